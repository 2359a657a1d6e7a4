use chrono::DateTime;

use crate::api::config::ChartConfig;
use crate::core::{DataPoint, PriceRange, Sample, ScreenPoint, ViewportTransform};
use crate::render::{
    ChartLayerKind, CirclePrimitive, Color, LayerPrimitives, LinePrimitive, RectPrimitive,
    TextHAlign, TextPrimitive,
};

const GRID_STROKE_PX: f64 = 1.0;
const LINE_STROKE_PX: f64 = 2.0;
const POINT_MARKER_RADIUS_PX: f64 = 3.0;
const TIME_LABEL_BOTTOM_OFFSET_PX: f64 = 20.0;
const FONT_MIN_PX: f64 = 6.0;
const FONT_MAX_PX: f64 = 24.0;

const PULSE_RING_COUNT: usize = 3;
const PULSE_BASE_RADIUS_PX: f64 = 4.0;
const PULSE_MAX_RADIUS_PX: f64 = 12.0;

const GUIDE_DASH_PX: f64 = 4.0;
const GUIDE_LABEL_WIDTH_PX: f64 = 54.0;
const GUIDE_LABEL_HEIGHT_PX: f64 = 18.0;
const GUIDE_LABEL_MARGIN_PX: f64 = 4.0;

/// Grid lines plus their axis labels, cached between throttled rebuilds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GridScene {
    pub grid: LayerPrimitives,
    pub labels: Vec<TextPrimitive>,
}

/// Lays out the adaptive time/price grid.
///
/// The time interval shrinks with 1/scale_x so zooming in reveals finer
/// divisions, but never below a minimum on-screen spacing; the price axis
/// divides the visible range into more bands as scale_y grows. Label font
/// size shrinks with sqrt(scale) so text does not dominate at high zoom.
pub(crate) fn build_grid_scene(
    config: &ChartConfig,
    transform: &ViewportTransform,
    now_ms: i64,
    price_range: Option<PriceRange>,
) -> GridScene {
    let mut grid = LayerPrimitives {
        kind: ChartLayerKind::Grid,
        lines: Vec::new(),
        circles: Vec::new(),
        rects: Vec::new(),
        texts: Vec::new(),
    };
    let mut labels = Vec::new();

    let viewport = config.viewport;
    let width = f64::from(viewport.width);
    let height = f64::from(viewport.height);
    let state = transform.state();
    let window = config.time_window_ms;

    // Time axis. Pixel spacing of one interval under the current transform
    // is interval * scale_x^2 * width / window; double the interval until it
    // clears the minimum spacing.
    let mut interval_ms = config.grid.base_time_interval_ms / state.scale_x;
    let mut spacing_px = interval_ms * state.scale_x * state.scale_x * width / window;
    for _ in 0..32 {
        if spacing_px >= config.grid.min_time_spacing_px {
            break;
        }
        interval_ms *= 2.0;
        spacing_px *= 2.0;
    }

    let time_font_px =
        (config.grid.base_font_size_px / state.scale_x.sqrt()).clamp(FONT_MIN_PX, FONT_MAX_PX);

    let earliest = transform.x_to_time(0.0, now_ms, viewport, window);
    let latest = transform.x_to_time(width, now_ms, viewport, window);
    if earliest.is_finite() && latest.is_finite() && interval_ms > 0.0 {
        let first_index = (earliest / interval_ms).floor() as i64;
        let last_index = (latest / interval_ms).ceil() as i64;
        // Degenerate transforms could ask for absurd line counts.
        if last_index.saturating_sub(first_index) <= 512 {
            for index in first_index..=last_index {
                let t = index as f64 * interval_ms;
                let x = transform.time_to_x(t, now_ms, viewport, window);
                if !x.is_finite() || x < -spacing_px || x > width + spacing_px {
                    continue;
                }

                grid.lines.push(LinePrimitive::new(
                    x,
                    0.0,
                    x,
                    height,
                    GRID_STROKE_PX,
                    config.style.grid_color,
                ));

                if let Some(stamp) = DateTime::from_timestamp_millis(t.round() as i64) {
                    labels.push(TextPrimitive::new(
                        stamp.format("%H:%M:%S").to_string(),
                        x,
                        height - TIME_LABEL_BOTTOM_OFFSET_PX,
                        time_font_px,
                        config.style.text_color,
                        TextHAlign::Center,
                    ));
                }
            }
        }
    }

    // Price axis, only once a range exists.
    if let Some(range) = price_range {
        let divisions = ((f64::from(config.grid.base_price_divisions) * state.scale_y).round())
            .clamp(2.0, 64.0) as u32;
        let step = range.span() / f64::from(divisions);
        let price_font_px =
            (config.grid.base_font_size_px / state.scale_y.sqrt()).clamp(FONT_MIN_PX, FONT_MAX_PX);

        for index in 0..=divisions {
            let price = range.min + f64::from(index) * step;
            let y = transform.price_to_y(price, range, viewport);
            if !y.is_finite() || y < 0.0 || y > height {
                continue;
            }

            grid.lines.push(LinePrimitive::new(
                0.0,
                y,
                width,
                y,
                GRID_STROKE_PX,
                config.style.grid_color,
            ));
            labels.push(TextPrimitive::new(
                format!("{price:.2}"),
                5.0,
                y - 4.0,
                price_font_px,
                config.style.text_color,
                TextHAlign::Left,
            ));
        }
    }

    GridScene { grid, labels }
}

/// Projects the visible samples into the series layer.
///
/// All static segments end at the second-newest sample; the newest segment
/// runs to `animated` when a transition is in flight, else to the newest
/// sample itself. Returns the endpoint driving the pulse and price guide,
/// as the (time, price) pair actually drawn plus its screen mapping, so the
/// guide label always names the price behind the guide's y. Non-finite
/// coordinates are excluded, never raised.
pub(crate) fn build_series_layer(
    config: &ChartConfig,
    transform: &ViewportTransform,
    now_ms: i64,
    visible: &[&Sample],
    range: PriceRange,
    animated: Option<DataPoint>,
) -> (LayerPrimitives, Option<(DataPoint, ScreenPoint)>) {
    let mut series = LayerPrimitives {
        kind: ChartLayerKind::Series,
        lines: Vec::new(),
        circles: Vec::new(),
        rects: Vec::new(),
        texts: Vec::new(),
    };

    let viewport = config.viewport;
    let width = f64::from(viewport.width);
    let window = config.time_window_ms;

    let map = |point: DataPoint| -> Option<ScreenPoint> {
        let mapped = ScreenPoint::new(
            transform.time_to_x(point.x, now_ms, viewport, window),
            transform.price_to_y(point.y, range, viewport),
        );
        mapped.is_finite().then_some(mapped)
    };

    match visible {
        [] => (series, None),
        [only] => {
            let data = DataPoint::new(only.timestamp_ms as f64, only.price);
            let Some(point) = map(data) else {
                return (series, None);
            };
            series.circles.push(CirclePrimitive::filled(
                point.x,
                point.y,
                POINT_MARKER_RADIUS_PX,
                config.style.latest_point_color,
            ));
            (series, Some((data, point)))
        }
        [.., second_last, last] => {
            let static_points: Vec<Option<ScreenPoint>> = visible[..visible.len() - 1]
                .iter()
                .map(|sample| map(DataPoint::new(sample.timestamp_ms as f64, sample.price)))
                .collect();

            for pair in static_points.windows(2) {
                let (Some(a), Some(b)) = (pair[0], pair[1]) else {
                    continue;
                };
                if segment_visible(a, b, width) {
                    series.lines.push(LinePrimitive::new(
                        a.x,
                        a.y,
                        b.x,
                        b.y,
                        LINE_STROKE_PX,
                        config.style.line_color,
                    ));
                }
            }

            let endpoint_data =
                animated.unwrap_or_else(|| DataPoint::new(last.timestamp_ms as f64, last.price));
            let endpoint = map(endpoint_data);
            let from = map(DataPoint::new(
                second_last.timestamp_ms as f64,
                second_last.price,
            ));
            if let (Some(from), Some(endpoint)) = (from, endpoint) {
                if segment_visible(from, endpoint, width) {
                    series.lines.push(LinePrimitive::new(
                        from.x,
                        from.y,
                        endpoint.x,
                        endpoint.y,
                        LINE_STROKE_PX,
                        config.style.line_color,
                    ));
                }
            }

            (series, endpoint.map(|screen| (endpoint_data, screen)))
        }
    }
}

fn segment_visible(a: ScreenPoint, b: ScreenPoint, width: f64) -> bool {
    a.x.max(b.x) >= 0.0 && a.x.min(b.x) <= width
}

/// Pulsing halo at the line endpoint: three phase-offset rings expanding
/// and fading on a sine wave, plus a solid center dot.
pub(crate) fn build_pulse_layer(
    config: &ChartConfig,
    endpoint: ScreenPoint,
    phase: f64,
) -> LayerPrimitives {
    let mut pulse = LayerPrimitives {
        kind: ChartLayerKind::Pulse,
        lines: Vec::new(),
        circles: Vec::new(),
        rects: Vec::new(),
        texts: Vec::new(),
    };

    for ring in 0..PULSE_RING_COUNT {
        let phase_offset = ring as f64 * std::f64::consts::TAU / PULSE_RING_COUNT as f64;
        let wave = ((phase + phase_offset).sin()).mul_add(0.5, 0.5);
        let radius =
            PULSE_BASE_RADIUS_PX + (PULSE_MAX_RADIUS_PX - PULSE_BASE_RADIUS_PX) * wave;
        let alpha = (1.0 - wave) * 0.6;
        if alpha < 0.01 {
            continue;
        }
        pulse.circles.push(CirclePrimitive::ring(
            endpoint.x,
            endpoint.y,
            radius,
            LINE_STROKE_PX,
            config.style.line_color.with_alpha(alpha),
        ));
    }

    pulse.circles.push(CirclePrimitive::filled(
        endpoint.x,
        endpoint.y,
        POINT_MARKER_RADIUS_PX,
        config.style.line_color,
    ));

    pulse
}

/// Dashed latest-price guide at exactly the endpoint's y, plus the
/// right-edge price tag. Sharing the endpoint keeps the guide and the line
/// tip pixel-aligned even mid-animation.
pub(crate) fn build_price_guide(
    config: &ChartConfig,
    endpoint: ScreenPoint,
    price: f64,
) -> (LayerPrimitives, Vec<TextPrimitive>) {
    let mut guide = LayerPrimitives {
        kind: ChartLayerKind::PriceGuide,
        lines: Vec::new(),
        circles: Vec::new(),
        rects: Vec::new(),
        texts: Vec::new(),
    };
    let mut labels = Vec::new();

    let width = f64::from(config.viewport.width);

    guide.lines.push(LinePrimitive::dashed(
        0.0,
        endpoint.y,
        width,
        endpoint.y,
        GRID_STROKE_PX,
        GUIDE_DASH_PX,
        GUIDE_DASH_PX,
        config.style.latest_point_color.with_alpha(0.8),
    ));

    if config.price_guide.show_label && price.is_finite() {
        let tag_x = width - GUIDE_LABEL_WIDTH_PX - GUIDE_LABEL_MARGIN_PX;
        guide.rects.push(RectPrimitive::rounded(
            tag_x,
            endpoint.y - GUIDE_LABEL_HEIGHT_PX / 2.0,
            GUIDE_LABEL_WIDTH_PX,
            GUIDE_LABEL_HEIGHT_PX,
            4.0,
            config.style.latest_point_color.with_alpha(0.9),
        ));
        labels.push(TextPrimitive::new(
            format!("{price:.2}"),
            tag_x + GUIDE_LABEL_WIDTH_PX / 2.0,
            endpoint.y + 4.0,
            11.0,
            Color::rgb(1.0, 1.0, 1.0),
            TextHAlign::Center,
        ));
    }

    (guide, labels)
}
