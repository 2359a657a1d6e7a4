use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::sample::Sample;
use crate::core::types::Viewport;
use crate::error::{ChartError, ChartResult};

pub const SCALE_MIN: f64 = 0.1;
pub const SCALE_MAX: f64 = 10.0;

/// Horizontal anchor for the newest sample, as a fraction of chart width.
const LATEST_ANCHOR_RATIO: f64 = 0.75;
/// Vertical band for price mapping: top margin and band height as fractions
/// of chart height. The bottom 20% is reserved for time-axis labels.
const BAND_TOP_RATIO: f64 = 0.10;
const BAND_HEIGHT_RATIO: f64 = 0.70;

/// Price extent of the visible window, padded to avoid a degenerate axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Derives a padded range from the visible samples.
    ///
    /// Padding is 10% of the raw span with a 1.0-unit floor, so a flat or
    /// single-sample window still produces a non-zero-height axis.
    #[must_use]
    pub fn from_samples<'a>(samples: impl Iterator<Item = &'a Sample>) -> Option<Self> {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut seen = false;

        for sample in samples {
            if !sample.price.is_finite() {
                continue;
            }
            min = min.min(sample.price);
            max = max.max(sample.price);
            seen = true;
        }

        if !seen {
            return None;
        }

        let padding = ((max - min) * 0.1).max(1.0);
        Some(Self::new(min - padding, max + padding))
    }

    #[must_use]
    pub fn span(self) -> f64 {
        self.max - self.min
    }
}

/// Public pan/zoom state snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub is_dragging: bool,
    pub drag_anchor: (f64, f64),
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            is_dragging: false,
            drag_anchor: (0.0, 0.0),
        }
    }
}

/// Pan/zoom model and the two coordinate-mapping functions used by every
/// chart layer.
///
/// `time_to_x`/`price_to_y` are the single source of truth for geometry:
/// grid, line, pulse and price-guide layers all map through them so layers
/// stay pixel-aligned under any pan/zoom state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportTransform {
    state: ViewportState,
}

impl ViewportTransform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> ViewportState {
        self.state
    }

    /// Multiplies both scales by `factor` (clamped to `[0.1, 10]`) and
    /// adjusts offsets so the screen point `(center_x, center_y)` maps to
    /// the same (time, price) before and after: zoom anchors at the cursor.
    pub fn zoom(
        &mut self,
        factor: f64,
        center_x: f64,
        center_y: f64,
        viewport: Viewport,
    ) -> ChartResult<()> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ChartError::InvalidData(
                "zoom factor must be finite and > 0".to_owned(),
            ));
        }
        if !center_x.is_finite() || !center_y.is_finite() {
            return Err(ChartError::InvalidData(
                "zoom center must be finite".to_owned(),
            ));
        }
        viewport.validate()?;

        let width = f64::from(viewport.width);
        let old_scale_x = self.state.scale_x;
        let old_scale_y = self.state.scale_y;

        self.state.scale_x = (self.state.scale_x * factor).clamp(SCALE_MIN, SCALE_MAX);
        self.state.scale_y = (self.state.scale_y * factor).clamp(SCALE_MIN, SCALE_MAX);

        let scale_factor_x = self.state.scale_x / old_scale_x;
        let scale_factor_y = self.state.scale_y / old_scale_y;

        // The effective time window itself narrows with scale_x, so screen x
        // is quadratic in the scale ratio; solve the anchor offset exactly to
        // keep the time under the cursor fixed.
        let anchor_term =
            LATEST_ANCHOR_RATIO * width * old_scale_x + self.state.offset_x - center_x;
        self.state.offset_x = center_x - LATEST_ANCHOR_RATIO * width * self.state.scale_x
            + scale_factor_x * scale_factor_x * anchor_term;
        self.state.offset_y = center_y - (center_y - self.state.offset_y) * scale_factor_y;
        Ok(())
    }

    pub fn begin_drag(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            trace!("ignoring drag start with non-finite coordinates");
            return;
        }
        self.state.is_dragging = true;
        self.state.drag_anchor = (x, y);
    }

    pub fn drag_to(&mut self, x: f64, y: f64) {
        if !self.state.is_dragging {
            return;
        }
        if !x.is_finite() || !y.is_finite() {
            trace!("ignoring drag move with non-finite coordinates");
            return;
        }

        let (anchor_x, anchor_y) = self.state.drag_anchor;
        self.pan_by(x - anchor_x, y - anchor_y);
        self.state.drag_anchor = (x, y);
    }

    pub fn end_drag(&mut self) {
        self.state.is_dragging = false;
    }

    /// Adds to the pan offsets. Applies only while a drag gesture is active.
    pub fn pan_by(&mut self, delta_x: f64, delta_y: f64) {
        if !self.state.is_dragging {
            return;
        }
        if !delta_x.is_finite() || !delta_y.is_finite() {
            trace!("ignoring pan with non-finite deltas");
            return;
        }
        self.state.offset_x += delta_x;
        self.state.offset_y += delta_y;
    }

    /// Restores scale to 1 and offsets to 0 and ends any drag gesture.
    pub fn reset(&mut self) {
        self.state = ViewportState::default();
    }

    /// Effective visible time span: the base window widened or narrowed by
    /// the horizontal zoom.
    #[must_use]
    pub fn adjusted_time_range(&self, base_window_ms: f64) -> f64 {
        base_window_ms / self.state.scale_x
    }

    /// Maps a timestamp to a screen x. The newest instant (`now_ms`) is
    /// anchored at 75% of chart width; older samples extend leftward.
    ///
    /// Takes fractional milliseconds because mid-animation endpoints fall
    /// between sample timestamps.
    #[must_use]
    pub fn time_to_x(
        &self,
        timestamp_ms: f64,
        now_ms: i64,
        viewport: Viewport,
        base_window_ms: f64,
    ) -> f64 {
        let width = f64::from(viewport.width);
        let adjusted = self.adjusted_time_range(base_window_ms);
        let age_ms = now_ms as f64 - timestamp_ms;
        let base_x = LATEST_ANCHOR_RATIO * width - (age_ms / adjusted) * width;
        base_x * self.state.scale_x + self.state.offset_x
    }

    /// Inverse of [`Self::time_to_x`].
    #[must_use]
    pub fn x_to_time(
        &self,
        x: f64,
        now_ms: i64,
        viewport: Viewport,
        base_window_ms: f64,
    ) -> f64 {
        let width = f64::from(viewport.width);
        let adjusted = self.adjusted_time_range(base_window_ms);
        let base_x = (x - self.state.offset_x) / self.state.scale_x;
        let age_ms = (LATEST_ANCHOR_RATIO * width - base_x) / width * adjusted;
        now_ms as f64 - age_ms
    }

    /// Maps a price into the 10%–80% vertical band of the chart.
    #[must_use]
    pub fn price_to_y(&self, price: f64, range: PriceRange, viewport: Viewport) -> f64 {
        let height = f64::from(viewport.height);
        let band_top = height * BAND_TOP_RATIO;
        let band_height = height * BAND_HEIGHT_RATIO;
        let normalized = (price - range.min) / range.span();
        let base_y = band_top + band_height - normalized * band_height;
        base_y * self.state.scale_y + self.state.offset_y
    }

    /// Inverse of [`Self::price_to_y`].
    #[must_use]
    pub fn y_to_price(&self, y: f64, range: PriceRange, viewport: Viewport) -> f64 {
        let height = f64::from(viewport.height);
        let band_top = height * BAND_TOP_RATIO;
        let band_height = height * BAND_HEIGHT_RATIO;
        let base_y = (y - self.state.offset_y) / self.state.scale_y;
        let normalized = (band_top + band_height - base_y) / band_height;
        range.min + normalized * range.span()
    }
}
