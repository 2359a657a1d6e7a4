use approx::assert_relative_eq;
use proptest::prelude::*;

use tickline::core::{PriceRange, Viewport, ViewportTransform};

const WINDOW_MS: f64 = 60_000.0;

#[test]
fn mapping_roundtrips_at_identity() {
    let transform = ViewportTransform::new();
    let viewport = Viewport::new(800, 600);
    let range = PriceRange::new(95.0, 105.0);
    let now = 120_000;

    for ts in [60_000.0, 90_000.0, 119_500.0, 120_000.0] {
        let x = transform.time_to_x(ts, now, viewport, WINDOW_MS);
        assert_relative_eq!(
            transform.x_to_time(x, now, viewport, WINDOW_MS),
            ts,
            max_relative = 1e-12
        );
    }

    for price in [95.0, 100.0, 104.75] {
        let y = transform.price_to_y(price, range, viewport);
        assert_relative_eq!(
            transform.y_to_price(y, range, viewport),
            price,
            max_relative = 1e-12
        );
    }
}

#[test]
fn mapping_roundtrips_after_pan_and_zoom() {
    let viewport = Viewport::new(1024, 768);
    let range = PriceRange::new(40.0, 60.0);
    let now = 500_000;

    let mut transform = ViewportTransform::new();
    transform.zoom(2.5, 300.0, 200.0, viewport).expect("zoom");
    transform.begin_drag(100.0, 100.0);
    transform.drag_to(37.0, 155.0);
    transform.end_drag();

    let x = transform.time_to_x(480_000.0, now, viewport, WINDOW_MS);
    assert_relative_eq!(
        transform.x_to_time(x, now, viewport, WINDOW_MS),
        480_000.0,
        max_relative = 1e-9
    );

    let y = transform.price_to_y(47.5, range, viewport);
    assert_relative_eq!(transform.y_to_price(y, range, viewport), 47.5, max_relative = 1e-9);
}

#[test]
fn zooming_in_narrows_the_visible_time_span() {
    let viewport = Viewport::new(800, 600);
    let mut transform = ViewportTransform::new();
    assert_relative_eq!(transform.adjusted_time_range(WINDOW_MS), 60_000.0);

    transform.zoom(2.0, 400.0, 300.0, viewport).expect("zoom");
    assert_relative_eq!(transform.adjusted_time_range(WINDOW_MS), 30_000.0);

    transform.reset();
    assert_relative_eq!(transform.adjusted_time_range(WINDOW_MS), 60_000.0);
}

proptest! {
    /// The data point under the cursor must not move when zooming, for any
    /// factor and cursor position, including factors that hit the scale
    /// clamp.
    #[test]
    fn zoom_is_anchored_at_the_cursor(
        factor in 0.1_f64..10.0,
        center_x in 0.0_f64..800.0,
        center_y in 0.0_f64..600.0,
        pan_x in -200.0_f64..200.0,
        pan_y in -200.0_f64..200.0,
    ) {
        let viewport = Viewport::new(800, 600);
        let range = PriceRange::new(90.0, 110.0);
        let now = 1_000_000;

        let mut transform = ViewportTransform::new();
        transform.begin_drag(0.0, 0.0);
        transform.drag_to(pan_x, pan_y);
        transform.end_drag();

        let anchor_time = transform.x_to_time(center_x, now, viewport, WINDOW_MS);
        let anchor_price = transform.y_to_price(center_y, range, viewport);
        prop_assume!(anchor_time.is_finite() && anchor_price.is_finite());

        transform.zoom(factor, center_x, center_y, viewport).expect("zoom");

        let x_after = transform.time_to_x(anchor_time, now, viewport, WINDOW_MS);
        let y_after = transform.price_to_y(anchor_price, range, viewport);
        prop_assert!((x_after - center_x).abs() < 1e-6);
        prop_assert!((y_after - center_y).abs() < 1e-6);
    }

    #[test]
    fn scale_always_stays_within_limits(
        factors in proptest::collection::vec(0.01_f64..100.0, 1..20),
    ) {
        let viewport = Viewport::new(800, 600);
        let mut transform = ViewportTransform::new();
        for factor in factors {
            transform.zoom(factor, 400.0, 300.0, viewport).expect("zoom");
            let state = transform.state();
            prop_assert!((0.1..=10.0).contains(&state.scale_x));
            prop_assert!((0.1..=10.0).contains(&state.scale_y));
        }
    }
}
