use crate::core::sample::Sample;

/// Returns samples inside the visible time window, preserving order.
///
/// The window is the single uniform definition used by price-range
/// computation, line drawing and grid layout alike:
/// `0 <= now - timestamp <= adjusted_range_ms`. Samples newer than `now`
/// are excluded along with those that scrolled off the left edge.
#[must_use]
pub fn samples_in_visible_window<'a>(
    samples: impl Iterator<Item = &'a Sample>,
    now_ms: i64,
    adjusted_range_ms: f64,
) -> Vec<&'a Sample> {
    samples
        .filter(|sample| {
            let age_ms = (now_ms - sample.timestamp_ms) as f64;
            age_ms >= 0.0 && age_ms <= adjusted_range_ms
        })
        .collect()
}
