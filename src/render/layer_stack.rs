use serde::{Deserialize, Serialize};

/// Compositing layers, back to front.
///
/// The grid sits behind the data line, the price guide behind the pulse
/// halo, and labels always composite on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartLayerKind {
    Background,
    Grid,
    Series,
    PriceGuide,
    Pulse,
    Labels,
}

impl ChartLayerKind {
    /// Fixed z-order used for every frame.
    #[must_use]
    pub fn canonical_stack() -> Vec<ChartLayerKind> {
        vec![
            ChartLayerKind::Background,
            ChartLayerKind::Grid,
            ChartLayerKind::Series,
            ChartLayerKind::PriceGuide,
            ChartLayerKind::Pulse,
            ChartLayerKind::Labels,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::ChartLayerKind;

    #[test]
    fn canonical_stack_orders_grid_below_series_and_labels_on_top() {
        let stack = ChartLayerKind::canonical_stack();
        assert_eq!(
            stack,
            vec![
                ChartLayerKind::Background,
                ChartLayerKind::Grid,
                ChartLayerKind::Series,
                ChartLayerKind::PriceGuide,
                ChartLayerKind::Pulse,
                ChartLayerKind::Labels,
            ]
        );
    }
}
