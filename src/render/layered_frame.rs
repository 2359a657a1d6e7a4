use crate::core::Viewport;

use super::{
    ChartLayerKind, CirclePrimitive, LinePrimitive, RectPrimitive, RenderFrame, TextPrimitive,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LayerPrimitives {
    pub kind: ChartLayerKind,
    pub lines: Vec<LinePrimitive>,
    pub circles: Vec<CirclePrimitive>,
    pub rects: Vec<RectPrimitive>,
    pub texts: Vec<TextPrimitive>,
}

impl LayerPrimitives {
    fn empty(kind: ChartLayerKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
            circles: Vec::new(),
            rects: Vec::new(),
            texts: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
            && self.circles.is_empty()
            && self.rects.is_empty()
            && self.texts.is_empty()
    }
}

/// Per-layer scene that flattens into a single [`RenderFrame`] preserving
/// the canonical z-order.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredRenderFrame {
    pub viewport: Viewport,
    pub layers: Vec<LayerPrimitives>,
}

impl LayeredRenderFrame {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        let layers = ChartLayerKind::canonical_stack()
            .into_iter()
            .map(LayerPrimitives::empty)
            .collect();
        Self { viewport, layers }
    }

    pub fn push_line(&mut self, kind: ChartLayerKind, line: LinePrimitive) {
        if let Some(layer) = self.layer_mut(kind) {
            layer.lines.push(line);
        }
    }

    pub fn push_circle(&mut self, kind: ChartLayerKind, circle: CirclePrimitive) {
        if let Some(layer) = self.layer_mut(kind) {
            layer.circles.push(circle);
        }
    }

    pub fn push_rect(&mut self, kind: ChartLayerKind, rect: RectPrimitive) {
        if let Some(layer) = self.layer_mut(kind) {
            layer.rects.push(rect);
        }
    }

    pub fn push_text(&mut self, kind: ChartLayerKind, text: TextPrimitive) {
        if let Some(layer) = self.layer_mut(kind) {
            layer.texts.push(text);
        }
    }

    /// Replaces one layer's primitives wholesale (used by the grid cache).
    pub fn replace_layer(&mut self, layer: LayerPrimitives) {
        if let Some(slot) = self.layer_mut(layer.kind) {
            *slot = layer;
        }
    }

    #[must_use]
    pub fn layer(&self, kind: ChartLayerKind) -> Option<&LayerPrimitives> {
        self.layers.iter().find(|layer| layer.kind == kind)
    }

    /// Flattens layers back-to-front into a single draw pass.
    #[must_use]
    pub fn flatten(&self) -> RenderFrame {
        let mut frame = RenderFrame::new(self.viewport);
        for layer in &self.layers {
            frame.lines.extend(layer.lines.iter().copied());
            frame.circles.extend(layer.circles.iter().copied());
            frame.rects.extend(layer.rects.iter().copied());
            frame.texts.extend(layer.texts.iter().cloned());
        }
        frame
    }

    fn layer_mut(&mut self, kind: ChartLayerKind) -> Option<&mut LayerPrimitives> {
        self.layers.iter_mut().find(|layer| layer.kind == kind)
    }
}
