mod frame;
mod layer_stack;
mod layered_frame;
mod null_renderer;
mod primitives;

pub use frame::RenderFrame;
pub use layer_stack::ChartLayerKind;
pub use layered_frame::{LayerPrimitives, LayeredRenderFrame};
pub use null_renderer::NullRenderer;
pub use primitives::{
    CirclePrimitive, Color, LinePrimitive, LineStrokeStyle, RectPrimitive, TextHAlign,
    TextPrimitive,
};

use crate::error::ChartResult;

/// Contract implemented by any rendering backend.
///
/// Backends receive a fully materialized, deterministic `RenderFrame` so
/// drawing code remains isolated from chart domain and interaction logic.
pub trait Renderer {
    fn render(&mut self, frame: &RenderFrame) -> ChartResult<()>;
}
