mod config;
mod engine;
mod frame_builder;

pub use config::{
    AnimationBehavior, ChartConfig, ChartStyle, GridBehavior, PriceGuideBehavior,
};
pub use engine::{ChartEngine, EngineSnapshot};
