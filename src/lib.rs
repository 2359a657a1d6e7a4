//! tickline: live streaming price chart engine.
//!
//! This crate provides a Rust-idiomatic core for rendering a continuously
//! arriving stream of price ticks as a pannable/zoomable line chart with a
//! smoothly animated newest segment. Drawing is abstracted behind the
//! [`render::Renderer`] trait so any immediate-mode 2D surface can host it.

pub mod api;
pub mod core;
pub mod error;
pub mod render;
pub mod telemetry;

pub use api::{ChartConfig, ChartEngine};
pub use error::{ChartError, ChartResult};
