use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::api::config::ChartConfig;
use crate::api::frame_builder::{self, GridScene};
use crate::core::buffer::FrequencyStats;
use crate::core::viewport::ViewportState;
use crate::core::windowing::samples_in_visible_window;
use crate::core::{
    AnimationScheduler, DataPoint, PriceRange, RawSample, Sample, SampleBuffer, Viewport,
    ViewportTransform,
};
use crate::error::{ChartError, ChartResult};
use crate::render::{ChartLayerKind, LayeredRenderFrame, RectPrimitive, RenderFrame, Renderer};

/// Pulse wave advance per rendered frame, in radians.
const PULSE_PHASE_STEP: f64 = 0.05;

#[derive(Debug, Clone)]
struct GridCache {
    built_at_ms: i64,
    scene: GridScene,
}

/// Serializable diagnostic snapshot of engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub config: ChartConfig,
    pub viewport: ViewportState,
    pub sample_count: usize,
    pub frequency: FrequencyStats,
    pub is_animating: bool,
    pub pending_animations: usize,
}

/// Top-level chart engine: owns the sample buffer, viewport transform and
/// animation scheduler, and assembles one render frame per tick.
///
/// The engine is frame-driven and holds no timers: the host calls
/// [`ChartEngine::on_frame`] with its own clock, which makes every
/// behavior, including animation and throttling, deterministic under test.
pub struct ChartEngine<R: Renderer> {
    renderer: R,
    config: ChartConfig,
    buffer: SampleBuffer,
    transform: ViewportTransform,
    scheduler: AnimationScheduler,
    pulse_phase: f64,
    grid_cache: Option<GridCache>,
    last_price_range: Option<PriceRange>,
}

impl<R: Renderer> ChartEngine<R> {
    pub fn new(renderer: R, config: ChartConfig) -> ChartResult<Self> {
        config.validate()?;

        Ok(Self {
            renderer,
            config,
            buffer: SampleBuffer::new(config.buffer_capacity)?,
            transform: ViewportTransform::new(),
            scheduler: AnimationScheduler::new(config.animation.duration_ms)?,
            pulse_phase: 0.0,
            grid_cache: None,
            last_price_range: None,
        })
    }

    /// Ingests one sample and, when animation is enabled and a previous
    /// sample exists, requests a transition from the old newest point to
    /// the new one.
    pub fn push_sample(&mut self, raw: RawSample, now_ms: i64) -> ChartResult<Sample> {
        let previous = self
            .buffer
            .samples()
            .last()
            .map(|sample| DataPoint::new(sample.timestamp_ms as f64, sample.price));

        let sample = self.buffer.add_sample(raw, now_ms)?;

        if self.config.animation.enabled {
            if let Some(from) = previous {
                let to = DataPoint::new(sample.timestamp_ms as f64, sample.price);
                self.scheduler.enqueue(from, to, now_ms);
            }
        }
        Ok(sample)
    }

    /// Builds and renders one frame at `now_ms`.
    pub fn on_frame(&mut self, now_ms: i64) -> ChartResult<()> {
        let frame = self.build_frame(now_ms);
        self.renderer.render(&frame)
    }

    /// Assembles the frame for `now_ms` without handing it to the renderer.
    ///
    /// Per-frame order: advance the animation, refresh frequency tracking,
    /// advance the pulse wave, resolve the visible window and price range,
    /// then populate layers back-to-front.
    pub fn build_frame(&mut self, now_ms: i64) -> RenderFrame {
        self.scheduler.tick(now_ms);
        self.buffer.refresh_frequency(now_ms);
        self.pulse_phase = (self.pulse_phase + PULSE_PHASE_STEP) % std::f64::consts::TAU;

        let adjusted = self
            .transform
            .adjusted_time_range(self.config.time_window_ms);
        let visible = samples_in_visible_window(self.buffer.samples(), now_ms, adjusted);

        // An empty window keeps the previous range so the grid and axis do
        // not collapse while data is momentarily out of view.
        let range = PriceRange::from_samples(visible.iter().copied()).or(self.last_price_range);
        self.last_price_range = range;

        let mut layered = LayeredRenderFrame::new(self.config.viewport);

        layered.push_rect(
            ChartLayerKind::Background,
            RectPrimitive::new(
                0.0,
                0.0,
                f64::from(self.config.viewport.width),
                f64::from(self.config.viewport.height),
                self.config.style.background,
            ),
        );

        let scene = cached_grid_scene(
            &mut self.grid_cache,
            &self.config,
            &self.transform,
            now_ms,
            range,
        );
        layered.replace_layer(scene.grid);
        for label in scene.labels {
            layered.push_text(ChartLayerKind::Labels, label);
        }

        if let Some(range) = range {
            let animated = self.scheduler.current_point();
            let (series, endpoint) = frame_builder::build_series_layer(
                &self.config,
                &self.transform,
                now_ms,
                &visible,
                range,
                animated,
            );
            layered.replace_layer(series);

            if let Some((endpoint_data, endpoint_screen)) = endpoint {
                if self.config.price_guide.visible {
                    let (guide, labels) = frame_builder::build_price_guide(
                        &self.config,
                        endpoint_screen,
                        endpoint_data.y,
                    );
                    layered.replace_layer(guide);
                    for label in labels {
                        layered.push_text(ChartLayerKind::Labels, label);
                    }
                }

                layered.replace_layer(frame_builder::build_pulse_layer(
                    &self.config,
                    endpoint_screen,
                    self.pulse_phase,
                ));
            }
        }

        layered.flatten()
    }

    /// Cursor-anchored zoom by `factor`, clamped to the scale limits.
    pub fn zoom(&mut self, factor: f64, center_x: f64, center_y: f64) -> ChartResult<()> {
        self.transform
            .zoom(factor, center_x, center_y, self.config.viewport)
    }

    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.transform.begin_drag(x, y);
    }

    pub fn drag_to(&mut self, x: f64, y: f64) {
        self.transform.drag_to(x, y);
    }

    pub fn end_drag(&mut self) {
        self.transform.end_drag();
    }

    /// Restores default pan/zoom and cancels all animations.
    pub fn reset_view(&mut self) {
        self.transform.reset();
        self.scheduler.clear();
        self.grid_cache = None;
        debug!("view reset");
    }

    /// Resizes the drawing surface. Pan/zoom state is preserved.
    pub fn set_viewport(&mut self, viewport: Viewport) -> ChartResult<()> {
        viewport.validate()?;
        self.config.viewport = viewport;
        self.grid_cache = None;
        Ok(())
    }

    /// Drops all samples and pending animations, keeping subscribers and
    /// view state.
    pub fn clear_data(&mut self) {
        self.buffer.clear();
        self.scheduler.clear();
        self.last_price_range = None;
    }

    /// Releases buffer subscribers and stops animations. Idempotent.
    pub fn dispose(&mut self) {
        self.buffer.dispose();
        self.scheduler.clear();
    }

    #[must_use]
    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    #[must_use]
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn buffer_mut(&mut self) -> &mut SampleBuffer {
        &mut self.buffer
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[must_use]
    pub fn viewport_state(&self) -> ViewportState {
        self.transform.state()
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.scheduler.is_animating()
    }

    pub fn frequency_stats(&mut self, now_ms: i64) -> FrequencyStats {
        self.buffer.frequency_stats(now_ms)
    }

    pub fn snapshot(&mut self, now_ms: i64) -> EngineSnapshot {
        EngineSnapshot {
            config: self.config,
            viewport: self.transform.state(),
            sample_count: self.buffer.len(),
            frequency: self.buffer.frequency_stats(now_ms),
            is_animating: self.scheduler.is_animating(),
            pending_animations: self.scheduler.pending_len(),
        }
    }

    /// Pretty-printed JSON snapshot for logs and bug reports.
    pub fn snapshot_json_pretty(&mut self, now_ms: i64) -> ChartResult<String> {
        serde_json::to_string_pretty(&self.snapshot(now_ms))
            .map_err(|err| ChartError::InvalidData(format!("snapshot serialization: {err}")))
    }
}

/// Grid scene lookup kept as a free function over the cache slot so frame
/// assembly can hold sample borrows while the cache is refreshed.
fn cached_grid_scene(
    cache: &mut Option<GridCache>,
    config: &ChartConfig,
    transform: &ViewportTransform,
    now_ms: i64,
    range: Option<PriceRange>,
) -> GridScene {
    if let Some(cache) = cache {
        if now_ms.saturating_sub(cache.built_at_ms) < config.grid.recompute_throttle_ms {
            return cache.scene.clone();
        }
    }

    let scene = frame_builder::build_grid_scene(config, transform, now_ms, range);
    trace!(
        lines = scene.grid.lines.len(),
        labels = scene.labels.len(),
        "grid recomputed"
    );
    *cache = Some(GridCache {
        built_at_ms: now_ms,
        scene: scene.clone(),
    });
    scene
}

#[cfg(test)]
mod tests {
    use super::ChartEngine;
    use crate::api::config::ChartConfig;
    use crate::core::{RawSample, Viewport};
    use crate::render::NullRenderer;

    fn engine() -> ChartEngine<NullRenderer> {
        let config = ChartConfig::new(Viewport::new(800, 600));
        ChartEngine::new(NullRenderer::default(), config).expect("engine")
    }

    #[test]
    fn push_sample_starts_animation_only_with_a_predecessor() {
        let mut engine = engine();
        engine
            .push_sample(RawSample::new(1_000, 100.0, 10, 1), 1_000)
            .expect("first");
        assert!(!engine.is_animating());

        engine
            .push_sample(RawSample::new(1_200, 101.0, 10, 2), 1_200)
            .expect("second");
        assert!(engine.is_animating());
    }

    #[test]
    fn grid_is_reused_within_the_throttle_window() {
        let mut engine = engine();
        engine
            .push_sample(RawSample::new(1_000, 100.0, 10, 1), 1_000)
            .expect("add");

        let first = engine.build_frame(1_000);
        let again = engine.build_frame(1_050);
        let grid_lines = |frame: &crate::render::RenderFrame| {
            frame
                .lines
                .iter()
                .filter(|line| line.stroke_width == 1.0)
                .count()
        };
        // 50ms later the cached grid is replayed verbatim.
        assert_eq!(grid_lines(&first), grid_lines(&again));

        let cache = engine.grid_cache.as_ref().expect("cache");
        assert_eq!(cache.built_at_ms, 1_000);

        engine.build_frame(1_101);
        let cache = engine.grid_cache.as_ref().expect("cache");
        assert_eq!(cache.built_at_ms, 1_101);
    }

    #[test]
    fn clear_data_keeps_view_state() {
        let mut engine = engine();
        engine
            .push_sample(RawSample::new(1_000, 100.0, 10, 1), 1_000)
            .expect("add");
        engine.zoom(2.0, 400.0, 300.0).expect("zoom");

        engine.clear_data();
        assert!(engine.buffer().is_empty());
        assert!((engine.viewport_state().scale_x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut engine = engine();
        engine
            .push_sample(RawSample::new(1_000, 100.0, 10, 1), 1_000)
            .expect("add");

        let json = engine.snapshot_json_pretty(1_500).expect("snapshot json");
        assert!(json.contains("\"sample_count\": 1"));
        assert!(json.contains("\"total_received\": 1"));
    }
}
