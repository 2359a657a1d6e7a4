use serde::{Deserialize, Serialize};

use crate::core::Viewport;
use crate::error::{ChartError, ChartResult};
use crate::render::Color;

/// Newest-segment transition animation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationBehavior {
    pub enabled: bool,
    pub duration_ms: f64,
}

impl Default for AnimationBehavior {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_ms: 800.0,
        }
    }
}

/// Adaptive grid layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBehavior {
    /// Time-axis grid interval at scale 1.
    pub base_time_interval_ms: f64,
    /// Grid lines never pack tighter than this on screen.
    pub min_time_spacing_px: f64,
    /// Price-axis division count at scale 1.
    pub base_price_divisions: u32,
    /// Axis label font size at scale 1; shrinks with sqrt(scale).
    pub base_font_size_px: f64,
    /// Grid recomputation is throttled to this interval, independent of
    /// frame rate.
    pub recompute_throttle_ms: i64,
}

impl Default for GridBehavior {
    fn default() -> Self {
        Self {
            base_time_interval_ms: 5_000.0,
            min_time_spacing_px: 40.0,
            base_price_divisions: 8,
            base_font_size_px: 12.0,
            recompute_throttle_ms: 100,
        }
    }
}

/// Chart palette.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartStyle {
    pub background: Color,
    pub grid_color: Color,
    pub line_color: Color,
    pub latest_point_color: Color,
    pub text_color: Color,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            background: Color::rgb(0.102, 0.102, 0.102),
            grid_color: Color::rgba(0.2, 0.2, 0.2, 0.3),
            line_color: Color::rgb(0.0, 0.667, 1.0),
            latest_point_color: Color::rgb(1.0, 0.267, 0.267),
            text_color: Color::rgb(0.8, 0.8, 0.8),
        }
    }
}

/// Latest-price guide overlay settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceGuideBehavior {
    pub visible: bool,
    pub show_label: bool,
}

impl Default for PriceGuideBehavior {
    fn default() -> Self {
        Self {
            visible: true,
            show_label: true,
        }
    }
}

/// Public engine bootstrap configuration.
///
/// This type is serializable so host applications can persist/load chart
/// setup without inventing their own ad-hoc format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub viewport: Viewport,
    /// Visible time span at scale 1.
    #[serde(default = "default_time_window_ms")]
    pub time_window_ms: f64,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default)]
    pub animation: AnimationBehavior,
    #[serde(default)]
    pub grid: GridBehavior,
    #[serde(default)]
    pub style: ChartStyle,
    #[serde(default)]
    pub price_guide: PriceGuideBehavior,
}

impl ChartConfig {
    /// Creates a config with default window, capacity, animation and style.
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            time_window_ms: default_time_window_ms(),
            buffer_capacity: default_buffer_capacity(),
            animation: AnimationBehavior::default(),
            grid: GridBehavior::default(),
            style: ChartStyle::default(),
            price_guide: PriceGuideBehavior::default(),
        }
    }

    #[must_use]
    pub fn with_time_window_ms(mut self, time_window_ms: f64) -> Self {
        self.time_window_ms = time_window_ms;
        self
    }

    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_animation(mut self, animation: AnimationBehavior) -> Self {
        self.animation = animation;
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: ChartStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_price_guide(mut self, price_guide: PriceGuideBehavior) -> Self {
        self.price_guide = price_guide;
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        self.viewport.validate()?;

        if !self.time_window_ms.is_finite() || self.time_window_ms <= 0.0 {
            return Err(ChartError::InvalidData(
                "time window must be finite and > 0".to_owned(),
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(ChartError::InvalidData(
                "buffer capacity must be > 0".to_owned(),
            ));
        }
        if !self.animation.duration_ms.is_finite() || self.animation.duration_ms <= 0.0 {
            return Err(ChartError::InvalidData(
                "animation duration must be finite and > 0".to_owned(),
            ));
        }
        if !self.grid.base_time_interval_ms.is_finite() || self.grid.base_time_interval_ms <= 0.0 {
            return Err(ChartError::InvalidData(
                "grid time interval must be finite and > 0".to_owned(),
            ));
        }
        if !self.grid.min_time_spacing_px.is_finite() || self.grid.min_time_spacing_px <= 0.0 {
            return Err(ChartError::InvalidData(
                "grid minimum spacing must be finite and > 0".to_owned(),
            ));
        }
        if self.grid.base_price_divisions == 0 {
            return Err(ChartError::InvalidData(
                "grid price divisions must be > 0".to_owned(),
            ));
        }
        if !self.grid.base_font_size_px.is_finite() || self.grid.base_font_size_px <= 0.0 {
            return Err(ChartError::InvalidData(
                "grid font size must be finite and > 0".to_owned(),
            ));
        }
        if self.grid.recompute_throttle_ms < 0 {
            return Err(ChartError::InvalidData(
                "grid recompute throttle must be >= 0".to_owned(),
            ));
        }

        for color in [
            self.style.background,
            self.style.grid_color,
            self.style.line_color,
            self.style.latest_point_color,
            self.style.text_color,
        ] {
            color.validate()?;
        }

        Ok(())
    }
}

fn default_time_window_ms() -> f64 {
    60_000.0
}

fn default_buffer_capacity() -> usize {
    crate::core::buffer::DEFAULT_CAPACITY
}

#[cfg(test)]
mod tests {
    use super::ChartConfig;
    use crate::core::Viewport;

    #[test]
    fn default_config_is_valid_and_roundtrips_json() {
        let config = ChartConfig::new(Viewport::new(800, 600));
        config.validate().expect("default config valid");

        let json = serde_json::to_string(&config).expect("serialize");
        let back: ChartConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }

    #[test]
    fn validate_rejects_degenerate_settings() {
        let mut config = ChartConfig::new(Viewport::new(800, 600));
        config.time_window_ms = 0.0;
        assert!(config.validate().is_err());

        let mut config = ChartConfig::new(Viewport::new(0, 600));
        config.time_window_ms = 60_000.0;
        assert!(config.validate().is_err());

        let mut config = ChartConfig::new(Viewport::new(800, 600));
        config.animation.duration_ms = -1.0;
        assert!(config.validate().is_err());
    }
}
