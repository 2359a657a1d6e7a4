use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// RGBA color in normalized 0..=1 channel values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Color {
    #[must_use]
    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    #[must_use]
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Self::rgba(red, green, blue, 1.0)
    }

    #[must_use]
    pub const fn with_alpha(self, alpha: f64) -> Self {
        Self::rgba(self.red, self.green, self.blue, alpha)
    }

    pub fn validate(self) -> ChartResult<()> {
        for (channel, value) in [
            ("red", self.red),
            ("green", self.green),
            ("blue", self.blue),
            ("alpha", self.alpha),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ChartError::InvalidData(format!(
                    "color channel `{channel}` must be finite and in [0, 1]"
                )));
            }
        }
        Ok(())
    }
}

/// Stroke pattern for line primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineStrokeStyle {
    Solid,
    Dashed { dash_px: f64, gap_px: f64 },
}

impl LineStrokeStyle {
    pub fn validate(self) -> ChartResult<()> {
        if let Self::Dashed { dash_px, gap_px } = self {
            if !dash_px.is_finite() || dash_px <= 0.0 || !gap_px.is_finite() || gap_px <= 0.0 {
                return Err(ChartError::InvalidData(
                    "dash pattern lengths must be finite and > 0".to_owned(),
                ));
            }
        }
        Ok(())
    }
}

/// Draw command for one line segment in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePrimitive {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub stroke_width: f64,
    pub stroke_style: LineStrokeStyle,
    pub color: Color,
}

impl LinePrimitive {
    #[must_use]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64, stroke_width: f64, color: Color) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            stroke_width,
            stroke_style: LineStrokeStyle::Solid,
            color,
        }
    }

    #[must_use]
    pub const fn dashed(
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke_width: f64,
        dash_px: f64,
        gap_px: f64,
        color: Color,
    ) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            stroke_width,
            stroke_style: LineStrokeStyle::Dashed { dash_px, gap_px },
            color,
        }
    }

    pub fn validate(self) -> ChartResult<()> {
        if !self.x1.is_finite()
            || !self.y1.is_finite()
            || !self.x2.is_finite()
            || !self.y2.is_finite()
        {
            return Err(ChartError::InvalidData(
                "line coordinates must be finite".to_owned(),
            ));
        }
        if !self.stroke_width.is_finite() || self.stroke_width <= 0.0 {
            return Err(ChartError::InvalidData(
                "line stroke width must be finite and > 0".to_owned(),
            ));
        }
        self.stroke_style.validate()?;
        self.color.validate()
    }
}

/// Draw command for one circle in pixel space: stroked ring, filled disc,
/// or both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CirclePrimitive {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
    pub stroke: Option<(f64, Color)>,
    pub fill: Option<Color>,
}

impl CirclePrimitive {
    #[must_use]
    pub const fn ring(cx: f64, cy: f64, radius: f64, stroke_width: f64, color: Color) -> Self {
        Self {
            cx,
            cy,
            radius,
            stroke: Some((stroke_width, color)),
            fill: None,
        }
    }

    #[must_use]
    pub const fn filled(cx: f64, cy: f64, radius: f64, color: Color) -> Self {
        Self {
            cx,
            cy,
            radius,
            stroke: None,
            fill: Some(color),
        }
    }

    pub fn validate(self) -> ChartResult<()> {
        if !self.cx.is_finite() || !self.cy.is_finite() {
            return Err(ChartError::InvalidData(
                "circle center must be finite".to_owned(),
            ));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(ChartError::InvalidData(
                "circle radius must be finite and > 0".to_owned(),
            ));
        }
        if self.stroke.is_none() && self.fill.is_none() {
            return Err(ChartError::InvalidData(
                "circle must have a stroke or a fill".to_owned(),
            ));
        }
        if let Some((width, color)) = self.stroke {
            if !width.is_finite() || width <= 0.0 {
                return Err(ChartError::InvalidData(
                    "circle stroke width must be finite and > 0".to_owned(),
                ));
            }
            color.validate()?;
        }
        if let Some(color) = self.fill {
            color.validate()?;
        }
        Ok(())
    }
}

/// Draw command for one filled rectangle, optionally rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectPrimitive {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub corner_radius: f64,
    pub fill: Color,
}

impl RectPrimitive {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64, fill: Color) -> Self {
        Self {
            x,
            y,
            width,
            height,
            corner_radius: 0.0,
            fill,
        }
    }

    #[must_use]
    pub const fn rounded(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        corner_radius: f64,
        fill: Color,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            corner_radius,
            fill,
        }
    }

    pub fn validate(self) -> ChartResult<()> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ChartError::InvalidData(
                "rect origin must be finite".to_owned(),
            ));
        }
        if !self.width.is_finite() || self.width <= 0.0 || !self.height.is_finite() || self.height <= 0.0 {
            return Err(ChartError::InvalidData(
                "rect dimensions must be finite and > 0".to_owned(),
            ));
        }
        if !self.corner_radius.is_finite() || self.corner_radius < 0.0 {
            return Err(ChartError::InvalidData(
                "rect corner radius must be finite and >= 0".to_owned(),
            ));
        }
        self.fill.validate()
    }
}

/// Horizontal text alignment relative to `TextPrimitive::x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextHAlign {
    Left,
    Center,
    Right,
}

/// Draw command for one label in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPrimitive {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size_px: f64,
    pub color: Color,
    pub h_align: TextHAlign,
}

impl TextPrimitive {
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        x: f64,
        y: f64,
        font_size_px: f64,
        color: Color,
        h_align: TextHAlign,
    ) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_size_px,
            color,
            h_align,
        }
    }

    pub fn validate(&self) -> ChartResult<()> {
        if self.text.is_empty() {
            return Err(ChartError::InvalidData(
                "text primitive must not be empty".to_owned(),
            ));
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(ChartError::InvalidData(
                "text coordinates must be finite".to_owned(),
            ));
        }
        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(ChartError::InvalidData(
                "font size must be finite and > 0".to_owned(),
            ));
        }
        self.color.validate()
    }
}
