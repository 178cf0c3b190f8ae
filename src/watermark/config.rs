//! Watermark option types.
//!
//! This module defines what a single composition is asked to do:
//! - Text watermarks (content, color, font family, size, opacity)
//! - Image watermarks (logo source, scale, opacity)
//! - Placement (tile grid or one of seven anchors, with grid counts)
//! - Output format for the finished image
//!
//! Values arrive from a parameter UI that normally keeps them within range;
//! the `clamped()` helpers apply those UI ranges for callers that don't.

use super::encoder::OutputFormat;
use super::image_loader::ImageSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Default values
fn default_text() -> String {
    "👋 Hello Watermark".to_string()
}

fn default_color() -> String {
    "#334155".to_string()
}

fn default_font_family() -> String {
    "Arial".to_string()
}

fn default_font_size() -> f32 {
    32.0
}

fn default_text_opacity() -> f32 {
    40.0
}

fn default_rotation() -> f32 {
    330.0
}

fn default_grid() -> u32 {
    6
}

fn default_logo_opacity() -> f32 {
    80.0
}

fn default_logo_scale() -> f32 {
    20.0
}

/// Parameter UI ranges.
pub const FONT_SIZE_RANGE: (f32, f32) = (20.0, 200.0);
pub const OPACITY_RANGE: (f32, f32) = (1.0, 100.0);
pub const ROTATION_RANGE: (f32, f32) = (0.0, 360.0);
pub const GRID_RANGE: (u32, u32) = (1, 20);
pub const SCALE_RANGE: (f32, f32) = (1.0, 100.0);

/// Clamp a float into `range`, mapping NaN to the lower bound.
fn clamp_f32(value: f32, (min, max): (f32, f32)) -> f32 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// Where watermark instances go.
///
/// `Tile` spreads a grid over the whole canvas; the other seven names pin
/// the watermark to an anchor with a fixed padding from the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WatermarkPosition {
    Tile,
    Center,
    TopCenter,
    BottomCenter,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Horizontal part of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// Vertical part of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAnchor {
    Top,
    Middle,
    Bottom,
}

impl WatermarkPosition {
    pub const ALL: [WatermarkPosition; 8] = [
        WatermarkPosition::Tile,
        WatermarkPosition::Center,
        WatermarkPosition::TopCenter,
        WatermarkPosition::BottomCenter,
        WatermarkPosition::TopLeft,
        WatermarkPosition::TopRight,
        WatermarkPosition::BottomLeft,
        WatermarkPosition::BottomRight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tile => "tile",
            Self::Center => "center",
            Self::TopCenter => "topCenter",
            Self::BottomCenter => "bottomCenter",
            Self::TopLeft => "topLeft",
            Self::TopRight => "topRight",
            Self::BottomLeft => "bottomLeft",
            Self::BottomRight => "bottomRight",
        }
    }

    pub fn is_tile(&self) -> bool {
        matches!(self, Self::Tile)
    }

    /// Split an anchor into its axes. `Tile` has no anchor and reports the
    /// canvas center.
    pub fn anchor(&self) -> (HorizontalAnchor, VerticalAnchor) {
        match self {
            Self::Tile | Self::Center => (HorizontalAnchor::Center, VerticalAnchor::Middle),
            Self::TopCenter => (HorizontalAnchor::Center, VerticalAnchor::Top),
            Self::BottomCenter => (HorizontalAnchor::Center, VerticalAnchor::Bottom),
            Self::TopLeft => (HorizontalAnchor::Left, VerticalAnchor::Top),
            Self::TopRight => (HorizontalAnchor::Right, VerticalAnchor::Top),
            Self::BottomLeft => (HorizontalAnchor::Left, VerticalAnchor::Bottom),
            Self::BottomRight => (HorizontalAnchor::Right, VerticalAnchor::Bottom),
        }
    }
}

impl fmt::Display for WatermarkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown placement name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown watermark position '{0}' (expected one of tile, center, topCenter, bottomCenter, topLeft, topRight, bottomLeft, bottomRight)")]
pub struct ParsePositionError(pub String);

impl FromStr for WatermarkPosition {
    type Err = ParsePositionError;

    /// Accepts the camelCase names plus kebab-case spellings for the CLI.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "tile" => Ok(Self::Tile),
            "center" => Ok(Self::Center),
            "topcenter" => Ok(Self::TopCenter),
            "bottomcenter" => Ok(Self::BottomCenter),
            "topleft" => Ok(Self::TopLeft),
            "topright" => Ok(Self::TopRight),
            "bottomleft" => Ok(Self::BottomLeft),
            "bottomright" => Ok(Self::BottomRight),
            _ => Err(ParsePositionError(s.to_string())),
        }
    }
}

/// Text watermark options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextWatermark {
    /// Text to draw. Empty text draws nothing.
    #[serde(default = "default_text")]
    pub text: String,

    /// CSS-style color (`#RGB`, `#RRGGBB`, `#RRGGBBAA`, `rgb(r, g, b)`)
    #[serde(default = "default_color")]
    pub color: String,

    /// Font family name, resolved through the font book
    #[serde(default = "default_font_family")]
    pub font_family: String,

    #[serde(default = "default_font_size")]
    pub font_size_px: f32,

    /// 0 (invisible) to 100 (opaque)
    #[serde(default = "default_text_opacity")]
    pub opacity_percent: f32,
}

impl Default for TextWatermark {
    fn default() -> Self {
        Self {
            text: default_text(),
            color: default_color(),
            font_family: default_font_family(),
            font_size_px: default_font_size(),
            opacity_percent: default_text_opacity(),
        }
    }
}

impl TextWatermark {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn clamped(&self) -> Self {
        Self {
            font_size_px: clamp_f32(self.font_size_px, FONT_SIZE_RANGE),
            opacity_percent: clamp_f32(self.opacity_percent, OPACITY_RANGE),
            ..self.clone()
        }
    }
}

/// Image (logo) watermark options.
#[derive(Debug, Clone)]
pub struct ImageWatermark {
    pub source: ImageSource,

    /// 0 (invisible) to 100 (opaque), independent of the text opacity
    pub opacity_percent: f32,

    /// Logo height as a percentage of the canvas's smaller dimension
    pub scale_percent: f32,
}

impl ImageWatermark {
    pub fn new(source: ImageSource) -> Self {
        Self {
            source,
            opacity_percent: default_logo_opacity(),
            scale_percent: default_logo_scale(),
        }
    }

    pub fn clamped(&self) -> Self {
        Self {
            source: self.source.clone(),
            opacity_percent: clamp_f32(self.opacity_percent, OPACITY_RANGE),
            scale_percent: clamp_f32(self.scale_percent, SCALE_RANGE),
        }
    }
}

/// What gets stamped.
#[derive(Debug, Clone)]
pub enum WatermarkKind {
    Text(TextWatermark),
    Image(ImageWatermark),
}

impl WatermarkKind {
    pub fn label(&self) -> &'static str {
        match self {
            WatermarkKind::Text(_) => "text",
            WatermarkKind::Image(_) => "image",
        }
    }

    pub fn opacity_percent(&self) -> f32 {
        match self {
            WatermarkKind::Text(text) => text.opacity_percent,
            WatermarkKind::Image(image) => image.opacity_percent,
        }
    }
}

/// Complete watermark description.
#[derive(Debug, Clone)]
pub struct WatermarkSpec {
    pub kind: WatermarkKind,

    /// Clockwise, about each instance's own center
    pub rotation_degrees: f32,
}

impl WatermarkSpec {
    pub fn text(text: TextWatermark) -> Self {
        Self {
            kind: WatermarkKind::Text(text),
            rotation_degrees: default_rotation(),
        }
    }

    pub fn image(image: ImageWatermark) -> Self {
        Self {
            kind: WatermarkKind::Image(image),
            rotation_degrees: 0.0,
        }
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation_degrees = degrees;
        self
    }

    pub fn clamped(&self) -> Self {
        let kind = match &self.kind {
            WatermarkKind::Text(text) => WatermarkKind::Text(text.clamped()),
            WatermarkKind::Image(image) => WatermarkKind::Image(image.clamped()),
        };
        Self {
            kind,
            rotation_degrees: clamp_f32(self.rotation_degrees, ROTATION_RANGE),
        }
    }
}

/// Placement of the watermark instances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementSpec {
    pub position: WatermarkPosition,

    #[serde(default = "default_grid")]
    pub grid_x: u32,

    #[serde(default = "default_grid")]
    pub grid_y: u32,
}

impl Default for PlacementSpec {
    fn default() -> Self {
        Self {
            position: WatermarkPosition::Tile,
            grid_x: default_grid(),
            grid_y: default_grid(),
        }
    }
}

impl PlacementSpec {
    pub fn new(position: WatermarkPosition, grid_x: u32, grid_y: u32) -> Self {
        Self {
            position,
            grid_x,
            grid_y,
        }
    }

    /// A single anchored (or full-canvas) instance.
    pub fn single(position: WatermarkPosition) -> Self {
        Self::new(position, 1, 1)
    }

    pub fn clamped(&self) -> Self {
        Self {
            position: self.position,
            grid_x: self.grid_x.clamp(GRID_RANGE.0, GRID_RANGE.1),
            grid_y: self.grid_y.clamp(GRID_RANGE.0, GRID_RANGE.1),
        }
    }

    /// Grid counts the layout engine actually uses: at least one, at most
    /// `max_grid`, per axis.
    pub fn effective_grid(&self, max_grid: u32) -> (u32, u32) {
        let max_grid = max_grid.max(1);
        (
            self.grid_x.clamp(1, max_grid),
            self.grid_y.clamp(1, max_grid),
        )
    }
}

/// One composition job.
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub watermark: WatermarkSpec,
    pub placement: PlacementSpec,

    /// Photo to watermark. `None` composes onto a blank canvas.
    pub base_image: Option<ImageSource>,

    pub output: OutputFormat,
}

impl CompositionRequest {
    pub fn new(watermark: WatermarkSpec, placement: PlacementSpec) -> Self {
        Self {
            watermark,
            placement,
            base_image: None,
            output: OutputFormat::Png,
        }
    }

    pub fn with_base_image(mut self, source: ImageSource) -> Self {
        self.base_image = Some(source);
        self
    }

    pub fn with_output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }
}
