// Configuration module
//
// Compositor settings loaded from YAML, with ${VAR} substitution from the
// environment. Every field has a default, so an empty document is valid.

use crate::logging::LogFormat;
use crate::watermark::image_loader::ImageLoaderConfig;
use crate::watermark::position::{CanvasSize, LayoutParams};
use crate::watermark::text_renderer::{parse_color, Color};
use crate::watermark::WatermarkError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest accepted `layout.max_grid`; a full grid is this squared.
pub const MAX_GRID_LIMIT: u32 = 1000;

// Default values
fn default_canvas_width() -> u32 {
    1920
}

fn default_canvas_height() -> u32 {
    1080
}

fn default_background() -> String {
    "#FFFFFF".to_string()
}

fn default_max_pixels() -> u64 {
    100_000_000
}

fn default_padding() -> f32 {
    20.0
}

fn default_anchor_area_fraction() -> f32 {
    0.15
}

fn default_logo_max_fraction() -> f32 {
    0.8
}

fn default_max_grid() -> u32 {
    100
}

fn default_cache_entries() -> u64 {
    32
}

fn default_cache_ttl_seconds() -> u64 {
    600
}

fn default_jpeg_quality() -> u8 {
    crate::watermark::encoder::DEFAULT_JPEG_QUALITY
}

/// Drawing surface settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Width of the blank canvas used when there is no base image
    #[serde(default = "default_canvas_width")]
    pub default_width: u32,

    /// Height of the blank canvas used when there is no base image
    #[serde(default = "default_canvas_height")]
    pub default_height: u32,

    /// Fill color of the blank canvas
    #[serde(default = "default_background")]
    pub background: String,

    /// Largest surface (width × height) a composition may allocate
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            default_width: default_canvas_width(),
            default_height: default_canvas_height(),
            background: default_background(),
            max_pixels: default_max_pixels(),
        }
    }
}

/// Layout engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Distance in pixels between anchored watermarks and the canvas edge
    #[serde(default = "default_padding")]
    pub padding: f32,

    /// Fraction of the canvas an anchored text grid is tiled into
    #[serde(default = "default_anchor_area_fraction")]
    pub anchor_area_fraction: f32,

    /// Largest share of either canvas dimension a logo may cover
    #[serde(default = "default_logo_max_fraction")]
    pub logo_max_fraction: f32,

    /// Upper bound for grid counts per axis
    #[serde(default = "default_max_grid")]
    pub max_grid: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            anchor_area_fraction: default_anchor_area_fraction(),
            logo_max_fraction: default_logo_max_fraction(),
            max_grid: default_max_grid(),
        }
    }
}

/// Decoded image cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCacheConfig {
    #[serde(default = "default_cache_entries")]
    pub max_entries: u64,

    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_entries(),
            ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JPEG quality used when a request doesn't name one (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Top-level compositor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositorConfig {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub image_cache: ImageCacheConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CompositorConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| e.to_string())
    }

    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        Self::from_yaml(&substituted)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        let canvas = &self.canvas;
        if canvas.default_width == 0 || canvas.default_height == 0 {
            return Err(format!(
                "canvas.default_width and canvas.default_height must be non-zero, got {}x{}",
                canvas.default_width, canvas.default_height
            ));
        }
        if canvas.max_pixels == 0 {
            return Err("canvas.max_pixels must be greater than 0".to_string());
        }
        if self.default_canvas().pixel_count() > canvas.max_pixels {
            return Err(format!(
                "Default canvas {}x{} exceeds canvas.max_pixels ({})",
                canvas.default_width, canvas.default_height, canvas.max_pixels
            ));
        }
        parse_color(&canvas.background).map_err(|e| format!("canvas.background: {}", e))?;

        let layout = &self.layout;
        if !layout.padding.is_finite() || layout.padding < 0.0 {
            return Err(format!(
                "layout.padding must be a finite value >= 0, got {}",
                layout.padding
            ));
        }
        if !layout.anchor_area_fraction.is_finite()
            || layout.anchor_area_fraction <= 0.0
            || layout.anchor_area_fraction > 1.0
        {
            return Err(format!(
                "layout.anchor_area_fraction must be in (0, 1], got {}",
                layout.anchor_area_fraction
            ));
        }
        if !layout.logo_max_fraction.is_finite()
            || layout.logo_max_fraction <= 0.0
            || layout.logo_max_fraction > 1.0
        {
            return Err(format!(
                "layout.logo_max_fraction must be in (0, 1], got {}",
                layout.logo_max_fraction
            ));
        }
        if layout.max_grid == 0 || layout.max_grid > MAX_GRID_LIMIT {
            return Err(format!(
                "layout.max_grid must be between 1 and {}, got {}",
                MAX_GRID_LIMIT, layout.max_grid
            ));
        }

        if self.image_cache.max_entries == 0 {
            return Err("image_cache.max_entries must be at least 1".to_string());
        }

        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(format!(
                "output.jpeg_quality must be between 1 and 100, got {}",
                self.output.jpeg_quality
            ));
        }

        Ok(())
    }

    /// Size of the blank canvas used when there is no base image.
    pub fn default_canvas(&self) -> CanvasSize {
        CanvasSize::new(self.canvas.default_width, self.canvas.default_height)
    }

    pub fn background_color(&self) -> Result<Color, WatermarkError> {
        parse_color(&self.canvas.background)
    }

    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            padding: self.layout.padding,
            anchor_area_fraction: self.layout.anchor_area_fraction,
            max_grid: self.layout.max_grid,
        }
    }

    pub fn loader_config(&self) -> ImageLoaderConfig {
        ImageLoaderConfig {
            max_cache_entries: self.image_cache.max_entries,
            cache_ttl: Duration::from_secs(self.image_cache.ttl_seconds),
        }
    }
}
