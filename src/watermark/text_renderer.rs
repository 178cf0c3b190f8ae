//! Text watermark rendering.
//!
//! This module measures and renders text watermarks into transparent RGBA
//! layers that the compositor rotates and blends onto the surface.
//!
//! # Features
//!
//! - CSS-style color parsing (`#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`,
//!   `rgb()` and `rgba()`)
//! - Font family resolution with embedded DejaVu faces and caller-registered
//!   fonts
//! - Canvas-like metrics: advance width plus kerning, ascent minus descent
//!
//! # Example
//!
//! ```ignore
//! use photo_watermark::watermark::text_renderer::{measure_text, parse_color, render_text, FontBook, TextRenderOptions};
//!
//! let fonts = FontBook::new()?;
//! let font = fonts.resolve("Arial");
//! let options = TextRenderOptions {
//!     text: "Copyright 2025".to_string(),
//!     font_size: 24.0,
//!     color: parse_color("#334155")?,
//! };
//!
//! let metrics = measure_text(font, &options.text, options.font_size)?;
//! let layer = render_text(font, &options, &metrics, u64::MAX)?;
//! ```

use super::WatermarkError;
use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use std::collections::HashMap;

const DEJAVU_SANS: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");
const DEJAVU_SERIF: &[u8] = include_bytes!("fonts/DejaVuSerif.ttf");
const DEJAVU_SANS_MONO: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

/// Family names that resolve to the embedded serif face.
const SERIF_FAMILIES: &[&str] = &[
    "serif",
    "times new roman",
    "times",
    "georgia",
    "simsun",
    "nsimsun",
    "kaiti",
    "stkaiti",
    "stsong",
    "stfangsong",
    "dejavu serif",
];

/// Family names that resolve to the embedded monospace face.
const MONO_FAMILIES: &[&str] = &[
    "monospace",
    "courier",
    "courier new",
    "consolas",
    "menlo",
    "dejavu sans mono",
];

/// Family names that resolve to the embedded sans-serif face. Anything not
/// listed anywhere falls back to sans-serif as well.
const SANS_FAMILIES: &[&str] = &[
    "sans-serif",
    "system-ui",
    "arial",
    "helvetica",
    "verdana",
    "inter",
    "microsoft yahei",
    "simhei",
    "pingfang sc",
    "stheiti",
    "dejavu sans",
];

/// A face the font book can hand out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontFace {
    SansSerif,
    Serif,
    Monospace,
    /// Registered at runtime, keyed by lowercase family name
    Custom(String),
}

/// Font family registry.
///
/// Immutable once built; share it between compositions by reference.
#[derive(Clone)]
pub struct FontBook {
    sans: FontArc,
    serif: FontArc,
    mono: FontArc,
    custom: HashMap<String, FontArc>,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut families: Vec<&String> = self.custom.keys().collect();
        families.sort();
        f.debug_struct("FontBook")
            .field("custom", &families)
            .finish()
    }
}

fn load_embedded(name: &str, data: &'static [u8]) -> Result<FontArc, WatermarkError> {
    FontArc::try_from_slice(data).map_err(|e| {
        WatermarkError::RenderError(format!("Embedded font {} is unusable: {}", name, e))
    })
}

/// Normalize one entry of a CSS font-family list.
fn normalize_family(family: &str) -> String {
    family
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_ascii_lowercase()
}

impl FontBook {
    /// Build a font book with the embedded faces.
    pub fn new() -> Result<Self, WatermarkError> {
        Ok(Self {
            sans: load_embedded("DejaVu Sans", DEJAVU_SANS)?,
            serif: load_embedded("DejaVu Serif", DEJAVU_SERIF)?,
            mono: load_embedded("DejaVu Sans Mono", DEJAVU_SANS_MONO)?,
            custom: HashMap::new(),
        })
    }

    /// Register a font family from TTF/OTF bytes.
    ///
    /// Registered families take precedence over the built-in name mapping,
    /// so registering "Arial" replaces the sans-serif stand-in.
    pub fn register(&mut self, family: &str, data: Vec<u8>) -> Result<(), WatermarkError> {
        let key = normalize_family(family);
        if key.is_empty() {
            return Err(WatermarkError::ConfigError(
                "Font family name cannot be empty".to_string(),
            ));
        }

        let font = FontArc::try_from_vec(data).map_err(|e| {
            WatermarkError::RenderError(format!("Invalid font data for '{}': {}", family, e))
        })?;

        self.custom.insert(key, font);
        Ok(())
    }

    pub fn is_registered(&self, family: &str) -> bool {
        self.custom.contains_key(&normalize_family(family))
    }

    /// Pick the face for a CSS-style family list (`"Inter", sans-serif`).
    ///
    /// The first entry that is registered or known wins. Unknown names fall
    /// back to sans-serif.
    pub fn face_for(&self, family: &str) -> FontFace {
        for candidate in family.split(',').map(normalize_family) {
            if candidate.is_empty() {
                continue;
            }
            if self.custom.contains_key(&candidate) {
                return FontFace::Custom(candidate);
            }
            if SERIF_FAMILIES.contains(&candidate.as_str()) {
                return FontFace::Serif;
            }
            if MONO_FAMILIES.contains(&candidate.as_str()) {
                return FontFace::Monospace;
            }
            if SANS_FAMILIES.contains(&candidate.as_str()) {
                return FontFace::SansSerif;
            }
        }
        FontFace::SansSerif
    }

    pub fn font(&self, face: &FontFace) -> &FontArc {
        match face {
            FontFace::SansSerif => &self.sans,
            FontFace::Serif => &self.serif,
            FontFace::Monospace => &self.mono,
            FontFace::Custom(key) => self.custom.get(key).unwrap_or(&self.sans),
        }
    }

    pub fn resolve(&self, family: &str) -> &FontArc {
        self.font(&self.face_for(family))
    }
}

/// Parsed RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(mut self, a: u8) -> Self {
        self.a = a;
        self
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn to_rgba(&self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

fn invalid_color(value: &str, reason: &str) -> WatermarkError {
    WatermarkError::RenderError(format!("Invalid color '{}': {}", value, reason))
}

fn hex_pair(hex: &str, idx: usize) -> u8 {
    // Callers validate the digits first
    u8::from_str_radix(&hex[idx..idx + 2], 16).unwrap_or(0)
}

fn hex_single(hex: &str, idx: usize) -> u8 {
    let v = u8::from_str_radix(&hex[idx..idx + 1], 16).unwrap_or(0);
    v * 17
}

fn parse_hex(value: &str, hex: &str) -> Result<Color, WatermarkError> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid_color(value, "non-hex characters"));
    }

    match hex.len() {
        3 => Ok(Color::new(
            hex_single(hex, 0),
            hex_single(hex, 1),
            hex_single(hex, 2),
        )),
        4 => Ok(Color::new(
            hex_single(hex, 0),
            hex_single(hex, 1),
            hex_single(hex, 2),
        )
        .with_alpha(hex_single(hex, 3))),
        6 => Ok(Color::new(
            hex_pair(hex, 0),
            hex_pair(hex, 2),
            hex_pair(hex, 4),
        )),
        8 => Ok(Color::new(
            hex_pair(hex, 0),
            hex_pair(hex, 2),
            hex_pair(hex, 4),
        )
        .with_alpha(hex_pair(hex, 6))),
        n => Err(invalid_color(
            value,
            &format!("expected 3, 4, 6 or 8 hex digits, got {}", n),
        )),
    }
}

fn parse_functional(value: &str, body: &str, with_alpha: bool) -> Result<Color, WatermarkError> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return Err(invalid_color(
            value,
            &format!("expected {} components, got {}", expected, parts.len()),
        ));
    }

    let channel = |part: &str| -> Result<u8, WatermarkError> {
        part.parse::<u8>()
            .map_err(|_| invalid_color(value, &format!("channel '{}' is not 0-255", part)))
    };

    let mut color = Color::new(channel(parts[0])?, channel(parts[1])?, channel(parts[2])?);

    if with_alpha {
        let alpha: f32 = parts[3]
            .parse()
            .map_err(|_| invalid_color(value, &format!("alpha '{}' is not a number", parts[3])))?;
        if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
            return Err(invalid_color(value, "alpha must be between 0 and 1"));
        }
        color.a = (alpha * 255.0).round() as u8;
    }

    Ok(color)
}

/// Parse a CSS-style color string.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_color("#FFF").unwrap(), Color::white());
/// assert_eq!(parse_color("rgb(255, 0, 0)").unwrap(), Color::new(255, 0, 0));
/// ```
pub fn parse_color(value: &str) -> Result<Color, WatermarkError> {
    let trimmed = value.trim();

    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex(value, hex);
    }

    let lower = trimmed.to_ascii_lowercase();
    if let Some(body) = lower.strip_prefix("rgba(").and_then(|s| s.strip_suffix(')')) {
        return parse_functional(value, body, true);
    }
    if let Some(body) = lower.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
        return parse_functional(value, body, false);
    }

    Err(invalid_color(value, "expected #hex, rgb() or rgba()"))
}

/// Canvas-like text metrics in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextMetrics {
    /// Sum of advances plus kerning
    pub width: f32,
    /// Ascent minus descent, or the font size when that is not positive
    pub height: f32,
    /// Distance from the top of the box to the baseline
    pub ascent: f32,
}

fn layout_width(font: &FontArc, scale: PxScale, text: &str) -> f32 {
    let scaled_font = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev_glyph: Option<GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);
        if let Some(prev) = prev_glyph {
            width += scaled_font.kern(prev, glyph_id);
        }
        width += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    width
}

/// Measure text at `font_size` pixels.
pub fn measure_text(font: &FontArc, text: &str, font_size: f32) -> Result<TextMetrics, WatermarkError> {
    if !font_size.is_finite() || font_size <= 0.0 {
        return Err(WatermarkError::RenderError(format!(
            "Font size must be a positive number, got {}",
            font_size
        )));
    }

    let scale = PxScale::from(font_size);
    let scaled_font = font.as_scaled(scale);

    let ascent = scaled_font.ascent();
    let descent = scaled_font.descent();
    let height = ascent - descent;

    let (height, ascent) = if height > 0.0 && height.is_finite() {
        (height, ascent)
    } else {
        (font_size, font_size)
    };

    Ok(TextMetrics {
        width: layout_width(font, scale, text).max(0.0),
        height,
        ascent,
    })
}

/// Options for text rendering.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    pub text: String,
    /// Font size in pixels.
    pub font_size: f32,
    pub color: Color,
}

/// Render text into a transparent layer sized to its metrics.
///
/// The layer is filled with the text color at zero alpha so that bilinear
/// sampling near glyph edges never bleeds a foreign color. Layers larger
/// than `max_pixels` are refused.
pub fn render_text(
    font: &FontArc,
    options: &TextRenderOptions,
    metrics: &TextMetrics,
    max_pixels: u64,
) -> Result<RgbaImage, WatermarkError> {
    if options.text.is_empty() {
        return Err(WatermarkError::RenderError(
            "Cannot render empty text".to_string(),
        ));
    }

    let width = (metrics.width.ceil() as u32).max(1);
    let height = (metrics.height.ceil() as u32).max(1);
    if width as u64 * height as u64 > max_pixels {
        return Err(WatermarkError::RenderError(format!(
            "Text layer {}x{} exceeds the {} pixel limit",
            width, height, max_pixels
        )));
    }

    let scale = PxScale::from(options.font_size);
    let scaled_font = font.as_scaled(scale);

    // Accumulated glyph coverage, 0.0 to 1.0 per pixel
    let mut coverage = vec![0.0f32; width as usize * height as usize];

    let baseline_y = metrics.ascent;
    let mut cursor_x = 0.0f32;
    let mut prev_glyph: Option<GlyphId> = None;

    for c in options.text.chars() {
        let glyph_id = scaled_font.glyph_id(c);

        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, ab_glyph::point(cursor_x, baseline_y));

        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();

            outlined.draw(|px, py, cov| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;

                if x >= 0 && y >= 0 && x < width as i32 && y < height as i32 {
                    let idx = y as usize * width as usize + x as usize;
                    let existing = coverage[idx];
                    coverage[idx] = existing + cov.clamp(0.0, 1.0) * (1.0 - existing);
                }
            });
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    let color = options.color;
    let color_alpha = color.a as f32;
    let layer = RgbaImage::from_fn(width, height, |x, y| {
        let cov = coverage[y as usize * width as usize + x as usize];
        let alpha = (cov * color_alpha).round().clamp(0.0, 255.0) as u8;
        Rgba([color.r, color.g, color.b, alpha])
    });

    Ok(layer)
}
