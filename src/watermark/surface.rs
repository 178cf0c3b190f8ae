//! Drawing surface and layer compositing.
//!
//! A [`Surface`] owns the RGBA pixels of one composition. Watermark
//! instances are drawn onto it as pre-rendered layers. A layer is rotated
//! about its own center once per composition (`imageproc`, bilinear) into a
//! [`Stamp`], and every instance blends that stamp with Porter-Duff "over"
//! at the instance opacity. The surface keeps no drawing state between
//! calls.

use super::position::{normalize_rotation, rotated_bounds, BoundingBox, CanvasSize, DrawOrigin};
use super::text_renderer::Color;
use super::WatermarkError;
use image::imageops;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate, Interpolation};
use std::borrow::Cow;

/// How one layer is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
    /// 0.0 (invisible) to 1.0 (as rendered)
    pub opacity: f32,
    /// Clockwise, about the layer center
    pub rotation_degrees: f32,
}

impl DrawStyle {
    /// Build a style from a 0-100 opacity. Out-of-range values are clamped
    /// and NaN counts as invisible.
    pub fn from_percent(opacity_percent: f32, rotation_degrees: f32) -> Self {
        let opacity = if opacity_percent.is_nan() {
            0.0
        } else {
            (opacity_percent / 100.0).clamp(0.0, 1.0)
        };
        Self {
            opacity,
            rotation_degrees,
        }
    }
}

/// RGBA drawing surface.
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

fn check_size(size: CanvasSize, max_pixels: u64) -> Result<(), WatermarkError> {
    if size.is_empty() {
        return Err(WatermarkError::surface(
            size.width,
            size.height,
            "dimensions must be non-zero",
        ));
    }
    if size.pixel_count() > max_pixels {
        return Err(WatermarkError::surface(
            size.width,
            size.height,
            format!("exceeds the {} pixel limit", max_pixels),
        ));
    }
    Ok(())
}

impl Surface {
    /// A surface filled with `background`.
    pub fn blank(size: CanvasSize, background: Color, max_pixels: u64) -> Result<Self, WatermarkError> {
        check_size(size, max_pixels)?;
        Ok(Self {
            pixels: RgbaImage::from_pixel(size.width, size.height, background.to_rgba()),
        })
    }

    /// A surface holding `image` at its natural size.
    pub fn from_image(image: &DynamicImage, max_pixels: u64) -> Result<Self, WatermarkError> {
        check_size(CanvasSize::new(image.width(), image.height()), max_pixels)?;
        Ok(Self {
            pixels: image.to_rgba8(),
        })
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.pixels.width(), self.pixels.height())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    /// Draw `layer` with its unrotated top-left corner at `origin`.
    ///
    /// Returns `false` when nothing was drawn (zero opacity or empty layer).
    pub fn draw_layer(&mut self, layer: &RgbaImage, origin: DrawOrigin, style: DrawStyle) -> bool {
        if style.opacity <= 0.0 || layer.width() == 0 || layer.height() == 0 {
            return false;
        }
        let stamp = Stamp::new(layer, style.rotation_degrees);
        self.draw_stamp(&stamp, origin, style.opacity)
    }

    /// Draw an already rotated layer with its unrotated top-left corner at
    /// `origin`.
    pub fn draw_stamp(&mut self, stamp: &Stamp<'_>, origin: DrawOrigin, opacity: f32) -> bool {
        if opacity <= 0.0 || stamp.pixels.width() == 0 || stamp.pixels.height() == 0 {
            return false;
        }
        let (x, y) = stamp.top_left(origin);
        blend_layer(&mut self.pixels, &stamp.pixels, x, y, opacity);
        true
    }
}

/// A layer rotated once and drawn at any number of origins.
#[derive(Debug, Clone)]
pub struct Stamp<'a> {
    pixels: Cow<'a, RgbaImage>,
    source_width: u32,
    source_height: u32,
    rotated: bool,
}

impl<'a> Stamp<'a> {
    pub fn new(layer: &'a RgbaImage, rotation_degrees: f32) -> Self {
        let rotation = normalize_rotation(rotation_degrees);
        let pixels = if rotation == 0.0 || layer.width() == 0 || layer.height() == 0 {
            Cow::Borrowed(layer)
        } else {
            Cow::Owned(rotate_layer(layer, rotation))
        };
        Self {
            rotated: matches!(pixels, Cow::Owned(_)),
            pixels,
            source_width: layer.width(),
            source_height: layer.height(),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Where the stamp lands so that its center matches the unrotated
    /// layer's center.
    fn top_left(&self, origin: DrawOrigin) -> (i64, i64) {
        if !self.rotated {
            return (origin.x.round() as i64, origin.y.round() as i64);
        }
        let center_x = origin.x + self.source_width as f32 / 2.0;
        let center_y = origin.y + self.source_height as f32 / 2.0;
        (
            (center_x - self.pixels.width() as f32 / 2.0).round() as i64,
            (center_y - self.pixels.height() as f32 / 2.0).round() as i64,
        )
    }
}

/// Rotate a layer clockwise about its center.
///
/// The result is just large enough to hold the rotated layer (give or take
/// a pixel of parity) and shares its center. Uncovered pixels are
/// transparent.
pub fn rotate_layer(layer: &RgbaImage, degrees: f32) -> RgbaImage {
    let rotation = normalize_rotation(degrees);
    if rotation == 0.0 || layer.width() == 0 || layer.height() == 0 {
        return layer.clone();
    }

    let (width, height) = layer.dimensions();
    let bounds = rotated_bounds(&BoundingBox::new(width as f32, height as f32), rotation);
    // Shave float noise so 90° doesn't grow the box by a pixel
    let bounds_w = (bounds.width - 1e-3).ceil().max(1.0) as u32;
    let bounds_h = (bounds.height - 1e-3).ceil().max(1.0) as u32;

    // A transparent border keeps edge pixels inside the bilinear footprint.
    // Even margins keep both the layer and the crop centered on the pivot.
    let pad_w = even_margin(bounds_w.max(width + 2), width);
    let pad_h = even_margin(bounds_h.max(height + 2), height);
    let crop_w = even_margin(bounds_w, pad_w);
    let crop_h = even_margin(bounds_h, pad_h);

    // Text layers carry their color in transparent pixels too; matching it
    // avoids dark fringes when edges are interpolated.
    let corner = layer.get_pixel(0, 0);
    let clear = Rgba([corner[0], corner[1], corner[2], 0]);

    let mut padded = RgbaImage::from_pixel(pad_w, pad_h, clear);
    imageops::replace(
        &mut padded,
        layer,
        ((pad_w - width) / 2) as i64,
        ((pad_h - height) / 2) as i64,
    );

    let center = ((pad_w - 1) as f32 / 2.0, (pad_h - 1) as f32 / 2.0);
    let rotated = rotate(
        &padded,
        center,
        rotation.to_radians(),
        Interpolation::Bilinear,
        clear,
    );

    imageops::crop_imm(
        &rotated,
        (pad_w - crop_w) / 2,
        (pad_h - crop_h) / 2,
        crop_w,
        crop_h,
    )
    .to_image()
}

/// Grow `size` by one if needed so that `size - other` is even.
fn even_margin(size: u32, other: u32) -> u32 {
    if size.abs_diff(other) % 2 == 0 {
        size
    } else {
        size + 1
    }
}

/// Blend `layer` onto `target` with its top-left corner at `(x, y)`.
///
/// Only the overlapping region is touched.
fn blend_layer(target: &mut RgbaImage, layer: &RgbaImage, x: i64, y: i64, opacity: f32) {
    let start_x = x.max(0);
    let start_y = y.max(0);
    let end_x = (x + layer.width() as i64).min(target.width() as i64);
    let end_y = (y + layer.height() as i64).min(target.height() as i64);

    for ty in start_y..end_y {
        for tx in start_x..end_x {
            let fg = *layer.get_pixel((tx - x) as u32, (ty - y) as u32);
            if fg[3] == 0 {
                continue;
            }
            let bg = target.get_pixel_mut(tx as u32, ty as u32);
            *bg = blend_pixels(*bg, fg, opacity);
        }
    }
}

/// Porter-Duff "over" of `fg` (scaled by `opacity`) onto `bg`.
pub fn blend_pixels(bg: Rgba<u8>, fg: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = fg[3] as f32 / 255.0 * opacity.clamp(0.0, 1.0);
    if fg_alpha <= 0.0 {
        return bg;
    }
    let bg_alpha = bg[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);
    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |f: u8, b: u8| -> u8 {
        let result =
            (f as f32 * fg_alpha + b as f32 * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        result.round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(fg[0], bg[0]),
        blend(fg[1], bg[1]),
        blend(fg[2], bg[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
