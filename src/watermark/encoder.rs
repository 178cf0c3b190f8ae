//! Surface encoders.
//!
//! Provides a trait-based encoder system for the finished surface:
//! - PNG keeps the alpha channel and is lossless
//! - JPEG flattens alpha onto white and takes a 1-100 quality factor
//!
//! Output format and quality never depend on the format of the input photo.

use super::WatermarkError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// File name stem used for downloads.
pub const DOWNLOAD_STEM: &str = "watermarked-image";

/// JPEG quality used when none is given.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless, keeps transparency
    #[default]
    Png,
    /// Lossy, quality 1 (smallest) to 100 (best)
    Jpeg {
        #[serde(default = "default_jpeg_quality")]
        quality: u8,
    },
}

impl OutputFormat {
    /// JPEG with the quality clamped to 1..=100.
    pub fn jpeg(quality: u8) -> Self {
        OutputFormat::Jpeg {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, OutputFormat::Png)
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg { .. } => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg { .. } => "jpeg",
        }
    }

    /// Quality on the 0.0-1.0 scale browsers use. PNG reports 1.0.
    pub fn quality_fraction(&self) -> f32 {
        match self {
            OutputFormat::Png => 1.0,
            OutputFormat::Jpeg { quality } => *quality as f32 / 100.0,
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg { .. } => ImageFormat::Jpeg,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = WatermarkError;

    /// Parses a format name; JPEG gets the default quality.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" | "lossless" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" | "lossy" => Ok(OutputFormat::jpeg(DEFAULT_JPEG_QUALITY)),
            other => Err(WatermarkError::ConfigError(format!(
                "Unknown output format '{}' (expected png or jpeg)",
                other
            ))),
        }
    }
}

/// Result of encoding a surface.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("bytes", &self.data.len())
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: OutputFormat, width: u32, height: u32) -> Self {
        Self {
            data,
            format,
            width,
            height,
        }
    }

    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `watermarked-image.png` or `watermarked-image.jpeg`.
    pub fn download_name(&self) -> String {
        format!("{}.{}", DOWNLOAD_STEM, self.extension())
    }

    /// `data:<mime>;base64,<payload>`
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime(), STANDARD.encode(&self.data))
    }

    /// Decode the payload back into a bitmap.
    pub fn decode(&self) -> Result<DynamicImage, WatermarkError> {
        image::load_from_memory_with_format(&self.data, self.format.image_format())
            .map_err(|e| WatermarkError::DecodeError(e.to_string()))
    }
}

/// Trait for surface encoders.
///
/// Implementations turn raw RGBA pixels into one output format. The trait
/// is object-safe so [`EncoderFactory`] can hand out boxed encoders.
pub trait SurfaceEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> OutputFormat;

    /// Encode raw RGBA pixel data (4 bytes per pixel)
    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<EncodedImage, WatermarkError>;

    fn supports_transparency(&self) -> bool;
}

/// JPEG encoder using the image crate
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl SurfaceEncoder for JpegEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg {
            quality: self.quality,
        }
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<EncodedImage, WatermarkError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        // JPEG has no alpha channel
        let rgb_data = flatten_onto_white(data);

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, self.quality);

        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8)
            .map_err(|e| WatermarkError::encode_failed("jpeg", e.to_string()))?;

        Ok(EncodedImage::new(
            output.into_inner(),
            self.format(),
            width,
            height,
        ))
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// PNG encoder using the image crate
pub struct PngEncoder;

impl SurfaceEncoder for PngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(&self, data: &[u8], width: u32, height: u32) -> Result<EncodedImage, WatermarkError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new(&mut output);

        encoder
            .write_image(data, width, height, image::ColorType::Rgba8)
            .map_err(|e| WatermarkError::encode_failed("png", e.to_string()))?;

        Ok(EncodedImage::new(
            output.into_inner(),
            OutputFormat::Png,
            width,
            height,
        ))
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

pub struct EncoderFactory;

impl EncoderFactory {
    /// Create an encoder for the specified output format
    pub fn create(format: OutputFormat) -> Box<dyn SurfaceEncoder> {
        match format {
            OutputFormat::Png => Box::new(PngEncoder),
            OutputFormat::Jpeg { quality } => Box::new(JpegEncoder::new(quality)),
        }
    }
}

/// Encode a finished surface, rejecting empty payloads.
pub fn encode_surface(
    surface: &RgbaImage,
    format: OutputFormat,
) -> Result<EncodedImage, WatermarkError> {
    let encoder = EncoderFactory::create(format);
    let encoded = encoder.encode(surface.as_raw(), surface.width(), surface.height())?;

    if encoded.is_empty() {
        return Err(WatermarkError::encode_failed(
            format.extension(),
            "encoder produced an empty payload",
        ));
    }

    Ok(encoded)
}

/// Convert RGBA to RGB by compositing over opaque white
fn flatten_onto_white(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for chunk in rgba.chunks_exact(4) {
        let alpha = chunk[3] as u32;
        for &channel in &chunk[..3] {
            let mixed = (channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(mixed as u8);
        }
    }
    rgb
}
