//! Watermark error types.
//!
//! Two layers of errors live here:
//!
//! - [`WatermarkError`] is raised by the individual building blocks (image
//!   loading, text rendering, surface allocation, encoding, option parsing).
//! - [`CompositionError`] is the outcome of a whole composition. It carries
//!   one of five closed [`ErrorKind`]s and, for failures that happen after
//!   the base image was drawn, a best-effort partial render.

use super::encoder::EncodedImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by the watermark building blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatermarkError {
    /// Failed to read the bytes behind an image source
    #[error("Failed to fetch image: {0}")]
    FetchError(String),

    /// Failed to decode image bytes
    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    /// Failed to measure or render watermark content
    #[error("Failed to render watermark: {0}")]
    RenderError(String),

    /// Drawing surface could not be allocated
    #[error("Cannot create {width}x{height} drawing surface: {reason}")]
    SurfaceError {
        width: u32,
        height: u32,
        reason: String,
    },

    /// Encoding the surface failed or produced nothing
    #[error("Failed to encode to {format}: {message}")]
    EncodeError { format: String, message: String },

    /// Invalid configuration or option value
    #[error("Watermark configuration error: {0}")]
    ConfigError(String),
}

impl WatermarkError {
    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        WatermarkError::EncodeError {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn surface(width: u32, height: u32, reason: impl Into<String>) -> Self {
        WatermarkError::SurfaceError {
            width,
            height,
            reason: reason.into(),
        }
    }
}

/// Closed classification of composition failures.
///
/// Serialized with the names the UI layer keys its messages on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "canvasContextError")]
    CanvasContext,
    #[serde(rename = "mainImageLoadError")]
    MainImageLoad,
    #[serde(rename = "logoImageLoadError")]
    LogoImageLoad,
    #[serde(rename = "canvasDrawingError")]
    CanvasDrawing,
    #[serde(rename = "imageExportError")]
    ImageExport,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CanvasContext => "canvasContextError",
            ErrorKind::MainImageLoad => "mainImageLoadError",
            ErrorKind::LogoImageLoad => "logoImageLoadError",
            ErrorKind::CanvasDrawing => "canvasDrawingError",
            ErrorKind::ImageExport => "imageExportError",
        }
    }

    /// Whether a partial render can accompany this kind of failure.
    pub fn allows_partial(&self) -> bool {
        matches!(self, ErrorKind::LogoImageLoad | ErrorKind::CanvasDrawing)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single composition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompositionError {
    /// The drawing surface could not be created. Fatal.
    #[error("Drawing surface could not be created: {message}")]
    CanvasContext { message: String },

    /// The base image failed to load or decode. Fatal, nothing was drawn.
    #[error("Failed to load main image: {message}")]
    MainImageLoad { message: String },

    /// The watermark image failed to load. The base render is salvaged.
    #[error("Failed to load watermark image: {message}")]
    LogoImageLoad {
        message: String,
        partial: Option<EncodedImage>,
    },

    /// Measuring or drawing the watermark failed.
    #[error("Failed to draw watermark: {message}")]
    CanvasDrawing {
        message: String,
        partial: Option<EncodedImage>,
    },

    /// The finished surface could not be encoded.
    #[error("Failed to export image: {message}")]
    ImageExport { message: String },
}

impl CompositionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompositionError::CanvasContext { .. } => ErrorKind::CanvasContext,
            CompositionError::MainImageLoad { .. } => ErrorKind::MainImageLoad,
            CompositionError::LogoImageLoad { .. } => ErrorKind::LogoImageLoad,
            CompositionError::CanvasDrawing { .. } => ErrorKind::CanvasDrawing,
            CompositionError::ImageExport { .. } => ErrorKind::ImageExport,
        }
    }

    /// Human-readable description without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            CompositionError::CanvasContext { message }
            | CompositionError::MainImageLoad { message }
            | CompositionError::LogoImageLoad { message, .. }
            | CompositionError::CanvasDrawing { message, .. }
            | CompositionError::ImageExport { message } => message,
        }
    }

    /// Best-effort render salvaged after a watermark-stage failure.
    pub fn partial(&self) -> Option<&EncodedImage> {
        match self {
            CompositionError::LogoImageLoad { partial, .. }
            | CompositionError::CanvasDrawing { partial, .. } => partial.as_ref(),
            _ => None,
        }
    }

    pub fn into_partial(self) -> Option<EncodedImage> {
        match self {
            CompositionError::LogoImageLoad { partial, .. }
            | CompositionError::CanvasDrawing { partial, .. } => partial,
            _ => None,
        }
    }

    pub fn canvas_context(err: impl fmt::Display) -> Self {
        CompositionError::CanvasContext {
            message: err.to_string(),
        }
    }

    pub fn main_image_load(err: impl fmt::Display) -> Self {
        CompositionError::MainImageLoad {
            message: err.to_string(),
        }
    }

    pub fn logo_image_load(err: impl fmt::Display, partial: Option<EncodedImage>) -> Self {
        CompositionError::LogoImageLoad {
            message: err.to_string(),
            partial,
        }
    }

    pub fn canvas_drawing(err: impl fmt::Display, partial: Option<EncodedImage>) -> Self {
        CompositionError::CanvasDrawing {
            message: err.to_string(),
            partial,
        }
    }

    pub fn image_export(err: impl fmt::Display) -> Self {
        CompositionError::ImageExport {
            message: err.to_string(),
        }
    }
}
