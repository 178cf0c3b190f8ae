//! Watermark compositing.
//!
//! Stamps a text or logo watermark onto a photo (or onto a blank canvas) and
//! encodes the result as PNG or JPEG.
//!
//! # Features
//!
//! - **Text watermarks** with color, font family, size and opacity
//! - **Image watermarks** scaled relative to the base image
//! - **8 placement modes**: a tiled grid plus 7 anchored positions
//! - **Rotation** of each instance about its own center
//! - **Partial results** when only the watermark stage fails
//!
//! # Example
//!
//! ```ignore
//! let request = CompositionRequest::new(
//!     WatermarkSpec::text(TextWatermark::new("CONFIDENTIAL")),
//!     PlacementSpec::new(WatermarkPosition::Tile, 6, 6),
//! )
//! .with_base_image(ImageSource::path("photo.jpg"))
//! .with_output(OutputFormat::jpeg(92));
//!
//! let encoded = compositor.compose(&request).await?;
//! std::fs::write(encoded.download_name(), &encoded.data)?;
//! ```

pub mod compositor;
pub mod config;
pub mod encoder;
pub mod error;
pub mod image_loader;
pub mod position;
pub mod result;
pub mod session;
pub mod surface;
pub mod text_renderer;

// Re-export main types for convenience
pub use compositor::{logo_target_size, CompositionStage, Compositor};
pub use config::{
    CompositionRequest, ImageWatermark, ParsePositionError, PlacementSpec, TextWatermark,
    WatermarkKind, WatermarkPosition, WatermarkSpec,
};
pub use encoder::{encode_surface, EncodedImage, OutputFormat};
pub use error::{CompositionError, ErrorKind, WatermarkError};
pub use image_loader::{CachedImage, ImageLoader, ImageLoaderConfig, ImageSource};
pub use position::{
    calculate_layout, clamp_to_bounds, is_visible, BoundingBox, CanvasSize, ContentKind,
    DrawOrigin, Layout, LayoutParams,
};
pub use result::CompositionResult;
pub use session::{PreviewSession, RequestId};
pub use surface::{DrawStyle, Stamp, Surface};
pub use text_renderer::{measure_text, parse_color, render_text, Color, FontBook, TextRenderOptions};
