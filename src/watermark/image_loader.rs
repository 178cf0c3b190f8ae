//! Image loading with caching.
//!
//! This module turns the image sources handed over by the acquisition layer
//! (file pickers, URL import, drag and drop) into decoded bitmaps, and keeps
//! recently decoded bitmaps in memory so that re-rendering a preview with new
//! watermark settings doesn't decode the same photo or logo again.
//!
//! # Supported Sources
//!
//! - `data:image/png;base64,...` - Data URI
//! - Raw encoded bytes
//! - Local file path
//! - An already decoded bitmap (never cached, returned as-is)
//!
//! # Caching
//!
//! Decoded bitmaps are cached in a `moka` cache with a bounded entry count
//! and a TTL. Paths are keyed by path, size and modification time; byte
//! payloads by their SHA-256.
//!
//! # Example
//!
//! ```ignore
//! use photo_watermark::watermark::image_loader::{ImageLoader, ImageLoaderConfig, ImageSource};
//!
//! let loader = ImageLoader::new(ImageLoaderConfig::default());
//! let image = loader.load(&ImageSource::path("photo.jpg")).await?;
//! ```

use super::WatermarkError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tracing::debug;

/// Configuration for the image loader.
#[derive(Debug, Clone)]
pub struct ImageLoaderConfig {
    /// Maximum number of cached bitmaps.
    pub max_cache_entries: u64,
    /// Time-to-live for cached bitmaps.
    pub cache_ttl: Duration,
}

impl Default for ImageLoaderConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: 32,
            cache_ttl: Duration::from_secs(600),
        }
    }
}

/// Where an image comes from.
#[derive(Clone)]
pub enum ImageSource {
    /// `data:<mime>;base64,<payload>`
    DataUri(String),
    /// Encoded file contents
    Bytes(Bytes),
    /// Local file
    Path(PathBuf),
    /// Bitmap the caller already decoded
    Decoded(Arc<DynamicImage>),
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::DataUri(uri) => f
                .debug_tuple("DataUri")
                .field(&format_args!("{} chars", uri.len()))
                .finish(),
            ImageSource::Bytes(bytes) => f
                .debug_tuple("Bytes")
                .field(&format_args!("{} bytes", bytes.len()))
                .finish(),
            ImageSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ImageSource::Decoded(image) => f
                .debug_tuple("Decoded")
                .field(&(image.width(), image.height()))
                .finish(),
        }
    }
}

impl ImageSource {
    pub fn data_uri(uri: impl Into<String>) -> Self {
        ImageSource::DataUri(uri.into())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        ImageSource::Bytes(bytes.into())
    }

    pub fn path(path: impl AsRef<Path>) -> Self {
        ImageSource::Path(path.as_ref().to_path_buf())
    }

    pub fn decoded(image: DynamicImage) -> Self {
        ImageSource::Decoded(Arc::new(image))
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            ImageSource::DataUri(uri) => format!("data URI ({} chars)", uri.len()),
            ImageSource::Bytes(bytes) => format!("{} bytes", bytes.len()),
            ImageSource::Path(path) => path.display().to_string(),
            ImageSource::Decoded(image) => {
                format!("decoded {}x{} bitmap", image.width(), image.height())
            }
        }
    }

    /// Cache key, or `None` for sources that are never cached.
    ///
    /// Paths are keyed by path, length and modification time, so a file
    /// rewritten in place is decoded again. Unreadable paths have no key.
    pub async fn cache_key(&self) -> Option<String> {
        match self {
            ImageSource::DataUri(uri) => Some(format!("sha256:{}", sha256_hex(uri.as_bytes()))),
            ImageSource::Bytes(bytes) => Some(format!("sha256:{}", sha256_hex(bytes))),
            ImageSource::Path(path) => {
                let metadata = tokio::fs::metadata(path).await.ok()?;
                let modified = metadata
                    .modified()
                    .ok()
                    .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                    .map(|since| since.as_nanos())
                    .unwrap_or_default();
                Some(format!(
                    "file:{}:{}:{}",
                    path.display(),
                    metadata.len(),
                    modified
                ))
            }
            ImageSource::Decoded(_) => None,
        }
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Extract the payload of a base64 data URI.
///
/// The media type is not checked; decoding decides whether the payload is
/// an image.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, WatermarkError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| WatermarkError::FetchError("Data URI must start with 'data:'".to_string()))?;

    let (header, payload) = rest.split_once(',').ok_or_else(|| {
        WatermarkError::FetchError("Data URI is missing the ',' separator".to_string())
    })?;

    if !header.to_ascii_lowercase().ends_with(";base64") {
        return Err(WatermarkError::FetchError(
            "Only base64 data URIs are supported".to_string(),
        ));
    }

    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| WatermarkError::FetchError(format!("Invalid base64 payload: {e}")))
}

/// Cached decoded bitmap.
#[derive(Clone)]
pub struct CachedImage {
    pub image: Arc<DynamicImage>,
}

impl fmt::Debug for CachedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedImage")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .finish()
    }
}

impl CachedImage {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Loader for base and watermark images with built-in caching.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct ImageLoader {
    cache: Cache<String, CachedImage>,
}

impl fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageLoader")
            .field("cached", &self.cache.entry_count())
            .finish()
    }
}

impl ImageLoader {
    pub fn new(config: ImageLoaderConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_cache_entries)
            .time_to_live(config.cache_ttl)
            .build();

        Self { cache }
    }

    /// Load and decode an image.
    ///
    /// Decoding runs on the blocking thread pool. Decoded bitmaps are cached
    /// until the TTL expires or the entry is evicted.
    ///
    /// # Errors
    ///
    /// - `FetchError` when the bytes cannot be obtained (unreadable file,
    ///   malformed data URI)
    /// - `DecodeError` when the bytes are not a supported image
    pub async fn load(&self, source: &ImageSource) -> Result<CachedImage, WatermarkError> {
        if let ImageSource::Decoded(image) = source {
            return Ok(CachedImage {
                image: Arc::clone(image),
            });
        }

        let cache_key = source.cache_key().await;
        if let Some(key) = &cache_key {
            if let Some(cached) = self.cache.get(key).await {
                debug!(source = %source.describe(), "image cache hit");
                return Ok(cached);
            }
        }

        let (data, hint) = read_source(source).await?;
        let image = tokio::task::spawn_blocking(move || decode_image(&data, hint.as_deref()))
            .await
            .map_err(|e| WatermarkError::DecodeError(format!("Decoder task failed: {e}")))??;

        debug!(
            source = %source.describe(),
            width = image.width(),
            height = image.height(),
            "image decoded"
        );

        let cached = CachedImage::new(image);
        if let Some(key) = cache_key {
            self.cache.insert(key, cached.clone()).await;
        }

        Ok(cached)
    }

    /// Get the number of cached bitmaps.
    pub fn cache_size(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Clear all cached bitmaps.
    pub async fn clear_cache(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Check if a source is cached.
    pub async fn is_cached(&self, source: &ImageSource) -> bool {
        match source.cache_key().await {
            Some(key) => self.cache.get(&key).await.is_some(),
            None => false,
        }
    }
}

/// Encoded bytes of a source plus a file name hint for format detection.
async fn read_source(source: &ImageSource) -> Result<(Bytes, Option<String>), WatermarkError> {
    match source {
        ImageSource::DataUri(uri) => Ok((Bytes::from(decode_data_uri(uri)?), None)),
        ImageSource::Bytes(bytes) => Ok((bytes.clone(), None)),
        ImageSource::Path(path) => {
            let data = tokio::fs::read(path).await.map_err(|e| {
                WatermarkError::FetchError(format!("Failed to read {}: {e}", path.display()))
            })?;
            Ok((Bytes::from(data), Some(path.display().to_string())))
        }
        ImageSource::Decoded(_) => Err(WatermarkError::FetchError(
            "Decoded bitmaps have no encoded bytes".to_string(),
        )),
    }
}

fn decode_image(data: &[u8], hint: Option<&str>) -> Result<DynamicImage, WatermarkError> {
    if data.is_empty() {
        return Err(WatermarkError::DecodeError("Image data is empty".to_string()));
    }

    let format = detect_image_format(data, hint)?;
    image::load_from_memory_with_format(data, format)
        .map_err(|e| WatermarkError::DecodeError(e.to_string()))
}

/// Detect image format from magic bytes, falling back to the file extension.
pub fn detect_image_format(data: &[u8], hint: Option<&str>) -> Result<ImageFormat, WatermarkError> {
    if let Ok(format) = image::guess_format(data) {
        return Ok(format);
    }

    let ext = hint
        .and_then(|path| path.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "gif" => Ok(ImageFormat::Gif),
        "webp" => Ok(ImageFormat::WebP),
        "" => Err(WatermarkError::DecodeError(
            "Unrecognized image format".to_string(),
        )),
        _ => Err(WatermarkError::DecodeError(format!(
            "Unsupported image format: {ext}"
        ))),
    }
}
