//! Watermark compositor.
//!
//! Runs one composition from request to encoded output:
//!
//! 1. acquire a surface (decoded base image, or a blank canvas)
//! 2. prepare the watermark (measure and render text, or load and scale the
//!    logo)
//! 3. ask the layout engine for instance origins
//! 4. draw every visible instance rotated about its own center
//! 5. encode in the requested format
//!
//! Every failure is returned once as a [`CompositionError`]. Failures after
//! the base image was drawn carry the base-only render as a partial result.
//!
//! # Example
//!
//! ```ignore
//! use photo_watermark::config::CompositorConfig;
//! use photo_watermark::watermark::{
//!     CompositionRequest, Compositor, PlacementSpec, TextWatermark, WatermarkPosition, WatermarkSpec,
//! };
//!
//! let compositor = Compositor::new(CompositorConfig::default())?;
//! let request = CompositionRequest::new(
//!     WatermarkSpec::text(TextWatermark::new("CONFIDENTIAL")),
//!     PlacementSpec::single(WatermarkPosition::Center),
//! );
//! let encoded = compositor.compose(&request).await?;
//! ```

use super::config::{
    CompositionRequest, ImageWatermark, PlacementSpec, TextWatermark, WatermarkKind,
};
use super::encoder::{encode_surface, EncodedImage, OutputFormat};
use super::error::{CompositionError, WatermarkError};
use super::image_loader::{ImageLoader, ImageSource};
use super::position::{
    calculate_layout, is_visible, rotated_footprint, BoundingBox, CanvasSize, ContentKind, Layout,
};
use super::result::CompositionResult;
use super::surface::{DrawStyle, Stamp, Surface};
use super::text_renderer::{
    measure_text, parse_color, render_text, Color, FontBook, TextRenderOptions,
};
use crate::config::CompositorConfig;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// Steps of a composition, logged as they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionStage {
    Idle,
    LoadingBase,
    BaseLoaded,
    BaseLoadFailed,
    LoadingWatermark,
    WatermarkLoaded,
    WatermarkLoadFailed,
    Rendering,
    Encoding,
    Done,
    EncodeFailed,
}

impl CompositionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::LoadingBase => "loading_base",
            Self::BaseLoaded => "base_loaded",
            Self::BaseLoadFailed => "base_load_failed",
            Self::LoadingWatermark => "loading_watermark",
            Self::WatermarkLoaded => "watermark_loaded",
            Self::WatermarkLoadFailed => "watermark_load_failed",
            Self::Rendering => "rendering",
            Self::Encoding => "encoding",
            Self::Done => "done",
            Self::EncodeFailed => "encode_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::BaseLoadFailed | Self::WatermarkLoadFailed | Self::Done | Self::EncodeFailed
        )
    }
}

impl fmt::Display for CompositionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(stage: CompositionStage) {
    debug!(stage = %stage, "composition stage");
}

/// Target size of a logo.
///
/// Height is `scale_percent` of the canvas's smaller side and width follows
/// the aspect ratio. Neither side may exceed `max_fraction` of the matching
/// canvas dimension; when one is capped the other is re-derived from the
/// aspect ratio. Both sides are at least one pixel.
pub fn logo_target_size(
    source_width: u32,
    source_height: u32,
    canvas: CanvasSize,
    scale_percent: f32,
    max_fraction: f32,
) -> (u32, u32) {
    let scale = if scale_percent.is_finite() {
        scale_percent.max(0.0)
    } else {
        0.0
    };
    let aspect = source_width.max(1) as f32 / source_height.max(1) as f32;

    let mut height = canvas.smaller_side() as f32 * scale / 100.0;
    let mut width = height * aspect;

    let max_width = canvas.width as f32 * max_fraction;
    let max_height = canvas.height as f32 * max_fraction;
    if width > max_width {
        width = max_width;
        height = width / aspect;
    }
    if height > max_height {
        height = max_height;
        width = height * aspect;
    }

    (
        width.round().max(1.0) as u32,
        height.round().max(1.0) as u32,
    )
}

/// A watermark ready to be stamped.
struct PreparedWatermark {
    layer: RgbaImage,
    bbox: BoundingBox,
    content: ContentKind,
    opacity_percent: f32,
}

/// Composes watermarked images.
///
/// Holds the immutable font book and the shared image cache. `Send + Sync`;
/// share one instance behind an `Arc` between concurrent compositions.
#[derive(Debug)]
pub struct Compositor {
    config: CompositorConfig,
    fonts: FontBook,
    loader: ImageLoader,
    background: Color,
}

impl Compositor {
    /// Create a compositor with the embedded fonts.
    pub fn new(config: CompositorConfig) -> Result<Self, WatermarkError> {
        Self::with_fonts(config, FontBook::new()?)
    }

    /// Create a compositor with a prepared font book.
    pub fn with_fonts(config: CompositorConfig, fonts: FontBook) -> Result<Self, WatermarkError> {
        config.validate().map_err(WatermarkError::ConfigError)?;
        let background = config.background_color()?;
        let loader = ImageLoader::new(config.loader_config());

        Ok(Self {
            config,
            fonts,
            loader,
            background,
        })
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    /// Register an extra font family from TTF/OTF bytes.
    pub fn register_font(&mut self, family: &str, data: Vec<u8>) -> Result<(), WatermarkError> {
        self.fonts.register(family, data)
    }

    /// Compose one watermarked image.
    #[instrument(
        skip(self, request),
        fields(
            kind = request.watermark.kind.label(),
            position = %request.placement.position,
            output = %request.output,
        )
    )]
    pub async fn compose(
        &self,
        request: &CompositionRequest,
    ) -> Result<EncodedImage, CompositionError> {
        enter(CompositionStage::Idle);
        let mut surface = self.acquire_surface(request.base_image.as_ref()).await?;
        let canvas = surface.size();

        let prepared = match &request.watermark.kind {
            WatermarkKind::Text(text) if text.text.is_empty() => {
                debug!("empty watermark text, nothing to draw");
                None
            }
            WatermarkKind::Text(text) => Some(
                self.prepare_text(text)
                    .map_err(|e| self.drawing_failure(e, &surface, request.output))?,
            ),
            WatermarkKind::Image(logo) => {
                let decoded = self.load_logo(&logo.source, &surface, request.output).await?;
                Some(
                    self.prepare_logo(&decoded, logo, canvas)
                        .map_err(|e| self.drawing_failure(e, &surface, request.output))?,
                )
            }
        };

        enter(CompositionStage::Rendering);
        if let Some(prepared) = prepared {
            self.warn_on_grid_clamp(&request.placement);
            let layout = calculate_layout(
                canvas,
                &request.placement,
                prepared.bbox,
                prepared.content,
                request.watermark.rotation_degrees,
                &self.config.layout_params(),
            );
            let drawn = render_instances(&mut surface, &prepared, &layout);
            debug!(
                instances = layout.len(),
                drawn,
                rotation = layout.rotation_degrees,
                "watermark rendered"
            );
        }

        enter(CompositionStage::Encoding);
        match encode_surface(surface.pixels(), request.output) {
            Ok(encoded) => {
                enter(CompositionStage::Done);
                info!(
                    width = encoded.width,
                    height = encoded.height,
                    bytes = encoded.len(),
                    "composition complete"
                );
                Ok(encoded)
            }
            Err(e) => {
                enter(CompositionStage::EncodeFailed);
                warn!(error = %e, "failed to encode composition");
                Err(CompositionError::image_export(e))
            }
        }
    }

    /// Compose and hand the outcome to `on_complete`, exactly once.
    pub async fn compose_with_callback<F>(&self, request: &CompositionRequest, on_complete: F)
    where
        F: FnOnce(CompositionResult),
    {
        let outcome = self.compose(request).await;
        on_complete(CompositionResult::from(outcome));
    }

    /// Layout a text watermark on a canvas without drawing it.
    pub fn plan_text(
        &self,
        canvas: CanvasSize,
        text: &TextWatermark,
        placement: &PlacementSpec,
        rotation_degrees: f32,
    ) -> Result<Layout, WatermarkError> {
        let font = self.fonts.resolve(&text.font_family);
        let metrics = measure_text(font, &text.text, text.font_size_px)?;
        Ok(calculate_layout(
            canvas,
            placement,
            BoundingBox::new(metrics.width, metrics.height),
            ContentKind::Text,
            rotation_degrees,
            &self.config.layout_params(),
        ))
    }

    async fn acquire_surface(
        &self,
        base_image: Option<&ImageSource>,
    ) -> Result<Surface, CompositionError> {
        enter(CompositionStage::LoadingBase);
        let max_pixels = self.config.canvas.max_pixels;

        let surface = match base_image {
            None => Surface::blank(self.config.default_canvas(), self.background, max_pixels),
            Some(source) => {
                let decoded = self.loader.load(source).await.map_err(|e| {
                    enter(CompositionStage::BaseLoadFailed);
                    warn!(source = %source.describe(), error = %e, "failed to load base image");
                    CompositionError::main_image_load(e)
                })?;
                Surface::from_image(&decoded.image, max_pixels)
            }
        }
        .map_err(|e| {
            warn!(error = %e, "failed to create drawing surface");
            CompositionError::canvas_context(e)
        })?;

        enter(CompositionStage::BaseLoaded);
        Ok(surface)
    }

    async fn load_logo(
        &self,
        source: &ImageSource,
        surface: &Surface,
        output: OutputFormat,
    ) -> Result<std::sync::Arc<DynamicImage>, CompositionError> {
        enter(CompositionStage::LoadingWatermark);
        match self.loader.load(source).await {
            Ok(cached) => {
                enter(CompositionStage::WatermarkLoaded);
                Ok(cached.image)
            }
            Err(e) => {
                enter(CompositionStage::WatermarkLoadFailed);
                warn!(source = %source.describe(), error = %e, "failed to load watermark image");
                Err(CompositionError::logo_image_load(
                    e,
                    salvage(surface, output),
                ))
            }
        }
    }

    fn prepare_text(&self, text: &TextWatermark) -> Result<PreparedWatermark, WatermarkError> {
        let color = parse_color(&text.color)?;
        let font = self.fonts.resolve(&text.font_family);
        let metrics = measure_text(font, &text.text, text.font_size_px)?;

        let options = TextRenderOptions {
            text: text.text.clone(),
            font_size: text.font_size_px,
            color,
        };
        let layer = render_text(font, &options, &metrics, self.config.canvas.max_pixels)?;

        Ok(PreparedWatermark {
            layer,
            bbox: BoundingBox::new(metrics.width, metrics.height),
            content: ContentKind::Text,
            opacity_percent: text.opacity_percent,
        })
    }

    fn prepare_logo(
        &self,
        image: &DynamicImage,
        logo: &ImageWatermark,
        canvas: CanvasSize,
    ) -> Result<PreparedWatermark, WatermarkError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(WatermarkError::RenderError(
                "Watermark image has no pixels".to_string(),
            ));
        }

        let (width, height) = logo_target_size(
            image.width(),
            image.height(),
            canvas,
            logo.scale_percent,
            self.config.layout.logo_max_fraction,
        );
        debug!(
            source_width = image.width(),
            source_height = image.height(),
            width,
            height,
            "scaling watermark image"
        );

        let layer = image
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgba8();

        Ok(PreparedWatermark {
            layer,
            bbox: BoundingBox::new(width as f32, height as f32),
            content: ContentKind::Image,
            opacity_percent: logo.opacity_percent,
        })
    }

    fn drawing_failure(
        &self,
        error: WatermarkError,
        surface: &Surface,
        output: OutputFormat,
    ) -> CompositionError {
        warn!(error = %error, "failed to draw watermark");
        CompositionError::canvas_drawing(error, salvage(surface, output))
    }

    fn warn_on_grid_clamp(&self, placement: &PlacementSpec) {
        let (grid_x, grid_y) = placement.effective_grid(self.config.layout.max_grid);
        if (grid_x, grid_y) != (placement.grid_x, placement.grid_y) {
            warn!(
                requested_x = placement.grid_x,
                requested_y = placement.grid_y,
                grid_x,
                grid_y,
                "grid counts clamped"
            );
        }
    }
}

/// Draw every visible instance; returns how many were drawn.
fn render_instances(surface: &mut Surface, prepared: &PreparedWatermark, layout: &Layout) -> usize {
    let style = DrawStyle::from_percent(prepared.opacity_percent, layout.rotation_degrees);
    if style.opacity <= 0.0 {
        return 0;
    }
    let canvas = surface.size();
    let stamp = Stamp::new(&prepared.layer, style.rotation_degrees);
    let mut drawn = 0;

    for origin in &layout.origins {
        let (footprint_origin, footprint) =
            rotated_footprint(origin, &layout.bounding_box, layout.rotation_degrees);
        if !is_visible(&footprint_origin, &footprint, &canvas) {
            continue;
        }
        if surface.draw_stamp(&stamp, *origin, style.opacity) {
            drawn += 1;
        }
    }

    drawn
}

/// Best-effort encode of whatever is on the surface.
fn salvage(surface: &Surface, output: OutputFormat) -> Option<EncodedImage> {
    match encode_surface(surface.pixels(), output) {
        Ok(partial) => {
            warn!(bytes = partial.len(), "returning partial render");
            Some(partial)
        }
        Err(e) => {
            warn!(error = %e, "partial render could not be encoded");
            None
        }
    }
}
