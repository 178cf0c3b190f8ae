use anyhow::{anyhow, Context, Result};
use clap::Parser;
use photo_watermark::config::CompositorConfig;
use photo_watermark::logging::{init_subscriber, LogFormat};
use photo_watermark::watermark::{
    CompositionRequest, CompositionResult, Compositor, ImageSource, ImageWatermark, OutputFormat,
    PlacementSpec, TextWatermark, WatermarkPosition, WatermarkSpec,
};
use std::path::PathBuf;

/// Photo Watermark - stamp a text or logo watermark onto a photo
#[derive(Parser, Debug)]
#[command(name = "photo-watermark")]
#[command(version, about, long_about = None)]
struct Args {
    /// Base image; a blank canvas is used when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Watermark text
    #[arg(short, long, default_value = "👋 Hello Watermark", conflicts_with = "logo")]
    text: String,

    /// Logo image used instead of text
    #[arg(short, long)]
    logo: Option<PathBuf>,

    /// tile, center, top-center, bottom-center, top-left, top-right, bottom-left, bottom-right
    #[arg(short, long, default_value = "tile")]
    position: WatermarkPosition,

    /// Columns of the tile grid
    #[arg(long, default_value_t = 6)]
    grid_x: u32,

    /// Rows of the tile grid
    #[arg(long, default_value_t = 6)]
    grid_y: u32,

    /// Text color
    #[arg(long, default_value = "#334155")]
    color: String,

    /// Font family
    #[arg(long, default_value = "Arial")]
    font: String,

    /// Font size in pixels
    #[arg(long, default_value_t = 32.0)]
    size: f32,

    /// Opacity in percent (defaults to 40 for text, 80 for logos)
    #[arg(long)]
    opacity: Option<f32>,

    /// Clockwise rotation in degrees (defaults to 330 for text, 0 for logos)
    #[arg(long)]
    rotation: Option<f32>,

    /// Logo height as a percentage of the smaller image side
    #[arg(long, default_value_t = 20.0)]
    scale: f32,

    /// Output format: png or jpeg
    #[arg(short, long, default_value = "png")]
    format: OutputFormat,

    /// JPEG quality (1-100); defaults to the configured quality
    #[arg(short, long)]
    quality: Option<u8>,

    /// Output file; defaults to watermarked-image.<ext>
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log format: pretty or json (overrides the configuration file)
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Include the encoded image as a data URI in the printed result
    #[arg(long)]
    data_uri: bool,
}

impl Args {
    fn watermark(&self) -> WatermarkSpec {
        let spec = match &self.logo {
            Some(path) => {
                let mut logo = ImageWatermark::new(ImageSource::path(path));
                logo.scale_percent = self.scale;
                if let Some(opacity) = self.opacity {
                    logo.opacity_percent = opacity;
                }
                WatermarkSpec::image(logo)
            }
            None => {
                let mut text = TextWatermark {
                    color: self.color.clone(),
                    font_family: self.font.clone(),
                    font_size_px: self.size,
                    ..TextWatermark::new(self.text.clone())
                };
                if let Some(opacity) = self.opacity {
                    text.opacity_percent = opacity;
                }
                WatermarkSpec::text(text)
            }
        };

        match self.rotation {
            Some(degrees) => spec.with_rotation(degrees),
            None => spec,
        }
    }

    fn output_format(&self, config: &CompositorConfig) -> OutputFormat {
        match self.format {
            OutputFormat::Png => OutputFormat::Png,
            OutputFormat::Jpeg { .. } => {
                OutputFormat::jpeg(self.quality.unwrap_or(config.output.jpeg_quality))
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CompositorConfig::from_file(path)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => CompositorConfig::default(),
    };

    let log_format = args.log_format.unwrap_or(config.logging.format);
    init_subscriber(log_format).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    let output = args.output_format(&config);
    let mut request = CompositionRequest::new(
        args.watermark(),
        PlacementSpec::new(args.position, args.grid_x, args.grid_y),
    )
    .with_output(output);
    if let Some(input) = &args.input {
        request = request.with_base_image(ImageSource::path(input));
    }

    tracing::info!(
        input = ?args.input,
        kind = request.watermark.kind.label(),
        position = %request.placement.position,
        output = %output,
        "Composing watermark"
    );

    let compositor = Compositor::new(config).context("Failed to create compositor")?;
    let outcome = compositor.compose(&request).await;

    let written = match &outcome {
        Ok(encoded) => Some(encoded),
        Err(error) => error.partial(),
    };
    if let Some(encoded) = written {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(encoded.download_name()));
        std::fs::write(&path, &encoded.data)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), bytes = encoded.len(), "Image written");
    }

    let success = outcome.is_ok();
    let mut result = CompositionResult::from(outcome);
    if !args.data_uri {
        result.encoded_image = None;
    }
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
