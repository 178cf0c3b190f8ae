// Configuration Integration Tests
//
// YAML files with environment substitution drive the compositor's
// defaults; invalid settings are rejected before any composition runs.

use photo_watermark::config::CompositorConfig;
use photo_watermark::logging::LogFormat;
use photo_watermark::watermark::{
    CompositionRequest, Compositor, PlacementSpec, TextWatermark, WatermarkError, WatermarkSpec,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_config_file_sets_blank_canvas() {
    std::env::set_var("PW_IT_CANVAS_BACKGROUND", "#000000");
    let file = write_config(
        r##"
canvas:
  default_width: 40
  default_height: 30
  background: "${PW_IT_CANVAS_BACKGROUND}"
logging:
  format: json
"##,
    );

    let config = CompositorConfig::from_file(file.path()).unwrap();
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.layout.padding, 20.0);

    let compositor = Compositor::new(config).unwrap();
    let request = CompositionRequest::new(
        WatermarkSpec::text(TextWatermark::new("")),
        PlacementSpec::default(),
    );
    let output = compositor
        .compose(&request)
        .await
        .unwrap()
        .decode()
        .unwrap()
        .to_rgba8();

    assert_eq!(output.dimensions(), (40, 30));
    assert!(output.pixels().all(|p| p.0 == [0, 0, 0, 255]));

    std::env::remove_var("PW_IT_CANVAS_BACKGROUND");
}

#[test]
fn test_missing_env_var_is_reported() {
    let file = write_config("canvas:\n  background: \"${PW_IT_UNSET_VARIABLE}\"\n");
    let err = CompositorConfig::from_file(file.path()).unwrap_err();
    assert!(err.contains("PW_IT_UNSET_VARIABLE"));
}

#[test]
fn test_invalid_background_rejected_by_compositor() {
    let file = write_config("canvas:\n  background: \"chartreuse-ish\"\n");
    let config = CompositorConfig::from_file(file.path()).unwrap();

    let err = Compositor::new(config).unwrap_err();
    assert!(matches!(err, WatermarkError::ConfigError(_)));
}

#[test]
fn test_missing_config_file() {
    let err = CompositorConfig::from_file("/nonexistent/photo-watermark.yaml").unwrap_err();
    assert!(err.contains("Failed to read config file"));
}

#[test]
fn test_oversized_grid_limit_rejected_by_compositor() {
    let file = write_config("layout:\n  max_grid: 1000000\n");
    let config = CompositorConfig::from_file(file.path()).unwrap();

    let err = Compositor::new(config).unwrap_err();
    assert!(matches!(err, WatermarkError::ConfigError(ref msg) if msg.contains("max_grid")));
}
