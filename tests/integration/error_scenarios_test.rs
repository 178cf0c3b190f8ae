// Error Scenario Integration Tests
//
// Each failure kind is returned exactly once, with a partial render where
// the base image had already been drawn.

use super::test_harness::*;
use image::DynamicImage;
use photo_watermark::config::CompositorConfig;
use photo_watermark::watermark::{
    CompositionRequest, CompositionResult, Compositor, ErrorKind, ImageSource, ImageWatermark,
    PlacementSpec, TextWatermark, WatermarkPosition, WatermarkSpec,
};

fn text_request(text: TextWatermark) -> CompositionRequest {
    CompositionRequest::new(
        WatermarkSpec::text(text),
        PlacementSpec::single(WatermarkPosition::Center),
    )
}

#[tokio::test]
async fn test_logo_decode_failure_returns_base_as_partial() {
    let compositor = compositor();
    let base = gradient(120, 80);

    let request = CompositionRequest::new(
        WatermarkSpec::image(ImageWatermark::new(ImageSource::from_bytes(
            b"definitely not a png".to_vec(),
        ))),
        PlacementSpec::single(WatermarkPosition::BottomRight),
    )
    .with_base_image(png_source(&base));

    let err = compositor.compose(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LogoImageLoad);

    let partial = err.into_partial().expect("base render is salvaged");
    assert_eq!(partial.decode().unwrap().to_rgba8(), base);
}

#[tokio::test]
async fn test_missing_logo_file_is_logo_error() {
    let compositor = compositor_with_canvas(50, 50);
    let request = CompositionRequest::new(
        WatermarkSpec::image(ImageWatermark::new(ImageSource::path(
            "/nonexistent/logo.png",
        ))),
        PlacementSpec::single(WatermarkPosition::TopLeft),
    );

    let err = compositor.compose(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LogoImageLoad);
    assert!(err.partial().is_some());
}

#[tokio::test]
async fn test_base_decode_failure_has_no_partial() {
    let compositor = compositor();
    let request = text_request(TextWatermark::new("X"))
        .with_base_image(ImageSource::from_bytes(vec![0u8; 64]));

    let err = compositor.compose(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MainImageLoad);
    assert!(err.partial().is_none());
}

#[tokio::test]
async fn test_malformed_data_uri_is_main_load_error() {
    let compositor = compositor();
    let request = text_request(TextWatermark::new("X"))
        .with_base_image(ImageSource::data_uri("data:image/png;base64,@@@"));

    let err = compositor.compose(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MainImageLoad);
}

#[tokio::test]
async fn test_invalid_color_returns_base_as_partial() {
    let compositor = compositor();
    let base = gradient(90, 60);
    let text = TextWatermark {
        color: "#zzzzzz".to_string(),
        ..TextWatermark::new("Hello")
    };

    let err = compositor
        .compose(&text_request(text).with_base_image(png_source(&base)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CanvasDrawing);
    assert!(err.message().contains("#zzzzzz"));

    let partial = err.partial().expect("base render is salvaged");
    assert_eq!(partial.decode().unwrap().to_rgba8(), base);
}

#[tokio::test]
async fn test_non_positive_font_size_is_drawing_error() {
    let compositor = compositor_with_canvas(40, 40);
    for size in [0.0, -12.0, f32::NAN] {
        let text = TextWatermark {
            font_size_px: size,
            ..TextWatermark::new("Hello")
        };
        let err = compositor.compose(&text_request(text)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CanvasDrawing);
    }
}

#[tokio::test]
async fn test_oversized_base_is_canvas_error() {
    let mut config = CompositorConfig::default();
    config.canvas.default_width = 100;
    config.canvas.default_height = 100;
    config.canvas.max_pixels = 10_000;
    let compositor = Compositor::new(config).unwrap();

    let request = text_request(TextWatermark::new("X"))
        .with_base_image(ImageSource::decoded(DynamicImage::new_rgb8(200, 100)));

    let err = compositor.compose(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CanvasContext);
    assert!(err.partial().is_none());
}

#[tokio::test]
async fn test_oversized_text_layer_is_drawing_error() {
    let mut config = CompositorConfig::default();
    config.canvas.default_width = 100;
    config.canvas.default_height = 100;
    config.canvas.max_pixels = 10_000;
    let compositor = Compositor::new(config).unwrap();

    let text = TextWatermark {
        font_size_px: 200.0,
        ..TextWatermark::new("A very long watermark line")
    };
    let err = compositor.compose(&text_request(text)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CanvasDrawing);
    assert!(err.message().contains("pixel limit"));
}

#[tokio::test]
async fn test_failure_result_serialization() {
    let compositor = compositor();
    let request = text_request(TextWatermark::new("X"))
        .with_base_image(ImageSource::from_bytes(b"nope".to_vec()));

    let result = CompositionResult::from(compositor.compose(&request).await);
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["success"], false);
    assert_eq!(json["errorKind"], "mainImageLoadError");
    assert!(json["message"].as_str().unwrap().len() > 0);
    assert!(json.get("encodedImage").is_none());
}
