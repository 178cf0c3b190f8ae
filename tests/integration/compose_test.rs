// Composition Integration Tests
//
// End-to-end runs of Compositor::compose:
// - Empty text leaves the base untouched
// - Blank canvas with a centered text instance
// - Logo sizing and placement
// - Rotation normalization
// - Grid clamping
// - File and data URI sources

use super::test_harness::*;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use photo_watermark::watermark::{
    position::rotated_bounds, CanvasSize, CompositionRequest, ImageSource, ImageWatermark,
    PlacementSpec, TextWatermark, WatermarkPosition, WatermarkSpec,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn text_request(text: TextWatermark, placement: PlacementSpec, rotation: f32) -> CompositionRequest {
    CompositionRequest::new(WatermarkSpec::text(text).with_rotation(rotation), placement)
}

#[tokio::test]
async fn test_empty_text_returns_base_unchanged() {
    let compositor = compositor();
    let base = gradient(800, 600);

    let request = text_request(
        TextWatermark::new(""),
        PlacementSpec::new(WatermarkPosition::Tile, 1, 1),
        330.0,
    )
    .with_base_image(png_source(&base));

    let encoded = compositor.compose(&request).await.unwrap();
    assert_eq!((encoded.width, encoded.height), (800, 600));
    assert_eq!(encoded.decode().unwrap().to_rgba8(), base);
}

#[tokio::test]
async fn test_blank_canvas_centered_text() {
    let compositor = compositor();
    let text = TextWatermark::new("CONFIDENTIAL");

    let request = text_request(
        text.clone(),
        PlacementSpec::single(WatermarkPosition::Center),
        0.0,
    );
    let output = compositor
        .compose(&request)
        .await
        .unwrap()
        .decode()
        .unwrap()
        .to_rgba8();
    assert_eq!(output.dimensions(), (1920, 1080));
    assert_eq!(*output.get_pixel(0, 0), WHITE);
    assert_eq!(*output.get_pixel(1919, 1079), WHITE);

    let layout = compositor
        .plan_text(
            CanvasSize::new(1920, 1080),
            &text,
            &PlacementSpec::single(WatermarkPosition::Center),
            0.0,
        )
        .unwrap();
    assert_eq!(layout.len(), 1);
    let (center_x, center_y) = layout.centers().next().unwrap();
    assert!((center_x - 960.0).abs() < 0.01);
    assert!((center_y - 540.0).abs() < 0.01);

    // All ink lies inside the measured box
    let origin = layout.origins[0];
    let bbox = layout.bounding_box;
    let (min_x, min_y, max_x, max_y) = ink_bounds(&output, WHITE).expect("text was drawn");
    assert!(min_x as f32 >= origin.x.floor() - 1.0);
    assert!(min_y as f32 >= origin.y.floor() - 1.0);
    assert!(max_x as f32 <= origin.x + bbox.width + 1.0);
    assert!(max_y as f32 <= origin.y + bbox.height + 1.0);

    // Horizontally the ink is centered up to the side bearings
    let ink_center_x = (min_x + max_x) as f32 / 2.0;
    assert!((ink_center_x - 960.0).abs() < 8.0, "ink center {}", ink_center_x);
}

#[tokio::test]
async fn test_rotated_text_stays_within_rotated_footprint() {
    let compositor = compositor();
    let text = TextWatermark::new("CONFIDENTIAL");
    let placement = PlacementSpec::single(WatermarkPosition::Center);

    let output = compositor
        .compose(&text_request(text.clone(), placement, 330.0))
        .await
        .unwrap()
        .decode()
        .unwrap()
        .to_rgba8();

    let layout = compositor
        .plan_text(CanvasSize::new(1920, 1080), &text, &placement, 330.0)
        .unwrap();
    let footprint = rotated_bounds(&layout.bounding_box, 330.0);

    let (min_x, min_y, max_x, max_y) = ink_bounds(&output, WHITE).expect("text was drawn");
    assert!(min_x as f32 >= 960.0 - footprint.width / 2.0 - 3.0);
    assert!(max_x as f32 <= 960.0 + footprint.width / 2.0 + 3.0);
    assert!(min_y as f32 >= 540.0 - footprint.height / 2.0 - 3.0);
    assert!(max_y as f32 <= 540.0 + footprint.height / 2.0 + 3.0);
}

#[tokio::test]
async fn test_tiled_text_covers_every_cell() {
    let compositor = compositor_with_canvas(600, 400);
    let text = TextWatermark {
        color: "#000000".to_string(),
        opacity_percent: 100.0,
        font_size_px: 20.0,
        ..TextWatermark::new("WM")
    };

    let output = compositor
        .compose(&text_request(
            text,
            PlacementSpec::new(WatermarkPosition::Tile, 3, 2),
            0.0,
        ))
        .await
        .unwrap()
        .decode()
        .unwrap()
        .to_rgba8();

    // One dark instance per 200x200 cell
    for row in 0..2u32 {
        for col in 0..3u32 {
            let has_ink = (col * 200..(col + 1) * 200)
                .flat_map(|x| (row * 200..(row + 1) * 200).map(move |y| (x, y)))
                .any(|(x, y)| output.get_pixel(x, y)[0] < 128);
            assert!(has_ink, "cell ({}, {}) has no watermark", col, row);
        }
    }
}

#[tokio::test]
async fn test_logo_capped_at_eighty_percent() {
    let compositor = compositor();
    let base = solid(200, 100, [255, 255, 255, 255]);
    let logo = solid(40, 20, [255, 0, 0, 255]);

    let watermark = ImageWatermark {
        source: png_source(&logo),
        opacity_percent: 100.0,
        scale_percent: 100.0,
    };
    let request = CompositionRequest::new(
        WatermarkSpec::image(watermark),
        PlacementSpec::single(WatermarkPosition::Center),
    )
    .with_base_image(png_source(&base));

    let output = compositor
        .compose(&request)
        .await
        .unwrap()
        .decode()
        .unwrap()
        .to_rgba8();

    // 100% of the smaller side is 100 high and 200 wide; the width cap of
    // 160 brings the height to 80
    assert_eq!(ink_bounds(&output, WHITE), Some((20, 10, 179, 89)));
}

#[tokio::test]
async fn test_logo_opacity_blends_with_base() {
    let compositor = compositor();
    let base = solid(100, 100, [255, 255, 255, 255]);
    let logo = solid(10, 10, [0, 0, 0, 255]);

    let watermark = ImageWatermark {
        source: png_source(&logo),
        opacity_percent: 50.0,
        scale_percent: 20.0,
    };
    let request = CompositionRequest::new(
        WatermarkSpec::image(watermark),
        PlacementSpec::single(WatermarkPosition::Center),
    )
    .with_base_image(png_source(&base));

    let output = compositor
        .compose(&request)
        .await
        .unwrap()
        .decode()
        .unwrap()
        .to_rgba8();

    let pixel = output.get_pixel(50, 50);
    assert!((pixel[0] as i32 - 128).abs() <= 2, "got {:?}", pixel);
}

#[tokio::test]
async fn test_full_turn_rotation_matches_unrotated() {
    let compositor = compositor_with_canvas(320, 240);
    let text = TextWatermark::new("Rotate me");
    let placement = PlacementSpec::new(WatermarkPosition::Tile, 2, 2);

    let mut outputs = Vec::new();
    for rotation in [0.0, 360.0, 720.0, -360.0] {
        let encoded = compositor
            .compose(&text_request(text.clone(), placement, rotation))
            .await
            .unwrap();
        outputs.push(encoded.decode().unwrap().to_rgba8());
    }

    for output in &outputs[1..] {
        assert_eq!(output, &outputs[0]);
    }
}

#[tokio::test]
async fn test_zero_grid_is_clamped_to_one() {
    let compositor = compositor_with_canvas(320, 240);
    let text = TextWatermark::new("Grid");

    let zero = compositor
        .compose(&text_request(
            text.clone(),
            PlacementSpec::new(WatermarkPosition::Tile, 0, 0),
            0.0,
        ))
        .await
        .unwrap();
    let one = compositor
        .compose(&text_request(
            text,
            PlacementSpec::new(WatermarkPosition::Tile, 1, 1),
            0.0,
        ))
        .await
        .unwrap();

    assert_eq!(zero.decode().unwrap(), one.decode().unwrap());
}

#[tokio::test]
async fn test_base_image_from_file() {
    let compositor = compositor();
    let base = gradient(64, 48);

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&encode_png(&base)).unwrap();
    file.flush().unwrap();

    let request = text_request(TextWatermark::new(""), PlacementSpec::default(), 0.0)
        .with_base_image(ImageSource::path(file.path()));

    let encoded = compositor.compose(&request).await.unwrap();
    assert_eq!(encoded.decode().unwrap().to_rgba8(), base);
}

#[tokio::test]
async fn test_base_image_from_data_uri() {
    let compositor = compositor();
    let base = gradient(32, 32);
    let uri = format!("data:image/png;base64,{}", STANDARD.encode(encode_png(&base)));

    let request = text_request(TextWatermark::new(""), PlacementSpec::default(), 0.0)
        .with_base_image(ImageSource::data_uri(uri));

    let encoded = compositor.compose(&request).await.unwrap();
    assert_eq!(encoded.decode().unwrap().to_rgba8(), base);
}
