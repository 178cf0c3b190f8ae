// Layout Integration Tests
//
// Placement geometry through the public layout API:
// - Tile grids place one centered instance per cell
// - Anchors keep the configured padding from the edges
// - Anchored text grids stay inside their anchor area

use super::test_harness::*;
use photo_watermark::watermark::{
    calculate_layout, BoundingBox, CanvasSize, ContentKind, LayoutParams, PlacementSpec,
    TextWatermark, WatermarkPosition,
};
use rstest::rstest;

#[rstest]
#[case(1, 1)]
#[case(6, 6)]
#[case(3, 5)]
#[case(20, 1)]
fn test_tile_instances_centered_in_cells(#[case] grid_x: u32, #[case] grid_y: u32) {
    let compositor = compositor();
    let canvas = CanvasSize::new(1920, 1080);
    let layout = compositor
        .plan_text(
            canvas,
            &TextWatermark::new("Tile"),
            &PlacementSpec::new(WatermarkPosition::Tile, grid_x, grid_y),
            330.0,
        )
        .unwrap();

    assert_eq!(layout.len(), (grid_x * grid_y) as usize);

    let cell_w = 1920.0 / grid_x as f32;
    let cell_h = 1080.0 / grid_y as f32;
    for (index, (center_x, center_y)) in layout.centers().enumerate() {
        let col = index as u32 % grid_x;
        let row = index as u32 / grid_x;
        assert!((center_x - (col as f32 + 0.5) * cell_w).abs() < 0.01);
        assert!((center_y - (row as f32 + 0.5) * cell_h).abs() < 0.01);
    }
}

#[rstest]
#[case(WatermarkPosition::TopLeft, 20.0, 20.0)]
#[case(WatermarkPosition::TopCenter, 450.0, 20.0)]
#[case(WatermarkPosition::TopRight, 880.0, 20.0)]
#[case(WatermarkPosition::Center, 450.0, 380.0)]
#[case(WatermarkPosition::BottomLeft, 20.0, 740.0)]
#[case(WatermarkPosition::BottomCenter, 450.0, 740.0)]
#[case(WatermarkPosition::BottomRight, 880.0, 740.0)]
fn test_anchor_origins(
    #[case] position: WatermarkPosition,
    #[case] expected_x: f32,
    #[case] expected_y: f32,
) {
    let canvas = CanvasSize::new(1000, 800);
    let bbox = BoundingBox::new(100.0, 40.0);

    for content in [ContentKind::Text, ContentKind::Image] {
        let layout = calculate_layout(
            canvas,
            &PlacementSpec::single(position),
            bbox,
            content,
            0.0,
            &LayoutParams::default(),
        );

        assert_eq!(layout.len(), 1);
        let origin = layout.origins[0];
        assert!((origin.x - expected_x).abs() < 0.01, "{} x", position);
        assert!((origin.y - expected_y).abs() < 0.01, "{} y", position);
        assert!(origin.x >= 0.0 && origin.x + bbox.width <= 1000.0);
        assert!(origin.y >= 0.0 && origin.y + bbox.height <= 800.0);
    }
}

#[rstest]
#[case(WatermarkPosition::TopLeft)]
#[case(WatermarkPosition::Center)]
#[case(WatermarkPosition::BottomRight)]
fn test_anchored_text_grid_tiles_anchor_area(#[case] position: WatermarkPosition) {
    let canvas = CanvasSize::new(2000, 1000);
    let params = LayoutParams::default();
    let bbox = BoundingBox::new(10.0, 10.0);

    let layout = calculate_layout(
        canvas,
        &PlacementSpec::new(position, 3, 2),
        bbox,
        ContentKind::Text,
        0.0,
        &params,
    );
    assert_eq!(layout.len(), 6);

    // 15% of the canvas, anchored like a single box of that size
    let area_w = 2000.0 * params.anchor_area_fraction;
    let area_h = 1000.0 * params.anchor_area_fraction;
    let (area_x, area_y) = match position {
        WatermarkPosition::TopLeft => (20.0, 20.0),
        WatermarkPosition::Center => ((2000.0 - area_w) / 2.0, (1000.0 - area_h) / 2.0),
        _ => (2000.0 - 20.0 - area_w, 1000.0 - 20.0 - area_h),
    };
    for (center_x, center_y) in layout.centers() {
        assert!(center_x > area_x && center_x < area_x + area_w);
        assert!(center_y > area_y && center_y < area_y + area_h);
    }
}

#[test]
fn test_anchored_image_ignores_grid() {
    let layout = calculate_layout(
        CanvasSize::new(800, 600),
        &PlacementSpec::new(WatermarkPosition::TopRight, 4, 4),
        BoundingBox::new(120.0, 60.0),
        ContentKind::Image,
        0.0,
        &LayoutParams::default(),
    );
    assert_eq!(layout.len(), 1);

    // Same edge-touching origin as a single anchored box
    let origin = layout.origins[0];
    assert!((origin.x - (800.0 - 20.0 - 120.0)).abs() < 0.01);
    assert!((origin.y - 20.0).abs() < 0.01);
}

#[test]
fn test_grid_clamped_to_maximum() {
    let params = LayoutParams::default();
    let layout = calculate_layout(
        CanvasSize::new(1000, 1000),
        &PlacementSpec::new(WatermarkPosition::Tile, 5000, 1),
        BoundingBox::new(5.0, 5.0),
        ContentKind::Text,
        0.0,
        &params,
    );
    assert_eq!(layout.len(), params.max_grid as usize);
}

#[test]
fn test_position_names_parse() {
    for position in WatermarkPosition::ALL {
        let parsed: WatermarkPosition = position.as_str().parse().unwrap();
        assert_eq!(parsed, position);
    }
    assert!("middle-left".parse::<WatermarkPosition>().is_err());
}
