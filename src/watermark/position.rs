//! Position calculation for watermark placement.
//!
//! Pure geometry: canvas size, the measured bounding box of one watermark
//! instance and the placement options go in; an ordered list of draw
//! origins (top-left corners of unrotated boxes) and the shared rotation
//! angle come out.
//!
//! # Position Modes
//!
//! - **Tile**: the canvas is split into a `grid_x` × `grid_y` grid and one
//!   instance is centered in every cell.
//! - **Anchored**: one of seven anchors (center, top/bottom center, four
//!   corners) with a fixed padding from the edges. Text with a grid larger
//!   than 1×1 tiles a small sub-rectangle placed at the anchor; everything
//!   else draws exactly one instance.
//!
//! # Example
//!
//! ```ignore
//! use photo_watermark::watermark::position::{anchor_origin, BoundingBox, CanvasSize};
//! use photo_watermark::watermark::WatermarkPosition;
//!
//! let canvas = CanvasSize::new(800, 600);
//! let bbox = BoundingBox::new(100.0, 50.0);
//!
//! let origin = anchor_origin(WatermarkPosition::BottomRight, canvas.bounds(), bbox, 20.0);
//! assert_eq!((origin.x, origin.y), (680.0, 530.0)); // 800 - 20 - 100, 600 - 20 - 50
//! ```

use super::config::{HorizontalAnchor, PlacementSpec, VerticalAnchor, WatermarkPosition};

/// Rotations closer than this to a whole turn take the identity path.
const ROTATION_EPSILON: f32 = 1e-4;

/// Dimensions of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn smaller_side(&self) -> u32 {
        self.width.min(self.height)
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The whole canvas as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

/// Measured size of one unrotated watermark instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Top-left corner of an unrotated watermark instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawOrigin {
    pub x: f32,
    pub y: f32,
}

impl DrawOrigin {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Center of the instance drawn at this origin; rotation pivots here.
    pub fn center(&self, bbox: &BoundingBox) -> (f32, f32) {
        (self.x + bbox.width / 2.0, self.y + bbox.height / 2.0)
    }
}

/// What is being placed. Anchored image watermarks never tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image,
}

/// Tunables of the layout engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// Distance between an anchored box and the canvas edge
    pub padding: f32,
    /// Size of the anchored tiling area relative to the canvas
    pub anchor_area_fraction: f32,
    /// Upper bound for grid counts per axis
    pub max_grid: u32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            padding: 20.0,
            anchor_area_fraction: 0.15,
            max_grid: 100,
        }
    }
}

/// Result of the layout engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Draw origins, row-major for tiled layouts
    pub origins: Vec<DrawOrigin>,
    pub bounding_box: BoundingBox,
    /// Normalized to `[0, 360)`, shared by every instance
    pub rotation_degrees: f32,
}

impl Layout {
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Instance centers, in draw order.
    pub fn centers(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.origins
            .iter()
            .map(move |origin| origin.center(&self.bounding_box))
    }
}

/// Bring any angle into `[0, 360)`. Non-finite angles become 0.
pub fn normalize_rotation(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let normalized = degrees.rem_euclid(360.0);
    if normalized < ROTATION_EPSILON || 360.0 - normalized < ROTATION_EPSILON {
        0.0
    } else {
        normalized
    }
}

/// Whether drawing at this angle is the same as not rotating at all.
pub fn is_identity_rotation(degrees: f32) -> bool {
    normalize_rotation(degrees) == 0.0
}

/// Size of the axis-aligned box that encloses `bbox` rotated by `degrees`.
pub fn rotated_bounds(bbox: &BoundingBox, degrees: f32) -> BoundingBox {
    let normalized = normalize_rotation(degrees);
    if normalized == 0.0 {
        return *bbox;
    }
    let (sin, cos) = normalized.to_radians().sin_cos();
    BoundingBox::new(
        (bbox.width * cos).abs() + (bbox.height * sin).abs(),
        (bbox.width * sin).abs() + (bbox.height * cos).abs(),
    )
}

/// Footprint of a rotated instance: the enclosing box, still centered on the
/// instance center.
pub fn rotated_footprint(
    origin: &DrawOrigin,
    bbox: &BoundingBox,
    degrees: f32,
) -> (DrawOrigin, BoundingBox) {
    let rotated = rotated_bounds(bbox, degrees);
    let (cx, cy) = origin.center(bbox);
    (
        DrawOrigin::new(cx - rotated.width / 2.0, cy - rotated.height / 2.0),
        rotated,
    )
}

/// Calculate tiled origins inside `area`.
///
/// The area is split into `grid_x` × `grid_y` equal cells and one instance
/// is centered in each. Origins are returned row-major (all columns of the
/// first row, then the next row). Zero counts are treated as one.
pub fn tile_origins(area: Rect, grid_x: u32, grid_y: u32, bbox: BoundingBox) -> Vec<DrawOrigin> {
    let grid_x = grid_x.max(1);
    let grid_y = grid_y.max(1);
    let spacing_x = area.width / grid_x as f32;
    let spacing_y = area.height / grid_y as f32;

    let mut origins = Vec::with_capacity((grid_x as usize) * (grid_y as usize));
    for row in 0..grid_y {
        let center_y = area.y + (row as f32 + 0.5) * spacing_y;
        for col in 0..grid_x {
            let center_x = area.x + (col as f32 + 0.5) * spacing_x;
            origins.push(DrawOrigin::new(
                center_x - bbox.width / 2.0,
                center_y - bbox.height / 2.0,
            ));
        }
    }
    origins
}

/// Calculate the origin of a single box pinned to an anchor of `area`.
///
/// Left/right anchors keep `padding` from the side; top/bottom anchors keep
/// `padding` from the top/bottom edge. Center anchors center the box on
/// that axis. `Tile` has no anchor and resolves to the center.
pub fn anchor_origin(
    position: WatermarkPosition,
    area: Rect,
    bbox: BoundingBox,
    padding: f32,
) -> DrawOrigin {
    let (horizontal, vertical) = position.anchor();

    let x = match horizontal {
        HorizontalAnchor::Left => area.x + padding,
        HorizontalAnchor::Center => area.x + area.width / 2.0 - bbox.width / 2.0,
        HorizontalAnchor::Right => area.right() - padding - bbox.width,
    };

    // Top/bottom anchors are expressed through the text baseline: the box
    // sits directly above it.
    let y = match vertical {
        VerticalAnchor::Top => {
            let baseline = area.y + padding + bbox.height;
            baseline - bbox.height
        }
        VerticalAnchor::Middle => area.y + area.height / 2.0 - bbox.height / 2.0,
        VerticalAnchor::Bottom => {
            let baseline = area.bottom() - padding;
            baseline - bbox.height
        }
    };

    DrawOrigin::new(x, y)
}

/// The sub-rectangle an anchored text grid is tiled into.
pub fn anchor_area(
    position: WatermarkPosition,
    canvas: CanvasSize,
    fraction: f32,
    padding: f32,
) -> Rect {
    let size = BoundingBox::new(
        canvas.width as f32 * fraction,
        canvas.height as f32 * fraction,
    );
    let origin = anchor_origin(position, canvas.bounds(), size, padding);
    Rect::new(origin.x, origin.y, size.width, size.height)
}

/// Map canvas, placement and instance size to the full list of draw origins.
///
/// Grid counts are clamped to `1..=params.max_grid`. Tile mode always yields
/// exactly `grid_x * grid_y` origins. Anchored mode yields one origin for
/// images and for 1×1 text, and a tiled sub-rectangle for larger text
/// grids. Anchored images are additionally kept inside the canvas.
pub fn calculate_layout(
    canvas: CanvasSize,
    placement: &PlacementSpec,
    bbox: BoundingBox,
    content: ContentKind,
    rotation_degrees: f32,
    params: &LayoutParams,
) -> Layout {
    let (grid_x, grid_y) = placement.effective_grid(params.max_grid);
    let position = placement.position;

    let origins = if position.is_tile() {
        tile_origins(canvas.bounds(), grid_x, grid_y, bbox)
    } else if content == ContentKind::Image {
        let origin = anchor_origin(position, canvas.bounds(), bbox, params.padding);
        vec![clamp_to_bounds(origin, &canvas, &bbox)]
    } else if grid_x == 1 && grid_y == 1 {
        vec![anchor_origin(position, canvas.bounds(), bbox, params.padding)]
    } else {
        let area = anchor_area(
            position,
            canvas,
            params.anchor_area_fraction,
            params.padding,
        );
        tile_origins(area, grid_x, grid_y, bbox)
    };

    Layout {
        origins,
        bounding_box: bbox,
        rotation_degrees: normalize_rotation(rotation_degrees),
    }
}

/// Clamp an origin so the box stays within the canvas.
///
/// Boxes larger than the canvas are pinned to the top-left corner.
pub fn clamp_to_bounds(origin: DrawOrigin, canvas: &CanvasSize, bbox: &BoundingBox) -> DrawOrigin {
    let max_x = (canvas.width as f32 - bbox.width).max(0.0);
    let max_y = (canvas.height as f32 - bbox.height).max(0.0);

    DrawOrigin::new(origin.x.clamp(0.0, max_x), origin.y.clamp(0.0, max_y))
}

/// Check if a box drawn at `origin` is at least partially on the canvas.
pub fn is_visible(origin: &DrawOrigin, bbox: &BoundingBox, canvas: &CanvasSize) -> bool {
    let right = origin.x + bbox.width;
    let bottom = origin.y + bbox.height;

    origin.x < canvas.width as f32 && origin.y < canvas.height as f32 && right > 0.0 && bottom > 0.0
}
