//! Derived block geometry, pin anchors and the collision primitives used by
//! auto-placement and the cost function.
//!
//! Block sizes are never set by callers. They follow from the pin counts and
//! label widths reported by a [`TextMeasurer`], rounded up to the grid so
//! that every pin anchor lands on a grid line.

use serde::Serialize;

use crate::config::GeometryConfig;
use crate::error::Result;
use crate::grid::GridSnapper;
use crate::model::{Block, BlockId, DiagramPin, Direction, Endpoint, PinId, Point, Size};
use crate::store::EntityStore;

/// Tolerance for the orientation tests below.
const EPSILON: f64 = 1e-9;

// ────────────────────────────────────────────────────────────────────────────
// Text measurement
// ────────────────────────────────────────────────────────────────────────────

pub trait TextMeasurer {
    /// Size of the rendered text in scene units.
    fn measure(&self, text: &str) -> Size;
}

/// Fixed per-character metrics. Good enough for layout without a font stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMeasurer {
    pub char_width: f64,
    pub char_height: f64,
}

impl MonospaceMeasurer {
    pub fn from_config(cfg: &GeometryConfig) -> Self {
        Self {
            char_width: cfg.char_width,
            char_height: cfg.char_height,
        }
    }
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self::from_config(&GeometryConfig::default())
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure(&self, text: &str) -> Size {
        Size::new(text.chars().count() as f64 * self.char_width, self.char_height)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rectangles and segments
// ────────────────────────────────────────────────────────────────────────────

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// True if the interiors overlap. Rectangles that only share an edge do not.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() <= other.left()
            || other.right() <= self.left()
            || self.bottom() <= other.top()
            || other.bottom() <= self.top())
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Grow by `dx` on the left and right and `dy` on the top and bottom.
    pub fn expanded(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(
            self.x - dx,
            self.y - dy,
            self.width + 2.0 * dx,
            self.height + 2.0 * dy,
        )
    }
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Proper crossing of two segments: each one strictly separates the other's
/// endpoints. Touching, collinear overlap and shared endpoints do not count.
pub fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);
    ((d1 > EPSILON && d2 < -EPSILON) || (d1 < -EPSILON && d2 > EPSILON))
        && ((d3 > EPSILON && d4 < -EPSILON) || (d3 < -EPSILON && d4 > EPSILON))
}

/// True if the segment passes through the interior of `rect`.
///
/// Liang-Barsky clipping against a slightly shrunken rectangle, so a wire
/// that ends on or runs along the boundary is not reported.
pub fn segment_intersects_rect(p1: Point, p2: Point, rect: &Rect) -> bool {
    let inner = rect.expanded(-EPSILON.sqrt(), -EPSILON.sqrt());
    if inner.width <= 0.0 || inner.height <= 0.0 {
        return false;
    }
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [
        (-dx, p1.x - inner.left()),
        (dx, inner.right() - p1.x),
        (-dy, p1.y - inner.top()),
        (dy, inner.bottom() - p1.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return false;
        }
    }
    true
}

// ────────────────────────────────────────────────────────────────────────────
// Block geometry
// ────────────────────────────────────────────────────────────────────────────

/// Compute the size a block should have for its current pins and labels.
pub fn block_size(
    store: &EntityStore,
    block: BlockId,
    cfg: &GeometryConfig,
    grid: &GridSnapper,
    measurer: &dyn TextMeasurer,
) -> Result<Size> {
    let block = store.block(block)?;
    let pitch = grid.pitch();

    let rows = block.inputs.len().max(block.outputs.len());
    let height = if rows == 0 {
        cfg.empty_block_height_cells * pitch
    } else {
        (cfg.pin_top_padding_cells
            + (rows - 1) as f64 * cfg.pin_spacing_cells
            + cfg.pin_bottom_padding_cells)
            * pitch
    };

    let widest_label = |pins: &[PinId]| -> Result<f64> {
        let mut widest = 0.0_f64;
        for id in pins {
            let label = measurer.measure(&store.pin(*id)?.name).width;
            widest = widest.max(label + 2.0 * cfg.pin_label_padding);
        }
        Ok(widest)
    };
    let title = measurer.measure(&block.name).width + 2.0 * cfg.title_padding;
    let labels = widest_label(&block.inputs)? + widest_label(&block.outputs)?;
    let width = (cfg.standard_block_width_cells * pitch)
        .max(title)
        .max(labels);

    Ok(Size::new(grid.ceil_value(width), grid.ceil_value(height)))
}

pub fn block_rect(block: &Block) -> Rect {
    Rect::from_origin_size(block.position, block.size)
}

/// Footprint of a diagram pin, centred on its anchor.
pub fn diagram_pin_rect(pin: &DiagramPin, cfg: &GeometryConfig) -> Rect {
    let half = cfg.diagram_pin_size * 0.5;
    Rect::new(
        pin.position.x - half,
        pin.position.y - half,
        cfg.diagram_pin_size,
        cfg.diagram_pin_size,
    )
}

/// Anchor of a block pin: left edge for inputs, right edge for outputs, at a
/// height given by the pin's index in its ordered list.
pub fn pin_anchor(
    store: &EntityStore,
    pin: PinId,
    cfg: &GeometryConfig,
    grid: &GridSnapper,
) -> Result<Point> {
    let p = store.pin(pin)?;
    let block = store.block(p.owner)?;
    let index = block
        .pins(p.direction)
        .iter()
        .position(|id| *id == pin)
        .unwrap_or(0);
    let pitch = grid.pitch();
    let y = block.position.y
        + (cfg.pin_top_padding_cells + index as f64 * cfg.pin_spacing_cells) * pitch;
    let x = match p.direction {
        Direction::Input => block.position.x,
        Direction::Output => block.position.x + block.size.width,
    };
    Ok(Point::new(x, y))
}

pub fn endpoint_anchor(
    store: &EntityStore,
    endpoint: Endpoint,
    cfg: &GeometryConfig,
    grid: &GridSnapper,
) -> Result<Point> {
    match endpoint {
        Endpoint::Block(pin) => pin_anchor(store, pin, cfg, grid),
        Endpoint::Diagram(id) => Ok(store.diagram_pin(id)?.position),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Super block and diagram pin alignment
// ────────────────────────────────────────────────────────────────────────────

/// Smallest rectangle containing every block, or `None` without blocks.
pub fn blocks_bounding_box(store: &EntityStore) -> Option<Rect> {
    store
        .blocks()
        .map(block_rect)
        .reduce(|acc, rect| acc.union(&rect))
}

/// Block bounding box expanded by the configured margins.
pub fn super_block(store: &EntityStore, cfg: &GeometryConfig) -> Option<Rect> {
    blocks_bounding_box(store)
        .map(|bbox| bbox.expanded(cfg.super_block_margin_x, cfg.super_block_margin_y))
}

/// Spread diagram inputs along the left edge of the super block and outputs
/// along its right edge, in list order. Does nothing without blocks.
///
/// Each pin sits at least one grid cell below the previous one, so a crowded
/// edge runs past the bottom of the frame instead of stacking pins.
pub fn align_diagram_pins(
    store: &mut EntityStore,
    cfg: &GeometryConfig,
    grid: &GridSnapper,
) -> Result<()> {
    let Some(frame) = super_block(store, cfg) else {
        return Ok(());
    };
    for (direction, x) in [
        (Direction::Input, frame.left()),
        (Direction::Output, frame.right()),
    ] {
        let pins = store.diagram_pins_of(direction);
        let segment = frame.height / (pins.len() + 1) as f64;
        let mut previous: Option<f64> = None;
        for (i, id) in pins.into_iter().enumerate() {
            let mut spot = grid.snap(Point::new(x, frame.top() + (i + 1) as f64 * segment));
            if let Some(prev) = previous {
                spot.y = spot.y.max(prev + grid.pitch());
            }
            previous = Some(spot.y);
            store.set_diagram_pin_position(id, spot)?;
        }
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Placement search
// ────────────────────────────────────────────────────────────────────────────

/// Footprints of every block (except `ignore`) and every diagram pin.
pub fn obstacles(store: &EntityStore, cfg: &GeometryConfig, ignore: Option<BlockId>) -> Vec<Rect> {
    store
        .blocks()
        .filter(|b| Some(b.id) != ignore)
        .map(block_rect)
        .chain(store.diagram_pins().map(|p| diagram_pin_rect(p, cfg)))
        .collect()
}

pub fn overlaps_any(rect: &Rect, obstacles: &[Rect]) -> bool {
    obstacles.iter().any(|o| rect.intersects(o))
}

/// Where a new block of `size` should start looking for a spot: to the right
/// of `existing` (the other blocks' bounding box), vertically centred on it.
pub fn placement_hint(
    existing: Option<Rect>,
    size: Size,
    cfg: &GeometryConfig,
    grid: &GridSnapper,
) -> Point {
    match existing {
        Some(bbox) => grid.snap(Point::new(
            bbox.right() + cfg.standard_block_width_cells * grid.pitch(),
            bbox.center().y - size.height * 0.5,
        )),
        None => Point::default(),
    }
}

/// Nearest grid position to `start` (top-left) where a `size` rectangle
/// overlaps none of `obstacles`.
///
/// Walks an outward square spiral one grid cell at a time. Falls back to
/// `start` once the search radius is exhausted.
pub fn find_free_spot(
    start: Point,
    size: Size,
    obstacles: &[Rect],
    grid: &GridSnapper,
    radius_cells: f64,
) -> Point {
    let start = grid.snap(start);
    let pitch = grid.pitch();
    let fits = |p: Point| !overlaps_any(&Rect::from_origin_size(p, size), obstacles);
    if fits(start) {
        return start;
    }

    let max_radius_sq = radius_cells * radius_cells;
    let (mut x, mut y) = (0_i64, 0_i64);
    let (mut dx, mut dy) = (0_i64, -1_i64);
    while ((x * x + y * y) as f64) < max_radius_sq {
        if x == y || (x < 0 && x == -y) || (x > 0 && x == 1 - y) {
            (dx, dy) = (-dy, dx);
        }
        x += dx;
        y += dy;
        let candidate = Point::new(start.x + x as f64 * pitch, start.y + y as f64 * pitch);
        if fits(candidate) {
            return candidate;
        }
    }
    start
}
