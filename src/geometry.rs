//! Planar primitives for the sweep path. Coordinates are surface pixels,
//! x to the right and y downward.

use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Integer marker position. Truncates toward zero.
    #[inline]
    pub fn truncated(self) -> CrossingPoint {
        CrossingPoint {
            x: self.x as i32,
            y: self.y as i32,
        }
    }
}

/// One discrete step of travel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    #[inline]
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        distance(self.start, self.end)
    }

    #[inline]
    pub fn crosses(&self, other: &Segment) -> bool {
        segments_intersect(self.start, self.end, other.start, other.end)
    }
}

/// Spatial index bucket coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub col: i32,
    pub row: i32,
}

impl CellKey {
    /// The 3x3 block centred on this cell, row by row.
    pub fn neighborhood(self) -> impl Iterator<Item = CellKey> {
        (-1..=1).flat_map(move |dr| {
            (-1..=1).map(move |dc| CellKey {
                col: self.col + dc,
                row: self.row + dr,
            })
        })
    }
}

/// Integer location of a detected self-crossing. Ordered by x, then y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CrossingPoint {
    pub x: i32,
    pub y: i32,
}

impl CrossingPoint {
    #[inline]
    pub fn distance_sq_to(self, p: Point) -> f64 {
        let dx = self.x as f64 - p.x;
        let dy = self.y as f64 - p.y;
        dx * dx + dy * dy
    }
}

#[inline]
pub fn distance(a: Point, b: Point) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

/// Sign of the turn a -> b -> c: positive counter-clockwise, zero collinear.
#[inline]
fn orientation(a: Point, b: Point, c: Point) -> f64 {
    let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if cross > 0.0 {
        1.0
    } else if cross < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// True iff segments p and q cross at a single interior point.
///
/// Each segment's endpoints must lie strictly on opposite sides of the other
/// segment's line. Collinear overlaps and endpoint contacts (corners,
/// T-junctions) are not crossings: consecutive steps share endpoints and lanes
/// run along each other, and neither is a self-intersection of the path.
pub fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

/// Bucket containing `p` for a grid of `cell_size` pixels.
#[inline]
pub fn cell_of(p: Point, cell_size: f64) -> CellKey {
    CellKey {
        col: (p.x / cell_size).floor() as i32,
        row: (p.y / cell_size).floor() as i32,
    }
}
