use std::collections::{BTreeMap, HashMap};

use crate::geometry::{CellKey, CrossingPoint, Point, Segment, cell_of};

/// Result of testing one new step against the path recorded so far.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutcome {
    /// The step crossed stored segments; one marker increment per hit.
    Crossed(Vec<CrossingPoint>),
    /// No geometric crossing, but the step ended near a known marker.
    NearCrossing(CrossingPoint),
    /// Nothing found; the step was stored for later queries.
    Recorded,
}

impl QueryOutcome {
    pub fn found(&self) -> bool {
        !matches!(self, QueryOutcome::Recorded)
    }
}

/// Uniform grid of path segments plus the self-crossing markers found so far.
///
/// Segments are bucketed by the cell of their end point, so a query only
/// looks at the 3x3 block around the new step instead of the whole path.
/// A step either lands in a bucket or bumps a marker, never both.
#[derive(Clone, Debug)]
pub struct SegmentIndex {
    cell_size: f64,
    proximity_radius: f64,
    cells: HashMap<CellKey, Vec<Segment>>,
    crossings: BTreeMap<CrossingPoint, u32>,
    segment_count: usize,
}

impl SegmentIndex {
    pub fn new(cell_size: f64, proximity_radius: f64) -> Self {
        Self {
            cell_size,
            proximity_radius,
            cells: HashMap::new(),
            crossings: BTreeMap::new(),
            segment_count: 0,
        }
    }

    pub fn insert(&mut self, segment: Segment) {
        self.cells
            .entry(cell_of(segment.end, self.cell_size))
            .or_default()
            .push(segment);
        self.segment_count += 1;
    }

    pub fn query_and_record(&mut self, prev: Point, new: Point) -> QueryOutcome {
        let step = Segment::new(prev, new);

        let mut hits = Vec::new();
        for key in cell_of(new, self.cell_size).neighborhood() {
            let Some(bucket) = self.cells.get(&key) else {
                continue;
            };
            for stored in bucket {
                if step.crosses(stored) {
                    let mean = Point::new(
                        (prev.x + new.x + stored.start.x + stored.end.x) / 4.0,
                        (prev.y + new.y + stored.start.y + stored.end.y) / 4.0,
                    );
                    hits.push(mean.truncated());
                }
            }
        }

        if !hits.is_empty() {
            for &point in &hits {
                *self.crossings.entry(point).or_insert(0) += 1;
            }
            return QueryOutcome::Crossed(hits);
        }

        if let Some(point) = self.nearest_crossing(new) {
            *self.crossings.entry(point).or_insert(0) += 1;
            return QueryOutcome::NearCrossing(point);
        }

        self.insert(step);
        QueryOutcome::Recorded
    }

    /// Closest marker within the proximity radius (inclusive). Ties go to the
    /// smallest point in (x, y) order.
    pub fn nearest_crossing(&self, p: Point) -> Option<CrossingPoint> {
        let limit = self.proximity_radius * self.proximity_radius;
        let mut best: Option<(CrossingPoint, f64)> = None;
        for &point in self.crossings.keys() {
            let d2 = point.distance_sq_to(p);
            if d2 > limit {
                continue;
            }
            if best.is_none_or(|(_, bd)| d2 < bd) {
                best = Some((point, d2));
            }
        }
        best.map(|(point, _)| point)
    }

    pub fn crossings(&self) -> &BTreeMap<CrossingPoint, u32> {
        &self.crossings
    }

    pub fn crossing_count(&self, point: CrossingPoint) -> u32 {
        self.crossings.get(&point).copied().unwrap_or(0)
    }

    /// Segments currently stored in the grid.
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Non-empty buckets.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[cfg(test)]
    pub fn segments_in(&self, key: CellKey) -> &[Segment] {
        self.cells.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.crossings.clear();
        self.segment_count = 0;
    }
}
