use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::geometry::{CrossingPoint, Point, Segment};
use crate::raster::{Raster, disc_pixels};

const POOL: [u8; 4] = [255, 255, 255, 255];
const PATH_LIGHT: [u8; 4] = [255, 190, 190, 255];
const PATH_DARK: [u8; 4] = [150, 0, 0, 255];
const MARKER: [u8; 4] = [255, 0, 0, 255];
const HEAD: [u8; 4] = [0, 128, 255, 255];

const DENSITY_BG: [u8; 4] = [0, 0, 0, 255];
const DENSITY_LOW: [u8; 4] = [90, 20, 20, 255];
const DENSITY_HIGH: [u8; 4] = [255, 230, 120, 255];

/// Passes over one pixel at which the path colour saturates.
const MAX_OVERDRAW: u16 = 6;
const HEAD_RADIUS: f64 = 6.0;

#[inline]
fn lerp_color(a: [u8; 4], b: [u8; 4], t: f32) -> [u8; 4] {
    let t = t.clamp(0.0, 1.0);
    [
        (a[0] as f32 + (b[0] as f32 - a[0] as f32) * t).round() as u8,
        (a[1] as f32 + (b[1] as f32 - a[1] as f32) * t).round() as u8,
        (a[2] as f32 + (b[2] as f32 - a[2] as f32) * t).round() as u8,
        255,
    ]
}

/// Count how many path segments pass over each pixel.
///
/// A segment contributes at most once per pixel, and the shared end point of
/// consecutive segments is only counted for the first of them.
pub fn path_coverage(trajectory: &[Point], w: usize, h: usize) -> Raster<u16> {
    let mut coverage = Raster::<u16>::new(w, h);
    if let Some((x, y)) = trajectory.first().and_then(|p| coverage.pixel_of(p.x, p.y)) {
        coverage.set(x, y, 1);
    }
    for pair in trajectory.windows(2) {
        trace_segment(&mut coverage, Segment::new(pair[0], pair[1]));
    }
    coverage
}

/// Extend a coverage raster with segments drained from a running
/// simulation. Feeding every segment of a path in order gives the same
/// counts as `path_coverage` over its trajectory.
pub fn add_segments(coverage: &mut Raster<u16>, segments: &[Segment]) {
    for &segment in segments {
        trace_segment(coverage, segment);
    }
}

/// Sample `segment` at pixel resolution, skipping its start pixel.
fn trace_segment(coverage: &mut Raster<u16>, segment: Segment) {
    let (a, b) = (segment.start, segment.end);
    let samples = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as usize;
    let mut last = coverage.pixel_of(a.x, a.y);
    for i in 1..=samples {
        let t = i as f64 / samples as f64;
        let pixel = coverage.pixel_of(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
        if pixel == last {
            continue;
        }
        last = pixel;
        if let Some((x, y)) = pixel {
            let v = coverage.get(x, y);
            coverage.set(x, y, v.saturating_add(1));
        }
    }
}

/// Render the pool: white surface, path shaded by overdraw, crossing markers
/// sized by hit count, and the robot head while the run is in progress.
pub fn render_path(
    coverage: &Raster<u16>,
    crossings: &BTreeMap<CrossingPoint, u32>,
    head: Option<Point>,
) -> Vec<u8> {
    let w = coverage.w;
    let h = coverage.h;
    let mut rgba = vec![0u8; w * h * 4];

    rgba.par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                let passes = coverage.get(x, y);
                let color = if passes == 0 {
                    POOL
                } else {
                    let t = (passes - 1) as f32 / (MAX_OVERDRAW - 1) as f32;
                    lerp_color(PATH_LIGHT, PATH_DARK, t)
                };
                row[x * 4..x * 4 + 4].copy_from_slice(&color);
            }
        });

    for (p, &count) in crossings {
        let radius = 3.0 + count as f64;
        for (x, y) in disc_pixels(p.x as f64, p.y as f64, radius, w, h) {
            let i = y * w + x;
            rgba[i * 4..i * 4 + 4].copy_from_slice(&MARKER);
        }
    }

    if let Some(head) = head {
        for (x, y) in disc_pixels(head.x, head.y, HEAD_RADIUS, w, h) {
            let i = y * w + x;
            rgba[i * 4..i * 4 + 4].copy_from_slice(&HEAD);
        }
    }

    rgba
}

/// Crossing heat layer: each marker splats its hit count over its disc.
pub fn render_crossing_density(
    crossings: &BTreeMap<CrossingPoint, u32>,
    w: usize,
    h: usize,
) -> Vec<u8> {
    let mut heat = Raster::<f32>::new(w, h);
    for (p, &count) in crossings {
        let radius = 3.0 + count as f64;
        for (x, y) in disc_pixels(p.x as f64, p.y as f64, radius, w, h) {
            let v = heat.get(x, y);
            heat.set(x, y, v + count as f32);
        }
    }

    let max_heat = heat.data.iter().cloned().fold(0.0f32, f32::max).max(1.0);
    let mut rgba = vec![0u8; w * h * 4];
    rgba.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let v = heat.get(x, y);
            let color = if v <= 0.0 {
                DENSITY_BG
            } else {
                lerp_color(DENSITY_LOW, DENSITY_HIGH, v / max_heat)
            };
            row[x * 4..x * 4 + 4].copy_from_slice(&color);
        }
    });

    rgba
}
