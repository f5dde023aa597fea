use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Params;
use crate::error::ConfigError;
use crate::geometry::{CrossingPoint, Point, Segment};
use crate::index::{QueryOutcome, SegmentIndex};
use crate::stepper::{Step, Stepper};

/// One crossing marker, flattened for serialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CrossingMarker {
    pub x: i32,
    pub y: i32,
    pub count: u32,
}

/// Observable state after a tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Frame {
    pub position: Point,
    pub distance_m: f64,
    pub drawn_steps: u64,
    pub target_steps: u64,
    pub complete: bool,
    pub crossings: Vec<CrossingMarker>,
}

/// Owns a whole sweep run: stepper, segment index, pacing and path length.
///
/// Driven by `advance` with the wall-clock time since the run started. The
/// number of steps taken is tied to that time, so the same sequence of
/// elapsed samples always yields the same path.
#[derive(Clone, Debug)]
pub struct Simulation {
    params: Params,
    surface: (usize, usize),
    stepper: Stepper,
    index: SegmentIndex,

    trajectory: Vec<Point>,
    new_segments: Vec<Segment>,

    drawn_steps: u64,
    target_steps: u64,
    distance_px: f64,
}

impl Simulation {
    pub fn new(params: Params) -> Result<Self, ConfigError> {
        params.validate()?;
        let surface = params.surface_size()?;
        let stepper = Stepper::from_params(&params);
        let index = SegmentIndex::new(params.cell_size_px(), params.proximity_radius_px);
        let target_steps = params.target_steps();
        debug!(
            target_steps,
            width_px = params.surface_width_px(),
            height_px = params.surface_height_px(),
            step_px = params.step_px(),
            "simulation created"
        );
        Ok(Self {
            params,
            surface,
            stepper,
            index,
            trajectory: vec![Point::ORIGIN],
            new_segments: Vec::new(),
            drawn_steps: 0,
            target_steps,
            distance_px: 0.0,
        })
    }

    pub fn reset(&mut self) {
        self.stepper.reset();
        self.index.clear();
        self.trajectory.clear();
        self.trajectory.push(Point::ORIGIN);
        self.new_segments.clear();
        self.drawn_steps = 0;
        self.distance_px = 0.0;
    }

    /// Steps that should have been drawn after `elapsed` seconds of the
    /// real-time budget. A zero budget replays everything at once.
    pub fn pacing_target(&self, elapsed: f64) -> u64 {
        let budget = self.params.realtime_budget_s;
        if budget <= 0.0 {
            return self.target_steps;
        }
        let ratio = (elapsed / budget).clamp(0.0, 1.0);
        if ratio.is_nan() {
            return 0;
        }
        ((ratio * self.target_steps as f64).floor() as u64).min(self.target_steps)
    }

    /// Catch up to the step count due at `elapsed` seconds. Returns how many
    /// steps were taken; zero once the run is complete.
    pub fn advance(&mut self, elapsed: f64) -> u64 {
        if self.is_complete() {
            return 0;
        }
        let goal = self.pacing_target(elapsed);
        let before = self.drawn_steps;
        while self.drawn_steps < goal {
            self.step_once();
        }

        if self.is_complete() {
            info!(
                steps = self.drawn_steps,
                distance_m = self.distance_m(),
                crossings = self.index.crossings().len(),
                "sweep complete"
            );
        }
        self.drawn_steps - before
    }

    /// Take a single step and test it against the recorded path, regardless
    /// of pacing.
    pub fn step_once(&mut self) -> (Step, QueryOutcome) {
        let step = self.stepper.step();
        let segment = step.segment;
        let outcome = self.index.query_and_record(segment.start, segment.end);

        self.distance_px += segment.length();
        self.trajectory.push(segment.end);
        self.new_segments.push(segment);
        self.drawn_steps += 1;
        (step, outcome)
    }

    pub fn is_complete(&self) -> bool {
        self.drawn_steps >= self.target_steps
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Raster size of the surface, `(width, height)` in pixels.
    pub fn surface_size(&self) -> (usize, usize) {
        self.surface
    }

    pub fn position(&self) -> Point {
        self.stepper.position()
    }

    /// Current position in meters.
    pub fn position_m(&self) -> Point {
        let p = self.stepper.position();
        Point::new(self.params.px_to_m(p.x), self.params.px_to_m(p.y))
    }

    pub fn stepper(&self) -> &Stepper {
        &self.stepper
    }

    pub fn index(&self) -> &SegmentIndex {
        &self.index
    }

    pub fn crossings(&self) -> &BTreeMap<CrossingPoint, u32> {
        self.index.crossings()
    }

    pub fn trajectory(&self) -> &[Point] {
        &self.trajectory
    }

    /// Segments emitted since the previous call. Renderers drain this every
    /// tick; it is not bounded otherwise.
    pub fn take_new_segments(&mut self) -> Vec<Segment> {
        std::mem::take(&mut self.new_segments)
    }

    pub fn drawn_steps(&self) -> u64 {
        self.drawn_steps
    }

    pub fn target_steps(&self) -> u64 {
        self.target_steps
    }

    pub fn distance_px(&self) -> f64 {
        self.distance_px
    }

    pub fn distance_m(&self) -> f64 {
        self.params.px_to_m(self.distance_px)
    }

    pub fn frame(&self) -> Frame {
        Frame {
            position: self.position(),
            distance_m: self.distance_m(),
            drawn_steps: self.drawn_steps,
            target_steps: self.target_steps,
            complete: self.is_complete(),
            crossings: self
                .crossings()
                .iter()
                .map(|(p, &count)| CrossingMarker {
                    x: p.x,
                    y: p.y,
                    count,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stepper::StepKind;

    fn short_run(seconds: f64) -> Params {
        Params {
            simulated_seconds: seconds,
            ..Params::default()
        }
    }

    #[test]
    fn rejects_invalid_params() {
        let p = Params {
            width_m: -1.0,
            ..Params::default()
        };
        assert!(Simulation::new(p).is_err());
    }

    #[test]
    fn pacing_is_linear_in_elapsed_time() {
        let sim = Simulation::new(short_run(100.0)).unwrap();
        assert_eq!(sim.pacing_target(0.0), 0);
        assert_eq!(sim.pacing_target(0.5), 25);
        assert_eq!(sim.pacing_target(1.0), 50);
        assert_eq!(sim.pacing_target(2.0), 100);
        assert_eq!(sim.pacing_target(50.0), 100);
        assert_eq!(sim.pacing_target(-1.0), 0);
        assert_eq!(sim.pacing_target(f64::NAN), 0);
    }

    #[test]
    fn zero_budget_draws_everything() {
        let p = Params {
            realtime_budget_s: 0.0,
            ..short_run(40.0)
        };
        let mut sim = Simulation::new(p).unwrap();
        assert_eq!(sim.advance(0.0), 40);
        assert!(sim.is_complete());
    }

    #[test]
    fn advance_never_goes_backwards() {
        let mut sim = Simulation::new(short_run(100.0)).unwrap();
        assert_eq!(sim.advance(1.0), 50);
        assert_eq!(sim.advance(0.5), 0);
        assert_eq!(sim.drawn_steps(), 50);
    }

    #[test]
    fn completion_freezes_state() {
        let mut sim = Simulation::new(short_run(100.0)).unwrap();
        sim.advance(2.0);
        assert!(sim.is_complete());
        let frame = sim.frame();
        assert_eq!(sim.advance(10.0), 0);
        assert_eq!(sim.frame(), frame);
    }

    #[test]
    fn distance_accumulates_step_lengths() {
        let mut sim = Simulation::new(short_run(100.0)).unwrap();
        sim.advance(1.0);
        // 50 straight steps of 0.2 m
        assert!((sim.distance_m() - 10.0).abs() < 1e-9);
        assert!((sim.distance_px() - 400.0).abs() < 1e-9);
    }

    #[test]
    fn trajectory_and_segment_drain() {
        let mut sim = Simulation::new(short_run(100.0)).unwrap();
        sim.advance(0.2);
        assert_eq!(sim.trajectory().len(), 11);
        let drained = sim.take_new_segments();
        assert_eq!(drained.len(), 10);
        assert_eq!(drained[0].start, Point::ORIGIN);
        assert!(sim.take_new_segments().is_empty());
        sim.advance(0.4);
        assert_eq!(sim.take_new_segments().len(), 10);
    }

    #[test]
    fn phase_switch_segment_is_tested_against_the_path() {
        let mut sim = Simulation::new(Params::default()).unwrap();
        let (step, outcome, stored) = loop {
            let stored = sim.index().segment_count();
            let (step, outcome) = sim.step_once();
            if step.kind == StepKind::PhaseSwitch {
                break (step, outcome, stored);
            }
            assert!(sim.drawn_steps() < 10_000, "width sweep never finished");
        };
        // last row runs east and ends in the far corner
        assert_eq!(step.segment.start, Point::new(800.0, 600.0));
        assert_eq!(step.segment.end, Point::ORIGIN);
        // the diagonal back to the origin cuts the stored rows near the origin
        assert!(matches!(outcome, QueryOutcome::Crossed(ref hits) if !hits.is_empty()));
        assert!(!sim.crossings().is_empty());
        assert_eq!(*sim.trajectory().last().unwrap(), Point::ORIGIN);
        assert_eq!(sim.index().segment_count(), stored);
    }

    #[test]
    fn surface_size_comes_from_params() {
        let sim = Simulation::new(Params::default()).unwrap();
        assert_eq!(sim.surface_size(), (800, 600));
        let p = Params {
            width_m: 1e9,
            height_m: 1e9,
            ..Params::default()
        };
        assert!(matches!(
            Simulation::new(p),
            Err(ConfigError::OutOfRange { name: "surface_pixels", .. })
        ));
    }

    #[test]
    fn reset_starts_over() {
        let mut sim = Simulation::new(short_run(3000.0)).unwrap();
        sim.advance(2.0);
        assert!(sim.is_complete());
        sim.reset();
        assert!(!sim.is_complete());
        assert_eq!(sim.drawn_steps(), 0);
        assert_eq!(sim.distance_px(), 0.0);
        assert_eq!(sim.trajectory(), &[Point::ORIGIN]);
        assert!(sim.crossings().is_empty());
        assert_eq!(sim.index().segment_count(), 0);
    }
}
