use tracing::{debug, trace};

use crate::config::Params;
use crate::geometry::{Point, Segment};

/// Which axis the lanes currently run along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    SweepAlongWidth,
    SweepAlongHeight,
}

impl Phase {
    /// Heading of the first lane after entering this phase.
    pub fn initial_heading(self) -> Heading {
        match self {
            Phase::SweepAlongWidth => Heading::PlusX,
            Phase::SweepAlongHeight => Heading::PlusY,
        }
    }

    /// Direction the robot shifts by one tool width between lanes.
    pub fn lane_offset(self) -> Heading {
        match self {
            Phase::SweepAlongWidth => Heading::PlusY,
            Phase::SweepAlongHeight => Heading::PlusX,
        }
    }

    pub fn next(self) -> Phase {
        match self {
            Phase::SweepAlongWidth => Phase::SweepAlongHeight,
            Phase::SweepAlongHeight => Phase::SweepAlongWidth,
        }
    }
}

/// Axis-aligned unit step direction. +y points down the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heading {
    PlusX,
    MinusX,
    PlusY,
    MinusY,
}

impl Heading {
    #[inline]
    pub fn vector(self) -> (f64, f64) {
        match self {
            Heading::PlusX => (1.0, 0.0),
            Heading::MinusX => (-1.0, 0.0),
            Heading::PlusY => (0.0, 1.0),
            Heading::MinusY => (0.0, -1.0),
        }
    }

    pub fn reversed(self) -> Heading {
        match self {
            Heading::PlusX => Heading::MinusX,
            Heading::MinusX => Heading::PlusX,
            Heading::PlusY => Heading::MinusY,
            Heading::MinusY => Heading::PlusY,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Heading::PlusX | Heading::MinusX)
    }
}

/// Edge of the surface rectangle a step ran past.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

/// Lane change for a boundary hit: shift along `offset`, continue along `heading`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Turn {
    pub offset: Heading,
    pub heading: Heading,
}

/// Turn table. Any exit reverses the lane and shifts one tool width along the
/// phase's offset axis; a width sweep can only leave through Left/Right and a
/// height sweep through Top/Bottom, since lane offsets are clamped back in.
pub fn turn_for(phase: Phase, heading: Heading, side: Side) -> Turn {
    match (phase, side) {
        (Phase::SweepAlongWidth, Side::Left) => Turn { offset: Heading::PlusY, heading: Heading::PlusX },
        (Phase::SweepAlongWidth, Side::Right) => Turn { offset: Heading::PlusY, heading: Heading::MinusX },
        (Phase::SweepAlongHeight, Side::Top) => Turn { offset: Heading::PlusX, heading: Heading::PlusY },
        (Phase::SweepAlongHeight, Side::Bottom) => Turn { offset: Heading::PlusX, heading: Heading::MinusY },
        (phase, _) => Turn {
            offset: phase.lane_offset(),
            heading: heading.reversed(),
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// Plain step along the lane.
    Straight,
    /// Hit a wall and moved over to the next lane.
    Turn,
    /// Ran out of lanes; restarted from the origin on the other axis.
    PhaseSwitch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub segment: Segment,
    pub kind: StepKind,
}

/// Boustrophedon turn controller over a `width` x `height` pixel rectangle.
#[derive(Clone, Debug)]
pub struct Stepper {
    width: f64,
    height: f64,
    step: f64,
    tool_width: f64,

    position: Point,
    heading: Heading,
    phase: Phase,

    lanes: u64,
    phase_switches: u64,
}

impl Stepper {
    pub fn new(width: f64, height: f64, step: f64, tool_width: f64) -> Self {
        let phase = Phase::SweepAlongWidth;
        Self {
            width,
            height,
            step,
            tool_width,
            position: Point::ORIGIN,
            heading: phase.initial_heading(),
            phase,
            lanes: 0,
            phase_switches: 0,
        }
    }

    pub fn from_params(params: &Params) -> Self {
        Self::new(
            params.surface_width_px(),
            params.surface_height_px(),
            params.step_px(),
            params.tool_width_px(),
        )
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.width, self.height, self.step, self.tool_width);
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Lane changes so far, across both phases.
    pub fn lanes(&self) -> u64 {
        self.lanes
    }

    pub fn phase_switches(&self) -> u64 {
        self.phase_switches
    }

    fn exit_side(&self, p: Point) -> Option<Side> {
        if p.x < 0.0 {
            Some(Side::Left)
        } else if p.x > self.width {
            Some(Side::Right)
        } else if p.y < 0.0 {
            Some(Side::Top)
        } else if p.y > self.height {
            Some(Side::Bottom)
        } else {
            None
        }
    }

    /// True once a lane offset has pushed past the last lane of the phase.
    fn lanes_exhausted(&self, p: Point) -> bool {
        match self.phase {
            Phase::SweepAlongWidth => p.y > self.height,
            Phase::SweepAlongHeight => p.x > self.width,
        }
    }

    /// Advance one step and return the segment travelled.
    pub fn step(&mut self) -> Step {
        let prev = self.position;
        let (dx, dy) = self.heading.vector();
        let mut next = Point::new(prev.x + dx * self.step, prev.y + dy * self.step);

        let Some(side) = self.exit_side(next) else {
            self.position = next;
            return Step {
                segment: Segment::new(prev, next),
                kind: StepKind::Straight,
            };
        };

        let turn = turn_for(self.phase, self.heading, side);
        let (ox, oy) = turn.offset.vector();
        next.x += ox * self.tool_width;
        next.y += oy * self.tool_width;
        self.heading = turn.heading;
        self.lanes += 1;

        let kind = if self.lanes_exhausted(next) {
            let phase = self.phase.next();
            debug!(
                from = ?self.phase,
                to = ?phase,
                lanes = self.lanes,
                "sweep axis exhausted, restarting from origin"
            );
            self.phase = phase;
            self.heading = phase.initial_heading();
            self.phase_switches += 1;
            next = Point::ORIGIN;
            StepKind::PhaseSwitch
        } else {
            trace!(?side, heading = ?self.heading, "lane turn");
            StepKind::Turn
        };

        next.x = next.x.clamp(0.0, self.width);
        next.y = next.y.clamp(0.0, self.height);
        self.position = next;

        debug_assert_eq!(
            self.heading.is_horizontal(),
            self.phase == Phase::SweepAlongWidth
        );

        Step {
            segment: Segment::new(prev, next),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn pool() -> Stepper {
        // 20 x 15 m at 40 px/m, 0.5 m tool, 0.2 m steps
        Stepper::new(800.0, 600.0, 8.0, 20.0)
    }

    #[test]
    fn starts_at_origin_heading_plus_x() {
        let s = pool();
        assert_eq!(s.position(), Point::ORIGIN);
        assert_eq!(s.heading(), Heading::PlusX);
        assert_eq!(s.phase(), Phase::SweepAlongWidth);
    }

    #[test]
    fn straight_steps_have_step_length() {
        let mut s = pool();
        for _ in 0..100 {
            let step = s.step();
            assert_eq!(step.kind, StepKind::Straight);
            assert!((step.segment.length() - 8.0).abs() < EPS);
        }
        assert!((s.position().x - 800.0).abs() < EPS);
        assert_eq!(s.position().y, 0.0);
    }

    #[test]
    fn right_wall_turns_into_next_lane() {
        let mut s = pool();
        for _ in 0..100 {
            s.step();
        }
        let step = s.step();
        assert_eq!(step.kind, StepKind::Turn);
        assert_eq!(s.heading(), Heading::MinusX);
        assert_eq!(s.phase(), Phase::SweepAlongWidth);
        assert!((s.position().x - 800.0).abs() < EPS);
        assert!((s.position().y - 20.0).abs() < EPS);
        // turn segment is the lateral shift, clipped to the wall
        assert!((step.segment.length() - 20.0).abs() < EPS);
        assert_eq!(s.lanes(), 1);
    }

    #[test]
    fn left_wall_turns_back_to_plus_x() {
        let mut s = pool();
        // out along lane 0, turn, back along lane 1, turn
        for _ in 0..(101 + 100) {
            s.step();
        }
        let step = s.step();
        assert_eq!(step.kind, StepKind::Turn);
        assert_eq!(s.heading(), Heading::PlusX);
        assert_eq!(s.position().x, 0.0);
        assert!((s.position().y - 40.0).abs() < EPS);
    }

    #[test]
    fn exhausting_rows_switches_to_height_sweep() {
        let mut s = pool();
        let mut switched = None;
        for i in 0..10_000 {
            let step = s.step();
            if step.kind == StepKind::PhaseSwitch {
                switched = Some((i, step));
                break;
            }
        }
        let (_, step) = switched.expect("width sweep never finished");
        assert_eq!(s.phase(), Phase::SweepAlongHeight);
        assert_eq!(s.heading(), Heading::PlusY);
        assert_eq!(s.position(), Point::ORIGIN);
        assert_eq!(step.segment.end, Point::ORIGIN);
        // rows at y = 0, 20, ..., 600
        assert_eq!(s.lanes(), 31);
        assert_eq!(s.phase_switches(), 1);
    }

    #[test]
    fn height_sweep_turns_at_bottom() {
        let mut s = pool();
        while s.phase() == Phase::SweepAlongWidth {
            s.step();
        }
        // 600 / 8 = 75 steps down to the bottom wall
        for _ in 0..75 {
            assert_eq!(s.step().kind, StepKind::Straight);
        }
        let step = s.step();
        assert_eq!(step.kind, StepKind::Turn);
        assert_eq!(s.heading(), Heading::MinusY);
        assert!((s.position().x - 20.0).abs() < EPS);
        assert!((s.position().y - 600.0).abs() < EPS);
    }

    #[test]
    fn full_cycle_returns_to_width_sweep() {
        let mut s = pool();
        while s.phase_switches() < 2 {
            s.step();
        }
        assert_eq!(s.phase(), Phase::SweepAlongWidth);
        assert_eq!(s.heading(), Heading::PlusX);
        assert_eq!(s.position(), Point::ORIGIN);
    }

    #[test]
    fn positions_stay_on_the_surface() {
        let mut s = pool();
        for _ in 0..20_000 {
            let step = s.step();
            let p = step.segment.end;
            assert!((0.0..=800.0).contains(&p.x), "x out of bounds: {p:?}");
            assert!((0.0..=600.0).contains(&p.y), "y out of bounds: {p:?}");
            assert_eq!(s.heading().is_horizontal(), s.phase() == Phase::SweepAlongWidth);
        }
    }

    #[test]
    fn turn_table_reverses_along_phase_axis() {
        let t = turn_for(Phase::SweepAlongWidth, Heading::PlusX, Side::Right);
        assert_eq!(t, Turn { offset: Heading::PlusY, heading: Heading::MinusX });
        let t = turn_for(Phase::SweepAlongHeight, Heading::MinusY, Side::Top);
        assert_eq!(t, Turn { offset: Heading::PlusX, heading: Heading::PlusY });
    }

    #[test]
    fn cross_axis_exit_still_reverses_along_phase_axis() {
        let t = turn_for(Phase::SweepAlongWidth, Heading::PlusY, Side::Bottom);
        assert_eq!(t, Turn { offset: Heading::PlusY, heading: Heading::MinusY });
        let t = turn_for(Phase::SweepAlongHeight, Heading::PlusX, Side::Right);
        assert_eq!(t, Turn { offset: Heading::PlusX, heading: Heading::MinusX });
    }

    #[test]
    fn phase_switch_segment_runs_from_last_lane_end_to_origin() {
        let mut s = pool();
        let mut last_lane_end = None;
        let step = loop {
            let step = s.step();
            if step.kind == StepKind::PhaseSwitch {
                break step;
            }
            last_lane_end = Some(step.segment.end);
        };
        // row 30 at y = 600 runs east
        assert_eq!(last_lane_end, Some(Point::new(800.0, 600.0)));
        assert_eq!(step.segment.start, Point::new(800.0, 600.0));
        assert_eq!(step.segment.end, Point::ORIGIN);
        assert!((step.segment.length() - 1000.0).abs() < EPS);
    }

    #[test]
    fn reset_restores_start_state() {
        let mut s = pool();
        for _ in 0..5_000 {
            s.step();
        }
        s.reset();
        assert_eq!(s.position(), Point::ORIGIN);
        assert_eq!(s.phase(), Phase::SweepAlongWidth);
        assert_eq!(s.lanes(), 0);
    }
}
