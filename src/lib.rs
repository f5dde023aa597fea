pub mod config;
pub mod error;
pub mod geometry;
pub mod index;
pub mod raster;
pub mod render;
pub mod sim;
pub mod stepper;

use std::time::Instant;

use tracing::info;

use config::Params;
use error::ConfigError;
use raster::Raster;
use sim::{Frame, Simulation};

/// Rendered output of a run at some point in its replay.
pub struct Report {
    pub w: usize,
    pub h: usize,
    pub frame: Frame,
    pub path_rgba: Vec<u8>,
    pub crossings_rgba: Vec<u8>,
}

pub struct Timing {
    pub name: &'static str,
    pub ms: f64,
}

/// Rendered layers for the current state of `sim`.
pub struct Layers {
    pub path_rgba: Vec<u8>,
    pub crossings_rgba: Vec<u8>,
}

/// `coverage` is the path traced so far, kept up to date by draining
/// `Simulation::take_new_segments` into `render::add_segments`.
pub fn render_layers(sim: &Simulation, coverage: &Raster<u16>, timings: &mut Vec<Timing>) -> Layers {
    let (w, h) = sim.surface_size();

    let t = Instant::now();
    let head = (!sim.is_complete()).then(|| sim.position());
    let path_rgba = render::render_path(coverage, sim.crossings(), head);
    timings.push(Timing {
        name: "render_path",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let t = Instant::now();
    let crossings_rgba = render::render_crossing_density(sim.crossings(), w, h);
    timings.push(Timing {
        name: "render_crossings",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    Layers {
        path_rgba,
        crossings_rgba,
    }
}

/// Replay a run up to `elapsed` seconds of its real-time budget (the whole
/// budget when `None`) and render the result.
pub fn run(params: &Params, elapsed: Option<f64>) -> Result<(Report, Vec<Timing>), ConfigError> {
    let mut timings = Vec::new();
    let total_start = Instant::now();

    let t = Instant::now();
    let mut sim = Simulation::new(params.clone())?;
    let (w, h) = sim.surface_size();
    // start pixel only; the path is traced from the drained segments
    let mut coverage = render::path_coverage(sim.trajectory(), w, h);
    let elapsed = elapsed.unwrap_or(params.realtime_budget_s);
    sim.advance(elapsed);
    timings.push(Timing {
        name: "simulate",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let t = Instant::now();
    render::add_segments(&mut coverage, &sim.take_new_segments());
    timings.push(Timing {
        name: "trace_path",
        ms: t.elapsed().as_secs_f64() * 1000.0,
    });

    let layers = render_layers(&sim, &coverage, &mut timings);

    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    timings.push(Timing {
        name: "TOTAL",
        ms: total_ms,
    });
    info!(
        elapsed,
        steps = sim.drawn_steps(),
        crossings = sim.crossings().len(),
        total_ms,
        "replay rendered"
    );

    let report = Report {
        w,
        h,
        frame: sim.frame(),
        path_rgba: layers.path_rgba,
        crossings_rgba: layers.crossings_rgba,
    };

    Ok((report, timings))
}
