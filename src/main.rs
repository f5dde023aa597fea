use std::path::{Path, PathBuf};

use anyhow::{Context, ensure};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sweepsim::config::Params;
use sweepsim::render;
use sweepsim::sim::Simulation;

#[derive(Parser, Debug)]
#[command(name = "sweepsim")]
#[command(about = "Replay a boustrophedon pool-vacuum sweep and render its self-crossings", long_about = None)]
struct Args {
    /// Simulated working time of the vacuum, in hours
    #[arg(long, default_value_t = 2.0)]
    hours: f64,

    /// Real-time budget for the replay, in seconds
    #[arg(long, default_value_t = 2.0)]
    realtime: f64,

    /// Pool width in meters
    #[arg(long, default_value_t = 20.0)]
    width: f64,

    /// Pool height in meters
    #[arg(long, default_value_t = 15.0)]
    height: f64,

    /// Lateral offset between lanes, in meters
    #[arg(long, default_value_t = 0.5)]
    tool_width: f64,

    /// Travel speed in meters per second
    #[arg(long, default_value_t = 0.2)]
    speed: f64,

    /// Replay frames per second
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Output directory for rendered layers
    #[arg(short, long, default_value = "artifacts")]
    out: PathBuf,
}

fn save(out_dir: &Path, name: &str, rgba: &[u8], w: usize, h: usize) -> anyhow::Result<()> {
    let path = out_dir.join(name);
    image::save_buffer(&path, rgba, w as u32, h as u32, image::ColorType::Rgba8)
        .with_context(|| format!("failed to save {}", path.display()))?;
    info!("saved {}", path.display());
    Ok(())
}

/// Frames between progress lines: about one per replayed second, whatever
/// the frame rate.
fn log_interval(fps: f64) -> u64 {
    fps.ceil().max(1.0) as u64
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sweepsim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    ensure!(
        args.fps.is_finite() && args.fps > 0.0,
        "fps must be positive, got {}",
        args.fps
    );

    let params = Params {
        width_m: args.width,
        height_m: args.height,
        tool_width_m: args.tool_width,
        speed_m_s: args.speed,
        simulated_seconds: args.hours * 3600.0,
        realtime_budget_s: args.realtime,
        ..Params::default()
    };
    let mut sim = Simulation::new(params).context("invalid simulation parameters")?;

    info!(
        "sweeping {}x{} m pool for {} h ({} steps) over {} s",
        args.width,
        args.height,
        args.hours,
        sim.target_steps(),
        args.realtime
    );

    let (w, h) = sim.surface_size();
    let mut coverage = render::path_coverage(sim.trajectory(), w, h);

    // Virtual display clock: one advance per frame, roughly one log line per
    // replayed second.
    let every = log_interval(args.fps);
    let mut frame: u64 = 0;
    while !sim.is_complete() {
        frame += 1;
        let elapsed = frame as f64 / args.fps;
        sim.advance(elapsed);
        render::add_segments(&mut coverage, &sim.take_new_segments());
        if frame % every == 0 {
            let pos = sim.position_m();
            info!(
                elapsed_s = elapsed,
                steps = sim.drawn_steps(),
                x_m = pos.x,
                y_m = pos.y,
                crossings = sim.crossings().len(),
                "replay progress"
            );
        }
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;

    let mut timings = Vec::new();
    let layers = sweepsim::render_layers(&sim, &coverage, &mut timings);
    save(&args.out, "path.png", &layers.path_rgba, w, h)?;
    save(&args.out, "crossings.png", &layers.crossings_rgba, w, h)?;

    eprintln!("\nTimings:");
    for t in &timings {
        eprintln!("  {:20} {:8.1} ms", t.name, t.ms);
    }

    let hits: u32 = sim.crossings().values().sum();
    eprintln!("\nFrames:          {frame}");
    eprintln!("Path length:     {:.1} m", sim.distance_m());
    eprintln!("Crossing points: {} ({hits} hits)", sim.crossings().len());
    eprintln!(
        "Stored segments: {} in {} grid cells",
        sim.index().segment_count(),
        sim.index().cell_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_interval_handles_fractional_and_slow_rates() {
        assert_eq!(log_interval(60.0), 60);
        assert_eq!(log_interval(29.97), 30);
        assert_eq!(log_interval(0.5), 1);
    }
}
