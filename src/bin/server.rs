use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sweepsim::config::Params;
use sweepsim::error::SweepError;
use sweepsim::sim::Frame;

#[derive(Deserialize)]
struct SimulateRequest {
    // Surface
    width_m: Option<f64>,
    height_m: Option<f64>,
    // Robot
    tool_width_m: Option<f64>,
    speed_m_s: Option<f64>,
    // Run length
    hours: Option<f64>,
    realtime_seconds: Option<f64>,
    /// Replay position; defaults to the end of the real-time budget.
    elapsed_seconds: Option<f64>,
}

#[derive(Serialize)]
struct SimulateResponse {
    layers: Vec<Layer>,
    timings: Vec<TimingEntry>,
    frame: Frame,
    width: usize,
    height: usize,
}

#[derive(Serialize)]
struct Layer {
    name: String,
    data_url: String,
}

#[derive(Serialize)]
struct TimingEntry {
    name: String,
    ms: f64,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, err: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

fn encode_png(rgba: &[u8], w: usize, h: usize) -> Result<String, SweepError> {
    let mut buf = Vec::new();
    let encoder = PngEncoder::new(&mut buf);
    encoder.write_image(rgba, w as u32, h as u32, image::ExtendedColorType::Rgba8)?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&buf);
    Ok(format!("data:image/png;base64,{}", b64))
}

fn simulate(params: Params, elapsed: Option<f64>) -> Result<SimulateResponse, SweepError> {
    let (report, timings) = sweepsim::run(&params, elapsed)?;

    let layers = vec![
        Layer {
            name: "path".into(),
            data_url: encode_png(&report.path_rgba, report.w, report.h)?,
        },
        Layer {
            name: "crossings".into(),
            data_url: encode_png(&report.crossings_rgba, report.w, report.h)?,
        },
    ];

    let timing_entries = timings
        .iter()
        .map(|t| TimingEntry {
            name: t.name.to_string(),
            ms: t.ms,
        })
        .collect();

    Ok(SimulateResponse {
        layers,
        timings: timing_entries,
        frame: report.frame,
        width: report.w,
        height: report.h,
    })
}

async fn simulate_handler(
    Json(req): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, ApiError> {
    let defaults = Params::default();
    let params = Params {
        width_m: req.width_m.unwrap_or(defaults.width_m),
        height_m: req.height_m.unwrap_or(defaults.height_m),
        tool_width_m: req.tool_width_m.unwrap_or(defaults.tool_width_m),
        speed_m_s: req.speed_m_s.unwrap_or(defaults.speed_m_s),
        simulated_seconds: req
            .hours
            .map(|h| h * 3600.0)
            .unwrap_or(defaults.simulated_seconds),
        realtime_budget_s: req.realtime_seconds.unwrap_or(defaults.realtime_budget_s),
        ..defaults
    };
    let elapsed = req.elapsed_seconds;

    let result = tokio::task::spawn_blocking(move || simulate(params, elapsed))
        .await
        .map_err(|e| {
            error!("simulation task failed: {e}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
        })?;

    match result {
        Ok(response) => Ok(Json(response)),
        Err(SweepError::Config(e)) => {
            warn!("rejected simulation request: {e}");
            Err(api_error(StatusCode::BAD_REQUEST, e))
        }
        Err(e) => {
            error!("simulation failed: {e}");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

async fn defaults_handler() -> Json<Params> {
    Json(Params::default())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sweepsim=info,server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = Router::new()
        .route("/api/simulate", post(simulate_handler))
        .route("/api/defaults", get(defaults_handler))
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("sweepsim server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
