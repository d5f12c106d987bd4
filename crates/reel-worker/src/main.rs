//! Highlight reel worker binary.
//!
//! Reads a compilation request (JSON file argument or stdin), compiles one
//! reel for `REEL_OWNER_ID` and prints the result as JSON.

use std::io::Read;
use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_media::FfmpegEngine;
use reel_models::CompilationRequest;
use reel_storage::R2Client;
use reel_worker::{metrics, CompilationError, Compiler, GeminiRecommender, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing();

    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        match addr.parse::<SocketAddr>() {
            Ok(addr) => match metrics::install_exporter(addr) {
                Ok(()) => info!("Prometheus exporter listening on {}", addr),
                Err(e) => warn!("Failed to install Prometheus exporter: {}", e),
            },
            Err(e) => warn!("Ignoring invalid METRICS_ADDR {}: {}", addr, e),
        }
    }

    let code = match run().await {
        Ok(reference) => {
            println!("{}", json!({ "outputReference": reference }));
            0
        }
        Err(e) => {
            error!("Compilation failed: {}", e);
            println!("{}", json!({ "error": e }));
            1
        }
    };
    std::process::exit(code);
}

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reel=info,reel_worker=info,reel_media=info,reel_storage=info"));

    // Logs go to stderr so stdout carries only the result document.
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true),
            )
            .with(env_filter)
            .init();
    }
}

async fn run() -> Result<String, CompilationError> {
    let request = read_request().map_err(CompilationError::validation)?;
    request.validate().map_err(CompilationError::validation)?;

    let owner_id = std::env::var("REEL_OWNER_ID")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CompilationError::validation("REEL_OWNER_ID not set"))?;
    let job = request.into_job(owner_id);

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let store = R2Client::from_env()
        .map_err(|e| CompilationError::validation(format!("storage not configured: {}", e)))?;
    let recommender = GeminiRecommender::from_env()
        .map_err(|e| CompilationError::validation(format!("recommender not configured: {}", e)))?;
    let engine = FfmpegEngine::new(config.ffmpeg_timeout.as_secs());

    let compiler = Compiler::new(config, Arc::new(engine), Arc::new(store), Arc::new(recommender))
        .map_err(|e| CompilationError::validation(e.to_string()))?;

    let artifact = compiler.compile(&job).await?;
    Ok(artifact.public_reference)
}

fn read_request() -> Result<CompilationRequest, String> {
    let raw = match std::env::args().nth(1) {
        Some(path) if path != "-" => {
            std::fs::read_to_string(&path).map_err(|e| format!("failed to read {}: {}", path, e))?
        }
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {}", e))?;
            buf
        }
    };
    serde_json::from_str(&raw).map_err(|e| format!("invalid request: {}", e))
}
