mod app;
mod screens;

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};

use tracing::warn;
use tracing_subscriber::{prelude::*, EnvFilter};
use ussd_core::{
    config::{self, AppConfig},
    StoreRetryMiddleware, TracingMiddleware, UssdApp,
};

const DEFAULT_MSISDN: &str = "254700000000";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "Configuration unreadable, using defaults");
            AppConfig {
                initial_screen: screens::INITIAL_SCREEN.to_string(),
                ..AppConfig::default()
            }
        }
    };

    let registry = screens::registry()?;
    let app = UssdApp::builder(config, registry)
        .middleware(StoreRetryMiddleware::default())
        .middleware(TracingMiddleware)
        .build()
        .context("failed to assemble the menu application")?;

    let msisdn = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_MSISDN.to_string());
    let mut sim = app::SimApp::new(app, msisdn);
    sim.run().await
}

/// Logs go to a file only; the terminal belongs to the simulator.
fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("ussd-sim.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
