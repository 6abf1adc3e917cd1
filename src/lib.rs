pub mod api; // Queue backend HTTP API
pub mod cli;
pub mod config;
pub mod dashboard; // Nurse queue dashboard
pub mod db;
pub mod gate; // Nurse view access gate
pub mod kiosk; // Patient intake view
pub mod media; // Camera / stream viewer
pub mod models;
pub mod store; // Queue repository (local SQLite blob or HTTP backend)
pub mod text;
pub mod triage; // Classifier, intake validation, summary text
pub mod views; // View router + queue poller

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    let mut app_config = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    cli.apply_overrides(&mut app_config);

    tracing::debug!("{} v{} starting", config::APP_NAME, config::APP_VERSION);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::execute(cli, app_config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
