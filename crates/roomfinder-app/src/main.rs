//! Roomfinder application binary - composition root.
//!
//! 1. Load `.env`, configuration and CLI overrides
//! 2. Build the hotel provider, transcriber and history log
//! 3. Start the axum API server until Ctrl+C

mod cli;

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use roomfinder_api::{start_server, AppState};
use roomfinder_chat::{ChatOrchestrator, ChatSettings};
use roomfinder_core::config::RoomfinderConfig;
use roomfinder_history::FileHistory;
use roomfinder_provider::{DisabledTranscriber, HttpTranscriber, RapidApiProvider, Transcriber};

use crate::cli::CliArgs;

fn build_transcriber(config: &RoomfinderConfig) -> Arc<dyn Transcriber> {
    if !config.voice.enabled {
        tracing::info!("Voice messages disabled");
        return Arc::new(DisabledTranscriber);
    }
    match HttpTranscriber::new(&config.voice, config.provider.timeout_secs) {
        Ok(transcriber) => {
            tracing::info!(endpoint = %config.voice.endpoint, "Voice transcription enabled");
            Arc::new(transcriber)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Voice transcription unavailable");
            Arc::new(DisabledTranscriber)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = RoomfinderConfig::load_or_default(&config_file);
    config.apply_env();

    // Tracing.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Roomfinder v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // History.
    let data_dir = args.resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let history_dir = data_dir.join(&config.history.dir);
    let history = Arc::new(FileHistory::new(&history_dir));
    tracing::info!(path = %history_dir.display(), "History log ready");

    // Provider.
    let provider = match RapidApiProvider::new(&config.provider, config.search.adults) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            tracing::error!(error = %e, "Hotel provider unavailable; set ROOMFINDER_API_KEY");
            return Err(e.into());
        }
    };
    tracing::info!(base_url = %config.provider.base_url, "Hotel provider ready");

    let transcriber = build_transcriber(&config);

    let orchestrator = ChatOrchestrator::new(
        provider,
        history,
        transcriber,
        ChatSettings::from(&config),
    );
    let state = AppState::new(orchestrator);

    // Shutdown on Ctrl+C.
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("Shutdown requested");
        signal.cancel();
    });

    let port = args.resolve_port(config.general.port);
    start_server(port, state, shutdown).await?;

    Ok(())
}
