//! Duel Platformer runner - steps a campaign from a recorded input transcript
//!
//! This is the main entry point for the headless runner. It handles:
//! - Loading levels and the optional transcript from disk
//! - Fixed-step simulation, optionally paced to the wall clock
//! - Graceful shutdown on Ctrl+C / SIGTERM
//! - Printing the final snapshot as JSON

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duel_platformer::app::{load_levels, load_transcript, Runner};
use duel_platformer::config::Config;
use duel_platformer::game::Campaign;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Duel Platformer runner");
    info!("Levels directory: {}", config.levels_dir.display());

    let settings = config.match_settings();
    let levels = load_levels(&config.levels_dir, settings.level_count).await?;
    let transcript = match &config.transcript_path {
        Some(path) => Some(load_transcript(path).await?),
        None => None,
    };

    let campaign = Campaign::new(levels, settings)?;
    let runner = Runner::new(campaign, transcript, config.realtime, config.max_ticks);
    let summary = runner.run(shutdown_signal()).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    info!("Runner shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping run");
        }
        _ = terminate => {
            info!("Received terminate signal, stopping run");
        }
    }
}
