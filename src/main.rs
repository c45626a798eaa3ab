//! AYAW: Are You Actually Winning?
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the configured bet store and serves the dashboard until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

use ayaw::config::{self, AppConfig};
use ayaw::dashboard::{self, AppContext};
use ayaw::storage;

const BANNER: &str = r#"
    _ __   __ _ __        __
   / \\ \ / // \\ \      / /
  / _ \\ V // _ \\ \ /\ / /
 / ___ \| |/ ___ \\ V  V /
/_/   \_\_/_/   \_\\_/\_/

  Are You Actually Winning?
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path =
        std::env::var("AYAW_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_FILE.to_string());
    let cfg = AppConfig::load_or_default(&config_path)?;

    println!("{BANNER}");
    info!(
        config = %config_path,
        backend = ?cfg.storage.backend,
        addr = %cfg.bind_addr(),
        "AYAW starting up"
    );

    let store = storage::open_store(&cfg.storage).await?;
    match store.list_all().await {
        Ok(bets) => info!(count = bets.len(), "Bet history loaded"),
        Err(e) => error!(error = %e, "Failed to read bet history"),
    }

    let state = Arc::new(AppContext::new(store));
    dashboard::serve(state, &cfg.bind_addr(), shutdown_signal()).await?;

    info!("AYAW shut down cleanly.");
    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received.");
}

/// Initialise the `tracing` subscriber.
///
/// `RUST_LOG` overrides the default `ayaw=info`; `AYAW_LOG_JSON` switches
/// to JSON lines.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ayaw=info"));

    let json_logging = std::env::var("AYAW_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
