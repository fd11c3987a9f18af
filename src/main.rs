//! # SL Hunt — console runner
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────┐   GET option-chain-indices    ┌──────────────────────┐
//!  │  NSE India   │ ◀──────────────────────────── │  EngineController    │
//!  │  (HTTP API)  │ ────────────────────────────▶ │   worker task        │
//!  └──────────────┘                               │   [Engine Loop]      │
//!                                                 └──────────────────────┘
//!  ┌──────────────┐   *_cache.json (same day)                │
//!  │  Cache dir   │ ◀───────────────────────────────────────▶│ EventSink (mpsc)
//!  └──────────────┘                                          ▼
//!                                                    stdout printer task
//! ```
//!
//! ## Environment Variables
//!
//! | Variable             | Default                    | Description                   |
//! |----------------------|----------------------------|-------------------------------|
//! | `REFRESH_SECS`       | `60`                       | Seconds between cycles        |
//! | `FETCH_TIMEOUT_SECS` | `10`                       | Live request timeout          |
//! | `NSE_BASE_URL`       | `https://www.nseindia.com` | Upstream site root            |
//! | `CACHE_DIR`          | `.`                        | Where snapshot caches live    |
//! | `MARKET_OPEN`        | `09:15`                    | Session start (local, HH:MM)  |
//! | `MARKET_CLOSE`       | `15:30`                    | Session end (local, HH:MM)    |
//! | `RUST_LOG`           | `slhunt=info`              | Tracing filter                |

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slhunt::events::write_events;
use slhunt::{EngineConfig, EngineController, EventSink, NseClient};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional) ──────────────────────────────────────────────
    dotenvy::dotenv().ok();

    // ── 2. Initialise structured logging (stderr; stdout is the report) ─────
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("slhunt=info")))
        .init();

    info!(
        r#"

  ╔═══════════════════════════════════════════════╗
  ║          SL HUNT ENGINE · NIFTY / BANKNIFTY   ║
  ║          PCR bias · OI memory · psy traps     ║
  ╚═══════════════════════════════════════════════╝"#
    );

    // ── 3. Configuration + upstream client ───────────────────────────────────
    let config = EngineConfig::from_env()?;
    info!(
        refresh  = ?config.refresh_interval,
        session  = %format!("{}-{}", config.market_open, config.market_close),
        upstream = %config.nse_base_url,
        "Configuration loaded"
    );

    let provider = NseClient::new(config.nse_base_url.clone(), config.fetch_timeout)
        .context("failed to build NSE HTTP client")?;

    // ── 4. Event printer ─────────────────────────────────────────────────────
    let (events, rx) = EventSink::channel();
    let printer = tokio::spawn(write_events(rx, std::io::stdout()));

    // ── 5. Run until Ctrl-C ──────────────────────────────────────────────────
    let mut controller = EngineController::new(config, Arc::new(provider), events);
    controller.start();

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
    info!("Shutdown requested");

    if !controller.stop(SHUTDOWN_TIMEOUT).await {
        info!(timeout = ?SHUTDOWN_TIMEOUT, "Exiting with a fetch still in flight");
    }

    // Dropping the last sinks closes the channel; the printer drains what is left.
    drop(controller);
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, printer).await {
        Ok(Ok(Err(e))) => info!(error = %e, "Event printer stopped writing"),
        Err(_) => info!("Event printer still busy, exiting anyway"),
        _ => {}
    }
    Ok(())
}
