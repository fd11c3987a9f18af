//! # market::acquisition — Live-first, cache-fallback snapshot policy
//!
//! ```text
//! stale cache? ──yes──▶ delete it
//!     │
//! session open? ──yes──▶ live fetch ──ok──▶ save cache ──▶ (snapshot, LIVE)
//!     │                      │
//!     │◀────── failure ──────┘ (logged)
//!     ▼
//! cache present? ──yes──▶ (snapshot, CACHED)
//!     │
//!     └──────────────────▶ (none, NO_DATA)
//! ```
//!
//! Acquisition never fails: every error is logged and downgrades the mode.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::InstrumentConfig;
use crate::error::FetchError;
use crate::events::EventSink;
use crate::market::cache::SnapshotCache;
use crate::market::provider::ChainProvider;
use crate::market::session::{reset_cache_if_new_day, SessionGate};
use crate::models::RawSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcquisitionMode {
    Live,
    Cached,
    NoData,
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionMode::Live => write!(f, "LIVE"),
            AcquisitionMode::Cached => write!(f, "CACHED"),
            AcquisitionMode::NoData => write!(f, "NO_DATA"),
        }
    }
}

/// Result of one acquisition.  `snapshot` is `None` iff `mode` is `NoData`.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquired {
    pub snapshot: Option<RawSnapshot>,
    pub mode:     AcquisitionMode,
}

impl Acquired {
    fn no_data() -> Self {
        Self { snapshot: None, mode: AcquisitionMode::NoData }
    }
}

pub struct AcquisitionPolicy {
    provider:     Arc<dyn ChainProvider>,
    session:      SessionGate,
    /// Overall budget for one live fetch, enforced on top of whatever the
    /// provider does internally.
    live_timeout: Duration,
}

impl AcquisitionPolicy {
    pub fn new(provider: Arc<dyn ChainProvider>, session: SessionGate, live_timeout: Duration) -> Self {
        Self { provider, session, live_timeout }
    }

    pub async fn acquire(
        &self,
        instrument: &InstrumentConfig,
        now:        NaiveDateTime,
        events:     &EventSink,
    ) -> Acquired {
        let cache = SnapshotCache::new(&instrument.cache_path);
        reset_cache_if_new_day(cache.path(), now.date());

        // ── 1. Live ──────────────────────────────────────────────────────────
        if self.session.is_market_open(now.time()) {
            match self.fetch_live(&instrument.name).await {
                Ok(snapshot) => {
                    if let Err(e) = cache.save(&snapshot) {
                        warn!(instrument = %instrument.name, error = %e, "Failed to persist snapshot");
                    }
                    info!(instrument = %instrument.name, spot = snapshot.spot(), "Live snapshot fetched");
                    return Acquired { snapshot: Some(snapshot), mode: AcquisitionMode::Live };
                }
                Err(e) => {
                    warn!(instrument = %instrument.name, error = %e, "Live fetch failed");
                    events.log(format!("Live fetch failed ({}): {e}", instrument.name));
                }
            }
        }

        // ── 2. Cache ─────────────────────────────────────────────────────────
        if cache.path().exists() {
            match cache.load() {
                Some(snapshot) => {
                    return Acquired { snapshot: Some(snapshot), mode: AcquisitionMode::Cached };
                }
                None => events.log(format!("Cache read failed ({})", instrument.name)),
            }
        }

        // ── 3. Nothing ───────────────────────────────────────────────────────
        Acquired::no_data()
    }

    async fn fetch_live(&self, symbol: &str) -> Result<RawSnapshot, FetchError> {
        tokio::time::timeout(self.live_timeout, self.provider.fetch_chain(symbol))
            .await
            .map_err(|_| FetchError::Timeout)?
    }
}
