//! # config — Engine configuration from environment variables
//!
//! Tunables that an operator may reasonably change (refresh cadence, timeouts,
//! provider URL, cache location, session window) come from the environment.
//! The decision thresholds are constants: changing them changes the strategy.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::NaiveTime;

// ─── Strategy Constants ───────────────────────────────────────────────────────

/// PCR above this is bullish.
pub const PCR_UPPER: f64 = 1.10;
/// PCR below this is bearish.
pub const PCR_LOWER: f64 = 0.90;
/// Minimum OI build-up on the trapped side before a trap is confirmed.
pub const MIN_OI_DELTA: i64 = 10_000;
/// Price must dwell near a psychological level this long to count as accepted.
pub const ACCEPTANCE_SECS: i64 = 300;
/// Width of an attempt-counting bucket.
pub const ATTEMPT_BUCKET_SECS: i64 = 300;
/// Attempts within one bucket needed before a trap can fire.
pub const MIN_ATTEMPTS: u32 = 2;
/// Max distance to the psychological level, as a fraction of the strike step.
pub const PSY_PROXIMITY: f64 = 0.6;
/// Attempt buckets older than this are dropped (24 h of 5-minute buckets).
pub const ATTEMPT_RETENTION_BUCKETS: i64 = 288;

// ─── Instrument ───────────────────────────────────────────────────────────────

/// Immutable descriptor of one tracked index.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentConfig {
    /// Symbol as understood by the provider, e.g. `"BANKNIFTY"`.
    pub name:       String,
    /// Strike spacing.
    pub step:       i64,
    /// Half-width of the strike ladder, in steps.
    pub range:      i64,
    /// Where the last good snapshot is kept.
    pub cache_path: PathBuf,
}

impl InstrumentConfig {
    pub fn new(name: &str, step: i64, range: i64, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            step,
            range,
            cache_path: cache_path.into(),
        }
    }

    pub fn nifty(cache_dir: &Path) -> Self {
        Self::new("NIFTY", 50, 5, cache_dir.join("nifty_cache.json"))
    }

    pub fn banknifty(cache_dir: &Path) -> Self {
        Self::new("BANKNIFTY", 100, 5, cache_dir.join("banknifty_cache.json"))
    }
}

// ─── Engine Config ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sleep between cycles.
    pub refresh_interval: Duration,
    /// Per-request timeout for the live fetch.
    pub fetch_timeout:    Duration,
    /// NSE site root; the API path is appended by the client.
    pub nse_base_url:     String,
    /// Session window (local time, both ends inclusive).
    pub market_open:      NaiveTime,
    pub market_close:     NaiveTime,
    /// Index used for the market-wide bias only.
    pub primary:          InstrumentConfig,
    /// Index the trap detector runs on.
    pub secondary:        InstrumentConfig,
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let refresh_secs: u64 = std::env::var("REFRESH_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("REFRESH_SECS must be a number")?;

        let timeout_secs: u64 = std::env::var("FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("FETCH_TIMEOUT_SECS must be a number")?;

        if refresh_secs == 0 {
            bail!("REFRESH_SECS must be greater than zero");
        }

        let market_open  = parse_time("MARKET_OPEN", "09:15")?;
        let market_close = parse_time("MARKET_CLOSE", "15:30")?;
        if market_close < market_open {
            bail!("MARKET_CLOSE ({market_close}) is before MARKET_OPEN ({market_open})");
        }

        let cache_dir = PathBuf::from(std::env::var("CACHE_DIR").unwrap_or_else(|_| ".".to_string()));

        Ok(Self {
            refresh_interval: Duration::from_secs(refresh_secs),
            fetch_timeout:    Duration::from_secs(timeout_secs),
            nse_base_url:     std::env::var("NSE_BASE_URL")
                .unwrap_or_else(|_| "https://www.nseindia.com".to_string()),
            market_open,
            market_close,
            primary:          InstrumentConfig::nifty(&cache_dir),
            secondary:        InstrumentConfig::banknifty(&cache_dir),
        })
    }

    /// Defaults with every cache file under `cache_dir`.  Used by tests and
    /// by embedders that do not read the environment.
    pub fn with_cache_dir(cache_dir: &Path) -> Self {
        Self {
            refresh_interval: Duration::from_secs(60),
            fetch_timeout:    Duration::from_secs(10),
            nse_base_url:     "https://www.nseindia.com".to_string(),
            market_open:      NaiveTime::from_hms_opt(9, 15, 0).unwrap_or_default(),
            market_close:     NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default(),
            primary:          InstrumentConfig::nifty(cache_dir),
            secondary:        InstrumentConfig::banknifty(cache_dir),
        }
    }
}

fn parse_time(key: &str, default: &str) -> anyhow::Result<NaiveTime> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .with_context(|| format!("{key} must be HH:MM, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_defaults() {
        let dir = Path::new("/tmp/slhunt");
        let nifty = InstrumentConfig::nifty(dir);
        let bank = InstrumentConfig::banknifty(dir);

        assert_eq!((nifty.step, nifty.range), (50, 5));
        assert_eq!((bank.step, bank.range), (100, 5));
        assert_eq!(bank.cache_path, dir.join("banknifty_cache.json"));
    }

    #[test]
    fn test_default_session_window() {
        let cfg = EngineConfig::with_cache_dir(Path::new("."));
        assert_eq!(cfg.market_open, NaiveTime::from_hms_opt(9, 15, 0).unwrap());
        assert_eq!(cfg.market_close, NaiveTime::from_hms_opt(15, 30, 0).unwrap());
        assert_eq!(cfg.refresh_interval, Duration::from_secs(60));
    }
}
