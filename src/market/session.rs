//! # market::session
//!
//! Time gates for acquisition: is the exchange session open, and was the
//! cached snapshot written on a previous trading day.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use tracing::{debug, warn};

/// Exchange session window in local time, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionGate {
    pub open:  NaiveTime,
    pub close: NaiveTime,
}

impl SessionGate {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// `true` iff `now` falls within `[open, close]`.
    #[inline]
    pub fn is_market_open(&self, now: NaiveTime) -> bool {
        self.open <= now && now <= self.close
    }
}

/// `true` iff the file at `cache_path` exists and was last written on a
/// calendar day other than `today`.  A missing or unreadable file is not stale.
pub fn is_cache_stale(cache_path: &Path, today: NaiveDate) -> bool {
    let modified = match fs::metadata(cache_path).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };

    DateTime::<Local>::from(modified).date_naive() != today
}

/// Delete yesterday's cache.  Removal is best effort: a failure is logged and
/// the (stale) file is left for the cache loader to serve.
pub fn reset_cache_if_new_day(cache_path: &Path, today: NaiveDate) {
    if !is_cache_stale(cache_path, today) {
        return;
    }

    match fs::remove_file(cache_path) {
        Ok(()) => debug!(path = %cache_path.display(), "Stale cache removed"),
        Err(e) => warn!(path = %cache_path.display(), error = %e, "Failed to remove stale cache"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn gate() -> SessionGate {
        SessionGate::new(hm(9, 15), hm(15, 30))
    }

    fn write_with_mtime(dir: &TempDir, mtime: SystemTime) -> std::path::PathBuf {
        let path = dir.path().join("cache.json");
        let file = fs::File::create(&path).unwrap();
        file.set_modified(mtime).unwrap();
        path
    }

    #[test]
    fn test_session_window_is_inclusive() {
        let g = gate();
        assert!(g.is_market_open(hm(9, 15)));
        assert!(g.is_market_open(hm(12, 0)));
        assert!(g.is_market_open(hm(15, 30)));
    }

    #[test]
    fn test_outside_session_is_closed() {
        let g = gate();
        assert!(!g.is_market_open(hm(9, 14)));
        assert!(!g.is_market_open(NaiveTime::from_hms_opt(15, 30, 1).unwrap()));
        assert!(!g.is_market_open(hm(0, 0)));
    }

    #[test]
    fn test_missing_cache_is_not_stale() {
        let dir = TempDir::new().unwrap();
        let today = Local::now().date_naive();
        assert!(!is_cache_stale(&dir.path().join("nope.json"), today));
    }

    #[test]
    fn test_cache_written_today_is_fresh() {
        let dir = TempDir::new().unwrap();
        let path = write_with_mtime(&dir, SystemTime::now());
        let today = Local::now().date_naive();
        assert!(!is_cache_stale(&path, today));
    }

    #[test]
    fn test_cache_from_previous_day_is_stale_and_removed() {
        let dir = TempDir::new().unwrap();
        let two_days_ago = SystemTime::now() - Duration::from_secs(2 * 24 * 3600);
        let path = write_with_mtime(&dir, two_days_ago);
        let today = Local::now().date_naive();

        assert!(is_cache_stale(&path, today));
        reset_cache_if_new_day(&path, today);
        assert!(!path.exists());
    }
}
