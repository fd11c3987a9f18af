//! # engine::memory
//!
//! The two rolling stores the engine keeps between cycles, one pair per
//! instrument:
//!
//! * [`OiMemory`]: last observed open interest per strike and side, so each
//!   cycle can report how much OI was added or removed at a strike.
//! * [`PsyMemory`]: per psychological level, how often price has tested it
//!   in the current 5-minute bucket and since when price has been sitting on it.
//!
//! Both are plain owned data.  The engine worker is the only writer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::{ACCEPTANCE_SECS, ATTEMPT_BUCKET_SECS};

// ─── Open Interest ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OiMemory {
    call: HashMap<i64, i64>,
    put:  HashMap<i64, i64>,
}

impl OiMemory {
    /// Record the current OI at `strike` and return `(call_delta, put_delta)`
    /// against the previous observation of the same strike.
    ///
    /// The first observation of a strike has a delta of zero.
    pub fn observe(&mut self, strike: i64, call_oi: i64, put_oi: i64) -> (i64, i64) {
        let prev_call = self.call.insert(strike, call_oi).unwrap_or(call_oi);
        let prev_put  = self.put.insert(strike, put_oi).unwrap_or(put_oi);
        (call_oi - prev_call, put_oi - prev_put)
    }

    /// Last recorded `(call, put)` OI at `strike`, if any.
    pub fn last(&self, strike: i64) -> Option<(i64, i64)> {
        Some((*self.call.get(&strike)?, *self.put.get(&strike)?))
    }
}

// ─── Psychological Levels ─────────────────────────────────────────────────────

/// 5-minute bucket index of `now`.
#[inline]
pub fn attempt_bucket(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(ATTEMPT_BUCKET_SECS)
}

#[derive(Debug, Clone, Default)]
pub struct PsyMemory {
    /// `(level, bucket)` → attempts seen in that bucket.
    attempts:   HashMap<(i64, i64), u32>,
    /// `level` → when price was first seen within one step of it.
    acceptance: HashMap<i64, DateTime<Utc>>,
}

impl PsyMemory {
    /// Has price been within `step` of `level` continuously for at least
    /// [`ACCEPTANCE_SECS`]?
    ///
    /// The timer starts on the first call that finds price near the level and
    /// is discarded as soon as price is more than one step away.
    pub fn check_acceptance(&mut self, level: i64, price: f64, step: i64, now: DateTime<Utc>) -> bool {
        if (price - level as f64).abs() > step as f64 {
            self.acceptance.remove(&level);
            return false;
        }

        match self.acceptance.get(&level) {
            None => {
                self.acceptance.insert(level, now);
                false
            }
            Some(since) => (now - *since).num_seconds() >= ACCEPTANCE_SECS,
        }
    }

    /// Count one more test of `level` in the bucket containing `now` and
    /// return the bucket's running total.
    pub fn record_attempt(&mut self, level: i64, now: DateTime<Utc>) -> u32 {
        let count = self.attempts.entry((level, attempt_bucket(now))).or_insert(0);
        *count += 1;
        *count
    }

    /// Drop every attempt bucket older than `min_bucket`.
    pub fn prune_before(&mut self, min_bucket: i64) {
        self.attempts.retain(|(_, bucket), _| *bucket >= min_bucket);
    }

    pub fn attempt_buckets(&self) -> usize {
        self.attempts.len()
    }

    pub fn accepted_since(&self, level: i64) -> Option<DateTime<Utc>> {
        self.acceptance.get(&level).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        // Aligned to a 5-minute boundary.
        Utc.with_ymd_and_hms(2024, 11, 20, 5, 0, 0).unwrap()
    }

    fn secs(s: i64) -> Duration {
        Duration::seconds(s)
    }

    // ── OI ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_first_observation_has_zero_delta() {
        let mut mem = OiMemory::default();
        assert_eq!(mem.observe(48200, 9_999_999, 123), (0, 0));
        assert_eq!(mem.last(48200), Some((9_999_999, 123)));
    }

    #[test]
    fn test_delta_against_previous_observation() {
        let mut mem = OiMemory::default();
        mem.observe(48200, 100_000, 80_000);
        assert_eq!(mem.observe(48200, 115_000, 60_000), (15_000, -20_000));
        assert_eq!(mem.observe(48200, 115_000, 60_000), (0, 0));
    }

    #[test]
    fn test_delta_never_crosses_strikes() {
        let mut mem = OiMemory::default();
        mem.observe(48200, 100_000, 80_000);
        // A different strike is a first observation, whatever 48200 holds.
        assert_eq!(mem.observe(48300, 500, 400), (0, 0));
        assert_eq!(mem.observe(48200, 100_500, 80_000), (500, 0));
    }

    // ── Acceptance ───────────────────────────────────────────────────────────

    #[test]
    fn test_acceptance_needs_300_seconds() {
        let mut mem = PsyMemory::default();
        assert!(!mem.check_acceptance(48200, 48205.0, 100, t0()));
        assert!(!mem.check_acceptance(48200, 48250.0, 100, t0() + secs(120)));
        assert!(!mem.check_acceptance(48200, 48180.0, 100, t0() + secs(299)));
        assert!(mem.check_acceptance(48200, 48199.0, 100, t0() + secs(300)));
        assert!(mem.check_acceptance(48200, 48300.0, 100, t0() + secs(900)));
    }

    #[test]
    fn test_excursion_restarts_timer_from_reentry() {
        let mut mem = PsyMemory::default();
        mem.check_acceptance(48200, 48205.0, 100, t0());
        assert!(mem.check_acceptance(48200, 48205.0, 100, t0() + secs(300)));

        // More than one step away: timer discarded.
        assert!(!mem.check_acceptance(48200, 48301.0, 100, t0() + secs(310)));
        assert_eq!(mem.accepted_since(48200), None);

        // Re-entry starts a fresh timer.
        assert!(!mem.check_acceptance(48200, 48210.0, 100, t0() + secs(400)));
        assert!(!mem.check_acceptance(48200, 48210.0, 100, t0() + secs(650)));
        assert!(mem.check_acceptance(48200, 48210.0, 100, t0() + secs(700)));
    }

    #[test]
    fn test_timer_starts_only_once() {
        let mut mem = PsyMemory::default();
        mem.check_acceptance(48200, 48205.0, 100, t0());
        mem.check_acceptance(48200, 48205.0, 100, t0() + secs(60));
        assert_eq!(mem.accepted_since(48200), Some(t0()));
    }

    // ── Attempts ─────────────────────────────────────────────────────────────

    #[test]
    fn test_attempts_count_within_bucket() {
        let mut mem = PsyMemory::default();
        assert_eq!(mem.record_attempt(48200, t0()), 1);
        assert_eq!(mem.record_attempt(48200, t0() + secs(60)), 2);
        assert_eq!(mem.record_attempt(48200, t0() + secs(299)), 3);
    }

    #[test]
    fn test_attempts_in_different_buckets_do_not_combine() {
        let mut mem = PsyMemory::default();
        assert_eq!(mem.record_attempt(48200, t0() + secs(299)), 1);
        assert_eq!(mem.record_attempt(48200, t0() + secs(300)), 1);
        assert_eq!(mem.attempt_buckets(), 2);
    }

    #[test]
    fn test_attempts_are_per_level() {
        let mut mem = PsyMemory::default();
        mem.record_attempt(48200, t0());
        assert_eq!(mem.record_attempt(48400, t0()), 1);
    }

    #[test]
    fn test_prune_drops_old_buckets_only() {
        let mut mem = PsyMemory::default();
        mem.record_attempt(48200, t0());
        mem.record_attempt(48200, t0() + secs(600));

        mem.prune_before(attempt_bucket(t0() + secs(600)));

        assert_eq!(mem.attempt_buckets(), 1);
        assert_eq!(mem.record_attempt(48200, t0() + secs(600)), 2);
    }
}
