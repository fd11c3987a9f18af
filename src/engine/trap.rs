//! # engine::trap
//!
//! **SL Hunt / Trap Detector**: five gates before a signal is emitted.
//!
//! ## Idea
//!
//! Price keeps returning to a round number (a psychological level) without
//! breaking it, while option writers pile OI onto the side that loses if the
//! level holds.  Stops clustered around the level get hunted, then price
//! reverses against the crowded side.
//!
//! ## Gates
//!
//! ```text
//! snapshot
//!     │
//!     ├─ [1] PCR bias        → own-index PCR must be bullish or bearish
//!     │
//!     ├─ [2] Proximity       → spot within 0.6 · step of the nearest psy level
//!     │
//!     ├─ [3] Acceptance      → spot within 1 step of the level for ≥ 300 s
//!     │
//!     ├─ [4] Attempts        → ≥ 2 tests of the level in this 5-minute bucket
//!     │
//!     └─ [5] OI confirmation
//!            BEARISH: ΔCE > 10 000 and ΔPE < 0  → BUY_PUT  ("CE TRAP")
//!            BULLISH: ΔPE > 10 000 and ΔCE < 0  → BUY_CALL ("PE TRAP")
//! ```
//!
//! The first gate that fails yields `WAIT` with its reason and zero
//! confidence.  Gates 3 and 4 update [`PsyMemory`], so the order matters.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{MIN_ATTEMPTS, MIN_OI_DELTA, PSY_PROXIMITY};
use crate::engine::memory::PsyMemory;
use crate::engine::processor::ProcessedResult;
use crate::models::{Action, Bias, Signal};

/// Offsets within a thousand that traders treat as round numbers.
pub const PSY_PATTERNS: [i64; 6] = [0, 200, 400, 500, 600, 800];

/// Nearest psychological level to `price`, looking at the thousand block
/// containing `price` and the next one up.  Ties go to the lower level.
pub fn nearest_psy_level(price: f64) -> i64 {
    let base = (price / 1000.0).floor() as i64 * 1000;

    PSY_PATTERNS
        .iter()
        .map(|p| base + p)
        .chain(PSY_PATTERNS.iter().map(|p| base + 1000 + p))
        .min_by(|a, b| {
            let da = (price - *a as f64).abs();
            let db = (price - *b as f64).abs();
            da.total_cmp(&db)
        })
        .unwrap_or(base)
}

/// Run the gates for one instrument.
pub fn detect_trap(
    result: &ProcessedResult,
    step:   i64,
    psy:    &mut PsyMemory,
    now:    DateTime<Utc>,
) -> Signal {
    let price = result.spot;

    // ── [1] PCR Bias ──────────────────────────────────────────────────────────
    let bias = match result.bias() {
        Some(b) => b,
        None => {
            debug!(instrument = %result.instrument, pcr = result.pcr, "❌ Trap WAIT: PCR neutral");
            return Signal::wait("PCR neutral");
        }
    };

    // ── [2] Proximity ─────────────────────────────────────────────────────────
    let level = nearest_psy_level(price);
    let distance = (price - level as f64).abs();
    if distance > step as f64 * PSY_PROXIMITY {
        debug!(price, level, distance, "❌ Trap WAIT: away from psy level");
        return Signal::wait("Away from psy");
    }

    // ── [3] Acceptance ────────────────────────────────────────────────────────
    if !psy.check_acceptance(level, price, step, now) {
        debug!(level, since = ?psy.accepted_since(level), "❌ Trap WAIT: level not yet accepted");
        return Signal::wait("Accepting psy");
    }

    // ── [4] Attempts ──────────────────────────────────────────────────────────
    let attempts = psy.record_attempt(level, now);
    if attempts < MIN_ATTEMPTS {
        debug!(level, attempts, "❌ Trap WAIT: first attempt in bucket");
        return Signal::wait("First attempt");
    }

    // ── [5] OI Confirmation ───────────────────────────────────────────────────
    let (ce, pe) = (result.call_delta, result.put_delta);
    let signal = match bias {
        Bias::Bearish if ce > MIN_OI_DELTA && pe < 0 => {
            Signal::trade(Action::BuyPut, format!("CE TRAP @ {level}"))
        }
        Bias::Bullish if pe > MIN_OI_DELTA && ce < 0 => {
            Signal::trade(Action::BuyCall, format!("PE TRAP @ {level}"))
        }
        _ => Signal::wait("No confirmation"),
    };

    debug!(
        instrument = %result.instrument,
        level, attempts, ce_delta = ce, pe_delta = pe,
        action = %signal.action,
        "Trap gates evaluated"
    );
    signal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::AcquisitionMode;
    use chrono::{Duration, TimeZone};

    const STEP: i64 = 100;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 20, 5, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(secs)
    }

    fn result(spot: f64, pcr: f64, call_delta: i64, put_delta: i64) -> ProcessedResult {
        ProcessedResult {
            instrument: "BANKNIFTY".into(),
            spot,
            atm: 48200,
            rows: Vec::new(),
            pcr,
            call_delta,
            put_delta,
            mode: AcquisitionMode::Live,
        }
    }

    /// Drive the memory through acceptance and one attempt so the next call
    /// reaches the OI gate.
    fn primed(level_spot: f64) -> PsyMemory {
        let mut psy = PsyMemory::default();
        let warm = result(level_spot, 0.75, 0, 0);
        assert_eq!(detect_trap(&warm, STEP, &mut psy, at(0)).reason, "Accepting psy");
        assert_eq!(detect_trap(&warm, STEP, &mut psy, at(300)).reason, "First attempt");
        psy
    }

    #[test]
    fn test_nearest_psy_level() {
        assert_eq!(nearest_psy_level(48205.0), 48200);
        assert_eq!(nearest_psy_level(48460.0), 48500);
        assert_eq!(nearest_psy_level(48950.0), 49000);
        assert_eq!(nearest_psy_level(48100.0), 48000);
        assert_eq!(nearest_psy_level(24690.0), 24600);
        assert_eq!(nearest_psy_level(999.0), 1000);
    }

    #[test]
    fn test_neutral_pcr_waits() {
        let mut psy = PsyMemory::default();
        let sig = detect_trap(&result(48205.0, 1.0, 15_000, -20_000), STEP, &mut psy, at(0));
        assert_eq!(sig, Signal::wait("PCR neutral"));
    }

    #[test]
    fn test_away_from_psy_waits_and_leaves_memory_alone() {
        let mut psy = PsyMemory::default();
        // Nearest level 48200 is 61 away; 0.6 · 100 = 60.
        let sig = detect_trap(&result(48261.0, 0.75, 15_000, -20_000), STEP, &mut psy, at(0));
        assert_eq!(sig, Signal::wait("Away from psy"));
        assert_eq!(psy.accepted_since(48200), None);
    }

    #[test]
    fn test_near_psy_passes_proximity_gate() {
        let mut psy = PsyMemory::default();
        let sig = detect_trap(&result(48205.0, 0.75, 15_000, -20_000), STEP, &mut psy, at(0));
        assert_eq!(sig.reason, "Accepting psy");
    }

    #[test]
    fn test_attempts_in_separate_buckets_never_fire() {
        let mut psy = PsyMemory::default();
        let res = result(48205.0, 0.75, 15_000, -20_000);
        detect_trap(&res, STEP, &mut psy, at(0));

        // One attempt per bucket, five buckets in a row.
        for bucket in 1..=5 {
            let sig = detect_trap(&res, STEP, &mut psy, at(bucket * 300));
            assert_eq!(sig.reason, "First attempt");
        }
    }

    #[test]
    fn test_bearish_ce_trap_buys_put() {
        let mut psy = primed(48205.0);
        let sig = detect_trap(&result(48205.0, 0.75, 15_000, -20_000), STEP, &mut psy, at(360));

        assert_eq!(sig.action, Action::BuyPut);
        assert_eq!(sig.reason, "CE TRAP @ 48200");
        assert_eq!(sig.confidence, 75);
    }

    #[test]
    fn test_bullish_pe_trap_buys_call() {
        let mut psy = primed(48205.0);
        let sig = detect_trap(&result(48195.0, 1.25, -5_000, 12_000), STEP, &mut psy, at(360));

        assert_eq!(sig, Signal::trade(Action::BuyCall, "PE TRAP @ 48200"));
    }

    #[test]
    fn test_delta_threshold_is_strict() {
        let mut psy = primed(48205.0);
        let sig = detect_trap(&result(48205.0, 0.75, 10_000, -1), STEP, &mut psy, at(360));
        assert_eq!(sig, Signal::wait("No confirmation"));
    }

    #[test]
    fn test_bias_must_match_trapped_side() {
        let mut psy = primed(48205.0);
        // CE build-up with a bullish PCR is not a trap.
        let sig = detect_trap(&result(48205.0, 1.25, 15_000, -20_000), STEP, &mut psy, at(360));
        assert_eq!(sig, Signal::wait("No confirmation"));
    }
}
