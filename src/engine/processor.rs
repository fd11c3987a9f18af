//! # engine::processor
//!
//! Turns one [`RawSnapshot`] into a [`ProcessedResult`]: ATM strike, the
//! strike ladder around it, whole-chain PCR and the ATM open-interest deltas.
//!
//! ```text
//! spot ──▶ ATM = round(spot / step) · step
//!            │
//!            ├─ ladder = strikes in [ATM − range·step, ATM + range·step]   (empty → NO_DATA)
//!            ├─ PCR    = Σ put OI / Σ call OI over the *whole* chain        (2 dp, 0 if no call OI)
//!            └─ ΔOI    = OiMemory.observe(strike, …) for each ladder strike, reported at ATM
//! ```

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::config::InstrumentConfig;
use crate::engine::bias::pcr_bias;
use crate::engine::memory::OiMemory;
use crate::market::AcquisitionMode;
use crate::models::{Bias, RawSnapshot};

/// One row of the strike ladder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrikeRow {
    pub strike:   i64,
    pub call_oi:  i64,
    pub call_ltp: f64,
    pub put_oi:   i64,
    pub put_ltp:  f64,
}

/// Per-instrument, per-cycle analysis input.  Rebuilt every cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedResult {
    pub instrument: String,
    pub spot:       f64,
    pub atm:        i64,
    /// Ladder rows, ascending by strike.
    pub rows:       Vec<StrikeRow>,
    pub pcr:        f64,
    /// OI change at the ATM strike since the previous cycle.
    pub call_delta: i64,
    pub put_delta:  i64,
    pub mode:       AcquisitionMode,
}

impl ProcessedResult {
    #[inline]
    pub fn bias(&self) -> Option<Bias> {
        pcr_bias(self.pcr)
    }
}

/// Nearest multiple of `step` to `spot`; exact halves round to the even multiple.
#[inline]
pub fn atm_strike(spot: f64, step: i64) -> i64 {
    (spot / step as f64).round_ties_even() as i64 * step
}

/// `put / call` rounded to two decimals, `0` when there is no call OI.
///
/// Rounding works on the exact binary value of the quotient, so a ratio
/// stored just below a half (221 / 200 = 1.10499…) rounds down.
pub fn put_call_ratio(total_call: f64, total_put: f64) -> f64 {
    if total_call == 0.0 {
        return 0.0;
    }
    format!("{:.2}", total_put / total_call).parse().unwrap_or(0.0)
}

/// Process `snapshot` for `instrument`, updating `memory` with the ladder's
/// open interest.  Returns `None` when no strike falls inside the ladder.
pub fn process(
    instrument: &InstrumentConfig,
    snapshot:   &RawSnapshot,
    mode:       AcquisitionMode,
    memory:     &mut OiMemory,
) -> Option<ProcessedResult> {
    let spot = snapshot.spot();
    let atm = atm_strike(spot, instrument.step);
    let half_width = instrument.range * instrument.step;
    let (low, high) = ((atm - half_width) as f64, (atm + half_width) as f64);

    let mut rows: Vec<StrikeRow> = snapshot
        .records
        .data
        .iter()
        .filter_map(|r| {
            let price = r.strike_price?;
            if price < low || price > high {
                return None;
            }
            Some(StrikeRow {
                strike:   r.strike()?,
                call_oi:  r.call.open_interest as i64,
                call_ltp: r.call.last_price,
                put_oi:   r.put.open_interest as i64,
                put_ltp:  r.put.last_price,
            })
        })
        .collect();

    if rows.is_empty() {
        debug!(instrument = %instrument.name, spot, atm, "No strikes inside ladder window");
        return None;
    }

    let (total_call, total_put) = snapshot.total_open_interest();
    let pcr = put_call_ratio(total_call, total_put);

    // The chain repeats strikes once per expiry; the first row of a strike
    // (nearest expiry) is the one tracked.
    let mut seen = HashSet::new();
    let (mut call_delta, mut put_delta) = (0, 0);
    for row in rows.iter().filter(|r| seen.insert(r.strike)) {
        let delta = memory.observe(row.strike, row.call_oi, row.put_oi);
        if row.strike == atm {
            (call_delta, put_delta) = delta;
        }
    }

    rows.sort_by_key(|r| r.strike);

    debug!(
        instrument = %instrument.name,
        spot, atm, pcr, call_delta, put_delta,
        ladder = rows.len(),
        "Snapshot processed"
    );

    Some(ProcessedResult {
        instrument: instrument.name.clone(),
        spot,
        atm,
        rows,
        pcr,
        call_delta,
        put_delta,
        mode,
    })
}
