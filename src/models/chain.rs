//! # models::chain
//!
//! Defines [`RawSnapshot`], the option-chain payload the NSE
//! `option-chain-indices` endpoint returns for one index at one point in time.
//!
//! Only the fields the engine consumes are modelled.  Every numeric field
//! defaults to `0` when missing so a partially populated chain still decodes;
//! unknown fields (`expiryDates`, `iv`, ...) are ignored.  The same struct is
//! written to and read back from the per-instrument cache file: the consumed
//! fields round-trip exactly, everything else is dropped on write.

use serde::{Deserialize, Serialize};

/// The full provider payload for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub records: ChainRecords,
}

/// The `records` object of the payload: the *unfiltered* strike universe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRecords {
    /// Spot price of the underlying index.
    #[serde(default)]
    pub underlying_value: f64,

    /// One entry per (strike, expiry) pair.
    #[serde(default)]
    pub data: Vec<StrikeRecord>,
}

/// A single strike row with its nested call (`CE`) and put (`PE`) legs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrikeRecord {
    /// Rows without a strike are skipped by the processor.
    #[serde(rename = "strikePrice", default, skip_serializing_if = "Option::is_none")]
    pub strike_price: Option<f64>,

    #[serde(rename = "CE", default)]
    pub call: OptionLeg,

    #[serde(rename = "PE", default)]
    pub put: OptionLeg,
}

/// One side (call or put) of a strike row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionLeg {
    #[serde(default)]
    pub open_interest: f64,

    #[serde(default)]
    pub last_price: f64,
}

impl RawSnapshot {
    /// Spot price of the underlying.
    #[inline]
    pub fn spot(&self) -> f64 {
        self.records.underlying_value
    }

    /// Total call / put open interest across the *whole* chain.
    pub fn total_open_interest(&self) -> (f64, f64) {
        self.records
            .data
            .iter()
            .fold((0.0, 0.0), |(ce, pe), r| {
                (ce + r.call.open_interest, pe + r.put.open_interest)
            })
    }
}

impl StrikeRecord {
    /// Strike as an integer key.  Index strikes are whole numbers; the
    /// `f64` in the payload is only a JSON artefact.
    #[inline]
    pub fn strike(&self) -> Option<i64> {
        self.strike_price.map(|s| s.round() as i64)
    }
}
