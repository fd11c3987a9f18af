//! # models::signal
//!
//! Directional [`Bias`] derived from the put/call ratio, and the advisory
//! [`Signal`] the trap detector emits every cycle.  Nothing here is ever
//! sent to a broker; the engine only reports.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Bias ─────────────────────────────────────────────────────────────────────

/// Market direction inferred from PCR.  "Neutral" is modelled as
/// `Option::<Bias>::None` at the call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Bias {
    Bullish,
    Bearish,
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bias::Bullish => write!(f, "BULLISH"),
            Bias::Bearish => write!(f, "BEARISH"),
        }
    }
}

// ─── Action ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Wait,
    BuyCall,
    BuyPut,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Wait => write!(f, "WAIT"),
            Action::BuyCall => write!(f, "BUY_CALL"),
            Action::BuyPut => write!(f, "BUY_PUT"),
        }
    }
}

// ─── Signal ───────────────────────────────────────────────────────────────────

/// Confidence attached to a confirmed trap.
pub const TRAP_CONFIDENCE: u8 = 75;

/// Outcome of one trap-detector evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub action: Action,
    pub reason: String,
    /// Either `0` (WAIT) or [`TRAP_CONFIDENCE`].
    pub confidence: u8,
}

impl Signal {
    pub fn wait(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Wait,
            reason: reason.into(),
            confidence: 0,
        }
    }

    pub fn trade(action: Action, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
            confidence: TRAP_CONFIDENCE,
        }
    }

    #[inline]
    pub fn is_actionable(&self) -> bool {
        self.action != Action::Wait
    }
}
