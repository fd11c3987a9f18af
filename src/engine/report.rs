//! # engine::report
//!
//! The per-cycle report delivered to the consumer, and its text rendering.

use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

use crate::engine::processor::ProcessedResult;
use crate::market::AcquisitionMode;
use crate::models::{Bias, Signal};

pub const REPORT_TITLE: &str = "SL HUNT ENGINE";

/// One line of the DATA section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentSummary {
    pub name:       String,
    pub mode:       AcquisitionMode,
    /// `None` when the instrument produced no processed result.
    pub spot:       Option<f64>,
    pub atm:        Option<i64>,
    pub pcr:        Option<f64>,
    pub call_delta: i64,
    pub put_delta:  i64,
}

impl InstrumentSummary {
    pub fn from_result(name: &str, mode: AcquisitionMode, result: Option<&ProcessedResult>) -> Self {
        match result {
            Some(r) => Self {
                name:       name.to_string(),
                mode:       r.mode,
                spot:       Some(r.spot),
                atm:        Some(r.atm),
                pcr:        Some(r.pcr),
                call_delta: r.call_delta,
                put_delta:  r.put_delta,
            },
            None => Self {
                name:       name.to_string(),
                mode,
                spot:       None,
                atm:        None,
                pcr:        None,
                call_delta: 0,
                put_delta:  0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub cycle_id:          Uuid,
    pub generated_at:      DateTime<Local>,
    pub instruments:       Vec<InstrumentSummary>,
    pub bias:              Option<Bias>,
    pub bias_reason:       String,
    pub signal:            Signal,
    pub next_refresh_secs: u64,
}

impl fmt::Display for InstrumentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10} : {:<7}", self.name, self.mode.to_string())?;
        if let (Some(spot), Some(atm), Some(pcr)) = (self.spot, self.atm, self.pcr) {
            write!(
                f,
                " SPOT {spot:.2} | ATM {atm} | PCR {pcr:.2} | ΔCE {:+} | ΔPE {:+}",
                self.call_delta, self.put_delta
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{REPORT_TITLE}")?;
        writeln!(f, "TIME: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"))?;

        writeln!(f)?;
        writeln!(f, "DATA")?;
        for inst in &self.instruments {
            writeln!(f, "{inst}")?;
        }

        writeln!(f)?;
        writeln!(f, "MARKET BIAS")?;
        match self.bias {
            Some(b) => writeln!(f, "STATUS : {b}")?,
            None => writeln!(f, "STATUS : NEUTRAL")?,
        }
        writeln!(f, "REASON : {}", self.bias_reason)?;

        writeln!(f)?;
        writeln!(f, "FINAL SIGNAL")?;
        writeln!(f, "ACTION     : {}", self.signal.action)?;
        writeln!(f, "REASON     : {}", self.signal.reason)?;
        writeln!(f, "CONFIDENCE : {}", self.signal.confidence)?;

        writeln!(f)?;
        write!(f, "Next refresh in {} sec…", self.next_refresh_secs)
    }
}
