//! # state
//!
//! [`EngineState`]: the rolling memory an engine instance carries from one
//! cycle to the next, partitioned per instrument.
//!
//! ## Ownership
//!
//! The state is owned by the engine worker and moved into it on start; it is
//! handed back when the worker stops so a restart resumes with the same
//! memory.  No lock is involved because only one task ever touches it.  Two
//! engines never share state, which keeps tests independent of each other.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::ATTEMPT_RETENTION_BUCKETS;
use crate::engine::memory::{attempt_bucket, OiMemory, PsyMemory};

/// Memory for a single instrument.
#[derive(Debug, Clone, Default)]
pub struct InstrumentMemory {
    pub oi:  OiMemory,
    pub psy: PsyMemory,
}

#[derive(Debug, Clone, Default)]
pub struct EngineState {
    instruments: HashMap<String, InstrumentMemory>,
    /// Completed cycles (successful or not) since the state was created.
    pub cycles:  u64,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory for `instrument`, created empty on first use.
    pub fn memory_mut(&mut self, instrument: &str) -> &mut InstrumentMemory {
        self.instruments
            .entry(instrument.to_string())
            .or_default()
    }

    pub fn memory(&self, instrument: &str) -> Option<&InstrumentMemory> {
        self.instruments.get(instrument)
    }

    /// Drop attempt buckets that fell out of the retention window.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let min_bucket = attempt_bucket(now) - ATTEMPT_RETENTION_BUCKETS;
        for memory in self.instruments.values_mut() {
            memory.psy.prune_before(min_bucket);
        }
    }
}
