//! Domain models shared across the engine.

pub mod chain;
pub mod signal;

pub use chain::{ChainRecords, OptionLeg, RawSnapshot, StrikeRecord};
pub use signal::{Action, Bias, Signal, TRAP_CONFIDENCE};
