//! Analysis pipeline: rolling memory, snapshot processing, bias, trap
//! detection, and the loop that drives them.

pub mod bias;
pub mod memory;
pub mod processor;
pub mod report;
pub mod runner;
pub mod trap;

pub use processor::ProcessedResult;
pub use report::{InstrumentSummary, Report};
pub use runner::{Engine, EngineController};
