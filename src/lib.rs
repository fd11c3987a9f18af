//! # slhunt
//!
//! Option-chain engine for NIFTY / BANKNIFTY.  Every cycle it pulls both
//! chains (live in session, cached otherwise), derives a market bias from
//! the two put/call ratios and runs the SL-hunt trap detector on BANKNIFTY.
//!
//! ```text
//!   NSE API ──▶ AcquisitionPolicy ──▶ process() ──▶ combined_bias()
//!                  │        ▲                            │
//!                  ▼        │                            ▼
//!              cache file ──┘                      detect_trap() ──▶ Report ──▶ EventSink
//! ```
//!
//! Embedders drive it through [`EngineController`] and read
//! [`EngineEvent`]s from the receiving end of an [`EventSink`].

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod market;
pub mod models;
pub mod state;

pub use config::{EngineConfig, InstrumentConfig};
pub use engine::{Engine, EngineController, Report};
pub use error::{CacheError, FetchError};
pub use events::{EngineEvent, EventSink};
pub use market::{ChainProvider, NseClient};
