//! # error
//!
//! Typed errors for the two fallible seams of the engine: the upstream
//! option-chain fetch and the on-disk snapshot cache.
//!
//! Neither ever escapes an engine cycle.  The acquisition policy logs them and
//! degrades to the cache or to `NO_DATA`; only the cycle-level guard in
//! `engine::runner` deals in `anyhow::Error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or request-building failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not a valid option-chain payload.
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
