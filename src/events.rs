//! # events
//!
//! Defines [`EngineEvent`], every message the engine delivers to its
//! consumer, and [`EventSink`], the send side of the delivery channel.
//!
//! The channel is an unbounded `tokio::sync::mpsc`: the worker never waits on
//! the consumer, and a consumer that has gone away is not an error.

use std::fmt;
use std::io::{self, Write};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::engine::report::Report;

/// Everything the consumer can receive.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    /// Lifecycle notices (started / stopped).
    System { message: String },

    /// Small operational notes from inside a cycle, e.g. a failed live fetch.
    Log { message: String },

    /// The per-cycle analysis report.
    Report { report: Box<Report> },

    /// A cycle failed; the engine carries on with the next one.
    Error { message: String, trace: String },

    /// The worker itself died.  Nothing follows this event.
    Fatal { message: String },
}

impl EngineEvent {
    /// JSON form for consumers that want structure instead of text.
    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"SERIALIZATION_ERROR"}"#.to_string())
    }
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::System { message } => write!(f, "[SYSTEM] {message}"),
            EngineEvent::Log { message } => write!(f, "[LOG] {message}"),
            EngineEvent::Report { report } => write!(f, "{report}"),
            EngineEvent::Error { message, trace } => write!(f, "Engine error:\n{message}\n{trace}"),
            EngineEvent::Fatal { message } => write!(f, "Fatal engine error: {message}"),
        }
    }
}

// ─── Sink ─────────────────────────────────────────────────────────────────────

/// Cloneable send side of the delivery channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<EngineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A fresh sink together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// A sink that drops everything (headless runs, tests).
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: EngineEvent) {
        if let Some(tx) = &self.tx {
            // Err only means the consumer is gone.
            let _ = tx.send(event);
        }
    }

    pub fn system(&self, message: impl Into<String>) {
        self.send(EngineEvent::System { message: message.into() });
    }

    pub fn log(&self, message: impl Into<String>) {
        self.send(EngineEvent::Log { message: message.into() });
    }
}

// ─── Console Consumer ─────────────────────────────────────────────────────────

/// Append every event to `out` until all senders are gone.  Reports are
/// followed by a blank line; nothing already written is ever cleared.
pub async fn write_events(
    mut rx: mpsc::UnboundedReceiver<EngineEvent>,
    mut out: impl Write,
) -> io::Result<()> {
    while let Some(event) = rx.recv().await {
        writeln!(out, "{event}")?;
        if matches!(event, EngineEvent::Report { .. }) {
            writeln!(out)?;
        }
        out.flush()?;
    }
    Ok(())
}
