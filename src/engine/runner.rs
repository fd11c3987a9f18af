//! # engine::runner — Engine loop and control surface
//!
//! ## Flow
//! ```text
//! loop until stopped:
//!   1. Acquire + process primary index    (bias only)
//!   2. Acquire + process secondary index  (bias + trap)
//!   3. Combine PCR biases
//!   4. Trap detector on the secondary index, if a market bias exists
//!   5. Deliver the report
//!   6. Sleep `refresh_interval`, or wake immediately on stop
//! ```
//!
//! A cycle never fails by returning an error: acquisition and processing
//! degrade to `NO_DATA`.  A panic inside a cycle is caught at the cycle
//! boundary and reported as an [`EngineEvent::Error`]; the loop carries on.
//! A panic outside that guard ends the worker with one [`EngineEvent::Fatal`].

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, InstrumentConfig};
use crate::engine::bias::combined_bias;
use crate::engine::processor::{process, ProcessedResult};
use crate::engine::report::{InstrumentSummary, Report};
use crate::engine::trap::detect_trap;
use crate::events::{EngineEvent, EventSink};
use crate::market::{AcquisitionMode, AcquisitionPolicy, ChainProvider, SessionGate};
use crate::models::Signal;
use crate::state::EngineState;

// ─── Engine ───────────────────────────────────────────────────────────────────

pub struct Engine {
    config:      EngineConfig,
    acquisition: AcquisitionPolicy,
    state:       EngineState,
    events:      EventSink,
}

impl Engine {
    pub fn new(config: EngineConfig, provider: Arc<dyn ChainProvider>, events: EventSink) -> Self {
        let session = SessionGate::new(config.market_open, config.market_close);
        // The provider's own timeout covers the API call; the warm-up needs room too.
        let acquisition = AcquisitionPolicy::new(provider, session, config.fetch_timeout * 2);

        Self {
            config,
            acquisition,
            state: EngineState::new(),
            events,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// One full cycle at wall-clock time `now`.
    pub async fn run_cycle(&mut self, now: DateTime<Local>) -> Report {
        let wall = now.naive_local();
        let utc = now.with_timezone(&Utc);

        let Self { config, acquisition, state, events } = self;

        let (primary_mode, primary) = analyse(acquisition, state, events, &config.primary, wall).await;
        let (secondary_mode, secondary) = analyse(acquisition, state, events, &config.secondary, wall).await;

        let (bias, bias_reason) = combined_bias(primary.as_ref(), secondary.as_ref());

        let signal = match (bias, secondary.as_ref()) {
            (Some(_), Some(result)) => {
                let psy = &mut state.memory_mut(&config.secondary.name).psy;
                detect_trap(result, config.secondary.step, psy, utc)
            }
            _ => Signal::wait(bias_reason),
        };

        state.prune(utc);

        let report = Report {
            cycle_id:          Uuid::new_v4(),
            generated_at:      now,
            instruments:       vec![
                InstrumentSummary::from_result(&config.primary.name, primary_mode, primary.as_ref()),
                InstrumentSummary::from_result(&config.secondary.name, secondary_mode, secondary.as_ref()),
            ],
            bias,
            bias_reason:       bias_reason.to_string(),
            signal,
            next_refresh_secs: config.refresh_interval.as_secs(),
        };

        info!(
            cycle_id = %report.cycle_id,
            bias     = ?report.bias,
            action   = %report.signal.action,
            reason   = %report.signal.reason,
            "Cycle complete"
        );
        report
    }

    /// [`run_cycle`](Self::run_cycle) with panics turned into errors.
    pub async fn guarded_cycle(&mut self, now: DateTime<Local>) -> anyhow::Result<Report> {
        let cycle = self.state.cycles + 1;
        AssertUnwindSafe(self.run_cycle(now))
            .catch_unwind()
            .await
            .map_err(|panic| anyhow!(panic_message(panic.as_ref())).context(format!("cycle {cycle} panicked")))
    }

    /// Run cycles until `stop` flips to `true` (or its sender is dropped).
    /// Returns the engine so its memory survives a restart.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> Self {
        info!(interval = ?self.config.refresh_interval, "Engine loop started");

        loop {
            if *stop.borrow() {
                break;
            }

            match self.guarded_cycle(Local::now()).await {
                Ok(report) => self.events.send(EngineEvent::Report { report: Box::new(report) }),
                Err(e) => {
                    error!(error = %e, "Engine cycle failed, continuing next interval");
                    self.events.send(EngineEvent::Error {
                        message: format!("{e:#}"),
                        trace:   format!("{e:?}"),
                    });
                }
            }
            self.state.cycles += 1;

            tokio::select! {
                _ = tokio::time::sleep(self.config.refresh_interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        info!(cycles = self.state.cycles, "Engine loop stopped");
        self
    }
}

/// Acquire and process one instrument.  The mode is `NoData` whenever no
/// processed result comes out, including an empty strike ladder.
async fn analyse(
    acquisition: &AcquisitionPolicy,
    state:       &mut EngineState,
    events:      &EventSink,
    instrument:  &InstrumentConfig,
    wall:        NaiveDateTime,
) -> (AcquisitionMode, Option<ProcessedResult>) {
    let acquired = acquisition.acquire(instrument, wall, events).await;

    let result = acquired.snapshot.as_ref().and_then(|snapshot| {
        let oi = &mut state.memory_mut(&instrument.name).oi;
        process(instrument, snapshot, acquired.mode, oi)
    });

    match result {
        Some(r) => (acquired.mode, Some(r)),
        None => {
            debug!(instrument = %instrument.name, mode = %acquired.mode, "No processed data");
            (AcquisitionMode::NoData, None)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Last-resort guard around the worker body (normally [`Engine::run`]).
async fn supervise<F>(worker: F, events: EventSink) -> Option<Engine>
where
    F: Future<Output = Engine>,
{
    match AssertUnwindSafe(worker).catch_unwind().await {
        Ok(engine) => Some(engine),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(%message, "Engine worker died");
            events.send(EngineEvent::Fatal { message });
            None
        }
    }
}

// ─── Controller ───────────────────────────────────────────────────────────────

struct Worker {
    stop_tx: watch::Sender<bool>,
    handle:  JoinHandle<Option<Engine>>,
}

/// Start/stop surface for whatever presents the reports.
///
/// The engine's memory lives in the worker while it runs and is parked here
/// between runs, so stop → start resumes with the same OI and level memory.
pub struct EngineController {
    config:   EngineConfig,
    provider: Arc<dyn ChainProvider>,
    events:   EventSink,
    idle:     Option<Engine>,
    worker:   Option<Worker>,
}

impl EngineController {
    pub fn new(config: EngineConfig, provider: Arc<dyn ChainProvider>, events: EventSink) -> Self {
        Self {
            config,
            provider,
            events,
            idle: None,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.handle.is_finished())
    }

    /// State of the parked engine; `None` while running or before first start.
    pub fn state(&self) -> Option<&EngineState> {
        self.idle.as_ref().map(Engine::state)
    }

    /// Spawn the worker.  Returns `false` (and does nothing) if it is already
    /// running.  Must be called inside a Tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            debug!("Engine already running, start ignored");
            return false;
        }

        // A worker that ended on its own (fatal) or finished after a timed-out stop.
        if let Some(worker) = self.worker.take() {
            if let Some(Ok(Some(engine))) = worker.handle.now_or_never() {
                self.idle = Some(engine);
            }
        }

        let engine = self.idle.take().unwrap_or_else(|| {
            Engine::new(self.config.clone(), Arc::clone(&self.provider), self.events.clone())
        });

        let (stop_tx, stop_rx) = watch::channel(false);
        self.events.system("Engine started");
        let handle = tokio::spawn(supervise(engine.run(stop_rx), self.events.clone()));
        self.worker = Some(Worker { stop_tx, handle });

        info!("🚀 Engine started");
        true
    }

    /// Ask the worker to stop and wait up to `timeout` for it.  Returns
    /// `true` if it is no longer running.  An in-flight fetch is not
    /// aborted; if it outlasts `timeout` the worker exits after it.
    pub async fn stop(&mut self, timeout: Duration) -> bool {
        let Some(mut worker) = self.worker.take() else {
            return true;
        };

        let _ = worker.stop_tx.send(true);

        match tokio::time::timeout(timeout, &mut worker.handle).await {
            Ok(Ok(engine)) => {
                self.idle = engine;
                self.events.system("Engine stopped");
                info!("Engine stopped");
                true
            }
            Ok(Err(e)) => {
                error!(error = %e, "Engine worker aborted");
                self.events.system("Engine stopped");
                true
            }
            Err(_) => {
                warn!(?timeout, "Engine did not stop in time; it will exit after the current cycle");
                self.events.system("Engine stopping");
                self.worker = Some(worker);
                false
            }
        }
    }
}
