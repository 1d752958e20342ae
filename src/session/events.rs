//! Run notifications.
//!
//! A run publishes `Start`, zero or more `Progress` values, and exactly one of `Complete` or
//! `Error`. The terminal publishers consume the [`EventBus`], so a second terminal event cannot
//! be expressed. After [`RunGate::close`] (composition destroyed) nothing is published at all.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::foundation::error::{FramecraftError, FramecraftResult};

/// Basic statistics reported with a completed run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UsageSummary {
    /// Wall time from `start()` to completion.
    pub elapsed: Duration,
    /// Number of scenes rendered.
    pub scenes: usize,
    /// Encoder invocations, including retries and the stitch.
    pub encoder_invocations: u64,
    /// Scene artifacts reused from the cache directory.
    pub cache_hits: u64,
    /// Failed attempts that were retried.
    pub retries: u64,
    /// Expected output duration in seconds.
    pub output_duration_secs: f64,
    /// Size of the published output file.
    pub output_bytes: u64,
}

/// Payload of the `complete` event.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionReport {
    /// Final output file.
    pub output: PathBuf,
    /// Run statistics.
    pub usage: UsageSummary,
}

/// One notification.
#[derive(Debug)]
pub enum RenderEvent {
    /// The run started.
    Start,
    /// Fraction of work done, in `[0, 1]`, never decreasing within a run.
    Progress(f64),
    /// The output was published. Terminal.
    Complete(CompletionReport),
    /// The run failed. Terminal.
    Error(FramecraftError),
}

impl RenderEvent {
    /// Return `true` for `Complete` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error(_))
    }
}

/// How a run ended, from the caller's side.
#[derive(Debug)]
pub enum RenderOutcome {
    /// `Complete` was received.
    Completed(CompletionReport),
    /// `Error` was received.
    Failed(FramecraftError),
    /// The stream ended without a terminal event (composition destroyed).
    Cancelled,
}

#[derive(Debug, Default)]
struct GateState {
    closed: bool,
    terminal: bool,
    last_progress: f64,
}

/// Shared switch that silences a run's bus; held by the composition.
#[derive(Clone, Debug, Default)]
pub(crate) struct RunGate {
    state: Arc<Mutex<GateState>>,
}

impl RunGate {
    /// Stop all further publishing. Returns once no publish is in progress.
    pub(crate) fn close(&self) {
        if let Ok(mut s) = self.state.lock() {
            s.closed = true;
        }
    }
}

/// Publishing side of a run.
#[derive(Debug)]
pub(crate) struct EventBus {
    tx: Sender<RenderEvent>,
    gate: RunGate,
}

/// Cloneable progress publisher for worker threads.
#[derive(Clone, Debug)]
pub(crate) struct ProgressSink {
    tx: Sender<RenderEvent>,
    gate: RunGate,
}

impl EventBus {
    /// Create a bus and its receiving end.
    pub(crate) fn channel(gate: RunGate) -> (Self, RenderEvents) {
        let (tx, rx) = mpsc::channel();
        (
            Self { tx, gate },
            RenderEvents {
                rx,
                done: false,
            },
        )
    }

    pub(crate) fn start(&self) {
        self.publish(RenderEvent::Start);
    }

    pub(crate) fn progress_sink(&self) -> ProgressSink {
        ProgressSink {
            tx: self.tx.clone(),
            gate: self.gate.clone(),
        }
    }

    pub(crate) fn complete(self, report: CompletionReport) {
        self.publish(RenderEvent::Complete(report));
    }

    pub(crate) fn fail(self, err: FramecraftError) {
        self.publish(RenderEvent::Error(err));
    }

    fn publish(&self, ev: RenderEvent) {
        let Ok(mut s) = self.gate.state.lock() else {
            return;
        };
        if s.closed || s.terminal {
            return;
        }
        if ev.is_terminal() {
            s.terminal = true;
        }
        // A dropped receiver only means nobody is listening.
        let _ = self.tx.send(ev);
    }
}

impl ProgressSink {
    /// Publish `fraction` (clamped to `[0, 1]`) when it does not move backwards.
    pub(crate) fn report(&self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let Ok(mut s) = self.gate.state.lock() else {
            return;
        };
        if s.closed || s.terminal || fraction < s.last_progress {
            return;
        }
        s.last_progress = fraction;
        let _ = self.tx.send(RenderEvent::Progress(fraction));
    }
}

/// Receiving side of a run. Iterates events until the terminal one.
#[derive(Debug)]
pub struct RenderEvents {
    rx: Receiver<RenderEvent>,
    done: bool,
}

impl RenderEvents {
    /// Wait up to `timeout` for the next event.
    ///
    /// `Ok(None)` means the stream has ended; an elapsed deadline is
    /// [`FramecraftError::Timeout`].
    pub fn next_timeout(&mut self, timeout: Duration) -> FramecraftResult<Option<RenderEvent>> {
        if self.done {
            return Ok(None);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(ev) => Ok(Some(self.observe(ev))),
            Err(RecvTimeoutError::Timeout) => Err(FramecraftError::timeout(format!(
                "no render event within {timeout:?}"
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                self.done = true;
                Ok(None)
            }
        }
    }

    /// Drain the stream and report how the run ended.
    pub fn wait(self) -> RenderOutcome {
        for ev in self {
            match ev {
                RenderEvent::Complete(report) => return RenderOutcome::Completed(report),
                RenderEvent::Error(err) => return RenderOutcome::Failed(err),
                RenderEvent::Start | RenderEvent::Progress(_) => {}
            }
        }
        RenderOutcome::Cancelled
    }

    fn observe(&mut self, ev: RenderEvent) -> RenderEvent {
        if ev.is_terminal() {
            self.done = true;
        }
        ev
    }
}

impl Iterator for RenderEvents {
    type Item = RenderEvent;

    fn next(&mut self) -> Option<RenderEvent> {
        if self.done {
            return None;
        }
        match self.rx.recv() {
            Ok(ev) => Some(self.observe(ev)),
            Err(_) => {
                self.done = true;
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/events.rs"]
mod tests;
