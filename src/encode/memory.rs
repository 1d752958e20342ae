use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::encode::engine::{EncoderInvocation, EncodingEngine};
use crate::foundation::core::CancelToken;
use crate::foundation::error::{FramecraftError, FramecraftResult};

/// In-process engine for tests and dry runs.
///
/// Records every invocation and writes a small placeholder file instead of encoding. Failures
/// can be scripted per invocation label, and an artificial delay makes concurrency observable.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    delay: Duration,
    calls: Mutex<Vec<EncoderInvocation>>,
    failures: Mutex<HashMap<String, VecDeque<FramecraftError>>>,
    probes: Mutex<HashMap<PathBuf, f64>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl InMemoryEngine {
    /// Engine that finishes every invocation immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that spends `delay` in every invocation (cancellable).
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Make the next invocations labelled `label` fail with `errors`, in order.
    pub fn fail_with(&self, label: &str, errors: impl IntoIterator<Item = FramecraftError>) {
        if let Ok(mut f) = self.failures.lock() {
            f.entry(label.to_owned()).or_default().extend(errors);
        }
    }

    /// Report `secs` as the duration of `path`.
    pub fn set_probe(&self, path: impl Into<PathBuf>, secs: f64) {
        if let Ok(mut p) = self.probes.lock() {
            p.insert(path.into(), secs);
        }
    }

    /// Every invocation received so far.
    pub fn invocations(&self) -> Vec<EncoderInvocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of invocations received so far.
    pub fn invocation_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of invocations whose label starts with `prefix`.
    pub fn count_labelled(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.iter().filter(|i| i.label.starts_with(prefix)).count())
            .unwrap_or(0)
    }

    /// Highest number of invocations observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn run(&self, invocation: &EncoderInvocation, cancel: &CancelToken) -> FramecraftResult<()> {
        let mut left = self.delay;
        while !left.is_zero() {
            if cancel.is_cancelled() {
                return Err(FramecraftError::Cancelled);
            }
            let step = left.min(Duration::from_millis(5));
            std::thread::sleep(step);
            left = left.saturating_sub(step);
        }
        if cancel.is_cancelled() {
            return Err(FramecraftError::Cancelled);
        }

        let scripted = self
            .failures
            .lock()
            .ok()
            .and_then(|mut f| f.get_mut(&invocation.label).and_then(VecDeque::pop_front));
        if let Some(err) = scripted {
            return Err(err);
        }

        for (path, _) in &invocation.side_files {
            if !path.is_file() {
                return Err(FramecraftError::external_terminal(format!(
                    "side file '{}' was not written",
                    path.display()
                )));
            }
        }
        if let Some(parent) = invocation.output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(
            &invocation.output,
            format!("{}\n{}\n", invocation.label, invocation.args.join(" ")),
        )?;
        Ok(())
    }
}

impl EncodingEngine for InMemoryEngine {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn encode(&self, invocation: &EncoderInvocation, cancel: &CancelToken) -> FramecraftResult<()> {
        if let Ok(mut c) = self.calls.lock() {
            c.push(invocation.clone());
        }
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = self.run(invocation, cancel);
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn probe_duration(&self, path: &Path) -> FramecraftResult<f64> {
        if let Some(secs) = self.probes.lock().ok().and_then(|p| p.get(path).copied()) {
            return Ok(secs);
        }
        if !path.is_file() {
            return Err(FramecraftError::resource_not_found(path));
        }
        Err(FramecraftError::external_terminal(format!(
            "no scripted duration for '{}'",
            path.display()
        )))
    }
}
