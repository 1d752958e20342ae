//! Bounded-concurrency scene job scheduler.
//!
//! Scene jobs run on a rayon pool sized by `concurrency`. Each job either reuses a complete
//! artifact from the cache directory or invokes the encoding engine, writing to a `.partial`
//! path that is renamed on success. Jobs sharing a cache directory and fingerprint are
//! de-duplicated through a [`JobTable`], process-wide by default: the first claimant encodes and
//! later claimants wait for its result. A claimant whose leader was cancelled takes the job over.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use rayon::prelude::*;

use crate::compile::fingerprint::Fingerprint;
use crate::encode::engine::{EncoderInvocation, EncodingEngine};
use crate::foundation::core::CancelToken;
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::render::job::SceneJob;
use crate::scene::model::Scene;
use crate::scene::options::CompositionOptions;
use crate::session::cache::{CacheManager, TempFileGuard, remove_if_exists};

const WAIT_SLICE: Duration = Duration::from_millis(25);

/// Retry bound and pause for retryable encoder failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Pause before each retry.
    pub pause: Duration,
}

impl RetryPolicy {
    /// Two retries, 250 ms apart.
    pub const DEFAULT: Self = Self {
        max_retries: 2,
        pause: Duration::from_millis(250),
    };
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A finished scene artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Scene position.
    pub index: usize,
    /// Job key.
    pub fingerprint: Fingerprint,
    /// Artifact file in the cache directory.
    pub path: PathBuf,
    /// Reused from an earlier run without invoking the encoder.
    pub cache_hit: bool,
    /// Written by this queue (as opposed to reused or awaited from another claimant).
    pub produced: bool,
}

/// Counters accumulated by a queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JobCounts {
    /// Encoder invocations, retries included.
    pub encoder_invocations: u64,
    /// Artifacts reused from the cache directory.
    pub cache_hits: u64,
    /// Retried attempts.
    pub retries: u64,
}

#[derive(Debug, Default)]
struct JobStats {
    encoder_invocations: AtomicU64,
    cache_hits: AtomicU64,
    retries: AtomicU64,
}

#[derive(Debug, Default)]
struct Slot {
    result: Mutex<Option<FramecraftResult<PathBuf>>>,
    ready: Condvar,
}

/// Cache directory (canonical) plus fingerprint: the files one job writes.
type JobKey = (PathBuf, Fingerprint);

/// In-flight job registry keyed by cache directory and fingerprint.
///
/// Compositions use [`JobTable::global`] unless given their own table.
#[derive(Debug, Default)]
pub struct JobTable {
    inflight: Mutex<HashMap<JobKey, Arc<Slot>>>,
}

enum Claim {
    Leader(Arc<Slot>),
    Follower(Arc<Slot>),
}

impl JobTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide table.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<JobTable>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(JobTable::new())))
    }

    /// Number of jobs currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inflight.lock().map(|m| m.len()).unwrap_or(0)
    }

    fn claim(&self, key: &JobKey) -> FramecraftResult<Claim> {
        let mut map = lock(&self.inflight)?;
        if let Some(slot) = map.get(key) {
            return Ok(Claim::Follower(Arc::clone(slot)));
        }
        let slot = Arc::new(Slot::default());
        map.insert(key.clone(), Arc::clone(&slot));
        Ok(Claim::Leader(slot))
    }

    /// Unregister the job, then wake its followers. A follower that claims again after this
    /// becomes a leader or finds the finished artifact.
    fn finish(&self, key: &JobKey, slot: &Slot, result: &FramecraftResult<PathBuf>) {
        if let Ok(mut map) = self.inflight.lock() {
            map.remove(key);
        }
        let shared = match result {
            Ok(p) => Ok(p.clone()),
            Err(e) => Err(e.duplicate()),
        };
        if let Ok(mut r) = slot.result.lock() {
            *r = Some(shared);
        }
        slot.ready.notify_all();
    }
}

/// Scene job scheduler bound to one engine and one cache directory.
pub struct RenderQueue {
    engine: Arc<dyn EncodingEngine>,
    table: Arc<JobTable>,
    cache: Arc<CacheManager>,
    retry: RetryPolicy,
    stats: JobStats,
}

impl RenderQueue {
    /// Create a queue.
    pub fn new(
        engine: Arc<dyn EncodingEngine>,
        table: Arc<JobTable>,
        cache: Arc<CacheManager>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            engine,
            table,
            cache,
            retry,
            stats: JobStats::default(),
        }
    }

    /// Encoding engine.
    pub fn engine(&self) -> &dyn EncodingEngine {
        self.engine.as_ref()
    }

    /// Cache manager.
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Counters so far.
    pub fn counts(&self) -> JobCounts {
        JobCounts {
            encoder_invocations: self.stats.encoder_invocations.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            retries: self.stats.retries.load(Ordering::Relaxed),
        }
    }

    /// Render every scene with at most `concurrency` jobs in flight.
    ///
    /// `on_done` receives the number of finished jobs after each success. On the first final
    /// failure the remaining jobs are aborted, artifacts produced by this call are discarded and
    /// that failure is returned. Cancelling `cancel` yields [`FramecraftError::Cancelled`].
    /// Artifacts of a failed call are released; those no other run holds are deleted.
    #[tracing::instrument(skip_all, fields(scenes = scenes.len(), concurrency = concurrency))]
    pub fn run_scenes(
        &self,
        scenes: &[Scene],
        options: &CompositionOptions,
        concurrency: usize,
        cancel: &CancelToken,
        on_done: &(dyn Fn(usize) + Sync),
    ) -> FramecraftResult<Vec<Artifact>> {
        let pool = build_thread_pool(concurrency)?;
        let abort = cancel.child();
        let first_err: Mutex<Option<FramecraftError>> = Mutex::new(None);
        let done = AtomicUsize::new(0);

        let results: Vec<Option<Artifact>> = pool.install(|| {
            scenes
                .par_iter()
                .enumerate()
                .map(|(i, scene)| {
                    if abort.is_cancelled() {
                        return None;
                    }
                    match self.run_scene(i, scene, options, &abort) {
                        Ok(a) => {
                            on_done(done.fetch_add(1, Ordering::SeqCst) + 1);
                            Some(a)
                        }
                        Err(e) => {
                            if !e.is_cancelled()
                                && let Ok(mut slot) = first_err.lock()
                                && slot.is_none()
                            {
                                tracing::warn!(scene = i, error = %e, "scene job failed");
                                *slot = Some(e);
                            }
                            abort.cancel();
                            None
                        }
                    }
                })
                .collect()
        });

        let failure = if cancel.is_cancelled() {
            Some(FramecraftError::Cancelled)
        } else {
            lock(&first_err)?.take()
        };
        if failure.is_some() || results.iter().any(Option::is_none) {
            let used: Vec<PathBuf> = results.iter().flatten().map(|a| a.path.clone()).collect();
            self.cache.discard(&used);
            return Err(failure.unwrap_or(FramecraftError::Cancelled));
        }
        Ok(results.into_iter().flatten().collect())
    }

    /// Prepare and execute one scene job.
    #[tracing::instrument(skip(self, scene, options, cancel))]
    pub fn run_scene(
        &self,
        index: usize,
        scene: &Scene,
        options: &CompositionOptions,
        cancel: &CancelToken,
    ) -> FramecraftResult<Artifact> {
        let job = SceneJob::prepare(index, scene, options, self.engine.as_ref())?;
        self.execute(&job, options, cancel)
    }

    /// Execute a prepared job, awaiting an in-flight job with the same cache directory and
    /// fingerprint instead of encoding twice.
    ///
    /// The artifact stays leased by this queue's cache manager until it is released.
    pub fn execute(
        &self,
        job: &SceneJob,
        options: &CompositionOptions,
        cancel: &CancelToken,
    ) -> FramecraftResult<Artifact> {
        self.cache.prepare()?;
        let key = (self.cache.dir_key(), job.fingerprint);
        let artifact = self.cache.artifact_path(job.fingerprint);
        self.cache.hold(&artifact);
        let result = self.claim_and_run(job, options, cancel, &key);
        if result.is_err() {
            self.cache.discard(std::slice::from_ref(&artifact));
        }
        result
    }

    fn claim_and_run(
        &self,
        job: &SceneJob,
        options: &CompositionOptions,
        cancel: &CancelToken,
        key: &JobKey,
    ) -> FramecraftResult<Artifact> {
        let fp = job.fingerprint;
        loop {
            match self.table.claim(key)? {
                Claim::Leader(slot) => {
                    let result = self.produce(job, options, cancel);
                    let shared = result
                        .as_ref()
                        .map(|a| a.path.clone())
                        .map_err(|e| e.duplicate());
                    self.table.finish(key, &slot, &shared);
                    return result;
                }
                Claim::Follower(slot) => {
                    tracing::debug!(label = %job.label, fingerprint = %fp, "awaiting in-flight job");
                    match await_slot(&slot, cancel) {
                        Ok(path) => {
                            return Ok(Artifact {
                                index: job.index,
                                fingerprint: fp,
                                path,
                                cache_hit: false,
                                produced: false,
                            });
                        }
                        Err(e) if e.is_cancelled() && !cancel.is_cancelled() => {
                            tracing::debug!(
                                label = %job.label,
                                fingerprint = %fp,
                                "in-flight job was cancelled by its owner; claiming it"
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    fn produce(
        &self,
        job: &SceneJob,
        options: &CompositionOptions,
        cancel: &CancelToken,
    ) -> FramecraftResult<Artifact> {
        let fp = job.fingerprint;
        let artifact = self.cache.artifact_path(fp);
        if artifact.is_file() {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(label = %job.label, fingerprint = %fp, "cache hit");
            return Ok(Artifact {
                index: job.index,
                fingerprint: fp,
                path: artifact,
                cache_hit: true,
                produced: false,
            });
        }

        let partial = self.cache.partial_path(fp);
        let invocation = job.compile(options, &partial)?;
        self.encode_with_retry(&invocation, cancel)?;

        std::fs::rename(&partial, &artifact).map_err(|e| {
            remove_if_exists(&partial);
            FramecraftError::from(anyhow::anyhow!(
                "failed to finalize artifact '{}': {e}",
                artifact.display()
            ))
        })?;
        self.cache.record(&artifact);
        Ok(Artifact {
            index: job.index,
            fingerprint: fp,
            path: artifact,
            cache_hit: false,
            produced: true,
        })
    }

    /// Run one invocation, retrying retryable failures up to the policy bound.
    ///
    /// Side files are written first and removed afterwards; the output is removed on failure.
    pub fn encode_with_retry(
        &self,
        invocation: &EncoderInvocation,
        cancel: &CancelToken,
    ) -> FramecraftResult<()> {
        let mut guards = Vec::with_capacity(invocation.side_files.len());
        for (path, contents) in &invocation.side_files {
            std::fs::write(path, contents).map_err(|e| {
                FramecraftError::from(anyhow::anyhow!(
                    "failed to write '{}': {e}",
                    path.display()
                ))
            })?;
            guards.push(TempFileGuard(Some(path.clone())));
        }
        let mut output_guard = TempFileGuard(Some(invocation.output.clone()));

        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(FramecraftError::Cancelled);
            }
            self.stats
                .encoder_invocations
                .fetch_add(1, Ordering::Relaxed);
            match self.engine.encode(invocation, cancel) {
                Ok(()) => {
                    output_guard.disarm();
                    return Ok(());
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    self.stats.retries.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        label = %invocation.label,
                        attempt,
                        error = %e,
                        "retrying encoder invocation"
                    );
                    remove_if_exists(&invocation.output);
                    pause(self.retry.pause, cancel);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn await_slot(slot: &Slot, cancel: &CancelToken) -> FramecraftResult<PathBuf> {
    let mut guard = lock(&slot.result)?;
    loop {
        if let Some(r) = guard.as_ref() {
            return match r {
                Ok(p) => Ok(p.clone()),
                Err(e) => Err(e.duplicate()),
            };
        }
        if cancel.is_cancelled() {
            return Err(FramecraftError::Cancelled);
        }
        guard = slot
            .ready
            .wait_timeout(guard, WAIT_SLICE)
            .map_err(|_| poisoned())?
            .0;
    }
}

fn pause(total: Duration, cancel: &CancelToken) {
    let mut left = total;
    while !left.is_zero() && !cancel.is_cancelled() {
        let step = left.min(WAIT_SLICE);
        std::thread::sleep(step);
        left = left.saturating_sub(step);
    }
}

fn build_thread_pool(threads: usize) -> FramecraftResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(FramecraftError::config("concurrency must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("framecraft-job-{i}"))
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}

fn lock<T>(m: &Mutex<T>) -> FramecraftResult<MutexGuard<'_, T>> {
    m.lock().map_err(|_| poisoned())
}

fn poisoned() -> FramecraftError {
    FramecraftError::from(anyhow::anyhow!("render queue lock poisoned"))
}

#[cfg(test)]
#[path = "../../tests/unit/render/queue.rs"]
mod tests;
