//! The composition: root of the scene graph and owner of one render run.
//!
//! Structural mutation is allowed in `Idle` and `Building`. `start()` freezes the scenes,
//! spawns the run and returns its event stream; from then on every mutating call fails with
//! [`FramecraftError::Config`]. `destroy()` is valid in every state and silences the run
//! before cancelling it, so no terminal event follows a destroy.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::encode::engine::EncodingEngine;
use crate::encode::ffmpeg::FfmpegEngine;
use crate::eval::timing::check_transitions;
use crate::foundation::core::CancelToken;
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::render::queue::{JobTable, RenderQueue, RetryPolicy};
use crate::scene::model::{AudioTrack, Scene};
use crate::scene::options::CompositionOptions;
use crate::session::cache::CacheManager;
use crate::session::events::{
    CompletionReport, EventBus, RenderEvents, RenderOutcome, RunGate,
};
use crate::session::run::{RunContext, spawn};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Lifecycle of a [`Composition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositionState {
    /// Freshly created.
    Idle,
    /// At least one structural mutation happened.
    Building,
    /// `start()` was called; the scene graph is frozen.
    Started,
    /// The run published its output.
    Completed,
    /// The run failed.
    Failed,
    /// `destroy()` was called.
    Destroyed,
}

/// Ordered scenes, global options and the optional audio track, plus the run they drive.
pub struct Composition {
    id: String,
    options: CompositionOptions,
    scenes: Arc<Vec<Scene>>,
    audio: Option<AudioTrack>,
    output: Option<PathBuf>,
    engine: Arc<dyn EncodingEngine>,
    jobs: Arc<JobTable>,
    retry: RetryPolicy,
    state: Arc<Mutex<CompositionState>>,
    gate: RunGate,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
    cache: Option<Arc<CacheManager>>,
}

impl std::fmt::Debug for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composition")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("scenes", &self.scenes.len())
            .field("engine", &self.engine.name())
            .finish_non_exhaustive()
    }
}

impl Composition {
    /// Composition encoding through `ffmpeg`/`ffprobe` on `PATH`.
    pub fn new(options: CompositionOptions) -> FramecraftResult<Self> {
        Self::with_engine(options, Arc::new(FfmpegEngine::new()))
    }

    /// Composition encoding through `engine`.
    pub fn with_engine(
        options: CompositionOptions,
        engine: Arc<dyn EncodingEngine>,
    ) -> FramecraftResult<Self> {
        options.validate()?;
        Ok(Self {
            id: next_id(),
            options,
            scenes: Arc::new(Vec::new()),
            audio: None,
            output: None,
            engine,
            jobs: JobTable::global(),
            retry: RetryPolicy::DEFAULT,
            state: Arc::new(Mutex::new(CompositionState::Idle)),
            gate: RunGate::default(),
            cancel: CancelToken::new(),
            worker: None,
            cache: None,
        })
    }

    /// Use `jobs` instead of the process-wide in-flight table. Identical scene jobs are encoded
    /// once among the compositions sharing a table.
    pub fn share_jobs(&mut self, jobs: Arc<JobTable>) -> FramecraftResult<&mut Self> {
        self.mutate()?;
        self.jobs = jobs;
        Ok(self)
    }

    /// Override the retry policy for encoder failures.
    pub fn set_retry_policy(&mut self, retry: RetryPolicy) -> FramecraftResult<&mut Self> {
        self.mutate()?;
        self.retry = retry;
        Ok(self)
    }

    /// Unique id, used for the default output name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CompositionState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(CompositionState::Failed)
    }

    /// Options in effect.
    pub fn options(&self) -> &CompositionOptions {
        &self.options
    }

    /// Scenes in order.
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Global audio track.
    pub fn audio(&self) -> Option<&AudioTrack> {
        self.audio.as_ref()
    }

    /// Append `scene`, returning its position.
    pub fn add_scene(&mut self, scene: Scene) -> FramecraftResult<usize> {
        self.mutate()?;
        let scenes = Arc::make_mut(&mut self.scenes);
        scenes.push(scene);
        Ok(scenes.len() - 1)
    }

    /// Mutable access to the scene at `index`.
    pub fn scene_mut(&mut self, index: usize) -> FramecraftResult<&mut Scene> {
        self.mutate()?;
        let count = self.scenes.len();
        Arc::make_mut(&mut self.scenes)
            .get_mut(index)
            .ok_or_else(|| {
                FramecraftError::config(format!("no scene at index {index} ({count} scenes)"))
            })
    }

    /// Read one option by key (`frameRate`, `videoEncodingParams.codec`, ...).
    pub fn get_option(&self, key: &str) -> FramecraftResult<Value> {
        self.options.get(key)
    }

    /// Write one option by key. Invalid keys or values leave the options unchanged.
    pub fn set_option(&mut self, key: &str, value: Value) -> FramecraftResult<()> {
        self.mutate()?;
        self.options.set(key, value)
    }

    /// Set the frame size.
    pub fn set_size(&mut self, width: u32, height: u32) -> FramecraftResult<&mut Self> {
        self.mutate()?;
        let mut next = self.options.clone();
        next.frame_width = width;
        next.frame_height = height;
        next.validate()?;
        self.options = next;
        Ok(self)
    }

    /// Enable run lifecycle logging at `info` and encoder logs.
    pub fn open_log(&mut self) -> FramecraftResult<&mut Self> {
        self.mutate()?;
        self.options.logging_enabled = true;
        Ok(self)
    }

    /// Disable run lifecycle logging.
    pub fn close_log(&mut self) -> FramecraftResult<&mut Self> {
        self.mutate()?;
        self.options.logging_enabled = false;
        Ok(self)
    }

    /// Set the global audio track.
    pub fn add_audio(&mut self, track: AudioTrack) -> FramecraftResult<&mut Self> {
        self.mutate()?;
        track.validate()?;
        self.audio = Some(track);
        Ok(self)
    }

    /// Set the output file. A relative path is resolved against `outputDir`.
    pub fn set_output(&mut self, path: impl AsRef<Path>) -> FramecraftResult<&mut Self> {
        self.mutate()?;
        let path = path.as_ref();
        if path.as_os_str().is_empty() || path.file_name().is_none() {
            return Err(FramecraftError::config(format!(
                "output path '{}' has no file name",
                path.display()
            )));
        }
        self.output = Some(if path.is_absolute() {
            path.to_owned()
        } else {
            self.options.output_dir.join(path)
        });
        Ok(self)
    }

    /// Output file the run publishes to.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.options.output_dir.join(format!("{}.mp4", self.id)))
    }

    /// Freeze the scene graph and start rendering on a background thread.
    ///
    /// Fails synchronously with [`FramecraftError::Config`] when the composition cannot run
    /// (already started, destroyed, no scenes, a transition longer than an adjacent scene).
    /// Render-time failures arrive as the stream's `Error` event.
    pub fn start(&mut self) -> FramecraftResult<RenderEvents> {
        match self.state() {
            CompositionState::Idle | CompositionState::Building => {}
            other => {
                return Err(FramecraftError::config(format!(
                    "cannot start a composition in state {other:?}"
                )));
            }
        }
        if self.scenes.is_empty() {
            return Err(FramecraftError::config("composition has no scenes"));
        }
        self.options.validate()?;
        check_transitions(&self.scenes)?;

        let cache = Arc::new(CacheManager::new(
            self.options.cache_dir.clone(),
            self.output_path(),
        ));
        let queue = Arc::new(RenderQueue::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.jobs),
            Arc::clone(&cache),
            self.retry,
        ));
        let (bus, events) = EventBus::channel(self.gate.clone());
        let ctx = RunContext {
            id: self.id.clone(),
            scenes: Arc::clone(&self.scenes),
            options: self.options.clone(),
            audio: self.audio.clone(),
            queue,
            cancel: self.cancel.clone(),
            state: Arc::clone(&self.state),
        };

        self.set_state(CompositionState::Started);
        match spawn(ctx, bus) {
            Ok(handle) => {
                self.worker = Some(handle);
                self.cache = Some(cache);
                Ok(events)
            }
            Err(e) => {
                self.set_state(CompositionState::Failed);
                Err(e)
            }
        }
    }

    /// `start()` and block until the run ends.
    pub fn render(&mut self) -> FramecraftResult<CompletionReport> {
        match self.start()?.wait() {
            RenderOutcome::Completed(report) => Ok(report),
            RenderOutcome::Failed(err) => Err(err),
            RenderOutcome::Cancelled => Err(FramecraftError::Cancelled),
        }
    }

    /// Stop any run, delete the files it produced in the cache directory and move to
    /// `Destroyed`. Safe to call repeatedly and from any state.
    ///
    /// The event stream ends without a terminal event. A published output survives.
    pub fn destroy(&mut self) {
        if self.state() == CompositionState::Destroyed {
            return;
        }
        self.set_state(CompositionState::Destroyed);
        self.gate.close();
        self.cancel.cancel();
        if let Some(handle) = self.worker.take()
            && handle.join().is_err()
        {
            tracing::warn!(composition = %self.id, "run thread panicked");
        }
        if let Some(cache) = self.cache.take() {
            cache.cleanup();
        }
        tracing::debug!(composition = %self.id, "composition destroyed");
    }

    fn mutate(&mut self) -> FramecraftResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("composition state lock poisoned"))?;
        match *state {
            CompositionState::Idle => {
                *state = CompositionState::Building;
                Ok(())
            }
            CompositionState::Building => Ok(()),
            other => Err(FramecraftError::config(format!(
                "composition is {other:?}; the scene graph can no longer change"
            ))),
        }
    }

    fn set_state(&self, to: CompositionState) {
        if let Ok(mut s) = self.state.lock() {
            *s = to;
        }
    }
}

impl Drop for Composition {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn next_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos() as u64);
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}-{seq}", nanos, std::process::id())
}

#[cfg(test)]
#[path = "../../tests/unit/scene/composition.rs"]
mod tests;
