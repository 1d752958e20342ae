//! Run orchestration: scene jobs, barrier, stitch, publish.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use crate::audio::track::AudioMix;
use crate::eval::timing::output_duration;
use crate::foundation::core::CancelToken;
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::render::queue::RenderQueue;
use crate::render::stitch::{StitchPlan, plan_stitch};
use crate::scene::composition::CompositionState;
use crate::scene::model::{AudioTrack, Scene};
use crate::scene::options::CompositionOptions;
use crate::session::cache::TempFileGuard;
use crate::session::events::{CompletionReport, EventBus, ProgressSink, UsageSummary};

/// Run lifecycle log line, at `info` when logging is enabled and `debug` otherwise.
macro_rules! lifecycle {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

/// Everything a run needs, frozen at `start()`.
pub(crate) struct RunContext {
    pub(crate) id: String,
    pub(crate) scenes: Arc<Vec<Scene>>,
    pub(crate) options: CompositionOptions,
    pub(crate) audio: Option<AudioTrack>,
    pub(crate) queue: Arc<RenderQueue>,
    pub(crate) cancel: CancelToken,
    pub(crate) state: Arc<Mutex<CompositionState>>,
}

/// Run on a dedicated thread, publishing to `bus`.
pub(crate) fn spawn(ctx: RunContext, bus: EventBus) -> FramecraftResult<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("framecraft-run-{}", ctx.id))
        .spawn(move || drive(ctx, bus))
        .map_err(|e| anyhow::anyhow!("failed to spawn run thread: {e}").into())
}

fn drive(ctx: RunContext, bus: EventBus) {
    let started = Instant::now();
    bus.start();
    let sink = bus.progress_sink();
    match execute(&ctx, &sink, started) {
        Ok(report) => {
            lifecycle!(
                ctx.options.logging_enabled,
                composition = %ctx.id,
                output = %report.output.display(),
                elapsed_ms = report.usage.elapsed.as_millis() as u64,
                "render complete"
            );
            settle(&ctx.state, CompositionState::Completed);
            bus.complete(report);
        }
        Err(e) if e.is_cancelled() && ctx.cancel.is_cancelled() => {
            lifecycle!(ctx.options.logging_enabled, composition = %ctx.id, "render cancelled");
        }
        Err(e) => {
            tracing::warn!(composition = %ctx.id, error = %e, "render failed");
            settle(&ctx.state, CompositionState::Failed);
            bus.fail(e);
        }
    }
}

/// Move a started composition to its terminal state; a destroyed one stays destroyed.
fn settle(state: &Mutex<CompositionState>, to: CompositionState) {
    if let Ok(mut s) = state.lock()
        && *s == CompositionState::Started
    {
        *s = to;
    }
}

#[tracing::instrument(skip_all, fields(composition = %ctx.id, scenes = ctx.scenes.len()))]
fn execute(
    ctx: &RunContext,
    sink: &ProgressSink,
    started: Instant,
) -> FramecraftResult<CompletionReport> {
    let scenes = ctx.scenes.as_slice();
    let cache = ctx.queue.cache();
    cache.prepare()?;

    let steps = (scenes.len() + 1) as f64;
    sink.report(0.0);
    lifecycle!(
        ctx.options.logging_enabled,
        concurrency = ctx.options.concurrency,
        "rendering scenes"
    );
    let artifacts = ctx.queue.run_scenes(
        scenes,
        &ctx.options,
        ctx.options.concurrency,
        &ctx.cancel,
        &|done| sink.report(done as f64 / steps),
    )?;

    let total = output_duration(scenes);
    let audio = ctx
        .audio
        .as_ref()
        .map(|t| AudioMix::plan(t, ctx.options.audio_loop_default, total))
        .transpose()?;

    let staging = cache.staging_path();
    let mut staging_guard = TempFileGuard(Some(staging.clone()));
    lifecycle!(ctx.options.logging_enabled, staging = %staging.display(), "stitching");
    match plan_stitch(&artifacts, scenes, audio.as_ref(), &ctx.options, &staging)? {
        StitchPlan::Copy(artifact) => {
            std::fs::copy(&artifact, &staging).map_err(|e| {
                FramecraftError::from(anyhow::anyhow!(
                    "failed to stage '{}': {e}",
                    artifact.display()
                ))
            })?;
        }
        StitchPlan::Encode(invocation) => {
            ctx.queue.encode_with_retry(&invocation, &ctx.cancel)?;
        }
    }
    if ctx.cancel.is_cancelled() {
        return Err(FramecraftError::Cancelled);
    }

    let output = cache.publish(&staging)?;
    staging_guard.disarm();
    sink.report(1.0);

    let counts = ctx.queue.counts();
    let output_bytes = std::fs::metadata(&output).map_or(0, |m| m.len());
    Ok(CompletionReport {
        output,
        usage: UsageSummary {
            elapsed: started.elapsed(),
            scenes: scenes.len(),
            encoder_invocations: counts.encoder_invocations,
            cache_hits: counts.cache_hits,
            retries: counts.retries,
            output_duration_secs: total,
            output_bytes,
        },
    })
}
