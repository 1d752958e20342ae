use std::path::Path;

use crate::compile::filter_graph::compile_scene;
use crate::compile::fingerprint::{Fingerprint, SourceStamp, fingerprint_scene};
use crate::encode::engine::{EncoderInvocation, EncodingEngine};
use crate::eval::timing::{PlaybackPolicy, ResolvedScene, resolve_scene};
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::scene::model::{ElementKind, Scene};
use crate::scene::options::CompositionOptions;

/// One scene's render job: resolved timing, source stamps and the fingerprint that keys it.
#[derive(Clone, Debug)]
pub struct SceneJob {
    /// Scene position in the composition.
    pub index: usize,
    /// Label for logs and errors.
    pub label: String,
    /// Frozen scene description.
    pub scene: Scene,
    /// Resolved timing, with probed clip ends filled in for looping video.
    pub resolved: ResolvedScene,
    /// Stamps of every referenced source file.
    pub sources: Vec<SourceStamp>,
    /// Job key.
    pub fingerprint: Fingerprint,
}

impl SceneJob {
    /// Resolve, stat sources and fingerprint one scene.
    ///
    /// Missing sources fail with [`FramecraftError::ResourceNotFound`]. A looping video trimmed
    /// only at its start is probed through `engine` so it can wrap at the source end.
    pub fn prepare(
        index: usize,
        scene: &Scene,
        options: &CompositionOptions,
        engine: &dyn EncodingEngine,
    ) -> FramecraftResult<Self> {
        let label = format!("scene {index}");
        let mut resolved = resolve_scene(index, scene, options.default_background_color);

        let mut sources = Vec::new();
        for element in scene.elements() {
            if let Some(path) = element.source_path() {
                sources.push(SourceStamp::read(path)?);
            }
        }

        for (element, r) in scene.elements().iter().zip(resolved.elements.iter_mut()) {
            let (ElementKind::Video(v), Some(playback)) = (element.kind(), r.playback.as_mut())
            else {
                continue;
            };
            if playback.policy != PlaybackPolicy::Wrap
                || playback.whole_source
                || playback.clip_end.is_some()
            {
                continue;
            }
            if r.window.is_empty() {
                continue;
            }
            let source_len = engine.probe_duration(&v.path)?;
            if source_len <= playback.clip_start {
                return Err(FramecraftError::config(format!(
                    "{label}: clipStartTime {}s is past the end of '{}' ({source_len}s)",
                    playback.clip_start,
                    v.path.display()
                )));
            }
            playback.clip_end = Some(source_len);
        }

        let fingerprint = fingerprint_scene(index, scene, options, &sources);
        Ok(Self {
            index,
            label,
            scene: scene.clone(),
            resolved,
            sources,
            fingerprint,
        })
    }

    /// Encoder invocation writing this job's artifact to `output`.
    pub fn compile(
        &self,
        options: &CompositionOptions,
        output: &Path,
    ) -> FramecraftResult<EncoderInvocation> {
        compile_scene(&self.label, &self.scene, &self.resolved, options, output)
    }
}
