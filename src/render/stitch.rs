//! Final assembly of scene artifacts.
//!
//! Artifacts are joined strictly in scene order. A scene that declares a transition blends its
//! tail into the next scene's head with `xfade`; otherwise the join is a hard cut (`concat`).
//! The optional global audio track is trimmed to the stitched length and mapped alongside.

use std::path::{Path, PathBuf};

use crate::audio::track::{AudioMix, audio_codec_args};
use crate::compile::filter_graph::{base_args, strs, video_codec_args};
use crate::encode::engine::EncoderInvocation;
use crate::eval::timing::{effective_transitions, output_duration};
use crate::foundation::core::fmt_num;
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::render::queue::Artifact;
use crate::scene::model::Scene;
use crate::scene::options::CompositionOptions;

/// Label of the stitch invocation.
pub const STITCH_LABEL: &str = "stitch";

/// How the staging file is produced.
#[derive(Clone, Debug, PartialEq)]
pub enum StitchPlan {
    /// A single scene without audio: the artifact is copied as is.
    Copy(PathBuf),
    /// Everything else goes through the encoder.
    Encode(EncoderInvocation),
}

/// Plan the stitch of `artifacts` (one per scene, in scene order) into `staging`.
pub fn plan_stitch(
    artifacts: &[Artifact],
    scenes: &[Scene],
    audio: Option<&AudioMix>,
    options: &CompositionOptions,
    staging: &Path,
) -> FramecraftResult<StitchPlan> {
    if artifacts.is_empty() || artifacts.len() != scenes.len() {
        return Err(FramecraftError::config(format!(
            "cannot stitch {} artifacts for {} scenes",
            artifacts.len(),
            scenes.len()
        )));
    }
    if let Some(pos) = artifacts.iter().enumerate().position(|(i, a)| a.index != i) {
        return Err(FramecraftError::config(format!(
            "artifact {pos} is out of scene order"
        )));
    }
    if artifacts.len() == 1 && audio.is_none() {
        return Ok(StitchPlan::Copy(artifacts[0].path.clone()));
    }

    let fps = options.fps()?;
    let f = fmt_num(fps.as_f64());
    let total = output_duration(scenes);

    let mut args = base_args(options);
    for a in artifacts {
        args.push("-i".to_owned());
        args.push(a.path.to_string_lossy().into_owned());
    }
    if let Some(mix) = audio {
        args.extend(mix.input_args());
    }

    let mut graph: Vec<String> = (0..artifacts.len())
        .map(|i| format!("[{i}:v]fps={f},settb=AVTB,setpts=PTS-STARTPTS[s{i}]"))
        .collect();
    let mut current = "[s0]".to_owned();
    let mut length = scenes[0].duration();
    for (i, transition) in effective_transitions(scenes)
        .into_iter()
        .enumerate()
        .take(scenes.len() - 1)
    {
        let next = i + 1;
        let out = format!("[j{next}]");
        match transition {
            Some(t) => {
                let offset = (length - t.duration_secs).max(0.0);
                graph.push(format!(
                    "{current}[s{next}]xfade=transition={}:duration={}:offset={}{out}",
                    t.kind.xfade_name(),
                    fmt_num(t.duration_secs),
                    fmt_num(offset)
                ));
                length = offset + scenes[next].duration();
            }
            None => {
                graph.push(format!("{current}[s{next}]concat=n=2:v=1:a=0{out}"));
                length += scenes[next].duration();
            }
        }
        current = out;
    }
    graph.push(format!(
        "{current}format={}[vout]",
        options.video_encoding_params.pixel_format
    ));
    if let Some(mix) = audio {
        graph.push(mix.filter(artifacts.len()));
    }

    args.extend(strs(["-filter_complex", &graph.join(";"), "-map", "[vout]"]));
    if audio.is_some() {
        args.extend(strs(["-map", "[aout]"]));
    }
    args.extend(strs(["-t", &fmt_num(total), "-r", &f]));
    args.extend(video_codec_args(&options.video_encoding_params));
    match audio {
        Some(_) => args.extend(audio_codec_args(&options.audio_encoding_params)),
        None => args.push("-an".to_owned()),
    }
    args.extend(strs(["-movflags", "+faststart", "-f", "mp4"]));
    args.push(staging.to_string_lossy().into_owned());

    Ok(StitchPlan::Encode(EncoderInvocation {
        label: STITCH_LABEL.to_owned(),
        args,
        output: staging.to_owned(),
        side_files: Vec::new(),
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/render/stitch.rs"]
mod tests;
