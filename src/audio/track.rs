use std::path::PathBuf;

use crate::foundation::core::fmt_num;
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::scene::model::AudioTrack;
use crate::scene::options::AudioEncodingParams;

/// Global audio track resolved against the stitched output length.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioMix {
    /// Source path.
    pub path: PathBuf,
    /// Repeat the source until the output ends.
    pub looped: bool,
    /// Linear gain.
    pub volume: f64,
    /// Fade-in length, clamped to the output length.
    pub fade_in: f64,
    /// Fade-out length, clamped to the output length.
    pub fade_out: f64,
    /// Output length the track is trimmed to.
    pub total_secs: f64,
}

impl AudioMix {
    /// Resolve `track`; an unset loop flag falls back to `loop_default`.
    ///
    /// The source must exist ([`FramecraftError::ResourceNotFound`] otherwise).
    pub fn plan(track: &AudioTrack, loop_default: bool, total_secs: f64) -> FramecraftResult<Self> {
        track.validate()?;
        if !track.path.is_file() {
            return Err(FramecraftError::resource_not_found(&track.path));
        }
        Ok(Self {
            path: track.path.clone(),
            looped: track.looped.unwrap_or(loop_default),
            volume: track.volume,
            fade_in: track.fade_in.min(total_secs),
            fade_out: track.fade_out.min(total_secs),
            total_secs,
        })
    }

    /// Input arguments for the track (`-stream_loop -1` when looping).
    pub fn input_args(&self) -> Vec<String> {
        let mut a = Vec::new();
        if self.looped {
            a.extend(["-stream_loop".to_owned(), "-1".to_owned()]);
        }
        a.push("-i".to_owned());
        a.push(self.path.to_string_lossy().into_owned());
        a
    }

    /// Filter chain from input `input` to the `[aout]` label: trim to the output length, apply
    /// gain, then the fade envelopes.
    pub fn filter(&self, input: usize) -> String {
        let total = fmt_num(self.total_secs);
        let mut chain = vec![
            format!("atrim=0:{total}"),
            "asetpts=PTS-STARTPTS".to_owned(),
            format!("volume={}", fmt_num(self.volume)),
        ];
        if self.fade_in > 0.0 {
            chain.push(format!("afade=t=in:st=0:d={}", fmt_num(self.fade_in)));
        }
        if self.fade_out > 0.0 {
            chain.push(format!(
                "afade=t=out:st={}:d={}",
                fmt_num((self.total_secs - self.fade_out).max(0.0)),
                fmt_num(self.fade_out)
            ));
        }
        format!("[{input}:a]{}[aout]", chain.join(","))
    }
}

/// Audio codec arguments for `params`.
pub fn audio_codec_args(params: &AudioEncodingParams) -> Vec<String> {
    vec![
        "-c:a".to_owned(),
        params.codec.clone(),
        "-b:a".to_owned(),
        params.bitrate.clone(),
        "-ar".to_owned(),
        params.sample_rate.to_string(),
        "-ac".to_owned(),
        params.channels.to_string(),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/audio/track.rs"]
mod tests;
