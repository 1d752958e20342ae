use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::foundation::core::Fps;
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::scene::color::Color;

/// Video stream encoding parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct VideoEncodingParams {
    /// Encoder name (`libx264`, `libx265`, ...).
    pub codec: String,
    /// Target bitrate (`"4M"`); when unset, quality-based rate control is used.
    pub bitrate: Option<String>,
    /// Encoder speed preset.
    pub preset: Option<String>,
    /// Constant rate factor.
    pub quality_factor: Option<u32>,
    /// Codec profile.
    pub profile: Option<String>,
    /// Codec level.
    pub level: Option<String>,
    /// Rate-control ceiling.
    pub max_bitrate: Option<String>,
    /// Rate-control buffer size.
    pub buffer_size: Option<String>,
    /// GOP length in frames.
    pub keyframe_interval: Option<u32>,
    /// Output pixel format.
    pub pixel_format: String,
}

impl Default for VideoEncodingParams {
    fn default() -> Self {
        Self {
            codec: "libx264".to_owned(),
            bitrate: None,
            preset: Some("medium".to_owned()),
            quality_factor: Some(23),
            profile: None,
            level: None,
            max_bitrate: None,
            buffer_size: None,
            keyframe_interval: None,
            pixel_format: "yuv420p".to_owned(),
        }
    }
}

/// Audio stream encoding parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct AudioEncodingParams {
    /// Encoder name.
    pub codec: String,
    /// Target bitrate.
    pub bitrate: String,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Output channel count.
    pub channels: u32,
}

impl Default for AudioEncodingParams {
    fn default() -> Self {
        Self {
            codec: "aac".to_owned(),
            bitrate: "128k".to_owned(),
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

/// Composition-wide configuration.
///
/// Defaults are applied once at construction; [`CompositionOptions::set`] rejects unknown keys
/// and re-validates the whole struct after every change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CompositionOptions {
    /// Output width in pixels (even).
    pub frame_width: u32,
    /// Output height in pixels (even).
    pub frame_height: u32,
    /// Output frames per second.
    pub frame_rate: u32,
    /// Maximum number of scene jobs encoding at once.
    pub concurrency: usize,
    /// Directory holding per-fingerprint intermediate artifacts.
    pub cache_dir: PathBuf,
    /// Directory that relative output paths resolve against.
    pub output_dir: PathBuf,
    /// Promote run lifecycle logs to `info` and let the encoder log.
    pub logging_enabled: bool,
    /// Canvas color for scenes without an explicit background.
    pub default_background_color: Color,
    /// Default `loop` flag for audio tracks.
    pub audio_loop_default: bool,
    /// Video stream parameters.
    pub video_encoding_params: VideoEncodingParams,
    /// Audio stream parameters.
    pub audio_encoding_params: AudioEncodingParams,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        let base = std::env::temp_dir().join("framecraft");
        Self {
            frame_width: 1280,
            frame_height: 720,
            frame_rate: 30,
            concurrency: 1,
            cache_dir: base.join("cache"),
            output_dir: base.join("output"),
            logging_enabled: false,
            default_background_color: Color::BLACK,
            audio_loop_default: false,
            video_encoding_params: VideoEncodingParams::default(),
            audio_encoding_params: AudioEncodingParams::default(),
        }
    }
}

impl CompositionOptions {
    /// Frame rate as a rational.
    pub fn fps(&self) -> FramecraftResult<Fps> {
        Fps::new(self.frame_rate, 1)
    }

    /// Check every field.
    pub fn validate(&self) -> FramecraftResult<()> {
        for (name, v) in [
            ("frameWidth", self.frame_width),
            ("frameHeight", self.frame_height),
        ] {
            if v == 0 || v % 2 != 0 {
                return Err(FramecraftError::config(format!(
                    "{name} must be a positive even number (got {v})"
                )));
            }
        }
        if self.frame_rate == 0 || self.frame_rate > 240 {
            return Err(FramecraftError::config(format!(
                "frameRate must be in 1..=240 (got {})",
                self.frame_rate
            )));
        }
        if self.concurrency == 0 {
            return Err(FramecraftError::config("concurrency must be >= 1"));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(FramecraftError::config("cacheDir must be non-empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(FramecraftError::config("outputDir must be non-empty"));
        }

        let v = &self.video_encoding_params;
        if v.codec.trim().is_empty() {
            return Err(FramecraftError::config(
                "videoEncodingParams.codec must be non-empty",
            ));
        }
        if v.pixel_format.trim().is_empty() {
            return Err(FramecraftError::config(
                "videoEncodingParams.pixelFormat must be non-empty",
            ));
        }
        if v.quality_factor.is_some_and(|q| q > 63) {
            return Err(FramecraftError::config(
                "videoEncodingParams.qualityFactor must be <= 63",
            ));
        }
        if v.keyframe_interval == Some(0) {
            return Err(FramecraftError::config(
                "videoEncodingParams.keyframeInterval must be >= 1",
            ));
        }

        let a = &self.audio_encoding_params;
        if a.codec.trim().is_empty() {
            return Err(FramecraftError::config(
                "audioEncodingParams.codec must be non-empty",
            ));
        }
        if a.sample_rate == 0 {
            return Err(FramecraftError::config(
                "audioEncodingParams.sampleRate must be > 0",
            ));
        }
        if !(1..=8).contains(&a.channels) {
            return Err(FramecraftError::config(
                "audioEncodingParams.channels must be in 1..=8",
            ));
        }
        Ok(())
    }

    /// Read an option by key (`frameRate`, `videoEncodingParams.codec`, ...).
    pub fn get(&self, key: &str) -> FramecraftResult<Value> {
        let tree = serde_json::to_value(self)?;
        let mut cur = &tree;
        for part in split_key(key)? {
            cur = cur
                .as_object()
                .and_then(|o| o.get(part))
                .ok_or_else(|| unknown_key(key))?;
        }
        Ok(cur.clone())
    }

    /// Write an option by key. The struct is left untouched when the key is unknown, the value
    /// has the wrong type, or the result fails validation.
    pub fn set(&mut self, key: &str, value: Value) -> FramecraftResult<()> {
        let parts = split_key(key)?;
        let mut tree = serde_json::to_value(&*self)?;
        let mut cur = &mut tree;
        let (last, parents) = parts.split_last().ok_or_else(|| unknown_key(key))?;
        for part in parents {
            cur = cur
                .as_object_mut()
                .and_then(|o| o.get_mut(*part))
                .ok_or_else(|| unknown_key(key))?;
        }
        let slot = cur
            .as_object_mut()
            .and_then(|o| o.get_mut(*last))
            .ok_or_else(|| unknown_key(key))?;
        *slot = value;

        let next: Self = serde_json::from_value(tree)
            .map_err(|e| FramecraftError::config(format!("invalid value for '{key}': {e}")))?;
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Every settable key, dotted for nested parameters.
    pub fn keys() -> Vec<String> {
        let mut out = Vec::new();
        if let Ok(Value::Object(top)) = serde_json::to_value(Self::default()) {
            for (k, v) in top {
                match v {
                    Value::Object(inner) => {
                        out.extend(inner.keys().map(|ik| format!("{k}.{ik}")));
                    }
                    _ => out.push(k),
                }
            }
        }
        out
    }
}

fn split_key(key: &str) -> FramecraftResult<Vec<&str>> {
    let parts: Vec<&str> = key.trim().split('.').collect();
    if parts.iter().any(|p| p.is_empty()) || parts.len() > 2 {
        return Err(unknown_key(key));
    }
    Ok(parts)
}

fn unknown_key(key: &str) -> FramecraftError {
    FramecraftError::config(format!("unknown option '{key}'"))
}

#[cfg(test)]
#[path = "../../tests/unit/scene/options.rs"]
mod tests;
