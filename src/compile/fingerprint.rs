use std::fmt;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use xxhash_rust::xxh3::Xxh3;

use crate::animation::anim::{Animation, AnimationKind, ShowType, TransformDelta};
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::scene::color::Color;
use crate::scene::model::{ElementKind, Scene, TextAlign};
use crate::scene::options::CompositionOptions;

const XXH3_SEED: u64 = 0x8b5ad4a0c7d8e9f1;
const FORMAT_VERSION: u32 = 1;

/// Stable 128-bit render job key.
///
/// Used both as the artifact file name in the cache directory and as the in-flight
/// de-duplication key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    /// High 64 bits.
    pub hi: u64,
    /// Low 64 bits.
    pub lo: u64,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.hi, self.lo)
    }
}

/// Size and modification time of a source file, so edited sources invalidate cached artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceStamp {
    /// Source path as referenced by the element.
    pub path: PathBuf,
    /// File length in bytes.
    pub len: u64,
    /// Modification time in nanoseconds since the epoch (0 when unavailable).
    pub modified_nanos: u128,
}

impl SourceStamp {
    /// Stat `path`; a missing or unreadable file is [`FramecraftError::ResourceNotFound`].
    pub fn read(path: &Path) -> FramecraftResult<Self> {
        let meta = std::fs::metadata(path)
            .map_err(|_| FramecraftError::resource_not_found(path))?;
        if !meta.is_file() {
            return Err(FramecraftError::resource_not_found(path));
        }
        let modified_nanos = meta
            .modified()
            .ok()
            .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_nanos());
        Ok(Self {
            path: path.to_owned(),
            len: meta.len(),
            modified_nanos,
        })
    }
}

/// Fingerprint one scene job: scene index, scene content, output parameters and source stamps.
pub fn fingerprint_scene(
    index: usize,
    scene: &Scene,
    options: &CompositionOptions,
    sources: &[SourceStamp],
) -> Fingerprint {
    let mut h = StableHasher::new();
    h.write_u32(FORMAT_VERSION);
    h.write_u64(index as u64);
    write_options(&mut h, options);
    write_scene(&mut h, scene, options.default_background_color);
    h.write_u32(sources.len() as u32);
    for s in sources {
        h.write_str(&s.path.to_string_lossy());
        h.write_u64(s.len);
        h.write_u128(s.modified_nanos);
    }
    h.finish()
}

struct StableHasher {
    inner: Xxh3,
}

impl StableHasher {
    fn new() -> Self {
        Self {
            inner: Xxh3::with_seed(XXH3_SEED),
        }
    }

    fn write_bytes(&mut self, b: &[u8]) {
        self.inner.update(b);
    }

    fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_u128(&mut self, v: u128) {
        self.write_bytes(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    fn write_opt_str(&mut self, s: Option<&str>) {
        self.write_bool(s.is_some());
        if let Some(s) = s {
            self.write_str(s);
        }
    }

    fn write_opt_f64(&mut self, v: Option<f64>) {
        self.write_bool(v.is_some());
        if let Some(v) = v {
            self.write_f64(v);
        }
    }

    fn write_color(&mut self, c: Color) {
        self.write_bytes(&[c.r, c.g, c.b, c.a]);
    }

    fn finish(self) -> Fingerprint {
        let v = self.inner.digest128();
        Fingerprint {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

fn write_options(h: &mut StableHasher, o: &CompositionOptions) {
    h.write_u32(o.frame_width);
    h.write_u32(o.frame_height);
    h.write_u32(o.frame_rate);
    let v = &o.video_encoding_params;
    h.write_str(&v.codec);
    h.write_opt_str(v.bitrate.as_deref());
    h.write_opt_str(v.preset.as_deref());
    h.write_bool(v.quality_factor.is_some());
    h.write_u32(v.quality_factor.unwrap_or(0));
    h.write_opt_str(v.profile.as_deref());
    h.write_opt_str(v.level.as_deref());
    h.write_opt_str(v.max_bitrate.as_deref());
    h.write_opt_str(v.buffer_size.as_deref());
    h.write_bool(v.keyframe_interval.is_some());
    h.write_u32(v.keyframe_interval.unwrap_or(0));
    h.write_str(&v.pixel_format);
}

fn write_scene(h: &mut StableHasher, scene: &Scene, default_background: Color) {
    h.write_f64(scene.duration());
    h.write_color(scene.background().unwrap_or(default_background));
    h.write_u32(scene.elements().len() as u32);
    for e in scene.elements() {
        write_kind(h, e.kind());
        h.write_f64(e.position().x);
        h.write_f64(e.position().y);
        h.write_opt_f64(e.size().map(|s| s.width));
        h.write_opt_f64(e.size().map(|s| s.height));
        h.write_f64(e.appear_time());
        h.write_opt_f64(e.duration());
        h.write_f64(e.scale());
        h.write_f64(e.rotation_deg());
        h.write_u32(e.animations().len() as u32);
        for a in e.animations() {
            write_animation(h, a);
        }
    }
}

fn write_kind(h: &mut StableHasher, kind: &ElementKind) {
    match kind {
        ElementKind::Image { path } => {
            h.write_u8(0);
            h.write_str(&path.to_string_lossy());
        }
        ElementKind::Gif { path } => {
            h.write_u8(1);
            h.write_str(&path.to_string_lossy());
        }
        ElementKind::Video(v) => {
            h.write_u8(2);
            h.write_str(&v.path.to_string_lossy());
            h.write_f64(v.clip_start);
            h.write_opt_f64(v.clip_end);
            h.write_bool(v.looped);
            h.write_bool(v.audio);
        }
        ElementKind::Text(t) => {
            h.write_u8(3);
            h.write_str(&t.text);
            h.write_f64(t.font_size);
            h.write_color(t.color);
            h.write_bool(t.background_color.is_some());
            h.write_color(t.background_color.unwrap_or(Color::TRANSPARENT));
            h.write_opt_f64(t.border.map(|b| b.width));
            h.write_color(t.border.map_or(Color::TRANSPARENT, |b| b.color));
            h.write_opt_str(t.font_file.as_deref().map(|p| p.to_string_lossy()).as_deref());
            h.write_u8(match t.alignment {
                TextAlign::Left => 0,
                TextAlign::Center => 1,
                TextAlign::Right => 2,
            });
        }
    }
}

fn write_animation(h: &mut StableHasher, a: &Animation) {
    match a.kind {
        AnimationKind::Move { from, to } => {
            h.write_u8(0);
            for v in [from.x, from.y, to.x, to.y] {
                h.write_f64(v);
            }
        }
        AnimationKind::Fade { from, to } => {
            h.write_u8(1);
            h.write_f64(from);
            h.write_f64(to);
        }
        AnimationKind::Zoom { from, to } => {
            h.write_u8(2);
            h.write_f64(from);
            h.write_f64(to);
        }
        AnimationKind::Rotate { from, to } => {
            h.write_u8(3);
            h.write_f64(from);
            h.write_f64(to);
        }
        AnimationKind::Custom { from, to } => {
            h.write_u8(4);
            write_delta(h, from);
            write_delta(h, to);
        }
    }
    h.write_bool(a.show_type == ShowType::Out);
    h.write_f64(a.time);
    h.write_f64(a.delay);
    h.write_str(a.ease.name());
}

fn write_delta(h: &mut StableHasher, d: TransformDelta) {
    h.write_f64(d.translate.x);
    h.write_f64(d.translate.y);
    h.write_f64(d.scale);
    h.write_f64(d.rotation_deg);
    h.write_f64(d.opacity);
}

#[cfg(test)]
#[path = "../../tests/unit/compile/fingerprint.rs"]
mod tests;
