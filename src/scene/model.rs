use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::animation::anim::Animation;
use crate::animation::presets::expand_effect;
use crate::effects::transitions::TransitionSpec;
use crate::foundation::core::{Size, Vec2};
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::scene::color::Color;

/// Scene duration used until [`Scene::set_duration`] is called.
pub const DEFAULT_SCENE_DURATION: f64 = 10.0;

/// A time-bounded segment of the output.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    duration: f64,
    background: Option<Color>,
    elements: Vec<Element>,
    transition: Option<TransitionSpec>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene lasting [`DEFAULT_SCENE_DURATION`] seconds.
    pub fn new() -> Self {
        Self {
            duration: DEFAULT_SCENE_DURATION,
            background: None,
            elements: Vec::new(),
            transition: None,
        }
    }

    /// Append an element and return its z-order index.
    pub fn add_element(&mut self, element: Element) -> usize {
        self.elements.push(element);
        self.elements.len() - 1
    }

    /// Set the scene duration in seconds.
    pub fn set_duration(&mut self, duration: f64) -> FramecraftResult<&mut Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(FramecraftError::config(format!(
                "scene duration must be finite and > 0 (got {duration})"
            )));
        }
        self.duration = duration;
        Ok(self)
    }

    /// Fill the canvas with a solid color.
    pub fn set_background(&mut self, color: Color) -> &mut Self {
        self.background = Some(color);
        self
    }

    /// Blend into the next scene with the named transition over `duration_ms` milliseconds.
    pub fn set_transition(&mut self, name: &str, duration_ms: f64) -> FramecraftResult<&mut Self> {
        self.transition = Some(TransitionSpec::from_millis(name, duration_ms)?);
        Ok(self)
    }

    /// Scene duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Background color, when set.
    pub fn background(&self) -> Option<Color> {
        self.background
    }

    /// Elements in z-order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Mutable access to one element.
    pub fn element_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.elements.get_mut(index)
    }

    /// Transition into the next scene, when set.
    pub fn transition(&self) -> Option<TransitionSpec> {
        self.transition
    }
}

/// Text alignment inside the text box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Left aligned.
    Left,
    /// Centered.
    #[default]
    Center,
    /// Right aligned.
    Right,
}

/// Outline drawn around text glyphs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextBorder {
    /// Outline width in pixels.
    pub width: f64,
    /// Outline color.
    pub color: Color,
}

/// Text payload and styling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// Text content.
    pub text: String,
    /// Font size in pixels.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Glyph color.
    #[serde(default = "default_text_color")]
    pub color: Color,
    /// Box color behind the text.
    #[serde(default)]
    pub background_color: Option<Color>,
    /// Glyph outline.
    #[serde(default)]
    pub border: Option<TextBorder>,
    /// Font file; the encoder default font when unset.
    #[serde(default)]
    pub font_file: Option<PathBuf>,
    /// Alignment of multi-line text.
    #[serde(default)]
    pub alignment: TextAlign,
}

fn default_font_size() -> f64 {
    24.0
}

fn default_text_color() -> Color {
    Color::WHITE
}

/// Video source trim and playback settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSource {
    /// Source media path.
    pub path: PathBuf,
    /// Trim start in source time (seconds).
    #[serde(default, rename = "clipStartTime")]
    pub clip_start: f64,
    /// Trim end in source time; the source end when unset.
    #[serde(default, rename = "clipEndTime")]
    pub clip_end: Option<f64>,
    /// Wrap playback at the clip boundary.
    #[serde(default, rename = "loop")]
    pub looped: bool,
    /// Keep the source audio. Recorded on the element; the stitched output only carries the
    /// global audio track.
    #[serde(default)]
    pub audio: bool,
}

/// Element variants and their payloads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    /// Still image.
    Image {
        /// Source path.
        path: PathBuf,
    },
    /// Animated image, looped for the element window.
    Gif {
        /// Source path.
        path: PathBuf,
    },
    /// Video clip.
    Video(VideoSource),
    /// Rendered text.
    Text(TextStyle),
}

/// A positioned, time-bounded item placed within a scene.
///
/// `position` addresses the element's center in canvas pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    kind: ElementKind,
    position: Vec2,
    size: Option<Size>,
    appear_time: f64,
    duration: Option<f64>,
    scale: f64,
    rotation_deg: f64,
    animations: Vec<Animation>,
}

impl Element {
    fn with_kind(kind: ElementKind) -> Self {
        Self {
            kind,
            position: Vec2::ZERO,
            size: None,
            appear_time: 0.0,
            duration: None,
            scale: 1.0,
            rotation_deg: 0.0,
            animations: Vec::new(),
        }
    }

    /// Still image element.
    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self::with_kind(ElementKind::Image { path: path.into() })
    }

    /// Animated GIF element.
    pub fn gif(path: impl Into<PathBuf>) -> Self {
        Self::with_kind(ElementKind::Gif { path: path.into() })
    }

    /// Video element playing the whole source from its start.
    pub fn video(path: impl Into<PathBuf>) -> Self {
        Self::with_kind(ElementKind::Video(VideoSource {
            path: path.into(),
            clip_start: 0.0,
            clip_end: None,
            looped: false,
            audio: false,
        }))
    }

    /// Text element with default styling.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_kind(ElementKind::Text(TextStyle {
            text: text.into(),
            font_size: default_font_size(),
            color: default_text_color(),
            background_color: None,
            border: None,
            font_file: None,
            alignment: TextAlign::default(),
        }))
    }

    /// Build from an already-populated variant.
    pub fn from_kind(kind: ElementKind) -> FramecraftResult<Self> {
        if let ElementKind::Video(v) = &kind {
            check_clip(v.clip_start, v.clip_end)?;
        }
        if let ElementKind::Text(t) = &kind {
            check_font_size(t.font_size)?;
        }
        Ok(Self::with_kind(kind))
    }

    /// Look up a named effect preset and append its expansion; returns the number of descriptors
    /// appended.
    pub fn add_effect(&mut self, name: &str, time: f64, delay: f64) -> FramecraftResult<usize> {
        let expansion = expand_effect(name, time, delay)?;
        let n = expansion.len();
        self.animations.extend(expansion);
        Ok(n)
    }

    /// Apply several presets with the same timing. Nothing is appended when any name is
    /// unknown.
    pub fn add_effects(&mut self, names: &[&str], time: f64, delay: f64) -> FramecraftResult<usize> {
        let mut staged = Vec::new();
        for name in names {
            staged.extend(expand_effect(name, time, delay)?);
        }
        let n = staged.len();
        self.animations.extend(staged);
        Ok(n)
    }

    /// Append a caller-supplied descriptor unchanged.
    pub fn add_animate(&mut self, animation: Animation) -> FramecraftResult<&mut Self> {
        animation.validate()?;
        self.animations.push(animation);
        Ok(self)
    }

    /// Set the static scale factor.
    pub fn set_scale(&mut self, scale: f64) -> FramecraftResult<&mut Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(FramecraftError::config(format!(
                "element scale must be finite and > 0 (got {scale})"
            )));
        }
        self.scale = scale;
        Ok(self)
    }

    /// Set the static rotation in degrees.
    pub fn set_rotate(&mut self, degrees: f64) -> FramecraftResult<&mut Self> {
        if !degrees.is_finite() {
            return Err(FramecraftError::config("element rotation must be finite"));
        }
        self.rotation_deg = degrees;
        Ok(self)
    }

    /// Place the element's center at `(x, y)`.
    pub fn set_position(&mut self, x: f64, y: f64) -> FramecraftResult<&mut Self> {
        if !x.is_finite() || !y.is_finite() {
            return Err(FramecraftError::config("element position must be finite"));
        }
        self.position = Vec2::new(x, y);
        Ok(self)
    }

    /// Set the displayed size in pixels.
    pub fn set_size(&mut self, width: f64, height: f64) -> FramecraftResult<&mut Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(FramecraftError::config(format!(
                "element size must be finite and > 0 (got {width}x{height})"
            )));
        }
        self.size = Some(Size::new(width, height));
        Ok(self)
    }

    /// Offset from the scene start, in seconds.
    pub fn set_appear_time(&mut self, secs: f64) -> FramecraftResult<&mut Self> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(FramecraftError::config(format!(
                "appearTime must be finite and >= 0 (got {secs})"
            )));
        }
        self.appear_time = secs;
        Ok(self)
    }

    /// Visible duration in seconds; clamped to the scene end when resolved.
    pub fn set_duration(&mut self, secs: f64) -> FramecraftResult<&mut Self> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(FramecraftError::config(format!(
                "element duration must be finite and >= 0 (got {secs})"
            )));
        }
        self.duration = Some(secs);
        Ok(self)
    }

    /// Trim a video source to `[start, end)`.
    pub fn set_clip(&mut self, start: f64, end: Option<f64>) -> FramecraftResult<&mut Self> {
        check_clip(start, end)?;
        let v = self.video_mut("setClip")?;
        v.clip_start = start;
        v.clip_end = end;
        Ok(self)
    }

    /// Wrap video playback at the clip boundary.
    pub fn set_loop(&mut self, looped: bool) -> FramecraftResult<&mut Self> {
        self.video_mut("setLoop")?.looped = looped;
        Ok(self)
    }

    /// Keep the video's own audio stream.
    pub fn set_audio(&mut self, audio: bool) -> FramecraftResult<&mut Self> {
        self.video_mut("setAudio")?.audio = audio;
        Ok(self)
    }

    /// Glyph color.
    pub fn set_color(&mut self, color: Color) -> FramecraftResult<&mut Self> {
        self.text_mut("setColor")?.color = color;
        Ok(self)
    }

    /// Box color behind text.
    pub fn set_background_color(&mut self, color: Color) -> FramecraftResult<&mut Self> {
        self.text_mut("setBackgroundColor")?.background_color = Some(color);
        Ok(self)
    }

    /// Glyph outline.
    pub fn set_border(&mut self, width: f64, color: Color) -> FramecraftResult<&mut Self> {
        if !width.is_finite() || width < 0.0 {
            return Err(FramecraftError::config("text border width must be >= 0"));
        }
        self.text_mut("setBorder")?.border = Some(TextBorder { width, color });
        Ok(self)
    }

    /// Font size in pixels.
    pub fn set_font_size(&mut self, size: f64) -> FramecraftResult<&mut Self> {
        check_font_size(size)?;
        self.text_mut("setFontSize")?.font_size = size;
        Ok(self)
    }

    /// Font file used for rendering.
    pub fn set_font_file(&mut self, path: impl Into<PathBuf>) -> FramecraftResult<&mut Self> {
        self.text_mut("setFontFile")?.font_file = Some(path.into());
        Ok(self)
    }

    /// Alignment of multi-line text.
    pub fn set_alignment(&mut self, alignment: TextAlign) -> FramecraftResult<&mut Self> {
        self.text_mut("setAlignment")?.alignment = alignment;
        Ok(self)
    }

    /// Variant payload.
    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Center position.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Displayed size; the source's natural size when unset.
    pub fn size(&self) -> Option<Size> {
        self.size
    }

    /// Offset from the scene start.
    pub fn appear_time(&self) -> f64 {
        self.appear_time
    }

    /// Requested duration; the rest of the scene when unset.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Static scale factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Static rotation in degrees.
    pub fn rotation_deg(&self) -> f64 {
        self.rotation_deg
    }

    /// Animations in composition order.
    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    /// Source file read by this element, if any.
    pub fn source_path(&self) -> Option<&Path> {
        match &self.kind {
            ElementKind::Image { path } | ElementKind::Gif { path } => Some(path),
            ElementKind::Video(v) => Some(&v.path),
            ElementKind::Text(t) => t.font_file.as_deref(),
        }
    }

    fn video_mut(&mut self, op: &str) -> FramecraftResult<&mut VideoSource> {
        match &mut self.kind {
            ElementKind::Video(v) => Ok(v),
            _ => Err(FramecraftError::config(format!(
                "{op} is only valid on video elements"
            ))),
        }
    }

    fn text_mut(&mut self, op: &str) -> FramecraftResult<&mut TextStyle> {
        match &mut self.kind {
            ElementKind::Text(t) => Ok(t),
            _ => Err(FramecraftError::config(format!(
                "{op} is only valid on text elements"
            ))),
        }
    }
}

fn check_clip(start: f64, end: Option<f64>) -> FramecraftResult<()> {
    if !start.is_finite() || start < 0.0 {
        return Err(FramecraftError::config(format!(
            "clipStartTime must be finite and >= 0 (got {start})"
        )));
    }
    if let Some(end) = end
        && !(end.is_finite() && end > start)
    {
        return Err(FramecraftError::config(format!(
            "clipEndTime must exceed clipStartTime (got {start}..{end})"
        )));
    }
    Ok(())
}

fn check_font_size(size: f64) -> FramecraftResult<()> {
    if !size.is_finite() || size <= 0.0 {
        return Err(FramecraftError::config(format!(
            "font size must be finite and > 0 (got {size})"
        )));
    }
    Ok(())
}

/// Global audio track mixed onto the stitched output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioTrack {
    /// Source path.
    pub path: PathBuf,
    /// Linear gain.
    #[serde(default = "default_volume")]
    pub volume: f64,
    /// Fade-in length in seconds.
    #[serde(default)]
    pub fade_in: f64,
    /// Fade-out length in seconds.
    #[serde(default)]
    pub fade_out: f64,
    /// Repeat the source to cover the output; `audioLoopDefault` when unset.
    #[serde(default, rename = "loop")]
    pub looped: Option<bool>,
}

fn default_volume() -> f64 {
    1.0
}

impl AudioTrack {
    /// Track at unit volume with no fades.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            volume: default_volume(),
            fade_in: 0.0,
            fade_out: 0.0,
            looped: None,
        }
    }

    /// Check gain and envelope parameters.
    pub fn validate(&self) -> FramecraftResult<()> {
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(FramecraftError::config("audio volume must be finite and >= 0"));
        }
        if !(self.fade_in.is_finite() && self.fade_in >= 0.0)
            || !(self.fade_out.is_finite() && self.fade_out >= 0.0)
        {
            return Err(FramecraftError::config(
                "audio fade durations must be finite and >= 0",
            ));
        }
        if self.path.as_os_str().is_empty() {
            return Err(FramecraftError::config("audio path must be non-empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
