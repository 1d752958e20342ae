//! JSON document form of a composition.
//!
//! A document is replayed through the same validating calls as the method surface, so a
//! document that loads is exactly as valid as the equivalent sequence of calls.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::animation::anim::Animation;
use crate::encode::engine::EncodingEngine;
use crate::foundation::core::{Size, Vec2};
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::scene::color::Color;
use crate::scene::composition::Composition;
use crate::scene::model::{AudioTrack, Element, ElementKind, Scene};
use crate::scene::options::CompositionOptions;

/// Whole composition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompositionDocument {
    /// Options; unset keys keep their defaults.
    #[serde(default)]
    pub options: CompositionOptions,
    /// Scenes in order.
    pub scenes: Vec<SceneDocument>,
    /// Global audio track.
    #[serde(default)]
    pub audio: Option<AudioTrack>,
    /// Output file, relative to `outputDir` unless absolute.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// One scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SceneDocument {
    /// Seconds; 10 when unset.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Solid background.
    #[serde(default)]
    pub background: Option<Color>,
    /// Transition into the next scene.
    #[serde(default)]
    pub transition: Option<TransitionDocument>,
    /// Elements in z-order.
    #[serde(default)]
    pub elements: Vec<ElementDocument>,
}

/// Transition by name and length in milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransitionDocument {
    /// Transition name (`fade`, `wipeleft`, ...).
    pub name: String,
    /// Milliseconds.
    pub duration: f64,
}

/// Named effect preset application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EffectDocument {
    /// Preset name (`fadeIn`, `moveInLeft`, ...).
    pub name: String,
    /// Ramp length in seconds.
    pub time: f64,
    /// Offset in seconds.
    #[serde(default)]
    pub delay: f64,
}

/// One element: its variant payload plus placement, timing and motion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDocument {
    /// Variant and payload, tagged by `type`.
    #[serde(flatten)]
    pub kind: ElementKind,
    /// Center position in canvas pixels.
    #[serde(default)]
    pub position: Option<Vec2>,
    /// Display size in pixels.
    #[serde(default)]
    pub size: Option<Size>,
    /// Offset from the scene start in seconds.
    #[serde(default)]
    pub appear_time: Option<f64>,
    /// Visible length in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Static scale factor.
    #[serde(default)]
    pub scale: Option<f64>,
    /// Static rotation in degrees.
    #[serde(default)]
    pub rotate: Option<f64>,
    /// Effect presets, expanded in order.
    #[serde(default)]
    pub effects: Vec<EffectDocument>,
    /// Explicit animation descriptors, appended after the presets.
    #[serde(default)]
    pub animations: Vec<Animation>,
}

impl CompositionDocument {
    /// Parse a document.
    pub fn from_json_str(json: &str) -> FramecraftResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| FramecraftError::serde(format!("invalid composition document: {e}")))
    }

    /// Read and parse a document file; relative source paths resolve against its directory.
    pub fn from_path(path: &Path) -> FramecraftResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FramecraftError::resource_not_found(path)
            } else {
                anyhow::anyhow!("failed to read '{}': {e}", path.display()).into()
            }
        })?;
        let mut doc = Self::from_json_str(&text)?;
        if let Some(dir) = path.parent() {
            doc.resolve_paths(dir);
        }
        Ok(doc)
    }

    /// Rebase every relative source path (media, fonts, audio) onto `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for scene in &mut self.scenes {
            for element in &mut scene.elements {
                match &mut element.kind {
                    ElementKind::Image { path } | ElementKind::Gif { path } => rebase(path),
                    ElementKind::Video(v) => rebase(&mut v.path),
                    ElementKind::Text(t) => {
                        if let Some(font) = &mut t.font_file {
                            rebase(font);
                        }
                    }
                }
            }
        }
        if let Some(audio) = &mut self.audio {
            rebase(&mut audio.path);
        }
    }

    /// Build scenes without a composition (validation only).
    pub fn build_scenes(&self) -> FramecraftResult<Vec<Scene>> {
        self.scenes
            .iter()
            .enumerate()
            .map(|(i, s)| {
                s.build().map_err(|e| within(format!("scene {i}"), e))
            })
            .collect()
    }
}

impl SceneDocument {
    fn build(&self) -> FramecraftResult<Scene> {
        let mut scene = Scene::new();
        if let Some(d) = self.duration {
            scene.set_duration(d)?;
        }
        if let Some(bg) = self.background {
            scene.set_background(bg);
        }
        if let Some(t) = &self.transition {
            scene.set_transition(&t.name, t.duration)?;
        }
        for (i, e) in self.elements.iter().enumerate() {
            let element = e.build().map_err(|err| within(format!("element {i}"), err))?;
            scene.add_element(element);
        }
        Ok(scene)
    }
}

impl ElementDocument {
    fn build(&self) -> FramecraftResult<Element> {
        let mut el = Element::from_kind(self.kind.clone())?;
        if let Some(p) = self.position {
            el.set_position(p.x, p.y)?;
        }
        if let Some(s) = self.size {
            el.set_size(s.width, s.height)?;
        }
        if let Some(t) = self.appear_time {
            el.set_appear_time(t)?;
        }
        if let Some(d) = self.duration {
            el.set_duration(d)?;
        }
        if let Some(s) = self.scale {
            el.set_scale(s)?;
        }
        if let Some(r) = self.rotate {
            el.set_rotate(r)?;
        }
        for fx in &self.effects {
            el.add_effect(&fx.name, fx.time, fx.delay)?;
        }
        for a in &self.animations {
            el.add_animate(a.clone())?;
        }
        Ok(el)
    }
}

impl Composition {
    /// Build a composition from `doc` through the validating method surface.
    pub fn from_document(
        doc: &CompositionDocument,
        engine: Arc<dyn EncodingEngine>,
    ) -> FramecraftResult<Self> {
        let mut comp = Self::with_engine(doc.options.clone(), engine)?;
        for scene in doc.build_scenes()? {
            comp.add_scene(scene)?;
        }
        if let Some(audio) = &doc.audio {
            comp.add_audio(audio.clone())?;
        }
        if let Some(out) = &doc.output {
            comp.set_output(out)?;
        }
        Ok(comp)
    }

    /// Parse `json` and build a composition from it.
    pub fn from_json_str(json: &str, engine: Arc<dyn EncodingEngine>) -> FramecraftResult<Self> {
        Self::from_document(&CompositionDocument::from_json_str(json)?, engine)
    }
}

/// Prefix a config error message with where it happened in the document.
fn within(place: String, err: FramecraftError) -> FramecraftError {
    match err {
        FramecraftError::Config(msg) => FramecraftError::Config(format!("{place}: {msg}")),
        other => other,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/document.rs"]
mod tests;
