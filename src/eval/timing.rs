//! Element timing resolution.
//!
//! Pure functions from the scene graph to absolute, scene-clamped windows. Running them twice on
//! the same scene yields identical results.

use crate::effects::transitions::TransitionSpec;
use crate::foundation::core::TimeWindow;
use crate::foundation::error::{FramecraftError, FramecraftResult};
use crate::scene::color::Color;
use crate::scene::model::{Element, ElementKind, Scene};

/// How source playback covers an element window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaybackPolicy {
    /// The clip is at least as long as the window; extra source is dropped.
    Truncate,
    /// The clip may be shorter than the window; its last frame is held until the window ends.
    HoldLastFrame,
    /// The clip repeats, wrapping exactly at the clip boundary.
    Wrap,
}

/// Resolved source-media playback for a video element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourcePlayback {
    /// Trim start in source time.
    pub clip_start: f64,
    /// Trim end in source time; unknown until probed when unset.
    pub clip_end: Option<f64>,
    /// Seconds of output the source must cover.
    pub play_secs: f64,
    /// Coverage policy.
    pub policy: PlaybackPolicy,
    /// The clip is the whole source (no trim set), so a wrap can loop the input itself.
    pub whole_source: bool,
}

impl SourcePlayback {
    /// Clip length, when the trim end is known.
    pub fn clip_len(&self) -> Option<f64> {
        self.clip_end.map(|end| end - self.clip_start)
    }
}

/// Timing of one element in scene time.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedElement {
    /// Index in the scene's element list (z-order).
    pub index: usize,
    /// Visible window in scene time, clamped to `[0, scene duration]`.
    pub window: TimeWindow,
    /// Source playback for video elements.
    pub playback: Option<SourcePlayback>,
}

impl ResolvedElement {
    /// Element-local duration, the time base of its animations.
    pub fn local_duration(&self) -> f64 {
        self.window.len_secs()
    }

    /// Return `true` when the element is never visible.
    pub fn is_hidden(&self) -> bool {
        self.window.is_empty()
    }
}

/// Timing of one scene.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedScene {
    /// Scene position in the composition.
    pub index: usize,
    /// Scene duration in seconds.
    pub duration: f64,
    /// Canvas color (scene background or the composition default).
    pub background: Color,
    /// Per-element timing, in z-order.
    pub elements: Vec<ResolvedElement>,
    /// Transition into the next scene.
    pub transition: Option<TransitionSpec>,
}

/// Resolve one element against its scene duration.
pub fn resolve_element(index: usize, element: &Element, scene_duration: f64) -> ResolvedElement {
    let start = element.appear_time().min(scene_duration);
    let requested = element
        .duration()
        .unwrap_or(scene_duration - element.appear_time());
    let end = (element.appear_time() + requested.max(0.0)).min(scene_duration);
    let window = TimeWindow {
        start,
        end: end.max(start),
    };

    let playback = match element.kind() {
        ElementKind::Video(v) => {
            let play_secs = window.len_secs();
            let clip_len = v.clip_end.map(|e| e - v.clip_start);
            let policy = if v.looped {
                PlaybackPolicy::Wrap
            } else if clip_len.is_some_and(|len| len >= play_secs) {
                PlaybackPolicy::Truncate
            } else {
                PlaybackPolicy::HoldLastFrame
            };
            Some(SourcePlayback {
                clip_start: v.clip_start,
                clip_end: v.clip_end,
                play_secs,
                policy,
                whole_source: v.clip_start == 0.0 && v.clip_end.is_none(),
            })
        }
        _ => None,
    };

    ResolvedElement {
        index,
        window,
        playback,
    }
}

/// Resolve every element of a scene.
pub fn resolve_scene(index: usize, scene: &Scene, default_background: Color) -> ResolvedScene {
    let duration = scene.duration();
    ResolvedScene {
        index,
        duration,
        background: scene.background().unwrap_or(default_background),
        elements: scene
            .elements()
            .iter()
            .enumerate()
            .map(|(i, e)| resolve_element(i, e, duration))
            .collect(),
        transition: scene.transition(),
    }
}

/// Transitions that take effect: every scene's transition except the last scene's.
pub fn effective_transitions(scenes: &[Scene]) -> Vec<Option<TransitionSpec>> {
    let n = scenes.len();
    scenes
        .iter()
        .enumerate()
        .map(|(i, s)| if i + 1 < n { s.transition() } else { None })
        .collect()
}

/// Check that no transition is longer than either scene it joins.
pub fn check_transitions(scenes: &[Scene]) -> FramecraftResult<()> {
    for (i, t) in effective_transitions(scenes).into_iter().enumerate() {
        let Some(t) = t else { continue };
        let limit = scenes[i].duration().min(scenes[i + 1].duration());
        if t.duration_secs > limit {
            return Err(FramecraftError::config(format!(
                "transition after scene {i} lasts {}s, longer than an adjacent scene ({limit}s)",
                t.duration_secs
            )));
        }
    }
    Ok(())
}

/// Stitched output length: scene durations minus transition overlaps.
pub fn output_duration(scenes: &[Scene]) -> f64 {
    let total: f64 = scenes.iter().map(Scene::duration).sum();
    let overlap: f64 = effective_transitions(scenes)
        .into_iter()
        .flatten()
        .map(|t| t.duration_secs)
        .sum();
    total - overlap
}

#[cfg(test)]
#[path = "../../tests/unit/eval/timing.rs"]
mod tests;
