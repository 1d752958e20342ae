use serde::{Deserialize, Serialize};

use crate::animation::ease::Ease;
use crate::foundation::core::{TimeWindow, Vec2};
use crate::foundation::error::{FramecraftError, FramecraftResult};

/// Whether an animation plays at the start (`in`) or end (`out`) of its element's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowType {
    /// Anchored to the element's local start, offset by `delay`.
    #[default]
    In,
    /// Anchored to the element's local end, offset backwards by `delay`.
    Out,
}

/// Transform contribution of one or more animations at a point in time.
///
/// Deltas compose with [`TransformDelta::then`]: translations and rotations add, scale factors
/// and opacities multiply.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformDelta {
    /// Offset from the element's resting position, in pixels.
    pub translate: Vec2,
    /// Uniform scale factor.
    pub scale: f64,
    /// Rotation in degrees (clockwise).
    pub rotation_deg: f64,
    /// Opacity multiplier in `[0, 1]`.
    pub opacity: f64,
}

impl Default for TransformDelta {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformDelta {
    /// The delta that changes nothing.
    pub const IDENTITY: Self = Self {
        translate: Vec2::ZERO,
        scale: 1.0,
        rotation_deg: 0.0,
        opacity: 1.0,
    };

    /// Apply `next` on top of `self`.
    pub fn then(self, next: Self) -> Self {
        Self {
            translate: self.translate + next.translate,
            scale: self.scale * next.scale,
            rotation_deg: self.rotation_deg + next.rotation_deg,
            opacity: (self.opacity * next.opacity).clamp(0.0, 1.0),
        }
    }

    fn lerp(a: Self, b: Self, p: f64) -> Self {
        Self {
            translate: a.translate.lerp(b.translate, p),
            scale: lerp(a.scale, b.scale, p),
            rotation_deg: lerp(a.rotation_deg, b.rotation_deg, p),
            opacity: lerp(a.opacity, b.opacity, p).clamp(0.0, 1.0),
        }
    }
}

/// Type-specific parameters of an animation descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnimationKind {
    /// Translate from one offset to another (pixels, relative to the resting position).
    Move {
        /// Offset at progress 0.
        from: Vec2,
        /// Offset at progress 1.
        to: Vec2,
    },
    /// Opacity ramp.
    Fade {
        /// Opacity at progress 0.
        from: f64,
        /// Opacity at progress 1.
        to: f64,
    },
    /// Uniform scale ramp.
    Zoom {
        /// Scale factor at progress 0.
        from: f64,
        /// Scale factor at progress 1.
        to: f64,
    },
    /// Rotation ramp in degrees.
    Rotate {
        /// Angle at progress 0.
        from: f64,
        /// Angle at progress 1.
        to: f64,
    },
    /// Arbitrary combination of all transform channels.
    Custom {
        /// Delta at progress 0.
        from: TransformDelta,
        /// Delta at progress 1.
        to: TransformDelta,
    },
}

/// Transform channels an animation can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Channel {
    TranslateX,
    TranslateY,
    Scale,
    Rotation,
    Opacity,
}

impl AnimationKind {
    fn endpoints(&self) -> (TransformDelta, TransformDelta) {
        let id = TransformDelta::IDENTITY;
        match *self {
            Self::Move { from, to } => (
                TransformDelta {
                    translate: from,
                    ..id
                },
                TransformDelta { translate: to, ..id },
            ),
            Self::Fade { from, to } => (
                TransformDelta {
                    opacity: from,
                    ..id
                },
                TransformDelta { opacity: to, ..id },
            ),
            Self::Zoom { from, to } => (
                TransformDelta { scale: from, ..id },
                TransformDelta { scale: to, ..id },
            ),
            Self::Rotate { from, to } => (
                TransformDelta {
                    rotation_deg: from,
                    ..id
                },
                TransformDelta {
                    rotation_deg: to,
                    ..id
                },
            ),
            Self::Custom { from, to } => (from, to),
        }
    }

    /// Channel value at both endpoints, or `None` when this kind leaves the channel untouched.
    pub(crate) fn channel(&self, ch: Channel) -> Option<(f64, f64)> {
        let (a, b) = self.endpoints();
        let pick = |d: TransformDelta| match ch {
            Channel::TranslateX => d.translate.x,
            Channel::TranslateY => d.translate.y,
            Channel::Scale => d.scale,
            Channel::Rotation => d.rotation_deg,
            Channel::Opacity => d.opacity,
        };
        let identity = pick(TransformDelta::IDENTITY);
        let (va, vb) = (pick(a), pick(b));
        let touched = match self {
            Self::Move { .. } => matches!(ch, Channel::TranslateX | Channel::TranslateY),
            Self::Fade { .. } => ch == Channel::Opacity,
            Self::Zoom { .. } => ch == Channel::Scale,
            Self::Rotate { .. } => ch == Channel::Rotation,
            Self::Custom { .. } => va != identity || vb != identity,
        };
        touched.then_some((va, vb))
    }
}

/// A time-windowed transform rule attached to an element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    /// Type-specific parameters.
    #[serde(flatten)]
    pub kind: AnimationKind,
    /// Anchor of the active window.
    #[serde(default)]
    pub show_type: ShowType,
    /// Ramp duration in seconds.
    pub time: f64,
    /// Offset from the anchor in seconds.
    #[serde(default)]
    pub delay: f64,
    /// Easing applied to normalized progress.
    #[serde(default)]
    pub ease: Ease,
}

impl Animation {
    /// Create an `in` animation with linear easing.
    pub fn new(kind: AnimationKind, time: f64, delay: f64) -> Self {
        Self {
            kind,
            show_type: ShowType::In,
            time,
            delay,
            ease: Ease::Linear,
        }
    }

    /// Set the anchor.
    pub fn show(mut self, show_type: ShowType) -> Self {
        self.show_type = show_type;
        self
    }

    /// Set the easing.
    pub fn eased(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    /// Check parameters; invalid descriptors are rejected when they are attached.
    pub fn validate(&self) -> FramecraftResult<()> {
        if !self.time.is_finite() || self.time <= 0.0 {
            return Err(FramecraftError::config(format!(
                "animation time must be finite and > 0 (got {})",
                self.time
            )));
        }
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(FramecraftError::config(format!(
                "animation delay must be finite and >= 0 (got {})",
                self.delay
            )));
        }
        let (a, b) = self.kind.endpoints();
        for d in [a, b] {
            let values = [
                d.translate.x,
                d.translate.y,
                d.scale,
                d.rotation_deg,
                d.opacity,
            ];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(FramecraftError::config(
                    "animation parameters must be finite",
                ));
            }
            if d.scale <= 0.0 {
                return Err(FramecraftError::config("animation scale must be > 0"));
            }
            if !(0.0..=1.0).contains(&d.opacity) {
                return Err(FramecraftError::config(
                    "animation opacity must be in [0, 1]",
                ));
            }
        }
        Ok(())
    }

    /// Active window in element-local time for an element living `element_duration` seconds.
    ///
    /// `in`: `[delay, delay + time]`. `out`: `[duration - time - delay, duration - delay]`.
    pub fn window(&self, element_duration: f64) -> TimeWindow {
        match self.show_type {
            ShowType::In => TimeWindow {
                start: self.delay,
                end: self.delay + self.time,
            },
            ShowType::Out => TimeWindow {
                start: element_duration - self.time - self.delay,
                end: element_duration - self.delay,
            },
        }
    }

    /// Return `true` when local time `t` lies inside the active window.
    pub fn is_active(&self, t: f64, element_duration: f64) -> bool {
        self.window(element_duration).contains(t)
    }

    /// Eased progress at local time `t`; holds 0 before the window and 1 after it.
    pub fn progress(&self, t: f64, element_duration: f64) -> f64 {
        let w = self.window(element_duration);
        self.ease.apply((t - w.start) / self.time)
    }

    /// Transform contribution at local time `t`.
    pub fn delta_at(&self, t: f64, element_duration: f64) -> TransformDelta {
        let (a, b) = self.kind.endpoints();
        TransformDelta::lerp(a, b, self.progress(t, element_duration))
    }
}

/// Compose every animation at local time `t`, in list order.
pub fn compose_at(animations: &[Animation], t: f64, element_duration: f64) -> TransformDelta {
    animations
        .iter()
        .fold(TransformDelta::IDENTITY, |acc, a| {
            acc.then(a.delta_at(t, element_duration))
        })
}

fn lerp(a: f64, b: f64, p: f64) -> f64 {
    a + (b - a) * p
}

#[cfg(test)]
#[path = "../../tests/unit/animation/anim.rs"]
mod tests;
