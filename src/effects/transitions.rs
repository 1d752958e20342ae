use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::error::{FramecraftError, FramecraftResult};

/// Direction of directional transitions, named after the motion of the incoming edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Right to left.
    Left,
    /// Left to right.
    Right,
    /// Bottom to top.
    Up,
    /// Top to bottom.
    Down,
}

impl Direction {
    fn suffix(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Blend style applied across a scene boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// Linear cross-dissolve.
    Fade,
    /// Fade through black.
    FadeBlack,
    /// Fade through white.
    FadeWhite,
    /// Noisy dissolve.
    Dissolve,
    /// Hard-edged wipe.
    Wipe(Direction),
    /// Push the outgoing scene off screen.
    Slide(Direction),
    /// Expanding circle reveal.
    CircleOpen,
    /// Shrinking circle reveal.
    CircleClose,
    /// Clock-hand sweep.
    Radial,
    /// Pixelate out and in.
    Pixelize,
    /// Zoom into the outgoing scene.
    ZoomIn,
}

const DIRS: [Direction; 4] = [
    Direction::Left,
    Direction::Right,
    Direction::Up,
    Direction::Down,
];

impl TransitionKind {
    /// Parse a transition name (case-insensitive, `_`/`-` ignored; `crossfade` aliases `fade`).
    pub fn parse(name: &str) -> FramecraftResult<Self> {
        let key: String = name
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        if key.is_empty() {
            return Err(FramecraftError::config("transition name must be non-empty"));
        }
        let kind = match key.as_str() {
            "fade" | "crossfade" => Self::Fade,
            "fadeblack" => Self::FadeBlack,
            "fadewhite" => Self::FadeWhite,
            "dissolve" => Self::Dissolve,
            "circleopen" => Self::CircleOpen,
            "circleclose" => Self::CircleClose,
            "radial" => Self::Radial,
            "pixelize" => Self::Pixelize,
            "zoomin" => Self::ZoomIn,
            other => {
                let directional = |prefix: &str| {
                    other
                        .strip_prefix(prefix)
                        .and_then(|rest| DIRS.into_iter().find(|d| d.suffix() == rest))
                };
                if let Some(d) = directional("wipe") {
                    Self::Wipe(d)
                } else if let Some(d) = directional("slide") {
                    Self::Slide(d)
                } else {
                    return Err(FramecraftError::config(format!(
                        "unknown transition '{}'",
                        name.trim()
                    )));
                }
            }
        };
        Ok(kind)
    }

    /// Name of the matching `xfade` filter transition.
    pub fn xfade_name(self) -> String {
        match self {
            Self::Fade => "fade".to_owned(),
            Self::FadeBlack => "fadeblack".to_owned(),
            Self::FadeWhite => "fadewhite".to_owned(),
            Self::Dissolve => "dissolve".to_owned(),
            Self::Wipe(d) => format!("wipe{}", d.suffix()),
            Self::Slide(d) => format!("slide{}", d.suffix()),
            Self::CircleOpen => "circleopen".to_owned(),
            Self::CircleClose => "circleclose".to_owned(),
            Self::Radial => "radial".to_owned(),
            Self::Pixelize => "pixelize".to_owned(),
            Self::ZoomIn => "zoomin".to_owned(),
        }
    }

    /// Every supported transition.
    pub fn all() -> Vec<Self> {
        let mut v = vec![
            Self::Fade,
            Self::FadeBlack,
            Self::FadeWhite,
            Self::Dissolve,
        ];
        v.extend(DIRS.into_iter().map(Self::Wipe));
        v.extend(DIRS.into_iter().map(Self::Slide));
        v.extend([
            Self::CircleOpen,
            Self::CircleClose,
            Self::Radial,
            Self::Pixelize,
            Self::ZoomIn,
        ]);
        v
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xfade_name())
    }
}

impl Serialize for TransitionKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.xfade_name())
    }
}

impl<'de> Deserialize<'de> for TransitionKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Transition declared on a scene, applied at its boundary with the next scene.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSpec {
    /// Blend style.
    pub kind: TransitionKind,
    /// Blend duration in seconds.
    pub duration_secs: f64,
}

impl TransitionSpec {
    /// Build from a style name and a duration in milliseconds.
    pub fn from_millis(name: &str, duration_ms: f64) -> FramecraftResult<Self> {
        let kind = TransitionKind::parse(name)?;
        if !duration_ms.is_finite() || duration_ms <= 0.0 {
            return Err(FramecraftError::config(format!(
                "transition duration must be finite and > 0 ms (got {duration_ms})"
            )));
        }
        Ok(Self {
            kind,
            duration_secs: duration_ms / 1000.0,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/transitions.rs"]
mod tests;
