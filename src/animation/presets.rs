//! Named effect shorthands.
//!
//! [`expand_effect`] is a pure builder: a preset name plus `(time, delay)` maps to an ordered list
//! of [`Animation`] descriptors. Motion presets pair the motion with a matching fade.

use smallvec::{SmallVec, smallvec};

use crate::animation::anim::{Animation, AnimationKind, ShowType};
use crate::animation::ease::Ease;
use crate::foundation::core::Vec2;
use crate::foundation::error::{FramecraftError, FramecraftResult};

/// Expansion of one preset. Every preset expands to at most two descriptors.
pub type Expansion = SmallVec<[Animation; 2]>;

/// Distance in pixels covered by the move presets.
pub const MOVE_DISTANCE: f64 = 200.0;

const ZOOM_SMALL: f64 = 0.3;
const ROTATE_TURN: f64 = 180.0;

const PRESET_NAMES: [&str; 16] = [
    "fadeIn",
    "fadeOut",
    "moveInLeft",
    "moveInRight",
    "moveInUp",
    "moveInDown",
    "moveOutLeft",
    "moveOutRight",
    "moveOutUp",
    "moveOutDown",
    "zoomIn",
    "zoomOut",
    "rotateIn",
    "rotateOut",
    "backIn",
    "backOut",
];

/// Every preset name, in catalogue order.
pub fn effect_names() -> &'static [&'static str] {
    &PRESET_NAMES
}

/// Expand a named preset (case-insensitive) into animation descriptors.
///
/// Unknown names and invalid `time`/`delay` fail with [`FramecraftError::Config`].
pub fn expand_effect(name: &str, time: f64, delay: f64) -> FramecraftResult<Expansion> {
    let key = name.trim().to_ascii_lowercase();
    let out = match key.as_str() {
        "fadein" => smallvec![fade(ShowType::In, time, delay)],
        "fadeout" => smallvec![fade(ShowType::Out, time, delay)],
        "moveinleft" => motion_in(offset(-1.0, 0.0), time, delay),
        "moveinright" => motion_in(offset(1.0, 0.0), time, delay),
        "moveinup" => motion_in(offset(0.0, 1.0), time, delay),
        "moveindown" => motion_in(offset(0.0, -1.0), time, delay),
        "moveoutleft" => motion_out(offset(-1.0, 0.0), time, delay),
        "moveoutright" => motion_out(offset(1.0, 0.0), time, delay),
        "moveoutup" => motion_out(offset(0.0, -1.0), time, delay),
        "moveoutdown" => motion_out(offset(0.0, 1.0), time, delay),
        "zoomin" => smallvec![
            fade(ShowType::In, time, delay),
            Animation::new(
                AnimationKind::Zoom {
                    from: ZOOM_SMALL,
                    to: 1.0
                },
                time,
                delay
            )
            .eased(Ease::OutQuad),
        ],
        "zoomout" => smallvec![
            fade(ShowType::Out, time, delay),
            Animation::new(
                AnimationKind::Zoom {
                    from: 1.0,
                    to: ZOOM_SMALL
                },
                time,
                delay
            )
            .show(ShowType::Out)
            .eased(Ease::InQuad),
        ],
        "rotatein" => smallvec![
            fade(ShowType::In, time, delay),
            Animation::new(
                AnimationKind::Rotate {
                    from: -ROTATE_TURN,
                    to: 0.0
                },
                time,
                delay
            )
            .eased(Ease::OutCubic),
        ],
        "rotateout" => smallvec![
            fade(ShowType::Out, time, delay),
            Animation::new(
                AnimationKind::Rotate {
                    from: 0.0,
                    to: ROTATE_TURN
                },
                time,
                delay
            )
            .show(ShowType::Out)
            .eased(Ease::InCubic),
        ],
        "backin" => {
            let mut v = motion_in(offset(-1.0, 0.0), time, delay);
            v[1].ease = Ease::OutBack;
            v
        }
        "backout" => {
            let mut v = motion_out(offset(1.0, 0.0), time, delay);
            v[1].ease = Ease::InCubic;
            v
        }
        _ => {
            return Err(FramecraftError::config(format!(
                "unknown effect '{}' (known: {})",
                name.trim(),
                PRESET_NAMES.join(", ")
            )));
        }
    };
    for a in &out {
        a.validate()
            .map_err(|e| FramecraftError::config(format!("effect '{}': {e}", name.trim())))?;
    }
    Ok(out)
}

fn offset(dx: f64, dy: f64) -> Vec2 {
    Vec2::new(dx * MOVE_DISTANCE, dy * MOVE_DISTANCE)
}

fn fade(show: ShowType, time: f64, delay: f64) -> Animation {
    let kind = match show {
        ShowType::In => AnimationKind::Fade { from: 0.0, to: 1.0 },
        ShowType::Out => AnimationKind::Fade { from: 1.0, to: 0.0 },
    };
    Animation::new(kind, time, delay).show(show)
}

fn motion_in(from: Vec2, time: f64, delay: f64) -> Expansion {
    smallvec![
        fade(ShowType::In, time, delay),
        Animation::new(
            AnimationKind::Move {
                from,
                to: Vec2::ZERO
            },
            time,
            delay
        )
        .eased(Ease::OutQuad),
    ]
}

fn motion_out(to: Vec2, time: f64, delay: f64) -> Expansion {
    smallvec![
        fade(ShowType::Out, time, delay),
        Animation::new(
            AnimationKind::Move {
                from: Vec2::ZERO,
                to
            },
            time,
            delay
        )
        .show(ShowType::Out)
        .eased(Ease::InQuad),
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/animation/presets.rs"]
mod tests;
