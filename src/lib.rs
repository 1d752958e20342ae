//! Framecraft composes videos from timed scenes and renders them through an external encoder.
//!
//! The public API is composition-oriented:
//!
//! - Build a [`Composition`] of [`Scene`]s holding [`Element`]s with effects and animations
//! - [`Composition::start`] freezes the graph and renders every scene as a bounded-parallel job
//! - Finished scene artifacts are stitched in order with transitions and the optional audio
//!   track, and progress arrives on the returned [`RenderEvents`] stream
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

/// Animation descriptors, easing and effect presets.
pub mod animation;
/// Global audio track.
pub mod audio;
/// Scene compilation and fingerprints.
pub mod compile;
/// Transition styles.
pub mod effects;
/// Encoding engines.
pub mod encode;
/// Timing resolution.
pub mod eval;
/// Scene jobs, queue and stitching.
pub mod render;
/// Scene graph and composition.
pub mod scene;
/// Events, cache and run orchestration.
pub mod session;

pub use crate::foundation::core::{CancelToken, Fps, Size, TimeWindow, Vec2};
pub use crate::foundation::error::{FramecraftError, FramecraftResult};

pub use crate::animation::anim::{Animation, AnimationKind, ShowType, TransformDelta};
pub use crate::animation::ease::Ease;
pub use crate::animation::presets::{effect_names, expand_effect};
pub use crate::audio::track::AudioMix;
pub use crate::effects::transitions::{Direction, TransitionKind, TransitionSpec};
pub use crate::encode::engine::{EncoderInvocation, EncodingEngine};
pub use crate::encode::ffmpeg::FfmpegEngine;
pub use crate::encode::memory::InMemoryEngine;
pub use crate::render::queue::{JobTable, RetryPolicy};
pub use crate::scene::color::Color;
pub use crate::scene::composition::{Composition, CompositionState};
pub use crate::scene::document::CompositionDocument;
pub use crate::scene::model::{
    AudioTrack, Element, ElementKind, Scene, TextAlign, TextBorder, TextStyle, VideoSource,
};
pub use crate::scene::options::{AudioEncodingParams, CompositionOptions, VideoEncodingParams};
pub use crate::session::events::{
    CompletionReport, RenderEvent, RenderEvents, RenderOutcome, UsageSummary,
};
