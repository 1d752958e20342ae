//! Scene graph: composition, scenes, elements and options.

/// RGBA colors.
pub mod color;
/// Composition lifecycle and method surface.
pub mod composition;
/// JSON document form.
pub mod document;
/// Scenes, elements and the audio track.
pub mod model;
/// Composition options.
pub mod options;
