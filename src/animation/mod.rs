//! Animation descriptors, easing curves and named effect presets.

/// Animation descriptors and their composition.
pub mod anim;
/// Named easing curves.
pub mod ease;
/// Effect preset catalogue.
pub mod presets;
