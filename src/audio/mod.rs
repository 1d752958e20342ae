//! Global audio track mixing.

/// Track trimming, gain and fade envelopes.
pub mod track;
