//! Scene compilation into encoder invocations and job fingerprints.

/// Per-scene filter graph construction.
pub mod filter_graph;
/// Stable render job keys.
pub mod fingerprint;
