//! Scene jobs, the bounded job queue and final stitching.

/// Prepared scene jobs.
pub mod job;
/// Bounded-concurrency job scheduler.
pub mod queue;
/// Artifact stitching.
pub mod stitch;
