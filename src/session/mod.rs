//! Run notifications, cache ownership and orchestration.

/// Cache directory and output publishing.
pub mod cache;
/// Event stream.
pub mod events;
pub(crate) mod run;
