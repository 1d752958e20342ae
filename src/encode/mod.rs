//! Encoding engines.
//!
//! Engines run self-contained [`engine::EncoderInvocation`]s. The `ffmpeg` engine drives the
//! system binaries; the in-memory engine records invocations for tests and dry runs.

/// Engine contract.
pub mod engine;
/// `ffmpeg`/`ffprobe` subprocess engine.
pub mod ffmpeg;
/// Scripted in-process engine.
pub mod memory;
