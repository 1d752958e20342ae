use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::error::{FramecraftError, FramecraftResult};

pub use kurbo::{Size, Vec2};

/// Closed time window `[start, end]` in seconds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimeWindow {
    /// Window start.
    pub start: f64,
    /// Window end, `>= start`.
    pub end: f64,
}

impl TimeWindow {
    /// Create a validated window with finite bounds and `start <= end`.
    pub fn new(start: f64, end: f64) -> FramecraftResult<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(FramecraftError::config("time window bounds must be finite"));
        }
        if start > end {
            return Err(FramecraftError::config("time window start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Window length in seconds.
    pub fn len_secs(self) -> f64 {
        self.end - self.start
    }

    /// Return `true` when the window has zero length.
    pub fn is_empty(self) -> bool {
        self.len_secs() <= 0.0
    }

    /// Return `true` when `t` lies inside the closed window.
    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> FramecraftResult<Self> {
        if den == 0 {
            return Err(FramecraftError::config("fps den must be > 0"));
        }
        if num == 0 {
            return Err(FramecraftError::config("fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Duration of one frame in seconds.
    pub fn frame_duration_secs(self) -> f64 {
        f64::from(self.den) / f64::from(self.num)
    }

    /// Convert seconds to a frame count, rounding up so the whole span is covered.
    pub fn secs_to_frames_ceil(self, secs: f64) -> u64 {
        (secs * self.as_f64() - 1e-9).ceil().max(0.0) as u64
    }
}

/// Shared cancellation flag observed by workers and the encoding engine.
///
/// A child token reports cancelled when either itself or its parent is cancelled; cancelling a
/// child never affects the parent.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that is also cancelled whenever `self` is.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::clone(&self.flag)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Return `true` once this token (or its parent) was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self
                .parent
                .as_ref()
                .is_some_and(|p| p.load(Ordering::SeqCst))
    }

    /// Return `true` when the parent (not this token itself) was cancelled.
    pub fn parent_cancelled(&self) -> bool {
        self.parent
            .as_ref()
            .is_some_and(|p| p.load(Ordering::SeqCst))
    }
}

/// Format a number for encoder arguments and filter expressions.
///
/// Fixed 6-decimal precision with trailing zeros trimmed, so equal inputs always produce equal
/// text (fingerprints and tests depend on it).
pub(crate) fn fmt_num(v: f64) -> String {
    let v = if v == 0.0 { 0.0 } else { v };
    let s = format!("{v:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_owned() } else { s.to_owned() }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
