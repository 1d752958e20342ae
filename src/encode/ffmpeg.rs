use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use crate::encode::engine::{EncoderInvocation, EncodingEngine};
use crate::foundation::core::CancelToken;
use crate::foundation::error::{FramecraftError, FramecraftResult};

/// Stderr fragments that point at a transient condition worth another attempt.
const TRANSIENT_MARKERS: [&str; 5] = [
    "Resource temporarily unavailable",
    "Cannot allocate memory",
    "Broken pipe",
    "Interrupted system call",
    "Device or resource busy",
];

/// [`EncodingEngine`] backed by the system `ffmpeg` / `ffprobe` binaries.
#[derive(Clone, Debug)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    poll_interval: Duration,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            poll_interval: Duration::from_millis(20),
        }
    }
}

impl FfmpegEngine {
    /// Engine using `ffmpeg` and `ffprobe` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine using explicit binary paths.
    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            ..Self::default()
        }
    }
}

impl EncodingEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    #[tracing::instrument(skip_all, fields(label = %invocation.label))]
    fn encode(&self, invocation: &EncoderInvocation, cancel: &CancelToken) -> FramecraftResult<()> {
        if cancel.is_cancelled() {
            return Err(FramecraftError::Cancelled);
        }
        ensure_parent_dir(&invocation.output)?;

        let mut child = Command::new(&self.ffmpeg)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                FramecraftError::external_terminal(format!(
                    "failed to spawn '{}' (is it installed and on PATH?): {e}",
                    self.ffmpeg.display()
                ))
            })?;

        let mut stderr = child.stderr.take().ok_or_else(|| {
            FramecraftError::external_terminal("failed to open ffmpeg stderr (unexpected)")
        })?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok::<_, std::io::Error>(stderr_bytes)
        });

        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stderr_drain.join();
                tracing::debug!("ffmpeg killed on cancellation");
                return Err(FramecraftError::Cancelled);
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => std::thread::sleep(self.poll_interval),
                Err(e) => {
                    let _ = child.kill();
                    return Err(FramecraftError::external_retryable(format!(
                        "failed to wait for ffmpeg: {e}"
                    )));
                }
            }
        };

        let stderr_bytes = stderr_drain
            .join()
            .map_err(|_| FramecraftError::external_terminal("ffmpeg stderr drain thread panicked"))?
            .map_err(|e| FramecraftError::external_terminal(format!("ffmpeg stderr read failed: {e}")))?;

        if status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&stderr_bytes);
        Err(classify_failure(status, stderr.trim()))
    }

    fn probe_duration(&self, path: &Path) -> FramecraftResult<f64> {
        #[derive(serde::Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeOut {
            format: ProbeFormat,
        }

        if !path.is_file() {
            return Err(FramecraftError::resource_not_found(path));
        }
        let out = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| FramecraftError::external_terminal(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(FramecraftError::external_terminal(format!(
                "ffprobe failed for '{}': {}",
                path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout).map_err(|e| {
            FramecraftError::external_terminal(format!("ffprobe json parse failed: {e}"))
        })?;
        parsed
            .format
            .duration
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| {
                FramecraftError::external_terminal(format!(
                    "ffprobe reported no duration for '{}'",
                    path.display()
                ))
            })
    }
}

/// Map a failed exit to a retryable or terminal error.
///
/// Death by signal and known transient conditions retry; everything else (bad arguments,
/// unreadable inputs, unknown filters) is terminal.
pub(crate) fn classify_failure(status: ExitStatus, stderr: &str) -> FramecraftError {
    let tail = stderr_tail(stderr);
    match status.code() {
        None => FramecraftError::external_retryable(format!(
            "ffmpeg terminated by signal ({status}): {tail}"
        )),
        Some(code) if TRANSIENT_MARKERS.iter().any(|m| stderr.contains(m)) => {
            FramecraftError::external_retryable(format!("ffmpeg exited with code {code}: {tail}"))
        }
        Some(code) => {
            FramecraftError::external_terminal(format!("ffmpeg exited with code {code}: {tail}"))
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    const MAX_LINES: usize = 8;
    let lines: Vec<&str> = stderr.lines().collect();
    let start = lines.len().saturating_sub(MAX_LINES);
    lines[start..].join("\n")
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> FramecraftResult<()> {
    if let Some(parent) = path.parent() {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` and `ffprobe` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    ["ffmpeg", "ffprobe"].iter().all(|bin| {
        Command::new(bin)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
