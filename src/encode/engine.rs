use std::path::{Path, PathBuf};

use crate::foundation::core::CancelToken;
use crate::foundation::error::FramecraftResult;

/// One self-contained call into the external encoding engine.
///
/// `args` are complete encoder arguments (inputs, filter graph, codec settings and `output`).
/// `side_files` must exist before the call; the caller removes them afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderInvocation {
    /// Human readable label used in logs and errors (`scene 3`, `stitch`).
    pub label: String,
    /// Encoder arguments, excluding the program name.
    pub args: Vec<String>,
    /// File the encoder writes.
    pub output: PathBuf,
    /// Auxiliary files referenced from `args` (text payloads), as `(path, contents)`.
    pub side_files: Vec<(PathBuf, String)>,
}

/// External media encoder contract.
///
/// Implementations block until the encoder exits. They must stop promptly once `cancel` reports
/// cancelled and return [`crate::FramecraftError::Cancelled`] in that case. Failures are
/// classified through [`crate::FramecraftError::ExternalProcess`]'s `retryable` flag.
pub trait EncodingEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Run one invocation to completion.
    fn encode(&self, invocation: &EncoderInvocation, cancel: &CancelToken) -> FramecraftResult<()>;

    /// Duration of a media file in seconds.
    fn probe_duration(&self, path: &Path) -> FramecraftResult<f64>;
}
