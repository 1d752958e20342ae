use std::path::PathBuf;

/// Convenience result type used across framecraft.
pub type FramecraftResult<T> = Result<T, FramecraftError>;

/// Top-level error taxonomy used by engine APIs.
///
/// `Config` errors are raised synchronously by the call that introduced them. Everything that
/// happens while a run is in progress is delivered through the run's terminal `Error` event.
#[derive(thiserror::Error, Debug)]
pub enum FramecraftError {
    /// Invalid scene, element, effect, or option parameters.
    #[error("config error: {0}")]
    Config(String),

    /// A referenced source asset is missing or unreadable.
    #[error("resource not found: '{}'", path.display())]
    ResourceNotFound {
        /// Path that could not be read.
        path: PathBuf,
    },

    /// The external encoding engine failed.
    #[error("external process error: {message}")]
    ExternalProcess {
        /// Human readable failure description (includes encoder stderr when available).
        message: String,
        /// Whether running the same invocation again may succeed.
        retryable: bool,
    },

    /// A caller-imposed deadline elapsed.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The run was cancelled through `Composition::destroy`.
    #[error("render cancelled")]
    Cancelled,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FramecraftError {
    /// Build a [`FramecraftError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`FramecraftError::ResourceNotFound`] value.
    pub fn resource_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ResourceNotFound { path: path.into() }
    }

    /// Build a retryable [`FramecraftError::ExternalProcess`] value.
    pub fn external_retryable(msg: impl Into<String>) -> Self {
        Self::ExternalProcess {
            message: msg.into(),
            retryable: true,
        }
    }

    /// Build a terminal (non-retryable) [`FramecraftError::ExternalProcess`] value.
    pub fn external_terminal(msg: impl Into<String>) -> Self {
        Self::ExternalProcess {
            message: msg.into(),
            retryable: false,
        }
    }

    /// Build a [`FramecraftError::Timeout`] value.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Build a [`FramecraftError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` when the failed operation may succeed if attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExternalProcess {
                retryable: true,
                ..
            }
        )
    }

    /// Return `true` for [`FramecraftError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Produce an equivalent error value for another waiter on the same job.
    ///
    /// `anyhow` errors are not `Clone`, so wrapped errors are re-created from their rendered
    /// message chain.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            Self::Config(m) => Self::Config(m.clone()),
            Self::ResourceNotFound { path } => Self::ResourceNotFound { path: path.clone() },
            Self::ExternalProcess { message, retryable } => Self::ExternalProcess {
                message: message.clone(),
                retryable: *retryable,
            },
            Self::Timeout(m) => Self::Timeout(m.clone()),
            Self::Cancelled => Self::Cancelled,
            Self::Serde(m) => Self::Serde(m.clone()),
            Self::Other(e) => Self::Other(anyhow::anyhow!("{e:#}")),
        }
    }
}

impl From<std::io::Error> for FramecraftError {
    fn from(e: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(e))
    }
}

impl From<serde_json::Error> for FramecraftError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
