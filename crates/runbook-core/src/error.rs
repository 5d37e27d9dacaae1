//! Error types for Runbook with categorization:
//!
//! - **Config errors**: loading, merging and validating command tables (exit code 1)
//! - **Script errors**: local script resolution and safety checks (exit code 2)
//! - **Execution errors**: spawning, supervising and observing a command
//!   (child exit code when known, 130 on cancellation, otherwise 2)
//!
//! Load-time errors abort the whole load. Execution-time errors travel inside
//! [`crate::executor::ExecutionFailure`] so the caller still gets timing.

pub mod config;
pub mod execution;
pub mod script;

use std::path::PathBuf;

pub use config::ConfigError;
pub use execution::ExecutionError;
pub use script::ScriptError;

use crate::config::Origin;

/// Top-level error type that can represent any error in the system.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Loading, merging or validating configuration failed
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A referenced local script is missing or unsafe
    #[error(transparent)]
    Script(#[from] ScriptError),
    /// Running a command or notifying observers failed
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    /// IO failure outside the categories above
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type alias for runbook-core operations
pub type Result<T> = std::result::Result<T, Error>;

// Convenience constructors
impl Error {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Self::Config(ConfigError::NotFound { path: path.into() })
    }

    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config(ConfigError::Parse {
            path: path.into(),
            message: message.into(),
        })
    }

    pub fn config_conflict(name: impl Into<String>, existing: Origin, incoming: Origin) -> Self {
        Self::Config(ConfigError::Conflict {
            name: name.into(),
            existing,
            incoming,
        })
    }

    pub fn validation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config(ConfigError::Validation {
            name: name.into(),
            message: message.into(),
        })
    }

    pub fn script_not_found(path: impl Into<PathBuf>) -> Self {
        Self::Script(ScriptError::NotFound { path: path.into() })
    }

    pub fn script_unsafe(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Script(ScriptError::Unsafe {
            path: path.into(),
            reason: reason.into(),
        })
    }

    pub fn command_empty(label: impl Into<String>) -> Self {
        Self::Execution(ExecutionError::CommandEmpty {
            label: label.into(),
        })
    }

    pub fn execution_failed(
        label: impl Into<String>,
        exit_code: Option<i32>,
        message: impl Into<String>,
    ) -> Self {
        Self::Execution(ExecutionError::Failed {
            label: label.into(),
            exit_code,
            message: message.into(),
        })
    }

    pub fn execution_cancelled(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Execution(ExecutionError::Cancelled {
            label: label.into(),
            reason: reason.into(),
        })
    }

    pub fn hook_failed(
        observer: impl Into<String>,
        event: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Execution(ExecutionError::HookFailed {
            observer: observer.into(),
            event: event.into(),
            message: message.into(),
        })
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Returns true when the error reports a cancelled or timed out run.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::Cancelled { .. }))
    }

    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit code scheme:
    /// - 1: configuration problems (missing, malformed, conflicting, invalid)
    /// - 2: unsafe or missing scripts, IO, spawn and observer failures
    /// - child exit code: the command itself exited non-zero
    /// - 130: the run was cancelled
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(err) => err.exit_code(),
            Self::Script(err) => err.exit_code(),
            Self::Execution(err) => err.exit_code(),
            Self::Io(_) => 2,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}
