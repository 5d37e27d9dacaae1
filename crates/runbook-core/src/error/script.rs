//! Script verification error types.

use std::path::PathBuf;

/// A script under the managed scripts root failed its pre-flight checks.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScriptError {
    /// The referenced script file does not exist
    #[error("Script not found: {}", path.display())]
    NotFound { path: PathBuf },
    /// The script exists but must not be run
    #[error("Script {} is unsafe to run: {reason}", path.display())]
    Unsafe { path: PathBuf, reason: String },
}

impl ScriptError {
    /// Get exit code for script errors (always 2).
    pub const fn exit_code(&self) -> i32 {
        2
    }
}
