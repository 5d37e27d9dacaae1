//! Configuration error types.
//!
//! These errors represent problems in the YAML command definitions that the
//! user can correct by editing the files.

use std::path::PathBuf;

use crate::config::Origin;

/// Errors raised while loading, merging or validating a command table.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// The config file or module directory does not exist
    #[error("Config not found: {}", path.display())]
    NotFound { path: PathBuf },
    /// The YAML document could not be parsed
    #[error("Failed to parse config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    /// A module file tried to replace a command set by an earlier module
    #[error("Conflicting definition for '{name}': {incoming} overrides {existing}")]
    Conflict {
        name: String,
        existing: Origin,
        incoming: Origin,
    },
    /// The resolved table is not executable as written
    #[error("Validation error in '{name}': {message}")]
    Validation { name: String, message: String },
}

impl ConfigError {
    /// Get exit code for configuration errors (always 1).
    pub const fn exit_code(&self) -> i32 {
        1
    }
}
