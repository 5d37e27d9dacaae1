//! Execution error types for spawned commands and lifecycle observers.

/// Errors raised while running a command.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutionError {
    /// The request carried no command text
    #[error("Command for {label} is empty")]
    CommandEmpty { label: String },
    /// The command could not be spawned or exited unsuccessfully
    #[error("Command {label} failed: {message}")]
    Failed {
        label: String,
        exit_code: Option<i32>,
        message: String,
    },
    /// The run was cancelled or hit its timeout before finishing
    #[error("Command {label} was cancelled: {reason}")]
    Cancelled { label: String, reason: String },
    /// A lifecycle observer rejected the event
    #[error("Observer '{observer}' failed on {event}: {message}")]
    HookFailed {
        observer: String,
        event: String,
        message: String,
    },
    /// An observer with the same name is already registered
    #[error("Observer '{name}' is already registered")]
    DuplicateObserver { name: String },
}

impl ExecutionError {
    /// Get exit code for execution errors.
    /// - Non-zero child exit: the child's code
    /// - Cancelled: 130
    /// - Anything else: 2
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Failed {
                exit_code: Some(code),
                ..
            } if *code != 0 => *code,
            Self::Cancelled { .. } => 130,
            _ => 2,
        }
    }
}
