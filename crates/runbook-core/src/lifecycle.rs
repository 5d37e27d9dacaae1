//! Lifecycle events, their payload, and the per-invocation state machine
//!
//! One invocation moves through:
//!
//! ```text
//! Idle → ValidatingCommand → VerifyingScript → BeforeHook → Spawning → Running
//!      → {Succeeded | Failed | Cancelled} → {AfterHook | ErrorHook} → Done
//! ```
//!
//! Any pre-spawn failure (empty command, unsafe script, rejected hook) and a
//! dry run jump straight to `Done`.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Events dispatched to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleEvent {
    /// A command table was freshly loaded
    RegistryLoaded,
    /// About to spawn; a failing observer aborts the run
    BeforeExecute,
    /// The command exited successfully
    AfterExecute,
    /// The command failed or was cancelled
    Error,
}

/// Payload handed to observers for every event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionContext {
    pub command_path: Vec<String>,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl ExecutionContext {
    /// Space-joined command path, or `<anonymous>` when empty
    pub fn label(&self) -> String {
        command_label(&self.command_path)
    }
}

pub(crate) fn command_label(path: &[String]) -> String {
    let label = path.join(" ");
    if label.trim().is_empty() {
        "<anonymous>".to_string()
    } else {
        label
    }
}

/// Shared contract for lifecycle state machines
///
/// # Contract Requirements
///
/// 1. **Transition Consistency**: `can_transition_to(next)` must return true if and only if `next`
///    is in `valid_next_states()`
///
/// 2. **Terminal States**: If `is_terminal()` returns true, `valid_next_states()` must return an
///    empty vec
///
/// 3. **Non-Terminal States**: If `is_terminal()` returns false, `valid_next_states()` must return
///    at least one state
///
/// 4. **Exhaustive Matching**: `all_states()` must return all possible enum variants
pub trait LifecycleState: Copy + Eq + Sized + 'static {
    /// Returns true if transition from `self` to `next` is valid
    fn can_transition_to(self, next: Self) -> bool {
        self.valid_next_states().contains(&next)
    }

    /// Returns all valid next states from current state
    fn valid_next_states(self) -> Vec<Self>;

    /// Returns true if this is a terminal state (no transitions out)
    fn is_terminal(self) -> bool;

    /// Returns all possible states for this state machine
    fn all_states() -> &'static [Self];
}

/// States of a single `execute` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionState {
    Idle,
    ValidatingCommand,
    VerifyingScript,
    BeforeHook,
    Spawning,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    AfterHook,
    ErrorHook,
    Done,
}

const ALL_EXECUTION_STATES: [ExecutionState; 12] = [
    ExecutionState::Idle,
    ExecutionState::ValidatingCommand,
    ExecutionState::VerifyingScript,
    ExecutionState::BeforeHook,
    ExecutionState::Spawning,
    ExecutionState::Running,
    ExecutionState::Succeeded,
    ExecutionState::Failed,
    ExecutionState::Cancelled,
    ExecutionState::AfterHook,
    ExecutionState::ErrorHook,
    ExecutionState::Done,
];

impl LifecycleState for ExecutionState {
    fn valid_next_states(self) -> Vec<Self> {
        match self {
            Self::Idle => vec![Self::ValidatingCommand],
            Self::ValidatingCommand => vec![Self::VerifyingScript, Self::Done],
            Self::VerifyingScript => vec![Self::BeforeHook, Self::Done],
            Self::BeforeHook => vec![Self::Spawning, Self::Done],
            Self::Spawning => vec![Self::Running, Self::Failed, Self::Cancelled],
            Self::Running => vec![Self::Succeeded, Self::Failed, Self::Cancelled],
            Self::Succeeded => vec![Self::AfterHook],
            Self::Failed | Self::Cancelled => vec![Self::ErrorHook],
            Self::AfterHook | Self::ErrorHook => vec![Self::Done],
            Self::Done => Vec::new(),
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }

    fn all_states() -> &'static [Self] {
        &ALL_EXECUTION_STATES
    }
}

/// Tracks one invocation's progress and logs every step
#[derive(Debug)]
pub(crate) struct StateTracker {
    label: String,
    state: ExecutionState,
}

impl StateTracker {
    pub(crate) const fn new(label: String) -> Self {
        Self {
            label,
            state: ExecutionState::Idle,
        }
    }

    pub(crate) const fn state(&self) -> ExecutionState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: ExecutionState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                path = %self.label,
                from = %self.state,
                to = %next,
                "unexpected execution state transition"
            );
        }
        tracing::trace!(path = %self.label, from = %self.state, to = %next, "execution state");
        self.state = next;
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SHARED CONFORMANCE TESTS
// ═══════════════════════════════════════════════════════════════════════════
