//! Guarded execution of one configured command
//!
//! `Executor::execute` runs a single [`ScriptRequest`] start to finish:
//! validate, verify any managed script, notify observers, spawn under the
//! platform shell, supervise until exit or cancellation, then notify again.
//! Observers see every stage through [`LifecycleEvent`]s.

mod env;
mod shell;

use std::{
    collections::BTreeMap,
    path::PathBuf,
    process::{ExitStatus, Stdio},
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use chrono::Utc;
use serde::Serialize;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

pub use self::{
    env::{assemble_env, env_pairs, inherited_env},
    shell::{build_command_line, ShellDialect},
};
use crate::{
    lifecycle::{command_label, ExecutionContext, ExecutionState, LifecycleEvent, StateTracker},
    plugins::ObserverRegistry,
    scripts::{is_under_root, resolve_command_target, verify_executable, ScriptsRootResolver},
    Error, Result,
};

// ═══════════════════════════════════════════════════════════════════════════
// REQUEST / RESULT TYPES
// ═══════════════════════════════════════════════════════════════════════════

/// Everything needed to run one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptRequest {
    /// Command path used for logging, e.g. `["deploy", "staging"]`
    pub command_path: Vec<String>,
    /// Trusted shell command line, executed verbatim
    pub command: String,
    /// Caller-supplied arguments, quoted one token each
    pub extra_args: Vec<String>,
    /// Environment from the resolved definition
    pub base_env: BTreeMap<String, String>,
    /// Caller overrides, highest precedence
    pub extra_env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
    pub dry_run: bool,
    /// Kill the child and report cancellation after this long
    pub timeout: Option<Duration>,
}

impl ScriptRequest {
    pub fn new(command_path: Vec<String>, command: impl Into<String>) -> Self {
        Self {
            command_path,
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn label(&self) -> String {
        command_label(&self.command_path)
    }
}

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// No process was spawned
    NotStarted,
    /// The process exited with this code (0 for a dry run)
    Exited(i32),
    /// The process was killed by a signal it did not get from us
    Terminated { signal: Option<i32> },
    /// Cancelled or timed out; the process was killed
    Cancelled,
}

/// What a dry run would have executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunReport {
    pub command_line: String,
    pub args: Vec<String>,
    /// `NAME=VALUE` pairs from the definition and the caller, sorted by name
    pub env: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub outcome: ExitOutcome,
    /// Wall-clock time of the whole `execute` call
    pub duration: Duration,
    pub dry_run: Option<DryRunReport>,
}

impl ExecutionResult {
    /// Real or synthetic process exit code, if the process got that far
    pub const fn exit_code(&self) -> Option<i32> {
        match self.outcome {
            ExitOutcome::Exited(code) => Some(code),
            _ => None,
        }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, ExitOutcome::Exited(0))
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self.outcome, ExitOutcome::Cancelled)
    }
}

/// An execution error together with the partial result (timing, outcome)
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct ExecutionFailure {
    pub result: ExecutionResult,
    pub error: Error,
}

impl From<ExecutionFailure> for Error {
    fn from(failure: ExecutionFailure) -> Self {
        failure.error
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EXECUTOR
// ═══════════════════════════════════════════════════════════════════════════

/// Runs commands and dispatches lifecycle events
pub struct Executor {
    observers: Arc<ObserverRegistry>,
    roots: Arc<dyn ScriptsRootResolver>,
    scripts_root: OnceLock<Result<PathBuf>>,
    dialect: ShellDialect,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("observers", &self.observers)
            .field("scripts_root", &self.scripts_root.get())
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

enum Interrupt {
    Cancelled,
    TimedOut,
    Finished(std::io::Result<ExitStatus>),
}

impl Executor {
    pub fn new(observers: Arc<ObserverRegistry>, roots: Arc<dyn ScriptsRootResolver>) -> Self {
        Self {
            observers,
            roots,
            scripts_root: OnceLock::new(),
            dialect: ShellDialect::native(),
        }
    }

    /// Override the shell dialect (quoting and invocation)
    pub fn with_dialect(mut self, dialect: ShellDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub const fn observers(&self) -> &Arc<ObserverRegistry> {
        &self.observers
    }

    /// Run one request to completion
    ///
    /// Cancelling `cancel` kills the child and yields the cancelled outcome.
    ///
    /// # Errors
    ///
    /// - `CommandEmpty` for a blank command
    /// - `ScriptNotFound` / `ScriptUnsafe` when a managed script fails verification
    /// - `HookFailed` when an observer rejects `before_execute` or `after_execute`
    /// - `ExecutionFailed` for spawn failures and non-zero exits
    /// - `ExecutionCancelled` on cancellation or timeout
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        req: ScriptRequest,
    ) -> std::result::Result<ExecutionResult, ExecutionFailure> {
        let started = Instant::now();
        let label = req.label();
        let mut tracker = StateTracker::new(label.clone());
        let failure = |outcome: ExitOutcome, error: Error| ExecutionFailure {
            result: ExecutionResult {
                outcome,
                duration: started.elapsed(),
                dry_run: None,
            },
            error,
        };

        tracker.advance(ExecutionState::ValidatingCommand);
        if req.command.trim().is_empty() {
            tracker.advance(ExecutionState::Done);
            tracing::warn!(path = %label, "refusing to run an empty command");
            return Err(failure(ExitOutcome::NotStarted, Error::command_empty(&label)));
        }

        let env = assemble_env(inherited_env(), &req.base_env, &req.extra_env);

        tracker.advance(ExecutionState::VerifyingScript);
        if let Err(error) = self.verify_script(&req, &env, &label) {
            tracker.advance(ExecutionState::Done);
            tracing::warn!(path = %label, error = %error, "script verification failed");
            return Err(failure(ExitOutcome::NotStarted, error));
        }

        let mut payload = ExecutionContext {
            command_path: req.command_path.clone(),
            command: req.command.clone(),
            args: req.extra_args.clone(),
            env,
            ..ExecutionContext::default()
        };

        tracker.advance(ExecutionState::BeforeHook);
        if let Err(error) = self.observers.emit(LifecycleEvent::BeforeExecute, &payload) {
            tracker.advance(ExecutionState::Done);
            tracing::warn!(path = %label, error = %error, "before_execute observer failed");
            return Err(failure(ExitOutcome::NotStarted, error));
        }

        let command_line = build_command_line(&req.command, &req.extra_args, self.dialect);

        if req.dry_run {
            tracker.advance(ExecutionState::Done);
            let mut declared = req.base_env.clone();
            declared.extend(req.extra_env.clone());
            tracing::info!(path = %label, command = %command_line, "dry run");
            return Ok(ExecutionResult {
                outcome: ExitOutcome::Exited(0),
                duration: started.elapsed(),
                dry_run: Some(DryRunReport {
                    command_line,
                    args: req.extra_args,
                    env: env_pairs(&declared),
                }),
            });
        }

        tracker.advance(ExecutionState::Spawning);
        payload.started_at = Some(Utc::now());

        let outcome = if cancel.is_cancelled() {
            Err((ExitOutcome::Cancelled, Error::execution_cancelled(&label, "cancelled")))
        } else {
            self.spawn_and_wait(cancel, &req, &payload.env, &command_line, &label, &mut tracker)
                .await
        };
        payload.finished_at = Some(Utc::now());

        let result = match outcome {
            Ok(()) => {
                tracker.advance(ExecutionState::Succeeded);
                payload.exit_code = Some(0);
                tracker.advance(ExecutionState::AfterHook);
                let result = ExecutionResult {
                    outcome: ExitOutcome::Exited(0),
                    duration: started.elapsed(),
                    dry_run: None,
                };
                let hooked = self.observers.emit(LifecycleEvent::AfterExecute, &payload);
                tracker.advance(ExecutionState::Done);
                match hooked {
                    Ok(()) => Ok(result),
                    Err(error) => {
                        tracing::warn!(path = %label, error = %error, "after_execute observer failed");
                        Err(ExecutionFailure { result, error })
                    }
                }
            }
            Err((outcome, error)) => {
                tracker.advance(if matches!(outcome, ExitOutcome::Cancelled) {
                    ExecutionState::Cancelled
                } else {
                    ExecutionState::Failed
                });
                payload.exit_code = match outcome {
                    ExitOutcome::Exited(code) => Some(code),
                    _ => None,
                };
                payload.error = Some(error.to_string());
                tracker.advance(ExecutionState::ErrorHook);
                if let Err(hook_error) = self.observers.emit(LifecycleEvent::Error, &payload) {
                    tracing::warn!(path = %label, error = %hook_error, "error observer failed; ignoring");
                }
                tracker.advance(ExecutionState::Done);
                tracing::info!(path = %label, error = %error, "command did not succeed");
                Err(failure(outcome, error))
            }
        };

        tracing::debug!(
            path = %label,
            state = %tracker.state(),
            elapsed = ?started.elapsed(),
            "execution finished"
        );
        result
    }

    /// Check the first token of the command against the managed scripts root
    fn verify_script(
        &self,
        req: &ScriptRequest,
        env: &BTreeMap<String, String>,
        label: &str,
    ) -> Result<()> {
        let tokens = shell_words::split(&req.command).map_err(|e| {
            Error::script_unsafe(req.command.clone(), format!("unparsable command: {e}"))
        })?;
        let Some(first) = tokens.first() else {
            return Err(Error::command_empty(label));
        };

        let token = shellexpand::env_with_context_no_errors(first, |name| env.get(name));
        if token.is_empty() {
            return Ok(());
        }
        let Some(candidate) = resolve_command_target(&token, req.working_dir.as_deref())? else {
            return Ok(());
        };

        let root = self.scripts_root()?;
        if !is_under_root(&candidate, &root) {
            tracing::trace!(path = %label, script = %candidate.display(), "outside scripts root; not verified");
            return Ok(());
        }
        verify_executable(&candidate)?;
        tracing::debug!(path = %label, script = %candidate.display(), "script verified");
        Ok(())
    }

    /// The scripts root, resolved on first use and cached for this executor
    fn scripts_root(&self) -> Result<PathBuf> {
        self.scripts_root
            .get_or_init(|| self.roots.resolve_root())
            .clone()
    }

    async fn spawn_and_wait(
        &self,
        cancel: &CancellationToken,
        req: &ScriptRequest,
        env: &BTreeMap<String, String>,
        command_line: &str,
        label: &str,
        tracker: &mut StateTracker,
    ) -> std::result::Result<(), (ExitOutcome, Error)> {
        let (program, args) = self.dialect.invocation(command_line);
        let mut command = Command::new(program);
        command
            .args(&args)
            .env_clear()
            .envs(env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = req.working_dir.as_ref().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            (
                ExitOutcome::NotStarted,
                Error::execution_failed(label, None, format!("failed to spawn {program}: {e}")),
            )
        })?;
        tracker.advance(ExecutionState::Running);
        tracing::debug!(path = %label, pid = ?child.id(), command = %command_line, "spawned");

        let interrupt = tokio::select! {
            biased;
            () = cancel.cancelled() => Interrupt::Cancelled,
            () = expire(req.timeout) => Interrupt::TimedOut,
            status = child.wait() => Interrupt::Finished(status),
        };

        let reason = match interrupt {
            Interrupt::Finished(Ok(status)) => return map_status(status, label),
            Interrupt::Finished(Err(e)) => {
                return Err((
                    ExitOutcome::Terminated { signal: None },
                    Error::execution_failed(label, None, format!("failed to wait for child: {e}")),
                ));
            }
            Interrupt::Cancelled => "cancelled",
            Interrupt::TimedOut => "timed out",
        };

        if let Err(e) = child.kill().await {
            tracing::warn!(path = %label, error = %e, "failed to kill child process");
        }
        Err((ExitOutcome::Cancelled, Error::execution_cancelled(label, reason)))
    }
}

async fn expire(timeout: Option<Duration>) {
    match timeout {
        Some(after) => tokio::time::sleep(after).await,
        None => std::future::pending().await,
    }
}

fn map_status(status: ExitStatus, label: &str) -> std::result::Result<(), (ExitOutcome, Error)> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err((
            ExitOutcome::Exited(code),
            Error::execution_failed(label, Some(code), format!("exited with status {code}")),
        ));
    }
    let signal = exit_signal(status);
    let message = signal.map_or_else(
        || "terminated without an exit code".to_string(),
        |sig| format!("terminated by signal {sig}"),
    );
    Err((
        ExitOutcome::Terminated { signal },
        Error::execution_failed(label, None, message),
    ))
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}
