//! Observer registry for lifecycle events
//!
//! Observers are notified synchronously, in registration order. Emission
//! holds a read lock, so concurrent runs can emit at the same time while
//! registration waits for them. A handler must not register observers.

use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    error::ExecutionError,
    lifecycle::{ExecutionContext, LifecycleEvent},
    Error, Result,
};

/// Capability implemented by anything that wants lifecycle notifications
pub trait Observer: Send + Sync {
    /// Unique name used for registration and error reporting
    fn name(&self) -> &str;

    /// Handle one event
    ///
    /// # Errors
    ///
    /// A failure on `BeforeExecute` aborts the run; on `AfterExecute` it is
    /// reported to the caller; on `Error` it is only logged.
    fn handle(&self, event: LifecycleEvent, payload: &ExecutionContext) -> anyhow::Result<()>;
}

/// Ordered list of observers
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.snapshot())
            .finish()
    }
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer
    ///
    /// # Errors
    ///
    /// Returns error if an observer with the same name is already registered
    pub fn register(&self, observer: Arc<dyn Observer>) -> Result<()> {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if observers.iter().any(|o| o.name() == observer.name()) {
            return Err(Error::Execution(ExecutionError::DuplicateObserver {
                name: observer.name().to_string(),
            }));
        }
        tracing::debug!(observer = observer.name(), "registered observer");
        observers.push(observer);
        drop(observers);
        Ok(())
    }

    /// Notify every observer in order, stopping at the first failure
    ///
    /// # Errors
    ///
    /// Returns `HookFailed` naming the observer and event that failed
    pub fn emit(&self, event: LifecycleEvent, payload: &ExecutionContext) -> Result<()> {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        for observer in observers.iter() {
            observer.handle(event, payload).map_err(|e| {
                Error::hook_failed(observer.name(), event.as_ref(), format!("{e:#}"))
            })?;
        }
        Ok(())
    }

    /// Names of the registered observers, in registration order
    pub fn snapshot(&self) -> Vec<String> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|o| o.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Logs every lifecycle event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn name(&self) -> &str {
        "tracing"
    }

    fn handle(&self, event: LifecycleEvent, payload: &ExecutionContext) -> anyhow::Result<()> {
        let path = payload.label();
        match event {
            LifecycleEvent::RegistryLoaded => {
                tracing::debug!(event = %event, "command table loaded");
            }
            LifecycleEvent::BeforeExecute => {
                tracing::info!(event = %event, path = %path, command = %payload.command, args = ?payload.args, "starting");
            }
            LifecycleEvent::AfterExecute => {
                tracing::info!(event = %event, path = %path, exit_code = ?payload.exit_code, "finished");
            }
            LifecycleEvent::Error => {
                tracing::warn!(
                    event = %event,
                    path = %path,
                    exit_code = ?payload.exit_code,
                    error = payload.error.as_deref().unwrap_or(""),
                    "failed"
                );
            }
        }
        Ok(())
    }
}
