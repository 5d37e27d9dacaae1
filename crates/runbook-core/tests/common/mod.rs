//! Shared fixtures for runbook-core integration tests

#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use runbook_core::{
    executor::ShellDialect, ExecutionContext, Executor, FixedScriptsRoot, LifecycleEvent, Observer,
    ObserverRegistry, ScriptRequest,
};

/// Observer that records every event and can be told to reject one
pub struct Recorder {
    name: String,
    fail_on: Option<LifecycleEvent>,
    seen: Mutex<Vec<(LifecycleEvent, ExecutionContext)>>,
}

impl Recorder {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_on: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_on(name: &str, event: LifecycleEvent) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            fail_on: Some(event),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(event, _)| *event)
            .collect()
    }

    pub fn payloads(&self) -> Vec<ExecutionContext> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl Observer for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, event: LifecycleEvent, payload: &ExecutionContext) -> anyhow::Result<()> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((event, payload.clone()));
        if self.fail_on == Some(event) {
            anyhow::bail!("{} rejected {event}", self.name);
        }
        Ok(())
    }
}

/// POSIX executor with a fixed scripts root and the given observers
pub fn executor(root: &Path, observers: &[Arc<Recorder>]) -> Executor {
    let registry = Arc::new(ObserverRegistry::new());
    for observer in observers {
        let observer: Arc<dyn Observer> = observer.clone();
        if let Err(e) = registry.register(observer) {
            panic!("observer registration failed: {e}");
        }
    }
    Executor::new(registry, Arc::new(FixedScriptsRoot(root.to_path_buf())))
        .with_dialect(ShellDialect::Posix)
}

pub fn request(command: &str) -> ScriptRequest {
    ScriptRequest::new(vec!["test".to_string(), "run".to_string()], command)
}

/// Write a file and set its unix mode
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str, mode: u32) -> std::io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, body)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))?;
    Ok(path)
}

/// Quote a path for embedding in a POSIX command line
pub fn sh_path(path: &Path) -> String {
    shell_words::quote(&path.to_string_lossy()).into_owned()
}
