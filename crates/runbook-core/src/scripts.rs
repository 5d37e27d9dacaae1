//! Local script resolution and pre-flight verification
//!
//! Only the first token of a command line is inspected:
//! - an absolute path is a candidate as-is
//! - `./x` and `../x` resolve against the working directory (or the process cwd)
//! - anything else is left to the shell's own `PATH` lookup
//!
//! A candidate is verified only when it lies inside the managed scripts root.
//! Paths outside the root belong to the user and are not checked.

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use crate::{
    config::{normalize_lexically, resolve_home_dir, GlobalConfig},
    Error, Result,
};

/// Supplies the trusted scripts root directory
pub trait ScriptsRootResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns error if the root cannot be determined
    fn resolve_root(&self) -> Result<PathBuf>;
}

/// Reads the scripts root from the runbook home's `global.yaml`
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalScriptsRoot;

impl ScriptsRootResolver for GlobalScriptsRoot {
    fn resolve_root(&self) -> Result<PathBuf> {
        let home = resolve_home_dir()?;
        GlobalConfig::load_from(&home)?.resolved_scripts_root(&home)
    }
}

/// A fixed scripts root, for embedding and tests
#[derive(Debug, Clone)]
pub struct FixedScriptsRoot(pub PathBuf);

impl ScriptsRootResolver for FixedScriptsRoot {
    fn resolve_root(&self) -> Result<PathBuf> {
        Ok(normalize_lexically(&self.0))
    }
}

/// Resolve the first shell token to a local script path, if it names one
///
/// # Errors
///
/// Returns error if a relative token needs the process cwd and it cannot be read
pub fn resolve_command_target(token: &str, working_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    if token.is_empty() {
        return Ok(None);
    }
    let path = Path::new(token);
    if path.is_absolute() {
        return Ok(Some(normalize_lexically(path)));
    }
    if !(token.starts_with("./") || token.starts_with("../")) {
        return Ok(None);
    }

    let base = match working_dir.filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| Error::io_error(format!("Failed to get current directory: {e}")))?,
    };
    Ok(Some(normalize_lexically(&base.join(path))))
}

/// True when `path` is strictly inside `root` (the root itself does not count)
pub fn is_under_root(path: &Path, root: &Path) -> bool {
    if root.as_os_str().is_empty() {
        return false;
    }
    normalize_lexically(path)
        .strip_prefix(normalize_lexically(root))
        .is_ok_and(|rest| !rest.as_os_str().is_empty())
}

/// Verify a script is a regular, executable file starting with `#!`
///
/// # Errors
///
/// Returns `ScriptNotFound` if the file is missing, otherwise `ScriptUnsafe`
/// describing the first failed check
pub fn verify_executable(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::script_not_found(path)
        } else {
            Error::script_unsafe(path, format!("cannot inspect file: {e}"))
        }
    })?;

    if metadata.is_dir() {
        return Err(Error::script_unsafe(path, "path is a directory"));
    }
    if !metadata.is_file() {
        return Err(Error::script_unsafe(path, "not a regular file"));
    }
    if !has_execute_bit(&metadata) {
        return Err(Error::script_unsafe(path, "missing executable permission"));
    }

    let mut head = Vec::with_capacity(2);
    std::fs::File::open(path)
        .and_then(|file| file.take(2).read_to_end(&mut head))
        .map_err(|e| Error::script_unsafe(path, format!("cannot read file: {e}")))?;
    if head != b"#!" {
        return Err(Error::script_unsafe(path, "missing #! interpreter line"));
    }
    Ok(())
}

#[cfg(unix)]
fn has_execute_bit(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_bit(_metadata: &std::fs::Metadata) -> bool {
    true
}
