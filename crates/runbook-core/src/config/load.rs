//! Configuration loading from YAML files and module directories
//!
//! A config location is either:
//! 1. A single file, optionally layered with `<stem>.<env><ext>` next to it
//!    (overlay merge, the environment file wins)
//! 2. A directory of `*.yaml` / `*.yml` module files, discovered recursively
//!    outside any `scripts` subtree and merged in sorted path order
//!
//! Every load builds a fresh table; nothing is cached between calls.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{
    merge::MergePolicy,
    types::{CommandTable, Diagnostic, Origin},
};
use crate::{Error, Result};

/// Directory name reserved for script assets inside a module directory
pub const SCRIPTS_DIR_NAME: &str = "scripts";

/// A validated command table together with the notes produced while building it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedConfig {
    pub table: CommandTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Loads command tables relative to a base directory
#[derive(Debug, Clone)]
pub struct Loader {
    base_dir: PathBuf,
    module_policy: MergePolicy,
}

impl Loader {
    /// Create a loader resolving relative paths against `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            module_policy: MergePolicy::Strict,
        }
    }

    /// Choose how module directories treat conflicting overrides
    pub fn with_module_policy(mut self, policy: MergePolicy) -> Self {
        self.module_policy = policy;
        self
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || self.base_dir.as_os_str().is_empty() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Load, merge and validate the command table at `path`
    ///
    /// `env` selects an overlay file for single-file configs; it is ignored
    /// for module directories.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The path or module directory does not exist (`ConfigNotFound`)
    /// - A file is not valid YAML (`ConfigParseError`)
    /// - A module overrides another module's command (`ConfigConflict`)
    /// - The merged table fails validation (`ValidationError`)
    pub fn load(&self, path: impl AsRef<Path>, env: Option<&str>) -> Result<LoadedConfig> {
        let full_path = self.resolve_path(path.as_ref());
        let metadata = std::fs::metadata(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(&full_path)
            } else {
                Error::io_error(format!(
                    "Failed to read config {}: {e}",
                    full_path.display()
                ))
            }
        })?;

        let loaded = if metadata.is_dir() {
            self.load_directory(&full_path)?
        } else {
            Self::load_with_overlay(&full_path, env)?
        };

        loaded.table.validate()?;
        tracing::debug!(
            path = %full_path.display(),
            commands = loaded.table.len(),
            "loaded command table"
        );
        Ok(loaded)
    }

    fn load_with_overlay(path: &Path, env: Option<&str>) -> Result<LoadedConfig> {
        let table = load_file(path, &describe_source(path, ""))?;
        let mut diagnostics = Vec::new();

        let env = env.map(str::trim).filter(|e| !e.is_empty());
        let Some(env) = env else {
            return Ok(LoadedConfig { table, diagnostics });
        };

        let overlay = overlay_path(path, env);
        if !overlay.is_file() {
            tracing::debug!(overlay = %overlay.display(), "no environment overlay present");
            return Ok(LoadedConfig { table, diagnostics });
        }

        let origin = describe_source(&overlay, &format!("@env:{env}"));
        let overlay_table = load_file(&overlay, &origin)?;
        let table = table.merge(overlay_table, MergePolicy::Overlay, &mut diagnostics)?;
        diagnostics.push(Diagnostic::info(format!(
            "applied environment overlay {origin}"
        )));
        Ok(LoadedConfig { table, diagnostics })
    }

    fn load_directory(&self, dir: &Path) -> Result<LoadedConfig> {
        let files = collect_module_files(dir)?;
        if files.is_empty() {
            return Err(Error::config_not_found(dir));
        }

        let module = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut diagnostics = Vec::new();
        let mut table = CommandTable::new();
        for file in &files {
            let origin = describe_source(file, &module);
            let module_table = load_file(file, &origin)?;
            table = table.merge(module_table, self.module_policy, &mut diagnostics)?;
            diagnostics.push(Diagnostic::info(format!("merged module {origin}")));
        }
        Ok(LoadedConfig { table, diagnostics })
    }
}

/// Parse one YAML file and stamp every entry with `origin`
///
/// # Errors
///
/// Returns error if the file is missing, unreadable or malformed
pub fn load_file(path: &Path, origin: &Origin) -> Result<CommandTable> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config_not_found(path)
        } else {
            Error::io_error(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        }
    })?;

    serde_yaml::from_str::<Option<CommandTable>>(&content)
        .map(|table| table.unwrap_or_default().with_origin(origin))
        .map_err(|e| Error::config_parse(path, e.to_string()))
}

/// `<dir>/<stem>.<env><ext>` for a base config path
pub fn overlay_path(path: &Path, env: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{stem}.{env}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{env}"),
    };
    path.with_file_name(file_name)
}

/// All YAML module files beneath `root`, sorted by path
///
/// Directories named `scripts` (any case) below the root are skipped, as are
/// symlinks and other non-regular files.
///
/// # Errors
///
/// Returns error if the directory tree cannot be walked
pub fn collect_module_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        !(entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_string_lossy()
                .eq_ignore_ascii_case(SCRIPTS_DIR_NAME))
    });

    for entry in walker {
        let entry = entry.map_err(|e| {
            Error::io_error(format!("Failed to walk module directory {}: {e}", root.display()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_yaml = entry
            .path()
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn describe_source(path: &Path, module: &str) -> Origin {
    Origin::new(module, path.to_string_lossy().replace('\\', "/"))
}
