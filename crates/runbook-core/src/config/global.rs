//! Tool-level settings stored under the runbook home directory
//!
//! # Layout
//!
//! ```text
//! $RUNBOOK_HOME (default ~/.runbook)
//! ├── global.yaml
//! └── config/
//!     ├── demo.yaml
//!     └── scripts/
//! ```

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable overriding the runbook home directory
pub const HOME_ENV: &str = "RUNBOOK_HOME";

const HOME_DIR_NAME: &str = ".runbook";
const GLOBAL_CONFIG_FILE: &str = "global.yaml";
const CONFIG_DIR_NAME: &str = "config";
const SCRIPTS_DIR_NAME: &str = "scripts";
const DEFAULT_CONFIG_FILE: &str = "demo.yaml";

/// Contents of `<home>/global.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub default_config_path: PathBuf,
    pub scripts_root: PathBuf,
    pub search_paths: Vec<PathBuf>,
}

impl GlobalConfig {
    /// Load `global.yaml` from the resolved home directory
    ///
    /// # Errors
    ///
    /// Returns error if the home directory cannot be determined or the file
    /// exists but is malformed
    pub fn load() -> Result<Self> {
        resolve_home_dir().and_then(|home| Self::load_from(&home))
    }

    /// Load `global.yaml` from `home`, falling back to defaults when absent
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load_from(home: &Path) -> Result<Self> {
        let home = &absolute(&normalize_lexically(home))?;
        let path = home.join(GLOBAL_CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_yaml::from_str::<Option<Self>>(&content)
                .map(|cfg| cfg.unwrap_or_default().fill_defaults(home))
                .map_err(|e| Error::config_parse(&path, e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::defaults(home)),
            Err(e) => Err(Error::io_error(format!(
                "Failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn defaults(home: &Path) -> Self {
        let config_dir = home.join(CONFIG_DIR_NAME);
        Self {
            default_config_path: config_dir.join(DEFAULT_CONFIG_FILE),
            scripts_root: config_dir.join(SCRIPTS_DIR_NAME),
            search_paths: vec![config_dir],
        }
    }

    fn fill_defaults(self, home: &Path) -> Self {
        let defaults = Self::defaults(home);
        let default_config_path = if self.default_config_path.as_os_str().is_empty() {
            defaults.default_config_path
        } else {
            self.default_config_path
        };
        let search_paths = if self.search_paths.is_empty() {
            default_config_path
                .parent()
                .map(|dir| vec![dir.to_path_buf()])
                .unwrap_or(defaults.search_paths)
        } else {
            self.search_paths
        };
        Self {
            scripts_root: if self.scripts_root.as_os_str().is_empty() {
                defaults.scripts_root
            } else {
                self.scripts_root
            },
            default_config_path,
            search_paths,
        }
    }

    /// Absolute scripts root, confined to `home`
    ///
    /// # Errors
    ///
    /// Returns error if the configured root resolves outside `home`
    pub fn resolved_scripts_root(&self, home: &Path) -> Result<PathBuf> {
        let home = absolute(&normalize_lexically(home))?;
        normalize_within_home(
            &self.scripts_root.to_string_lossy(),
            &Self::defaults(&home).scripts_root,
            &home,
        )
    }
}

/// `$RUNBOOK_HOME` when set, otherwise `~/.runbook`
///
/// A relative override is resolved against the current directory.
///
/// # Errors
///
/// Returns error if neither the override nor the user's home directory is available
pub fn resolve_home_dir() -> Result<PathBuf> {
    if let Some(custom) = std::env::var_os(HOME_ENV).filter(|v| !v.to_string_lossy().trim().is_empty())
    {
        return absolute(&normalize_lexically(Path::new(&custom)));
    }
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(HOME_DIR_NAME))
        .ok_or_else(|| Error::io_error("Failed to determine the user's home directory"))
}

/// Expand a leading `~` and `$VAR` / `${VAR}` references, then normalize
///
/// Unset variables expand to the empty string.
pub fn expand_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return PathBuf::new();
    }
    let tilde = shellexpand::tilde(trimmed);
    let expanded = shellexpand::env_with_context_no_errors(tilde.as_ref(), |name| {
        Some(std::env::var(name).unwrap_or_default())
    });
    normalize_lexically(Path::new(expanded.as_ref()))
}

/// Resolve `raw` (or `fallback` when blank) to an absolute path inside `home`
///
/// # Errors
///
/// Returns a validation error if the result escapes `home`
pub fn normalize_within_home(raw: &str, fallback: &Path, home: &Path) -> Result<PathBuf> {
    let candidate = if raw.trim().is_empty() {
        normalize_lexically(fallback)
    } else {
        expand_path(raw)
    };
    let home = absolute(&normalize_lexically(home))?;
    let candidate = if candidate.is_absolute() {
        candidate
    } else {
        normalize_lexically(&home.join(candidate))
    };

    if candidate.starts_with(&home) {
        Ok(candidate)
    } else {
        Err(Error::validation(
            "scripts_root",
            format!(
                "path {} is outside the runbook home {}",
                candidate.display(),
                home.display()
            ),
        ))
    }
}

/// Resolve `.` and `..` components without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                ) && normalized.pop();
                if !popped && !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| normalize_lexically(&cwd.join(path)))
        .map_err(|e| Error::io_error(format!("Failed to get current directory: {e}")))
}
