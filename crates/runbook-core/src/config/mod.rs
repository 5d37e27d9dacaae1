//! Command table loading and management
//!
//! # Sources
//!
//! A table comes from one of two layouts:
//! 1. Base file plus optional environment overlay: `demo.yaml` + `demo.dev.yaml`
//! 2. Module directory: every `*.yaml` / `*.yml` below it, in sorted path order
//!
//! # Example Config
//!
//! ```yaml
//! commands:
//!   system:
//!     alias: sys
//!     description: System maintenance
//!     command: echo status
//!     env:
//!       LOG_LEVEL: info
//!     actions:
//!       update:
//!         alias: up
//!         command: ./scripts/update.sh
//! ```
//!
//! # Module Structure
//!
//! - `types`: Command table structure definitions
//! - `load`: Loading from files and module directories
//! - `merge`: Overlay, strict and permissive merging
//! - `validate`: Naming, alias and invocability rules
//! - `global`: Tool-level settings and path helpers

// Module declarations
mod global;
mod load;
mod merge;
mod types;
mod validate;

// Test modules (organized by concern)
#[cfg(test)]
mod tests_loading;
#[cfg(test)]
mod tests_validation;

// Re-export public API
pub use global::{
    expand_path, normalize_lexically, normalize_within_home, resolve_home_dir, GlobalConfig,
    HOME_ENV,
};
pub use load::{
    collect_module_files, load_file, overlay_path, LoadedConfig, Loader, SCRIPTS_DIR_NAME,
};
pub use merge::MergePolicy;
pub use types::{ActionSpec, CommandSpec, CommandTable, Diagnostic, Origin, Severity};
