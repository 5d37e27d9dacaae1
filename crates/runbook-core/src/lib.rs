//! # Runbook Core
//!
//! Layered command tables and guarded shell execution.
//!
//! A command table is loaded from a YAML file (plus an optional
//! `<stem>.<env><ext>` overlay) or from a directory of module files,
//! merged under an explicit policy, and validated. At invocation time the
//! [`executor::Executor`] verifies managed scripts, notifies observers,
//! runs the command under the platform shell, and reports a typed outcome.
//!
//! ## Laws (Compiler Enforced)
//!
//! - No `unwrap()` - returns `Result` instead
//! - No `expect()` - returns `Result` instead
//! - No `panic!()` - returns `Result` instead
//! - No `unsafe` - safe Rust only
//!
//! ## Error Handling
//!
//! All fallible operations return `Result<T, Error>`. Use:
//! - `?` operator for propagation
//! - `map`, `and_then` combinators for transformation
//! - `match` / `map_or` / `unwrap_or_else` for defaults

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod plugins;
pub mod scripts;

pub use config::{CommandSpec, CommandTable, LoadedConfig, Loader, MergePolicy, Origin};
pub use error::{Error, Result};
pub use executor::{ExecutionFailure, ExecutionResult, Executor, ExitOutcome, ScriptRequest};
pub use lifecycle::{ExecutionContext, LifecycleEvent};
pub use plugins::{Observer, ObserverRegistry, TracingObserver};
pub use scripts::{FixedScriptsRoot, GlobalScriptsRoot, ScriptsRootResolver};
