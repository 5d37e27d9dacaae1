//! Subcommand handlers

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use runbook_core::{
    config::{expand_path, GlobalConfig},
    executor::DryRunReport,
    CommandSpec, ExecutionContext, Executor, GlobalScriptsRoot, LifecycleEvent,
    LoadedConfig, Loader, MergePolicy, ObserverRegistry, Origin, ScriptRequest, TracingObserver,
};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Commands, RunArgs};

pub async fn dispatch(cli: &Cli, cancel: &CancellationToken) -> Result<()> {
    let observers = Arc::new(ObserverRegistry::new());
    observers.register(Arc::new(TracingObserver))?;

    let (source, loaded) = load_table(cli)?;
    if let Err(e) = observers.emit(LifecycleEvent::RegistryLoaded, &ExecutionContext::default()) {
        tracing::warn!(error = %e, "registry_loaded observer failed");
    }

    match &cli.command {
        Commands::List { json } => list(&source, &loaded, *json),
        Commands::Validate => {
            validate(&source, &loaded);
            Ok(())
        }
        Commands::Run(args) => run(&loaded, args, observers, cancel).await,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LOADING
// ═══════════════════════════════════════════════════════════════════════════

fn load_table(cli: &Cli) -> Result<(PathBuf, LoadedConfig)> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let source = match &cli.config {
        Some(raw) => {
            let global = GlobalConfig::load()?;
            locate_config(&expand_path(&raw.to_string_lossy()), &cwd, &global.search_paths)
        }
        None => GlobalConfig::load()?.default_config_path,
    };

    let policy = if cli.permissive {
        MergePolicy::Permissive
    } else {
        MergePolicy::Strict
    };
    tracing::debug!(source = %source.display(), env = ?cli.env, policy = %policy, "loading command table");

    let loaded = Loader::new(&cwd)
        .with_module_policy(policy)
        .load(&source, cli.env.as_deref())?;
    for diagnostic in &loaded.diagnostics {
        tracing::debug!("{diagnostic}");
    }
    Ok((source, loaded))
}

/// Resolve a relative `--config` against the cwd, then the configured search paths
fn locate_config(raw: &Path, cwd: &Path, search_paths: &[PathBuf]) -> PathBuf {
    if raw.is_absolute() {
        return raw.to_path_buf();
    }
    let local = cwd.join(raw);
    if local.exists() {
        return local;
    }
    search_paths
        .iter()
        .map(|dir| dir.join(raw))
        .find(|candidate| candidate.exists())
        .unwrap_or(local)
}

// ═══════════════════════════════════════════════════════════════════════════
// LIST / VALIDATE
// ═══════════════════════════════════════════════════════════════════════════

fn list(source: &Path, loaded: &LoadedConfig, json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({
            "source": source.display().to_string(),
            "commands": &loaded.table.commands,
            "diagnostics": &loaded.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for (name, spec) in &loaded.table.commands {
        println!(
            "{}",
            describe_entry(name, spec.alias(), &spec.description, &spec.origin)
        );
        for (action_name, action) in &spec.actions {
            println!(
                "  {}",
                describe_entry(action_name, action.alias(), &action.description, &action.origin)
            );
        }
    }
    for diagnostic in &loaded.diagnostics {
        eprintln!("{diagnostic}");
    }
    Ok(())
}

fn describe_entry(name: &str, alias: Option<&str>, description: &str, origin: &Origin) -> String {
    [
        Some(name.to_string()),
        alias.map(|a| format!("({a})")),
        Some(description.trim())
            .filter(|d| !d.is_empty())
            .map(|d| format!("- {d}")),
        Some(origin)
            .filter(|o| !o.is_empty())
            .map(|o| format!("[{o}]")),
    ]
    .into_iter()
    .flatten()
    .join(" ")
}

fn validate(source: &Path, loaded: &LoadedConfig) {
    for diagnostic in &loaded.diagnostics {
        eprintln!("{diagnostic}");
    }
    let actions: usize = loaded.table.commands.values().map(|s| s.actions.len()).sum();
    println!(
        "OK: {} commands, {actions} actions from {}",
        loaded.table.len(),
        source.display()
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// RUN
// ═══════════════════════════════════════════════════════════════════════════

/// Command line, definition env and command path for a resolved invocation
#[derive(Debug)]
struct Target {
    path: Vec<String>,
    command: String,
    env: BTreeMap<String, String>,
}

fn resolve_target(loaded: &LoadedConfig, command: &str, action: Option<&str>) -> Result<Target> {
    let Some((name, spec)) = loaded.table.resolve(command) else {
        bail!("unknown command '{command}' (see `runbook list` for available commands)");
    };

    match action {
        Some(wanted) => {
            let Some((action_name, action)) = spec.resolve_action(wanted) else {
                bail!("unknown action '{wanted}' for '{name}'; {}", action_hint(spec));
            };
            let mut env = spec.env.clone();
            env.extend(action.env.clone());
            Ok(Target {
                path: vec![name.to_string(), action_name.to_string()],
                command: action.command().unwrap_or_default().to_string(),
                env,
            })
        }
        None => {
            let Some(default) = spec.default_command() else {
                bail!("'{name}' has no default command; {}", action_hint(spec));
            };
            Ok(Target {
                path: vec![name.to_string()],
                command: default.to_string(),
                env: spec.env.clone(),
            })
        }
    }
}

fn action_hint(spec: &CommandSpec) -> String {
    format!(
        "choose an action: {}",
        spec.sorted_action_names().into_iter().join(", ")
    )
}

async fn run(
    loaded: &LoadedConfig,
    args: &RunArgs,
    observers: Arc<ObserverRegistry>,
    cancel: &CancellationToken,
) -> Result<()> {
    let target = resolve_target(loaded, &args.command, args.action.as_deref())?;

    let request = ScriptRequest {
        command_path: target.path,
        command: target.command,
        extra_args: args.args.clone(),
        base_env: target.env,
        extra_env: args.set.iter().cloned().collect(),
        working_dir: args.dir.clone(),
        dry_run: args.dry_run,
        timeout: args.timeout.map(Duration::from_secs),
    };

    let executor = Executor::new(observers, Arc::new(GlobalScriptsRoot));
    match executor.execute(cancel, request).await {
        Ok(result) => {
            if let Some(report) = &result.dry_run {
                print_dry_run(report);
            }
            tracing::debug!(elapsed = ?result.duration, "done");
            Ok(())
        }
        Err(failure) => {
            tracing::debug!(elapsed = ?failure.result.duration, outcome = ?failure.result.outcome, "failed");
            Err(failure.error.into())
        }
    }
}

fn print_dry_run(report: &DryRunReport) {
    println!("command: {}", report.command_line);
    if !report.args.is_empty() {
        println!("args: {}", report.args.iter().join(" "));
    }
    if !report.env.is_empty() {
        println!("env:");
        for pair in &report.env {
            println!("  {pair}");
        }
    }
}
