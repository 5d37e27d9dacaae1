//! Command table merging logic
//!
//! Merging is per field, not per record: an incoming spec that only sets a
//! description leaves the existing command line alone. Conflicts are detected
//! before anything is applied, and a failed merge drops the partially built
//! table together with `self`.

use super::types::{ActionSpec, CommandSpec, CommandTable, Diagnostic, Origin};
use crate::{Error, Result};

/// How a merge treats an incoming command line that differs from one already set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MergePolicy {
    /// Module directories: a differing command line is a `ConfigConflict`
    #[default]
    Strict,
    /// Environment overlay: incoming values always win
    Overlay,
    /// Module directories, lenient: record a warning and apply the override
    Permissive,
}

impl CommandTable {
    /// Merge `other` into this table (other takes precedence where allowed)
    ///
    /// Diagnostics produced by the merge are appended to `diagnostics`.
    ///
    /// # Errors
    ///
    /// Under [`MergePolicy::Strict`], returns `ConfigConflict` naming both
    /// origins when `other` sets a non-empty command or action command that
    /// differs from one already present.
    pub fn merge(
        mut self,
        other: Self,
        policy: MergePolicy,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Self> {
        for (name, incoming) in other.commands {
            match self.commands.remove(&name) {
                None => {
                    self.commands.insert(name, incoming);
                }
                Some(existing) => {
                    check_command_overrides(&name, &existing, &incoming, policy, diagnostics)?;
                    self.commands.insert(name, existing.merge(incoming));
                }
            }
        }
        Ok(self)
    }
}

impl CommandSpec {
    fn merge(self, other: Self) -> Self {
        let Self {
            alias,
            description,
            command,
            actions: incoming_actions,
            env: incoming_env,
            origin,
        } = other;

        let mut actions = self.actions;
        for (name, incoming) in incoming_actions {
            let merged = match actions.remove(&name) {
                Some(existing) => existing.merge(incoming),
                None => incoming,
            };
            actions.insert(name, merged);
        }
        let mut env = self.env;
        env.extend(incoming_env);

        Self {
            alias: pick_alias(self.alias, alias),
            description: pick(self.description, description),
            command: pick(self.command, command),
            actions,
            env,
            origin: if origin.is_empty() { self.origin } else { origin },
        }
    }
}

impl ActionSpec {
    fn merge(self, other: Self) -> Self {
        let Self {
            alias,
            description,
            command,
            env: incoming_env,
            origin,
        } = other;

        let mut env = self.env;
        env.extend(incoming_env);

        Self {
            alias: pick_alias(self.alias, alias),
            description: pick(self.description, description),
            command: pick(self.command, command),
            env,
            origin: if origin.is_empty() { self.origin } else { origin },
        }
    }
}

fn pick_alias(current: Option<String>, incoming: Option<String>) -> Option<String> {
    if incoming
        .as_deref()
        .map(str::trim)
        .is_some_and(|a| !a.is_empty())
    {
        incoming
    } else {
        current
    }
}

fn pick(current: String, incoming: String) -> String {
    if incoming.trim().is_empty() {
        current
    } else {
        incoming
    }
}

/// Check every command line `incoming` would replace, before any field is applied
fn check_command_overrides(
    name: &str,
    existing: &CommandSpec,
    incoming: &CommandSpec,
    policy: MergePolicy,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    check_override(
        name,
        existing.default_command(),
        &existing.origin,
        incoming.default_command(),
        &incoming.origin,
        policy,
        diagnostics,
    )?;

    for (action_name, incoming_action) in &incoming.actions {
        if let Some(existing_action) = existing.actions.get(action_name) {
            check_override(
                &format!("{name}.{action_name}"),
                existing_action.command(),
                &existing_action.origin,
                incoming_action.command(),
                &incoming_action.origin,
                policy,
                diagnostics,
            )?;
        }
    }
    Ok(())
}

fn check_override(
    name: &str,
    existing: Option<&str>,
    existing_origin: &Origin,
    incoming: Option<&str>,
    incoming_origin: &Origin,
    policy: MergePolicy,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<()> {
    let (Some(existing), Some(incoming)) = (existing, incoming) else {
        return Ok(());
    };
    if existing == incoming {
        return Ok(());
    }

    match policy {
        MergePolicy::Strict => Err(Error::config_conflict(
            name,
            existing_origin.clone(),
            incoming_origin.clone(),
        )),
        MergePolicy::Permissive => {
            tracing::warn!(
                command = name,
                existing = %existing_origin,
                incoming = %incoming_origin,
                "module overrides an existing command"
            );
            diagnostics.push(Diagnostic::warning(format!(
                "{name}: {incoming_origin} overrides the command set by {existing_origin}"
            )));
            Ok(())
        }
        MergePolicy::Overlay => {
            tracing::debug!(command = name, incoming = %incoming_origin, "overlay replaces command");
            Ok(())
        }
    }
}
