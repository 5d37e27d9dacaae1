//! Command table validation
//!
//! A table is executable when every name and alias is a single shell-safe
//! word, aliases are unique within their scope, and every command can run
//! something.

use std::collections::BTreeMap;

use super::types::{CommandSpec, CommandTable};
use crate::{Error, Result};

impl CommandTable {
    /// Validate the resolved table
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` naming the first offending command or
    /// action, in command-name order.
    pub fn validate(&self) -> Result<()> {
        let mut aliases: BTreeMap<&str, &str> = BTreeMap::new();

        for (name, spec) in &self.commands {
            validate_identifier(name, "command name", name)?;
            validate_command_spec(name, spec)?;

            if let Some(alias) = spec.alias() {
                if let Some(owner) = aliases.insert(alias, name) {
                    return Err(Error::validation(
                        name.as_str(),
                        format!("alias '{alias}' is already used by command '{owner}'"),
                    ));
                }
                if alias != name && self.commands.contains_key(alias) {
                    return Err(Error::validation(
                        name.as_str(),
                        format!("alias '{alias}' shadows the command of the same name"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Validate one command spec and its actions in isolation
pub(crate) fn validate_command_spec(name: &str, spec: &CommandSpec) -> Result<()> {
    if let Some(alias) = spec.alias() {
        validate_identifier(name, "alias", alias)?;
    }

    if spec.default_command().is_none() && spec.actions.is_empty() {
        return Err(Error::validation(
            name,
            "needs a default command or at least one action",
        ));
    }

    let mut aliases: BTreeMap<&str, &str> = BTreeMap::new();
    for (action_name, action) in &spec.actions {
        let qualified = format!("{name}.{action_name}");
        validate_identifier(&qualified, "action name", action_name)?;

        if action.command().is_none() {
            return Err(Error::validation(qualified, "action command is empty"));
        }

        if let Some(alias) = action.alias() {
            validate_identifier(&qualified, "alias", alias)?;
            if let Some(owner) = aliases.insert(alias, action_name) {
                return Err(Error::validation(
                    qualified,
                    format!("alias '{alias}' is already used by action '{owner}'"),
                ));
            }
            if alias != action_name && spec.actions.contains_key(alias) {
                return Err(Error::validation(
                    qualified,
                    format!("alias '{alias}' shadows the action of the same name"),
                ));
            }
        }
    }
    Ok(())
}

/// Names and aliases must be non-empty and free of whitespace
fn validate_identifier(owner: &str, kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(owner, format!("{kind} cannot be empty")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(Error::validation(
            owner,
            format!("{kind} '{value}' must not contain whitespace"),
        ));
    }
    Ok(())
}
