//! Command table structure definitions

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Deserializer, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// PROVENANCE
// ═══════════════════════════════════════════════════════════════════════════

/// Module label and file path that last set a value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Origin {
    /// Module label, e.g. the module directory name or `@env:dev`
    pub module: String,
    /// Config file path with forward slashes
    pub file: String,
}

impl Origin {
    pub fn new(module: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            file: file.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.module.trim().is_empty() && self.file.trim().is_empty()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = self.module.trim();
        let file = self.file.trim();
        match (module.is_empty(), file.is_empty()) {
            (false, false) => write!(f, "{module} ({file})"),
            (true, false) => write!(f, "{file}"),
            (false, true) => write!(f, "{module}"),
            (true, true) => Ok(()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════

/// Severity of a merge diagnostic
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Note accumulated during a load for the caller to render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// COMMAND TABLE
// ═══════════════════════════════════════════════════════════════════════════

/// Resolved mapping of command name to its definition
///
/// Backed by a `BTreeMap` so every walk over the table is in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTable {
    #[serde(default, deserialize_with = "nullable_map")]
    pub commands: BTreeMap<String, CommandSpec>,
}

/// A top-level command: an optional default command plus named actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub description: String,
    pub command: String,
    #[serde(deserialize_with = "nullable_map")]
    pub actions: BTreeMap<String, ActionSpec>,
    #[serde(deserialize_with = "nullable_map")]
    pub env: BTreeMap<String, String>,
    #[serde(skip_deserializing)]
    pub origin: Origin,
}

/// A named action nested under a command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub description: String,
    pub command: String,
    #[serde(deserialize_with = "nullable_map")]
    pub env: BTreeMap<String, String>,
    #[serde(skip_deserializing)]
    pub origin: Origin,
}

impl CommandTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: CommandSpec) -> Option<CommandSpec> {
        self.commands.insert(name.into(), spec)
    }

    /// Command names in lexicographic order
    pub fn sorted_names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    /// Find a command by its name, falling back to its alias
    pub fn resolve(&self, name_or_alias: &str) -> Option<(&str, &CommandSpec)> {
        self.commands
            .get_key_value(name_or_alias)
            .or_else(|| {
                self.commands
                    .iter()
                    .find(|(_, spec)| spec.alias() == Some(name_or_alias))
            })
            .map(|(name, spec)| (name.as_str(), spec))
    }

    /// Stamp every command and action with the given origin
    pub fn with_origin(mut self, origin: &Origin) -> Self {
        self.commands.values_mut().for_each(|spec| {
            spec.origin = origin.clone();
            spec.actions
                .values_mut()
                .for_each(|action| action.origin = origin.clone());
        });
        self
    }
}

impl CommandSpec {
    /// Alias with surrounding whitespace removed, if one is set
    pub fn alias(&self) -> Option<&str> {
        non_blank(self.alias.as_deref())
    }

    /// Default command line, if one is set
    pub fn default_command(&self) -> Option<&str> {
        non_blank(Some(self.command.as_str()))
    }

    /// Action names in lexicographic order
    pub fn sorted_action_names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    /// Find an action by its name, falling back to its alias
    pub fn resolve_action(&self, name_or_alias: &str) -> Option<(&str, &ActionSpec)> {
        self.actions
            .get_key_value(name_or_alias)
            .or_else(|| {
                self.actions
                    .iter()
                    .find(|(_, action)| action.alias() == Some(name_or_alias))
            })
            .map(|(name, action)| (name.as_str(), action))
    }
}

impl ActionSpec {
    pub fn alias(&self) -> Option<&str> {
        non_blank(self.alias.as_deref())
    }

    pub fn command(&self) -> Option<&str> {
        non_blank(Some(self.command.as_str()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Deserialize a map where the map itself or any value may be YAML `null`
fn nullable_map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<BTreeMap<String, Option<T>>>::deserialize(deserializer).map(|map| {
        map.unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, value.unwrap_or_default()))
            .collect()
    })
}
