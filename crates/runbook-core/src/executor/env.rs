//! Process environment assembly
//!
//! Layers, lowest to highest precedence: inherited process environment,
//! the definition's base env, then the caller's overrides.

use std::collections::BTreeMap;

/// Merge the three environment layers; later layers win on key collision
pub fn assemble_env<I>(
    inherited: I,
    base: &BTreeMap<String, String>,
    extra: &BTreeMap<String, String>,
) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env: BTreeMap<String, String> = inherited.into_iter().collect();
    env.extend(base.iter().map(|(k, v)| (k.clone(), v.clone())));
    env.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    env
}

/// The current process environment; non-UTF-8 entries are decoded lossily
pub fn inherited_env() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os().map(|(k, v)| {
        (
            k.to_string_lossy().into_owned(),
            v.to_string_lossy().into_owned(),
        )
    })
}

/// Flat `NAME=VALUE` list in key order
pub fn env_pairs(env: &BTreeMap<String, String>) -> Vec<String> {
    env.iter().map(|(k, v)| format!("{k}={v}")).collect()
}
