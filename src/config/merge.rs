//! Scope merge engine.
//!
//! Effective env and mount lists for a step are built by override-by-key
//! precedence: every step entry is kept, task entries are appended only
//! when their key is unseen, then global entries likewise. A key defined
//! at a narrower scope is never shadowed by a broader one because the
//! broader entry is simply not added.

use std::collections::HashSet;

/// Merge `KEY=VALUE` env lists with step > task > global precedence.
/// The key is the substring before the first `=`.
pub fn merge_envs(step: &[String], task: &[String], global: &[String]) -> Vec<String> {
    merge_by_key(step, task, global, env_key)
}

/// Merge mount specifier lists with step > task > global precedence.
/// The key is the mount destination, the second colon-delimited field.
pub fn merge_mounts(step: &[String], task: &[String], global: &[String]) -> Vec<String> {
    merge_by_key(step, task, global, mount_destination)
}

fn merge_by_key(
    step: &[String],
    task: &[String],
    global: &[String],
    key: fn(&str) -> &str,
) -> Vec<String> {
    let mut merged: Vec<String> = step.to_vec();
    let mut seen: HashSet<&str> = step.iter().map(|e| key(e)).collect();

    for scope in [task, global] {
        for entry in scope {
            if seen.insert(key(entry)) {
                merged.push(entry.clone());
            }
        }
    }
    merged
}

fn env_key(entry: &str) -> &str {
    entry.split('=').next().unwrap_or(entry)
}

fn mount_destination(entry: &str) -> &str {
    let trimmed = entry.trim_matches(|c| c == '\'' || c == '"');
    trimmed.split(':').nth(1).unwrap_or(trimmed)
}
