//! Backtick placeholder resolution.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{DunnerError, Result};

use super::EnvSource;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`\$(?P<name>[^`]+)`").expect("Invalid regex pattern"));

/// Substitute every `` `$NAME` `` occurrence in `s` with the value of
/// `NAME` from `env`. Supports multiple distinct and repeated placeholders
/// in one string; a string without placeholders is returned unchanged.
///
/// Fails with [`DunnerError::EnvNotFound`] when any referenced name is
/// unset or empty.
pub fn resolve(s: &str, env: &dyn EnvSource) -> Result<String> {
    let mut resolved = s.to_string();
    for captures in PLACEHOLDER.captures_iter(s) {
        let name = &captures["name"];
        let value = env
            .lookup(name)
            .ok_or_else(|| DunnerError::EnvNotFound(name.to_string()))?;
        resolved = resolved.replace(&format!("`${name}`"), &value);
    }
    Ok(resolved)
}
