//! Mount specifier decoding.
//!
//! A mount is authored as `source:destination[:mode]`. The mode is `r`
//! (read-only, the default) or one of `w`/`wr`/`rw` (read-write). The
//! source may reference environment placeholders and a leading `~`, and
//! must resolve to an existing host directory.

use std::path::PathBuf;

use crate::env::{self, EnvSource};
use crate::error::{DunnerError, Result};

const DEFAULT_MODE: &str = "r";
const VALID_MODES: [&str; 4] = [DEFAULT_MODE, "wr", "rw", "w"];

/// A decoded host-directory-to-container-path bind mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    /// Absolute host source directory.
    pub source: PathBuf,
    /// Container destination path, as authored (placeholder-resolved).
    pub destination: String,
    pub read_only: bool,
}

/// Decode one mount specifier into a [`BindMount`].
pub fn decode_mount(spec: &str, env: &dyn EnvSource) -> Result<BindMount> {
    let trimmed = spec.trim_matches(|c| c == '\'' || c == '"');
    let fields: Vec<&str> = trimmed.split(':').collect();
    if fields.len() < 2 || fields.len() > 3 || fields[0].is_empty() || fields[1].is_empty() {
        return Err(DunnerError::InvalidMountFormat(spec.to_string()));
    }

    let mode = fields.get(2).copied().unwrap_or(DEFAULT_MODE);
    if !VALID_MODES.contains(&mode) {
        return Err(DunnerError::InvalidMountFormat(spec.to_string()));
    }
    let read_only = mode == DEFAULT_MODE;

    let source = env::resolve(fields[0], env)?;
    let destination = env::resolve(fields[1], env)?;

    let source = expand_home(&source);
    let source = std::fs::canonicalize(&source)
        .map_err(|_| DunnerError::SourceNotFound(spec.to_string()))?;
    if !source.is_dir() {
        return Err(DunnerError::SourceNotFound(spec.to_string()));
    }

    Ok(BindMount {
        source,
        destination,
        read_only,
    })
}

/// Expand a leading `~` to the current user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}
