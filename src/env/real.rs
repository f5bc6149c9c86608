//! Process-environment backed lookup with dotenv overrides.

use std::collections::HashMap;
use std::path::Path;

use tracing::{info, warn};

use super::EnvSource;

/// Production environment source: the host process environment, overridden
/// by entries from an optional dotenv-style file. A variable defined in
/// both places resolves to the dotenv value.
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    dotenv: HashMap<String, String>,
}

impl HostEnv {
    /// Build a source from the host environment alone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source layering `dotenv_file` over the host environment.
    /// A missing or unreadable file is not an error; the host environment
    /// is used as-is.
    pub fn with_dotenv(dotenv_file: &Path) -> Self {
        let mut dotenv = HashMap::new();
        match dotenvy::from_filename_iter(dotenv_file) {
            Ok(entries) => {
                for entry in entries {
                    match entry {
                        Ok((key, value)) => {
                            dotenv.insert(key, value);
                        }
                        Err(err) => warn!(
                            "Skipping malformed entry in {} file: {err}",
                            dotenv_file.display()
                        ),
                    }
                }
            }
            Err(err) if err.not_found() => {
                info!(
                    "No environment loaded from {} file: Not found",
                    dotenv_file.display()
                );
            }
            Err(err) => {
                warn!(
                    "Failed to load environment from {} file: {err}",
                    dotenv_file.display()
                );
            }
        }
        Self { dotenv }
    }
}

impl EnvSource for HostEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        let mut value = std::env::var(name).ok();
        if let Some(v) = self.dotenv.get(name) {
            value = Some(v.clone());
        }
        value.filter(|v| !v.is_empty())
    }
}
