//! In-memory environment source for tests.

use std::collections::HashMap;

use super::EnvSource;

/// Mock environment backed by a plain map, for tests that must not depend
/// on the host process environment.
#[derive(Debug, Clone, Default)]
pub struct MockEnv {
    vars: HashMap<String, String>,
}

impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable to the mock environment.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MockEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned().filter(|v| !v.is_empty())
    }
}
