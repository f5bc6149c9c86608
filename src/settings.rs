//! Per-invocation runtime settings.
//!
//! One `RunSettings` value is built by the CLI layer before dispatch and
//! threaded read-only through the executor and the container backend. Step
//! workers never mutate it, which keeps concurrent step execution free of
//! shared mutable flag state.

use std::path::PathBuf;

/// Default task file read when `--task-file` is not given.
pub const DEFAULT_TASK_FILE: &str = ".dunner.yaml";

/// Default dotenv file consulted for placeholder lookups.
pub const DEFAULT_DOTENV_FILE: &str = ".env";

/// Container-internal directory the host working directory is mounted at.
/// Relative step `dir` values are joined under this root.
pub const CONTAINER_WORKING_ROOT: &str = "/dunner";

/// Immutable settings for one `dunner` invocation.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Path of the task definition file.
    pub task_file: PathBuf,
    /// Path of the dotenv file overriding host environment lookups.
    pub dotenv_file: PathBuf,
    /// Host directory bind-mounted read-write into every container.
    pub working_directory: PathBuf,
    /// Run all steps of a task (and followed tasks) concurrently.
    pub async_mode: bool,
    /// Stream verbose progress output. Forced off under `async_mode`.
    pub verbose: bool,
    /// Create and start containers but skip command execution.
    pub dry_run: bool,
    /// Pull images even when present locally.
    pub force_pull: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            task_file: PathBuf::from(DEFAULT_TASK_FILE),
            dotenv_file: PathBuf::from(DEFAULT_DOTENV_FILE),
            working_directory: PathBuf::from("./"),
            async_mode: false,
            verbose: false,
            dry_run: false,
            force_pull: false,
        }
    }
}
