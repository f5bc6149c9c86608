//! Container backend interface and step execution.
//!
//! The engine never talks to a container runtime directly: everything goes
//! through the [`ContainerBackend`] trait. Production uses [`DockerCli`],
//! which drives the `docker` binary through the subprocess layer; tests use
//! [`MockBackend`], which records calls and plays back scripted results.

pub mod cli;
pub mod mock;
pub mod step;

pub use cli::DockerCli;
pub use mock::{BackendCall, MockBackend};
pub use step::{ExecResult, ExecStep};

use async_trait::async_trait;

use crate::config::BindMount;
use crate::error::Result;

/// Everything needed to create one container.
#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    pub image: String,
    /// Command the container itself runs. The step machine passes a no-op
    /// long-running command here so that step commands can be exec'd into
    /// the same container state one after another.
    pub command: Vec<String>,
    /// Merged `KEY=VALUE` environment variables.
    pub env: Vec<String>,
    /// Container-internal working directory.
    pub working_dir: String,
    /// Container user, empty for the image default.
    pub user: String,
    pub mounts: Vec<BindMount>,
}

/// Handle to a created container plus any backend warnings.
#[derive(Debug, Clone)]
pub struct CreatedContainer {
    pub id: String,
    pub warnings: Vec<String>,
}

/// Output of one command exec'd inside a running container.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    pub fn success(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32, stderr: &str) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code,
        }
    }
}

/// Container runtime operations used by the step execution state machine.
#[async_trait]
pub trait ContainerBackend: Send + Sync {
    /// Whether `image` is present locally. An image reference without a
    /// tag matches any local tag of that repository.
    async fn image_exists(&self, image: &str) -> Result<bool>;

    /// Pull `image` from its registry, returning the progress output.
    async fn pull_image(&self, image: &str) -> Result<String>;

    async fn create_container(&self, config: &ContainerConfig) -> Result<CreatedContainer>;

    async fn start_container(&self, id: &str) -> Result<()>;

    /// Run `command` inside the running container, capturing demultiplexed
    /// stdout/stderr and the command's exit code.
    async fn exec(&self, id: &str, command: &[String]) -> Result<ExecOutput>;

    /// Stop the container gracefully.
    async fn stop_container(&self, id: &str) -> Result<()>;

    async fn remove_container(&self, id: &str) -> Result<()>;
}
