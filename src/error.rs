use thiserror::Error;

/// Crate-wide error type.
///
/// Configuration errors are caller-input problems and are never retried.
/// Backend errors come from the container runtime; `PullFailed` is only
/// raised after the local-image fallback check misses. `CommandFailed` is
/// the expected outcome of a user command exiting non-zero.
#[derive(Error, Debug)]
pub enum DunnerError {
    #[error("dunner: task '{0}' does not exist")]
    TaskNotFound(String),

    #[error("mount directory '{0}' is invalid. Check format is '<valid_src_dir>:<valid_dest_dir>:<optional_mode>' and has right permission level")]
    InvalidMountFormat(String),

    #[error("mount directory '{0}' is invalid. Check if source directory path exists.")]
    SourceNotFound(String),

    #[error("could not find environment variable '{0}'")]
    EnvNotFound(String),

    #[error("config: invalid format of environment variable: {0}")]
    InvalidEnvFormat(String),

    #[error("dunner: insufficient number of arguments passed")]
    InsufficientArgs,

    #[error("dunner: image repository name cannot be empty")]
    EmptyImage,

    #[error("config: Command cannot be empty")]
    EmptyCommand,

    #[error("failed to pull image '{image}': {reason}")]
    PullFailed { image: String, reason: String },

    #[error("failed to create container from image '{image}': {reason}")]
    CreateFailed { image: String, reason: String },

    #[error("failed to start container '{id}': {reason}")]
    StartFailed { id: String, reason: String },

    #[error("command '{command}' exited with code {exit_code}")]
    CommandFailed { command: String, exit_code: i32 },

    #[error("container backend error: {0}")]
    Backend(String),

    #[error("task '{task}': {error}")]
    Validation { task: String, error: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, DunnerError>;
