//! Task file model and loader.
//!
//! A dunner task file is YAML with top-level `envs`, `mounts` and `tasks`
//! keys. Each task carries its own `envs`/`mounts` overrides and an
//! ordered list of steps; each step either runs commands in a container or
//! follows another task. Scope precedence is step > task > global and is
//! applied by the merge engine in [`merge`].

pub mod merge;
pub mod mount;
pub mod validate;

pub use merge::{merge_envs, merge_mounts};
pub use mount::{decode_mount, BindMount};

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::env::{self, EnvSource};
use crate::error::{DunnerError, Result};

/// One step of a task: a single container invocation, or a jump to another
/// task when `follow` is set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Optional name, identification only.
    #[serde(default)]
    pub name: String,

    /// Image the container is created from. Required unless `follow` is set.
    #[serde(default)]
    pub image: String,

    /// Working directory for the commands. Absolute paths are used as-is,
    /// relative paths are joined under the container working root.
    #[serde(default)]
    pub dir: String,

    /// A single command to run.
    #[serde(default)]
    pub command: Vec<String>,

    /// Commands run in order inside the same container instance.
    #[serde(default)]
    pub commands: Vec<Vec<String>>,

    /// Step-scope `KEY=VALUE` environment variables (innermost override).
    #[serde(default)]
    pub envs: Vec<String>,

    /// Step-scope mount specifiers (innermost override).
    #[serde(default)]
    pub mounts: Vec<String>,

    /// Name of another task to execute instead of running a container.
    #[serde(default)]
    pub follow: String,

    /// Arguments passed through when following another task.
    #[serde(default)]
    pub args: Vec<String>,

    /// Container user override, `user` or `user:group`.
    #[serde(default)]
    pub user: String,
}

impl Step {
    /// The step's command list: `commands` when given, otherwise the
    /// single `command` as a one-element list.
    pub fn command_list(&self) -> Vec<Vec<String>> {
        if self.commands.is_empty() {
            vec![self.command.clone()]
        } else {
            self.commands.clone()
        }
    }
}

/// One named unit of work: ordered steps plus task-scope env/mount
/// overrides shared by all of them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    #[serde(default)]
    pub envs: Vec<String>,
    #[serde(default)]
    pub mounts: Vec<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Parsed task definition file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configs {
    /// Environment variables common to all tasks.
    #[serde(default)]
    pub envs: Vec<String>,
    /// Directory mounts common to all tasks.
    #[serde(default)]
    pub mounts: Vec<String>,
    #[serde(default)]
    pub tasks: HashMap<String, Task>,
}

impl Configs {
    /// Read and decode a task file, then eagerly resolve backtick
    /// placeholders inside env values of every scope.
    pub fn load(path: &Path, env: &dyn EnvSource) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents, env)
    }

    /// Decode task file contents. Split out from [`Configs::load`] so tests
    /// can feed YAML directly.
    pub fn from_yaml(contents: &str, env: &dyn EnvSource) -> Result<Self> {
        let mut configs: Configs = serde_yaml::from_str(contents)?;
        configs.resolve_env_values(env)?;
        Ok(configs)
    }

    /// Resolve `` `$NAME` `` placeholders in the values of every env entry,
    /// at global, task and step scope. A value defined in the dotenv file
    /// overrides the host environment.
    fn resolve_env_values(&mut self, env: &dyn EnvSource) -> Result<()> {
        resolve_env_list(&mut self.envs, env)?;
        for task in self.tasks.values_mut() {
            resolve_env_list(&mut task.envs, env)?;
            for step in &mut task.steps {
                resolve_env_list(&mut step.envs, env)?;
            }
        }
        Ok(())
    }
}

fn resolve_env_list(envs: &mut [String], env: &dyn EnvSource) -> Result<()> {
    for entry in envs.iter_mut() {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| DunnerError::InvalidEnvFormat(entry.clone()))?;
        if key.is_empty() {
            return Err(DunnerError::InvalidEnvFormat(entry.clone()));
        }
        let resolved = env::resolve(value, env)?;
        if resolved != value {
            *entry = format!("{key}={resolved}");
        }
    }
    Ok(())
}
