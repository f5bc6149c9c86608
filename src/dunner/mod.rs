//! Task executor and scheduler.
//!
//! [`TaskRunner`] drives one invocation over the task graph: it resolves
//! each step into an execution plan, dispatches plans sequentially or
//! concurrently depending on async mode, handles `follow` chaining, and
//! propagates the first observed failure. No state survives the
//! invocation.

pub mod args;

pub use args::pass_args;

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::{decode_mount, merge_envs, merge_mounts, Configs, Step, Task};
use crate::docker::{ContainerBackend, ExecResult, ExecStep};
use crate::env::{self, EnvSource};
use crate::error::{DunnerError, Result};
use crate::settings::RunSettings;

/// What one step resolves to: a container run, or a jump to another task.
enum StepPlan {
    Run(Box<ExecStep>),
    Follow { task: String, args: Vec<String> },
}

/// Executes tasks against a container backend. Cheap to clone; clones share
/// the same configs, settings, backend and environment source.
#[derive(Clone)]
pub struct TaskRunner {
    configs: Arc<Configs>,
    settings: Arc<RunSettings>,
    backend: Arc<dyn ContainerBackend>,
    env: Arc<dyn EnvSource>,
}

impl TaskRunner {
    pub fn new(
        configs: Configs,
        settings: RunSettings,
        backend: Arc<dyn ContainerBackend>,
        env: Arc<dyn EnvSource>,
    ) -> Self {
        Self {
            configs: Arc::new(configs),
            settings: Arc::new(settings),
            backend,
            env,
        }
    }

    /// Execute the named task with the given positional arguments.
    ///
    /// Boxed because `follow` chaining makes the future recursive.
    pub fn exec_task(&self, task_name: &str, task_args: Vec<String>) -> BoxFuture<'static, Result<()>> {
        let runner = self.clone();
        let task_name = task_name.to_string();
        Box::pin(async move { runner.exec_task_inner(&task_name, task_args).await })
    }

    async fn exec_task_inner(&self, task_name: &str, task_args: Vec<String>) -> Result<()> {
        let task = self
            .configs
            .tasks
            .get(task_name)
            .ok_or_else(|| DunnerError::TaskNotFound(task_name.to_string()))?
            .clone();

        if self.settings.async_mode {
            self.exec_steps_async(task_name, &task, &task_args).await
        } else {
            for step in &task.steps {
                let plan = self.plan_step(task_name, &task, step).await?;
                self.process(plan, &task_args).await?;
            }
            Ok(())
        }
    }

    /// Launch every step as its own unit of work and wait for all of them.
    /// Already-launched steps are not cancelled when one fails; the first
    /// observed error is returned after the join barrier.
    async fn exec_steps_async(
        &self,
        task_name: &str,
        task: &Task,
        task_args: &[String],
    ) -> Result<()> {
        let mut join_set: JoinSet<Result<()>> = JoinSet::new();
        let mut first_error = None;

        for step in &task.steps {
            match self.plan_step(task_name, task, step).await {
                Ok(plan) => {
                    let runner = self.clone();
                    let step_args = task_args.to_vec();
                    join_set.spawn(async move { runner.process(plan, &step_args).await });
                }
                Err(err) => {
                    // Config resolution failure aborts dispatching, but the
                    // join barrier below still waits for launched steps.
                    first_error = Some(err);
                    break;
                }
            }
        }

        while let Some(joined) = join_set.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(join_err) => Err(DunnerError::Backend(format!(
                    "step worker failed to complete: {join_err}"
                ))),
            };
            if let Err(err) = result {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Resolve one authored step into an execution plan: placeholder
    /// resolution for its own fields, scope merges, mount decoding.
    async fn plan_step(&self, task_name: &str, task: &Task, step: &Step) -> Result<StepPlan> {
        if !step.follow.is_empty() {
            return Ok(StepPlan::Follow {
                task: step.follow.trim().to_string(),
                args: step.args.clone(),
            });
        }

        let env = self.env.as_ref();
        let working_dir = env::resolve(&step.dir, env)?;
        let user = env::resolve(&step.user, env)?;
        let user = if user.is_empty() { default_user() } else { user };

        // The two merges read only immutable scope lists and run
        // concurrently, joined before use.
        let (step_envs, task_envs, global_envs) =
            (step.envs.clone(), task.envs.clone(), self.configs.envs.clone());
        let (step_mounts, task_mounts, global_mounts) = (
            step.mounts.clone(),
            task.mounts.clone(),
            self.configs.mounts.clone(),
        );
        let (merged_envs, merged_mounts) = tokio::join!(
            async move { merge_envs(&step_envs, &task_envs, &global_envs) },
            async move { merge_mounts(&step_mounts, &task_mounts, &global_mounts) },
        );

        let mut mounts = Vec::with_capacity(merged_mounts.len());
        for spec in &merged_mounts {
            mounts.push(decode_mount(spec, env)?);
        }

        Ok(StepPlan::Run(Box::new(ExecStep {
            task: task_name.to_string(),
            name: step.name.clone(),
            image: step.image.clone(),
            commands: step.command_list(),
            env: merged_envs,
            working_dir,
            user,
            mounts,
        })))
    }

    /// Process one planned step: chain to the followed task, or substitute
    /// arguments and run the container.
    async fn process(&self, plan: StepPlan, step_args: &[String]) -> Result<()> {
        match plan {
            StepPlan::Follow { task, args } => self.exec_task(&task, args).await,
            StepPlan::Run(mut step) => {
                pass_args(&mut step.commands, step_args)?;
                if step.image.is_empty() {
                    return Err(DunnerError::EmptyImage);
                }

                let results = step.exec(self.backend.as_ref(), &self.settings).await?;
                report(&step, &results);

                if let Some(failed) = results.iter().find(|r| r.failed()) {
                    return Err(DunnerError::CommandFailed {
                        command: failed.command.clone(),
                        exit_code: failed.exit_code,
                    });
                }
                Ok(())
            }
        }
    }
}

fn report(step: &ExecStep, results: &[ExecResult]) {
    for result in results {
        info!(
            "Running task '{}' on '{}' Docker with command '{}'",
            step.task, step.image, result.command
        );
        if !result.output.is_empty() {
            print!("OUT: {}", result.output);
        }
        if !result.error.is_empty() {
            print!("ERR: {}", result.error);
        }
    }
}

/// Container user when the step does not set one: the invoking user's uid,
/// so files written to the mounted working directory stay owned by them.
fn default_user() -> String {
    #[cfg(unix)]
    {
        nix::unistd::getuid().to_string()
    }
    #[cfg(not(unix))]
    {
        String::new()
    }
}

/// Names of all defined tasks, sorted for stable output.
pub fn task_names(configs: &Configs) -> Vec<String> {
    let mut names: Vec<String> = configs.tasks.keys().cloned().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configs;
    use crate::docker::MockBackend;
    use crate::env::MockEnv;

    fn runner(yaml: &str, backend: MockBackend, settings: RunSettings) -> TaskRunner {
        let env = MockEnv::new();
        let configs = Configs::from_yaml(yaml, &env).unwrap();
        TaskRunner::new(configs, settings, Arc::new(backend), Arc::new(env))
    }

    #[tokio::test]
    async fn unknown_task_fails() {
        let runner = runner(
            "tasks: {}",
            MockBackend::new(),
            RunSettings::default(),
        );
        let err = runner.exec_task("ghost", vec![]).await.unwrap_err();
        assert_eq!(err.to_string(), "dunner: task 'ghost' does not exist");
    }

    #[tokio::test]
    async fn unresolvable_step_dir_aborts_task() {
        let backend = MockBackend::new().with_image("busybox");
        let runner = runner(
            r#"
tasks:
  test:
    steps:
      - image: busybox
        dir: "`$INVALID_USER_NONEXISTING`"
        command: ["ls"]
"#,
            backend.clone(),
            RunSettings {
                working_directory: std::env::temp_dir(),
                ..RunSettings::default()
            },
        );

        let err = runner.exec_task("test", vec![]).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not find environment variable 'INVALID_USER_NONEXISTING'"
        );
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn task_names_are_sorted() {
        let configs = Configs::from_yaml(
            r#"
tasks:
  zeta:
    steps:
      - image: busybox
        command: ["ls"]
  alpha:
    steps:
      - image: busybox
        command: ["ls"]
"#,
            &MockEnv::new(),
        )
        .unwrap();
        assert_eq!(task_names(&configs), vec!["alpha", "zeta"]);
    }
}
