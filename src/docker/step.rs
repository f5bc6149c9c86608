//! Step execution state machine.
//!
//! One [`ExecStep`] drives one container through its whole lifecycle:
//! image presence check, conditional pull (with a local-cache fallback when
//! the registry is unreachable), create, start, one exec per command, and
//! best-effort stop/remove teardown.
//!
//! Infrastructure failures (pull/create/start/backend) surface as errors.
//! A command exiting non-zero is an expected, reportable outcome: it stops
//! the remaining commands of the step but its captured output stays in the
//! returned results, where the executor turns it into a `CommandFailed`
//! after reporting. Teardown always runs and never masks an earlier error.

use tracing::{info, warn};

use crate::config::BindMount;
use crate::error::{DunnerError, Result};
use crate::settings::{RunSettings, CONTAINER_WORKING_ROOT};

use super::{ContainerBackend, ContainerConfig};

/// Keeps the container alive so that every command of the step can be
/// exec'd into the same container state.
const PLACEHOLDER_COMMAND: [&str; 3] = ["tail", "-f", "/dev/null"];

/// The fully merged, resolved view of one step, ready for execution.
/// Built fresh per step run and discarded after teardown.
#[derive(Debug, Clone, Default)]
pub struct ExecStep {
    /// Name of the owning task, for logging.
    pub task: String,
    /// Step name, identification only.
    pub name: String,
    pub image: String,
    /// Commands to run in order, already argument-substituted.
    pub commands: Vec<Vec<String>>,
    /// Merged `KEY=VALUE` environment variables (step > task > global).
    pub env: Vec<String>,
    /// Resolved `dir` field, empty for the container working root.
    pub working_dir: String,
    /// Resolved container user.
    pub user: String,
    /// Merged and decoded bind mounts.
    pub mounts: Vec<BindMount>,
}

/// Record of one executed command.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub command: String,
    pub output: String,
    pub error: String,
    pub exit_code: i32,
}

impl ExecResult {
    pub fn failed(&self) -> bool {
        self.exit_code != 0
    }
}

impl ExecStep {
    /// Run the step's container lifecycle. Returns one [`ExecResult`] per
    /// executed command; in dry-run mode no commands execute and the list
    /// is empty.
    pub async fn exec(
        &self,
        backend: &dyn ContainerBackend,
        settings: &RunSettings,
    ) -> Result<Vec<ExecResult>> {
        self.ensure_image(backend, settings).await?;

        let config = self.container_config(settings)?;
        let created = backend
            .create_container(&config)
            .await
            .map_err(|err| DunnerError::CreateFailed {
                image: self.image.clone(),
                reason: err.to_string(),
            })?;
        for warning in &created.warnings {
            warn!("{warning}");
        }

        let outcome = self.run_commands(backend, settings, &created.id).await;

        // Best-effort teardown on every exit path; never masks `outcome`.
        if let Err(err) = backend.stop_container(&created.id).await {
            warn!("failed to stop container '{}': {err}", created.id);
        }
        if let Err(err) = backend.remove_container(&created.id).await {
            warn!("failed to remove container '{}': {err}", created.id);
        }

        outcome
    }

    /// Make sure the step's image is available locally, pulling if needed.
    /// A failed pull falls back to a second local check so a previously
    /// pulled image stays usable offline.
    async fn ensure_image(
        &self,
        backend: &dyn ContainerBackend,
        settings: &RunSettings,
    ) -> Result<()> {
        if !settings.force_pull && backend.image_exists(&self.image).await? {
            return Ok(());
        }

        match backend.pull_image(&self.image).await {
            Ok(progress) => {
                if settings.verbose && !progress.is_empty() {
                    print!("{progress}");
                }
                info!("Pulled image: '{}'", self.image);
                Ok(())
            }
            Err(err) => {
                if backend.image_exists(&self.image).await? {
                    warn!(
                        "pull of image '{}' failed, using local copy: {err}",
                        self.image
                    );
                    Ok(())
                } else {
                    Err(DunnerError::PullFailed {
                        image: self.image.clone(),
                        reason: err.to_string(),
                    })
                }
            }
        }
    }

    fn container_config(&self, settings: &RunSettings) -> Result<ContainerConfig> {
        let mut mounts = self.mounts.clone();
        mounts.push(BindMount {
            source: std::fs::canonicalize(&settings.working_directory)?,
            destination: CONTAINER_WORKING_ROOT.to_string(),
            read_only: false,
        });

        Ok(ContainerConfig {
            image: self.image.clone(),
            command: PLACEHOLDER_COMMAND.iter().map(|s| s.to_string()).collect(),
            env: self.env.clone(),
            working_dir: container_working_dir(&self.working_dir),
            user: self.user.clone(),
            mounts,
        })
    }

    async fn run_commands(
        &self,
        backend: &dyn ContainerBackend,
        settings: &RunSettings,
        id: &str,
    ) -> Result<Vec<ExecResult>> {
        backend
            .start_container(id)
            .await
            .map_err(|err| DunnerError::StartFailed {
                id: id.to_string(),
                reason: err.to_string(),
            })?;

        if settings.dry_run {
            return Ok(Vec::new());
        }

        let mut results = Vec::new();
        for command in &self.commands {
            if command.is_empty() {
                return Err(DunnerError::EmptyCommand);
            }

            let output = backend.exec(id, command).await?;
            info!(
                "Finished running command '{}' on '{}' docker",
                command.join(" "),
                self.image
            );

            let failed = output.exit_code != 0;
            results.push(ExecResult {
                command: command.join(" "),
                output: output.stdout,
                error: output.stderr,
                exit_code: output.exit_code,
            });
            if failed {
                break;
            }
        }
        Ok(results)
    }
}

/// Container working directory for a step: the fixed working root by
/// default, absolute `dir` as-is, relative `dir` joined under the root.
fn container_working_dir(dir: &str) -> String {
    if dir.is_empty() {
        CONTAINER_WORKING_ROOT.to_string()
    } else if dir.starts_with('/') {
        dir.to_string()
    } else {
        format!("{CONTAINER_WORKING_ROOT}/{dir}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::{BackendCall, ExecOutput, MockBackend};

    fn step(commands: &[&[&str]]) -> ExecStep {
        ExecStep {
            task: "test".to_string(),
            image: "busybox".to_string(),
            commands: commands
                .iter()
                .map(|c| c.iter().map(|s| s.to_string()).collect())
                .collect(),
            ..ExecStep::default()
        }
    }

    fn settings() -> RunSettings {
        RunSettings {
            working_directory: std::env::temp_dir(),
            ..RunSettings::default()
        }
    }

    #[tokio::test]
    async fn present_image_is_not_pulled() {
        let backend = MockBackend::new().with_image("busybox");
        step(&[&["ls"]]).exec(&backend, &settings()).await.unwrap();

        assert!(!backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::Pull(_))));
    }

    #[tokio::test]
    async fn absent_image_is_pulled() {
        let backend = MockBackend::new();
        step(&[&["ls"]]).exec(&backend, &settings()).await.unwrap();

        assert!(backend
            .calls()
            .contains(&BackendCall::Pull("busybox".to_string())));
    }

    #[tokio::test]
    async fn force_pull_pulls_despite_local_image() {
        let backend = MockBackend::new().with_image("busybox");
        let settings = RunSettings {
            force_pull: true,
            ..settings()
        };
        step(&[&["ls"]]).exec(&backend, &settings).await.unwrap();

        assert!(backend
            .calls()
            .contains(&BackendCall::Pull("busybox".to_string())));
    }

    #[tokio::test]
    async fn failed_pull_falls_back_to_local_image() {
        let backend = MockBackend::new()
            .with_image("busybox")
            .fail_pulls("registry unreachable");
        let settings = RunSettings {
            force_pull: true,
            ..settings()
        };

        let results = step(&[&["ls"]]).exec(&backend, &settings).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn failed_pull_without_local_image_is_fatal() {
        let backend = MockBackend::new().fail_pulls("registry unreachable");
        let err = step(&[&["ls"]])
            .exec(&backend, &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, DunnerError::PullFailed { .. }));
    }

    #[tokio::test]
    async fn command_sequence_stops_on_first_failure() {
        let backend = MockBackend::new()
            .with_image("busybox")
            .on_command("false", ExecOutput::failure(1, ""));

        let results = step(&[&["true"], &["false"], &["true"]])
            .exec(&backend, &settings())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[1].failed());
        assert_eq!(backend.executed_commands(), vec!["true", "false"]);
    }

    #[tokio::test]
    async fn teardown_runs_after_command_failure() {
        let backend = MockBackend::new()
            .with_image("busybox")
            .on_command("false", ExecOutput::failure(1, ""));

        step(&[&["false"]]).exec(&backend, &settings()).await.unwrap();

        let calls = backend.calls();
        assert!(calls.iter().any(|c| matches!(c, BackendCall::Stop(_))));
        assert!(calls.iter().any(|c| matches!(c, BackendCall::Remove(_))));
    }

    #[tokio::test]
    async fn failed_create_is_fatal_and_skips_teardown() {
        let backend = MockBackend::new()
            .with_image("busybox")
            .fail_create("invalid container config");

        let err = step(&[&["ls"]])
            .exec(&backend, &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, DunnerError::CreateFailed { .. }));

        // nothing to tear down: no container was ever created
        assert!(!backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::Stop(_) | BackendCall::Remove(_))));
    }

    #[tokio::test]
    async fn failing_teardown_does_not_mask_command_outcome() {
        let backend = MockBackend::new()
            .with_image("busybox")
            .on_command("false", ExecOutput::failure(1, ""))
            .fail_stop("container already stopped")
            .fail_remove("no such container");

        let results = step(&[&["false"]])
            .exec(&backend, &settings())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].failed());

        // both teardown calls were still attempted
        let calls = backend.calls();
        assert!(calls.iter().any(|c| matches!(c, BackendCall::Stop(_))));
        assert!(calls.iter().any(|c| matches!(c, BackendCall::Remove(_))));
    }

    #[tokio::test]
    async fn failing_teardown_does_not_mask_start_error() {
        let backend = MockBackend::new()
            .with_image("busybox")
            .fail_start("cannot start")
            .fail_stop("container already stopped");

        let err = step(&[&["ls"]])
            .exec(&backend, &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, DunnerError::StartFailed { .. }));
    }

    #[tokio::test]
    async fn failed_start_is_fatal_but_still_torn_down() {
        let backend = MockBackend::new()
            .with_image("busybox")
            .fail_start("cannot start");

        let err = step(&[&["ls"]])
            .exec(&backend, &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, DunnerError::StartFailed { .. }));
        assert!(backend
            .calls()
            .iter()
            .any(|c| matches!(c, BackendCall::Remove(_))));
    }

    #[tokio::test]
    async fn dry_run_creates_and_starts_but_skips_commands() {
        let backend = MockBackend::new().with_image("busybox");
        let settings = RunSettings {
            dry_run: true,
            ..settings()
        };

        let results = step(&[&["ls"]]).exec(&backend, &settings).await.unwrap();
        assert!(results.is_empty());
        assert!(backend.executed_commands().is_empty());

        let calls = backend.calls();
        assert!(calls.iter().any(|c| matches!(c, BackendCall::Create(_))));
        assert!(calls.iter().any(|c| matches!(c, BackendCall::Start(_))));
    }

    #[tokio::test]
    async fn container_receives_envs_mounts_workdir_and_implicit_mount() {
        let backend = MockBackend::new().with_image("busybox");
        let mut exec_step = step(&[&["ls"]]);
        exec_step.env = vec!["A=1".to_string()];
        exec_step.working_dir = "sub".to_string();
        exec_step.user = "20".to_string();

        exec_step.exec(&backend, &settings()).await.unwrap();

        let created = backend.created_containers();
        assert_eq!(created.len(), 1);
        let config = &created[0];
        assert_eq!(config.env, vec!["A=1"]);
        assert_eq!(config.working_dir, "/dunner/sub");
        assert_eq!(config.user, "20");
        assert_eq!(config.command, vec!["tail", "-f", "/dev/null"]);
        // implicit working-directory mount is always last and read-write
        let implicit = config.mounts.last().unwrap();
        assert_eq!(implicit.destination, "/dunner");
        assert!(!implicit.read_only);
    }

    #[test]
    fn working_dir_resolution() {
        assert_eq!(container_working_dir(""), "/dunner");
        assert_eq!(container_working_dir("/opt/app"), "/opt/app");
        assert_eq!(container_working_dir("src"), "/dunner/src");
    }
}
