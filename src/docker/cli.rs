//! `docker` CLI backed container backend.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{DunnerError, Result};
use crate::process::{ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};

use super::{ContainerBackend, ContainerConfig, CreatedContainer, ExecOutput};

/// Container backend shelling out to the `docker` binary.
pub struct DockerCli {
    runner: Arc<dyn ProcessRunner>,
    program: String,
}

impl DockerCli {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            runner,
            program: "docker".to_string(),
        }
    }

    pub fn production() -> Self {
        Self::new(Arc::new(TokioProcessRunner))
    }

    async fn docker<I, S>(&self, args: I) -> Result<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner
            .run(ProcessCommand::new(&self.program).args(args))
            .await
    }
}

fn backend_error(action: &str, output: &ProcessOutput) -> DunnerError {
    let detail = if output.stderr.trim().is_empty() {
        output.stdout.trim().to_string()
    } else {
        output.stderr.trim().to_string()
    };
    DunnerError::Backend(format!(
        "docker {action} exited with code {}: {detail}",
        output.status.code()
    ))
}

#[async_trait]
impl ContainerBackend for DockerCli {
    async fn image_exists(&self, image: &str) -> Result<bool> {
        let output = self
            .docker(["images", "--format", "{{.Repository}}:{{.Tag}}"])
            .await?;
        if !output.status.success() {
            return Err(backend_error("images", &output));
        }

        // A colon marks a tag only after the last `/`; a registry host
        // with a port (`localhost:5000/app`) is still an untagged reference.
        let tagged = image
            .rsplit('/')
            .next()
            .is_some_and(|name| name.contains(':'));
        Ok(output.stdout.lines().any(|line| {
            if tagged {
                line == image
            } else {
                line.rsplit_once(':').map(|(repo, _)| repo) == Some(image)
            }
        }))
    }

    async fn pull_image(&self, image: &str) -> Result<String> {
        let output = self.docker(["pull", image]).await?;
        if !output.status.success() {
            return Err(backend_error("pull", &output));
        }
        Ok(output.stdout)
    }

    async fn create_container(&self, config: &ContainerConfig) -> Result<CreatedContainer> {
        let mut args: Vec<String> = vec!["create".to_string()];
        for env in &config.env {
            args.push("-e".to_string());
            args.push(env.clone());
        }
        if !config.working_dir.is_empty() {
            args.push("-w".to_string());
            args.push(config.working_dir.clone());
        }
        if !config.user.is_empty() {
            args.push("-u".to_string());
            args.push(config.user.clone());
        }
        for mount in &config.mounts {
            let mut spec = format!("{}:{}", mount.source.display(), mount.destination);
            if mount.read_only {
                spec.push_str(":ro");
            }
            args.push("-v".to_string());
            args.push(spec);
        }
        args.push(config.image.clone());
        args.extend(config.command.iter().cloned());

        let output = self.docker(args).await?;
        if !output.status.success() {
            return Err(backend_error("create", &output));
        }

        Ok(CreatedContainer {
            id: output.stdout.trim().to_string(),
            warnings: output
                .stderr
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        let output = self.docker(["start", id]).await?;
        if !output.status.success() {
            return Err(backend_error("start", &output));
        }
        Ok(())
    }

    async fn exec(&self, id: &str, command: &[String]) -> Result<ExecOutput> {
        let mut args = vec!["exec".to_string(), id.to_string()];
        args.extend(command.iter().cloned());

        // `docker exec` propagates the command's own exit code, so a
        // non-success status here is the command failing, not the backend.
        let output = self.docker(args).await?;
        Ok(ExecOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code(),
        })
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        let output = self.docker(["stop", id]).await?;
        if !output.status.success() {
            return Err(backend_error("stop", &output));
        }
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let output = self.docker(["rm", id]).await?;
        if !output.status.success() {
            return Err(backend_error("rm", &output));
        }
        Ok(())
    }
}
