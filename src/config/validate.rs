//! Task file validation.
//!
//! All problems are collected into one list rather than stopping at the
//! first, so a `dunner validate` run reports everything at once. Every
//! error names the offending task.

use crate::env::EnvSource;
use crate::error::DunnerError;

use super::{mount, Configs, Step};

impl Configs {
    /// Validate the parsed task file. Returns every error found; an empty
    /// list means the file is safe to hand to the executor.
    pub fn validate(&self, env: &dyn EnvSource) -> Vec<DunnerError> {
        let mut errors = Vec::new();

        for (task_name, task) in &self.tasks {
            if task_name.is_empty() {
                errors.push(validation("", "task name cannot be empty"));
                continue;
            }
            if task.steps.is_empty() {
                errors.push(validation(task_name, "task must have at least one step"));
            }
            for step in &task.steps {
                self.validate_step(task_name, step, env, &mut errors);
            }
        }
        errors
    }

    fn validate_step(
        &self,
        task_name: &str,
        step: &Step,
        env: &dyn EnvSource,
        errors: &mut Vec<DunnerError>,
    ) {
        if step.image.is_empty() && step.follow.is_empty() {
            errors.push(validation(
                task_name,
                "image is required, unless the task has a `follow` field",
            ));
        }

        if !step.follow.is_empty() && !self.tasks.contains_key(step.follow.trim()) {
            errors.push(validation(
                task_name,
                &format!("follow task '{}' does not exist", step.follow),
            ));
        }

        if step.command.iter().any(String::is_empty) {
            errors.push(validation(task_name, "command entries cannot be empty"));
        }
        for command in &step.commands {
            if command.is_empty() || command.iter().any(String::is_empty) {
                errors.push(validation(task_name, "command entries cannot be empty"));
            }
        }

        for spec in &step.mounts {
            if let Err(err) = mount::decode_mount(spec, env) {
                errors.push(validation(task_name, &err.to_string()));
            }
        }
    }
}

fn validation(task: &str, error: &str) -> DunnerError {
    DunnerError::Validation {
        task: task.to_string(),
        error: error.to_string(),
    }
}
