//! Scripted container backend for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{DunnerError, Result};

use super::{ContainerBackend, ContainerConfig, CreatedContainer, ExecOutput};

/// One recorded backend invocation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    ImageExists(String),
    Pull(String),
    Create(String),
    Start(String),
    Exec { id: String, command: Vec<String> },
    Stop(String),
    Remove(String),
}

#[derive(Default)]
struct State {
    local_images: HashSet<String>,
    pull_failure: Option<String>,
    create_failure: Option<String>,
    start_failure: Option<String>,
    stop_failure: Option<String>,
    remove_failure: Option<String>,
    exec_results: HashMap<String, ExecOutput>,
    calls: Vec<BackendCall>,
    created: Vec<ContainerConfig>,
    next_id: u32,
}

/// In-memory [`ContainerBackend`] that records every call and plays back
/// configured results. Commands without a scripted result succeed with
/// empty output.
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<State>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an image as locally present.
    pub fn with_image(self, image: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .local_images
            .insert(image.to_string());
        self
    }

    /// Make every pull fail with `reason`.
    pub fn fail_pulls(self, reason: &str) -> Self {
        self.state.lock().unwrap().pull_failure = Some(reason.to_string());
        self
    }

    /// Make container creation fail with `reason`.
    pub fn fail_create(self, reason: &str) -> Self {
        self.state.lock().unwrap().create_failure = Some(reason.to_string());
        self
    }

    /// Make container start fail with `reason`.
    pub fn fail_start(self, reason: &str) -> Self {
        self.state.lock().unwrap().start_failure = Some(reason.to_string());
        self
    }

    /// Make container stop fail with `reason`.
    pub fn fail_stop(self, reason: &str) -> Self {
        self.state.lock().unwrap().stop_failure = Some(reason.to_string());
        self
    }

    /// Make container removal fail with `reason`.
    pub fn fail_remove(self, reason: &str) -> Self {
        self.state.lock().unwrap().remove_failure = Some(reason.to_string());
        self
    }

    /// Script the result of exec'ing `command` (space-joined form).
    pub fn on_command(self, command: &str, output: ExecOutput) -> Self {
        self.state
            .lock()
            .unwrap()
            .exec_results
            .insert(command.to_string(), output);
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Container configs passed to `create_container`, in call order.
    pub fn created_containers(&self) -> Vec<ContainerConfig> {
        self.state.lock().unwrap().created.clone()
    }

    /// Space-joined commands exec'd against any container, in call order.
    pub fn executed_commands(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Exec { command, .. } => Some(command.join(" ")),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ContainerBackend for MockBackend {
    async fn image_exists(&self, image: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::ImageExists(image.to_string()));
        Ok(state.local_images.contains(image))
    }

    async fn pull_image(&self, image: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::Pull(image.to_string()));
        if let Some(reason) = &state.pull_failure {
            return Err(DunnerError::Backend(reason.clone()));
        }
        state.local_images.insert(image.to_string());
        Ok(format!("pulled {image}"))
    }

    async fn create_container(&self, config: &ContainerConfig) -> Result<CreatedContainer> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::Create(config.image.clone()));
        if let Some(reason) = &state.create_failure {
            return Err(DunnerError::Backend(reason.clone()));
        }
        state.created.push(config.clone());
        state.next_id += 1;
        Ok(CreatedContainer {
            id: format!("container-{}", state.next_id),
            warnings: Vec::new(),
        })
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::Start(id.to_string()));
        if let Some(reason) = &state.start_failure {
            return Err(DunnerError::Backend(reason.clone()));
        }
        Ok(())
    }

    async fn exec(&self, id: &str, command: &[String]) -> Result<ExecOutput> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::Exec {
            id: id.to_string(),
            command: command.to_vec(),
        });
        let joined = command.join(" ");
        Ok(state
            .exec_results
            .get(&joined)
            .cloned()
            .unwrap_or_else(|| ExecOutput::success("")))
    }

    async fn stop_container(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::Stop(id.to_string()));
        if let Some(reason) = &state.stop_failure {
            return Err(DunnerError::Backend(reason.clone()));
        }
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(BackendCall::Remove(id.to_string()));
        if let Some(reason) = &state.remove_failure {
            return Err(DunnerError::Backend(reason.clone()));
        }
        Ok(())
    }
}
