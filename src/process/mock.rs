//! Scripted process runner for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{DunnerError, Result};

use super::runner::{ProcessCommand, ProcessOutput, ProcessRunner};

struct Expectation {
    program: String,
    first_arg: Option<String>,
    response: ProcessOutput,
}

/// Mock runner that matches commands against configured expectations and
/// records every call for later assertions.
#[derive(Clone, Default)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<Expectation>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for `program`, optionally narrowed to commands
    /// whose first argument equals `first_arg`. Later expectations win so
    /// tests can override earlier generic ones.
    pub fn expect(&self, program: &str, first_arg: Option<&str>, response: ProcessOutput) {
        self.expectations.lock().unwrap().push(Expectation {
            program: program.to_string(),
            first_arg: first_arg.map(str::to_string),
            response,
        });
    }

    pub fn call_history(&self) -> Vec<ProcessCommand> {
        self.call_history.lock().unwrap().clone()
    }

    /// Count calls to `program` whose first argument equals `first_arg`.
    pub fn calls_matching(&self, program: &str, first_arg: &str) -> usize {
        self.call_history
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.program == program && c.args.first().map(String::as_str) == Some(first_arg))
            .count()
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput> {
        self.call_history.lock().unwrap().push(command.clone());

        let expectations = self.expectations.lock().unwrap();
        for expectation in expectations.iter().rev() {
            if expectation.program != command.program {
                continue;
            }
            if let Some(first) = &expectation.first_arg {
                if command.args.first() != Some(first) {
                    continue;
                }
            }
            return Ok(expectation.response.clone());
        }

        Err(DunnerError::Backend(format!(
            "no mock expectation for command: {}",
            command.display()
        )))
    }
}
