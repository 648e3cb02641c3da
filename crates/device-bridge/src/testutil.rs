//! Scripted command runner for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::command::{CommandOutput, CommandRunner, DeviceCommand, ExecError};

enum Response {
    Ok(String),
    Fail { code: i32, stderr: String },
}

/// A [`CommandRunner`] that replays scripted responses in order and records
/// every invocation. An empty script answers with empty, successful output.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<Response>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response with the given stdout
    pub fn push_ok(&self, stdout: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Response::Ok(stdout.to_string()));
    }

    /// Queue a non-zero exit
    pub fn push_fail(&self, code: i32, stderr: &str) {
        self.responses.lock().unwrap().push_back(Response::Fail {
            code,
            stderr: stderr.to_string(),
        });
    }

    /// Every command line executed so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, command: &DeviceCommand) -> Result<CommandOutput, ExecError> {
        self.calls.lock().unwrap().push(command.to_string());
        match self.responses.lock().unwrap().pop_front() {
            Some(Response::Ok(stdout)) => Ok(CommandOutput {
                stdout,
                stderr: String::new(),
            }),
            Some(Response::Fail { code, stderr }) => Err(ExecError::NonZeroExit {
                command: command.to_string(),
                code: Some(code),
                stderr,
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &DeviceCommand) -> Result<CommandOutput, ExecError> {
        self.next(command)
    }

    async fn run_streamed(&self, command: &DeviceCommand) -> Result<i32, ExecError> {
        self.next(command).map(|_| 0)
    }
}
