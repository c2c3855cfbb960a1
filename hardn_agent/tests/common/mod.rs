//! Shared fixtures: a scripted `CommandRunner` that records every invocation.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use hardn_agent::error::CommandError;
use hardn_agent::runner::{CommandOutput, CommandRunner, CommandSpec};

#[derive(Debug, Clone)]
pub enum Reply {
    Exit {
        code: i32,
        stdout: String,
        stderr: String,
    },
    Timeout,
}

impl Reply {
    pub fn ok(stdout: &str) -> Self {
        Reply::Exit {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn fail(code: i32, stderr: &str) -> Self {
        Reply::Exit {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Answers by exact command line; anything unscripted exits 1 with no output.
#[derive(Default)]
pub struct ScriptedRunner {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, command_line: &str, reply: Reply) -> Self {
        self.replies.insert(command_line.to_string(), reply);
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::command_line).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        self.calls.lock().unwrap().push(spec.clone());
        match self.replies.get(&spec.command_line()) {
            Some(Reply::Exit {
                code,
                stdout,
                stderr,
            }) => Ok(CommandOutput {
                code: Some(*code),
                stdout: stdout.clone(),
                stderr: stderr.clone(),
            }),
            Some(Reply::Timeout) => Err(CommandError::Timeout {
                program: spec.program.clone(),
                timeout: spec.timeout,
            }),
            None => Ok(CommandOutput {
                code: Some(1),
                ..Default::default()
            }),
        }
    }
}

pub const SECOND: Duration = Duration::from_secs(1);
