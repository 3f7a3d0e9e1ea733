use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use anyhow::anyhow;
use branchsweep_core::command_runner::{CommandOutput, CommandRunner};

#[derive(Debug, Clone)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
}

/// Replays scripted outputs strictly in call order. Suits the sequential
/// deletion path where the exact command sequence is the thing under test.
#[derive(Default)]
pub struct QueueRunner {
    outputs: Mutex<VecDeque<anyhow::Result<CommandOutput>>>,
    calls: Mutex<Vec<Call>>,
}

impl QueueRunner {
    pub fn new(outputs: Vec<anyhow::Result<CommandOutput>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl CommandRunner for QueueRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        _cwd: Option<&Path>,
    ) -> anyhow::Result<CommandOutput> {
        self.calls.lock().expect("calls lock").push(Call {
            program: program.to_string(),
            args: args.iter().map(|value| (*value).to_string()).collect(),
        });

        self.outputs
            .lock()
            .expect("outputs lock")
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("missing scripted output")))
    }
}

/// Answers by exact argument match instead of call order, so classification
/// runs that fan out across worker threads stay scriptable.
#[derive(Default)]
pub struct ScriptRunner {
    responses: Vec<(Vec<String>, CommandOutput)>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_ok(self, args: &[&str], stdout: &str) -> Self {
        self.respond(args, 0, stdout, "")
    }

    pub fn on_fail(self, args: &[&str], stderr: &str, status: i32) -> Self {
        self.respond(args, status, "", stderr)
    }

    fn respond(mut self, args: &[&str], status: i32, stdout: &str, stderr: &str) -> Self {
        self.responses.push((
            args.iter().map(|value| (*value).to_string()).collect(),
            CommandOutput {
                status_code: status,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl CommandRunner for ScriptRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        _cwd: Option<&Path>,
    ) -> anyhow::Result<CommandOutput> {
        self.calls.lock().expect("calls lock").push(Call {
            program: program.to_string(),
            args: args.iter().map(|value| (*value).to_string()).collect(),
        });

        self.responses
            .iter()
            .find(|(expected, _)| expected == args)
            .map(|(_, response)| Ok(response.clone()))
            .unwrap_or_else(|| Err(anyhow!("unscripted command: {program} {args:?}")))
    }
}

pub fn output(stdout: &str, stderr: &str, status: i32) -> anyhow::Result<CommandOutput> {
    Ok(CommandOutput {
        status_code: status,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    })
}
