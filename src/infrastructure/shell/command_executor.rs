//! Command executor for running external programs
//!
//! Used by the updater to run `git clone`. Every command is bounded by a
//! timeout and killed if it overruns or if its future is dropped.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::core::error::Result;

/// Trait for executing external commands
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args`, giving up after `timeout`
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandResult>;

    /// Whether `program` resolves to an executable on `$PATH`
    fn program_available(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

/// Result of command execution
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// The command was killed for exceeding its timeout
    pub timed_out: bool,
}

impl CommandResult {
    /// Check if the command was successful
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Command executor backed by `tokio::process`
pub struct ProcessCommandExecutor;

impl ProcessCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProcessCommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandResult> {
        debug!(program, ?args, "Running command");
        let child = Command::new(program)
            .args(args)
            // never block on a credentials prompt
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output?;
                Ok(CommandResult {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                    timed_out: false,
                })
            }
            Err(_) => {
                warn!(program, ?args, ?timeout, "Command timed out");
                Ok(CommandResult {
                    exit_code: -1,
                    stderr: format!("timed out after {}s", timeout.as_secs()),
                    timed_out: true,
                    ..Default::default()
                })
            }
        }
    }
}

/// Mock command executor for testing
#[cfg(test)]
pub struct MockCommandExecutor {
    pub results: std::collections::HashMap<String, CommandResult>,
    pub calls: std::sync::Mutex<Vec<Vec<String>>>,
}

#[cfg(test)]
impl MockCommandExecutor {
    pub fn new() -> Self {
        Self {
            results: std::collections::HashMap::new(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Register the result for any invocation whose arguments contain `needle`
    pub fn with_result(mut self, needle: &str, exit_code: i32, stderr: &str) -> Self {
        self.results.insert(
            needle.to_string(),
            CommandResult {
                exit_code,
                stderr: stderr.to_string(),
                ..Default::default()
            },
        );
        self
    }
}

#[cfg(test)]
#[async_trait]
impl CommandExecutor for MockCommandExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandResult> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        Ok(self
            .results
            .iter()
            .find(|(needle, _)| args.iter().any(|a| a.contains(needle.as_str())))
            .map(|(_, result)| result.clone())
            .unwrap_or_default())
    }

    fn program_available(&self, _program: &str) -> bool {
        true
    }
}
