// ABOUTME: Command runner capability for every external process the deployer starts.
// ABOUTME: ShellRunner spawns `sh -c`; ScriptedRunner records calls for deterministic tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Errors from starting a command. A non-zero exit is not an error here.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs opaque shell commands in a working directory.
///
/// Hooks, permission fixes, migrations and the health probe all go through this
/// trait so the deploy logic never touches a process API directly.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput, RunnerError>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput, RunnerError> {
        tracing::debug!("Running `{}` in {}", command, cwd.display());

        // kill_on_drop lets callers bound the run with tokio::time::timeout.
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RunnerError::Spawn {
                command: command.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// One call observed by [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub command: String,
    pub cwd: PathBuf,
    pub env: HashMap<String, String>,
}

/// In-process runner that never spawns anything.
///
/// Commands exit 0 unless a rule whose pattern is a substring of the command
/// says otherwise. The first matching rule wins.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<(String, CommandOutput)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make commands containing `pattern` exit with `code`.
    pub fn exit_with(self, pattern: &str, code: i32) -> Self {
        self.respond(
            pattern,
            CommandOutput {
                exit_code: Some(code),
                ..Default::default()
            },
        )
    }

    /// Make commands containing `pattern` produce `output`.
    pub fn respond(self, pattern: &str, output: CommandOutput) -> Self {
        self.rules.lock().push((pattern.to_string(), output));
        self
    }

    /// Commands seen so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Just the command strings seen so far.
    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.command.clone()).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
    ) -> Result<CommandOutput, RunnerError> {
        self.calls.lock().push(RecordedCall {
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
            env: env.clone(),
        });

        let rules = self.rules.lock();
        let output = rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or(CommandOutput {
                exit_code: Some(0),
                ..Default::default()
            });
        Ok(output)
    }
}
