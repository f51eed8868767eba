// ABOUTME: Hooks system for deployment lifecycle events.
// ABOUTME: Runs configured shell commands before cutover, after cutover and after success.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::runner::CommandRunner;
use crate::types::{AppName, Version};

/// Hook execution points in the deployment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before cutover. Failure aborts deployment.
    BeforeDeploy,
    /// After cutover. Failure logs warning.
    AfterDeploy,
    /// After a healthy deploy. Failure logs warning.
    AfterSuccess,
}

impl HookPoint {
    /// Config key for this point.
    pub fn name(&self) -> &'static str {
        match self {
            HookPoint::BeforeDeploy => "before_deploy",
            HookPoint::AfterDeploy => "after_deploy",
            HookPoint::AfterSuccess => "after_success",
        }
    }

    /// Whether failure at this hook point should abort deployment.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HookPoint::BeforeDeploy)
    }
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub app: AppName,
    pub version: Version,
    pub previous_version: Option<Version>,
    pub release_dir: PathBuf,
    pub install_path: PathBuf,
}

impl HookContext {
    /// Convert context to environment variables.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("SLIPWAY_APP".to_string(), self.app.to_string());
        env.insert("SLIPWAY_VERSION".to_string(), self.version.to_string());
        env.insert(
            "SLIPWAY_RELEASE_DIR".to_string(),
            self.release_dir.display().to_string(),
        );
        env.insert(
            "SLIPWAY_INSTALL_PATH".to_string(),
            self.install_path.display().to_string(),
        );
        if let Some(ref prev) = self.previous_version {
            env.insert("SLIPWAY_PREVIOUS_VERSION".to_string(), prev.to_string());
        }
        env
    }
}

/// Result of running one hook command.
#[derive(Debug)]
pub struct HookResult {
    pub command: String,
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, thiserror::Error)]
#[error("{point} hook `{command}` failed (exit code {exit_code:?}): {stderr}")]
pub struct HookError {
    pub point: &'static str,
    pub command: String,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

/// Runs hook command lists through a [`CommandRunner`].
pub struct HookRunner<'a, R: ?Sized> {
    runner: &'a R,
}

impl<'a, R: CommandRunner + ?Sized> HookRunner<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Run `commands` in order from the release directory.
    ///
    /// At a fatal point the first failing command stops the list and is
    /// returned as an error. At other points failures are logged and the
    /// remaining commands still run.
    pub async fn run(
        &self,
        point: HookPoint,
        commands: &[String],
        context: &HookContext,
    ) -> Result<Vec<HookResult>, HookError> {
        let env = context.to_env();
        let mut results = Vec::with_capacity(commands.len());

        for command in commands {
            tracing::info!("Running {} hook: {}", point.name(), command);

            let result = match self.runner.run(command, &context.release_dir, &env).await {
                Ok(output) => HookResult {
                    command: command.clone(),
                    success: output.success(),
                    exit_code: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                },
                Err(e) => {
                    tracing::error!("Failed to execute {} hook: {}", point.name(), e);
                    HookResult {
                        command: command.clone(),
                        success: false,
                        exit_code: None,
                        stdout: String::new(),
                        stderr: e.to_string(),
                    }
                }
            };

            if result.success {
                tracing::info!("{} hook completed successfully", point.name());
            } else if point.is_fatal() {
                return Err(HookError {
                    point: point.name(),
                    command: result.command,
                    exit_code: result.exit_code,
                    stderr: result.stderr.trim().to_string(),
                });
            } else {
                tracing::warn!(
                    "{} hook `{}` failed with exit code {:?}",
                    point.name(),
                    command,
                    result.exit_code
                );
            }

            results.push(result);
        }

        Ok(results)
    }
}
