// ABOUTME: Post-cutover health probe: one command run from the install path.
// ABOUTME: Exit 0 within the timeout is healthy; anything else is a reason to roll back.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::runner::CommandRunner;

pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// No command configured.
    Skipped,
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        !matches!(self, HealthStatus::Unhealthy(_))
    }
}

#[derive(Debug, Clone)]
pub struct HealthProbe {
    pub command: Option<String>,
    pub timeout: Duration,
}

impl Default for HealthProbe {
    fn default() -> Self {
        Self {
            command: None,
            timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }
}

impl HealthProbe {
    /// Run the probe once. There are no retries.
    pub async fn check<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
        install_path: &Path,
    ) -> HealthStatus {
        let Some(command) = self.command.as_deref() else {
            tracing::info!("No health check configured, skipping");
            return HealthStatus::Skipped;
        };

        tracing::info!("Health check: {}", command);
        let env = HashMap::new();
        let run = runner.run(command, install_path, &env);

        match tokio::time::timeout(self.timeout, run).await {
            Err(_) => HealthStatus::Unhealthy(format!(
                "`{}` timed out after {:?}",
                command, self.timeout
            )),
            Ok(Err(e)) => HealthStatus::Unhealthy(e.to_string()),
            Ok(Ok(output)) if output.success() => {
                tracing::info!("Health check passed");
                HealthStatus::Healthy
            }
            Ok(Ok(output)) => {
                let detail = if output.stderr.trim().is_empty() {
                    output.stdout.trim().to_string()
                } else {
                    output.stderr.trim().to_string()
                };
                HealthStatus::Unhealthy(format!(
                    "`{}` exited with {:?}: {}",
                    command, output.exit_code, detail
                ))
            }
        }
    }
}
