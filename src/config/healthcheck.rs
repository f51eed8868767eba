// ABOUTME: Post-cutover health check configuration.
// ABOUTME: One shell command and a timeout; no command means the check is skipped.

use serde::Deserialize;
use std::time::Duration;

use crate::health::{DEFAULT_HEALTH_TIMEOUT, HealthProbe};

#[derive(Debug, Clone, Deserialize)]
pub struct HealthcheckConfig {
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_HEALTH_TIMEOUT
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout: default_timeout(),
        }
    }
}

impl HealthcheckConfig {
    pub fn probe(&self) -> HealthProbe {
        HealthProbe {
            command: self.command.clone().filter(|c| !c.trim().is_empty()),
            timeout: self.timeout,
        }
    }
}
