// ABOUTME: Lifecycle hook command lists from slipway.yml.
// ABOUTME: Each list runs in order from the release directory.

use serde::Deserialize;

use crate::hooks::HookPoint;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub before_deploy: Vec<String>,
    #[serde(default)]
    pub after_deploy: Vec<String>,
    #[serde(default)]
    pub after_success: Vec<String>,
}

impl HooksConfig {
    pub fn commands(&self, point: HookPoint) -> &[String] {
        match point {
            HookPoint::BeforeDeploy => &self.before_deploy,
            HookPoint::AfterDeploy => &self.after_deploy,
            HookPoint::AfterSuccess => &self.after_success,
        }
    }
}
