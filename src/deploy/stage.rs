// ABOUTME: Named stages of a deploy run, used in logs and error reports.
// ABOUTME: Mirrors the order in which the orchestrator drives the type-state transitions.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Resolving,
    CheckingVersion,
    Fetching,
    Preserving,
    Materializing,
    CuttingOver,
    HealthChecking,
    Cleaning,
    RollingBack,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Resolving => "resolving",
            Stage::CheckingVersion => "checking version",
            Stage::Fetching => "fetching",
            Stage::Preserving => "preserving",
            Stage::Materializing => "materializing",
            Stage::CuttingOver => "cutting over",
            Stage::HealthChecking => "health checking",
            Stage::Cleaning => "cleaning",
            Stage::RollingBack => "rolling back",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
