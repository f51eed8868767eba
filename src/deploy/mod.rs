// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports state markers, the Deployment struct, the Orchestrator and local maintenance.

mod cancel;
mod confirm;
mod deployment;
mod error;
mod lock;
mod maintenance;
mod orchestrator;
mod stage;
mod state;
mod transitions;

pub use cancel::CancelFlag;
pub use confirm::{AssumeDefault, AssumeYes, Confirm, FixedAnswer};
pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind, DeployFailure, RollbackReport};
pub use lock::{DeployLock, LockInfo};
pub use maintenance::{Maintenance, RollbackOutcome, StatusReport};
pub use orchestrator::{DeployOptions, DeployOutcome, DeployReport, Orchestrator};
pub use stage::Stage;
pub use state::{
    Completed, CutOver, Fetched, HealthChecked, Initialized, Materialized, Preserved, Resolved,
};
pub use transitions::TransitionResult;
