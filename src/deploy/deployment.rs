// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: State types carry their own data for compile-time guarantees.

use crate::health::HealthStatus;
use crate::preserve::PreserveReport;
use crate::registry::ReleaseInfo;
use crate::release::Release;
use crate::types::Version;

use super::state::{
    Completed, CutOver, Fetched, HealthChecked, Initialized, Materialized, Preserved, Resolved,
};

/// A deployment in progress, parameterized by its current state.
///
/// The state type parameter `S` carries state-specific data (release
/// metadata, the extracted tree, the materialized release) so an operation is
/// only callable once its inputs exist.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) previous: Option<Release>,
    pub(crate) state: S,
}

impl Deployment<Initialized> {
    /// Start a deployment. `previous` is the release active before it.
    pub fn new(previous: Option<Release>) -> Self {
        Deployment {
            previous,
            state: Initialized,
        }
    }
}

impl<S> Deployment<S> {
    /// The release that was active when the deployment started.
    pub fn previous(&self) -> Option<&Release> {
        self.previous.as_ref()
    }

    pub fn previous_version(&self) -> Option<&Version> {
        self.previous.as_ref().map(|r| &r.version)
    }
}

impl Deployment<Resolved> {
    pub fn release_info(&self) -> &ReleaseInfo {
        &self.state.info
    }

    pub fn version(&self) -> &Version {
        &self.state.info.version
    }
}

impl Deployment<Fetched> {
    pub fn version(&self) -> &Version {
        &self.state.info.version
    }

    pub fn extracted_root(&self) -> &std::path::Path {
        &self.state.extracted
    }
}

impl Deployment<Preserved> {
    pub fn version(&self) -> &Version {
        &self.state.info.version
    }

    pub fn preserve_report(&self) -> &PreserveReport {
        &self.state.report
    }
}

impl Deployment<Materialized> {
    pub fn release(&self) -> &Release {
        &self.state.release
    }

    /// False when an existing release directory was reused.
    pub fn is_fresh(&self) -> bool {
        self.state.fresh
    }
}

impl Deployment<CutOver> {
    pub fn release(&self) -> &Release {
        &self.state.release
    }

    pub fn is_fresh(&self) -> bool {
        self.state.fresh
    }
}

impl Deployment<HealthChecked> {
    pub fn release(&self) -> &Release {
        &self.state.release
    }

    pub fn health(&self) -> &HealthStatus {
        &self.state.health
    }
}

impl Deployment<Completed> {
    pub fn release(&self) -> &Release {
        &self.state.release
    }
}
