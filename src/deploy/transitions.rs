// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::cutover;
use crate::health::HealthProbe;
use crate::preserve::preserve;
use crate::registry::{ArtifactFetcher, ReleaseSource};
use crate::release::{Release, ReleaseStore};
use crate::runner::CommandRunner;

use super::Deployment;
use super::error::{DeployError, DeployFailure, RollbackReport};
use super::stage::Stage;
use super::state::{
    Completed, CutOver, Fetched, HealthChecked, Initialized, Materialized, Preserved, Resolved,
};

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<Deployment<T>, (Deployment<S>, DeployError)>;

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Deployment<S> {
    /// Internal helper to transition to a new state.
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            previous: self.previous,
            state,
        }
    }
}

fn join_error(stage: Stage) -> impl FnOnce(tokio::task::JoinError) -> DeployError {
    move |e| DeployError::new(stage, DeployFailure::Task(e.to_string()))
}

/// Point the install link back at `previous`, the release that was live when
/// the run started, and drop `failed` if this run created it. Without a usable
/// `previous` the newest release older than `failed` is used.
fn roll_back_release(
    store: &ReleaseStore,
    previous: Option<&Release>,
    failed: &Release,
    fresh: bool,
) -> RollbackReport {
    let live_before = previous.filter(|p| p.version != failed.version && p.path.is_dir());
    let target = match live_before {
        Some(previous) => previous.clone(),
        None => match store.previous_before(&failed.version) {
            Ok(Some(target)) => target,
            Ok(None) => {
                tracing::error!("No release older than {} to roll back to", failed.version);
                return RollbackReport::Unavailable;
            }
            Err(e) => return RollbackReport::Failed(e.to_string()),
        },
    };

    if let Err(e) = cutover::rollback(&store.install_path(), &target.path) {
        tracing::error!("Rollback to {} failed: {}", target.version, e);
        return RollbackReport::Failed(e.to_string());
    }

    let discarded = fresh
        && match store.discard(&failed.version) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to remove failed release {}: {}", failed.version, e);
                false
            }
        };

    RollbackReport::RolledBack {
        to: target.version,
        discarded,
    }
}

// =============================================================================
// Initialized -> Resolved
// =============================================================================

impl Deployment<Initialized> {
    /// Ask the registry for the latest release.
    #[must_use = "deployment state must be used"]
    pub async fn resolve<S: ReleaseSource>(
        self,
        fetcher: &ArtifactFetcher<S>,
    ) -> Result<Deployment<Resolved>, DeployError> {
        let info = fetcher
            .resolve_latest()
            .await
            .map_err(|e| DeployError::new(Stage::Resolving, e))?;
        Ok(self.transition(Resolved { info }))
    }
}

// =============================================================================
// Resolved -> Fetched
// =============================================================================

impl Deployment<Resolved> {
    /// Download and extract the release archive into the store's scratch dir.
    #[must_use = "deployment state must be used"]
    pub async fn fetch<S: ReleaseSource>(
        self,
        fetcher: &ArtifactFetcher<S>,
        store: &ReleaseStore,
    ) -> Result<Deployment<Fetched>, DeployError> {
        let extracted = fetcher
            .download_and_extract(&self.state.info, &store.scratch_dir(), &store.install_path())
            .await
            .map_err(|e| DeployError::new(Stage::Fetching, e))?;

        tracing::info!("Extracted application root {}", extracted.display());
        let info = self.state.info.clone();
        Ok(self.transition(Fetched { info, extracted }))
    }
}

// =============================================================================
// Fetched -> Preserved
// =============================================================================

impl Deployment<Fetched> {
    /// Copy preserved paths from the previous release into the extracted tree.
    /// A first deploy has nothing to preserve.
    #[must_use = "deployment state must be used"]
    pub async fn preserve(self, paths: &[PathBuf]) -> Result<Deployment<Preserved>, DeployError> {
        let report = match &self.previous {
            None => {
                tracing::info!("No active release, nothing to preserve");
                Default::default()
            }
            Some(previous) => {
                let source = previous.path.clone();
                let dest = self.state.extracted.clone();
                let paths = paths.to_vec();
                tokio::task::spawn_blocking(move || preserve(&source, &dest, &paths))
                    .await
                    .map_err(join_error(Stage::Preserving))?
                    .map_err(|e| DeployError::new(Stage::Preserving, e))?
            }
        };

        let Fetched { info, extracted } = self.state.clone();
        Ok(self.transition(Preserved {
            info,
            extracted,
            report,
        }))
    }
}

// =============================================================================
// Preserved -> Materialized
// =============================================================================

impl Deployment<Preserved> {
    /// Create (or reuse) the release directory.
    ///
    /// A reused directory that is not the active release gets the preserved
    /// paths refreshed from the active release. The active release itself is
    /// never written to.
    #[must_use = "deployment state must be used"]
    pub async fn materialize(
        self,
        store: &ReleaseStore,
        paths: &[PathBuf],
    ) -> Result<Deployment<Materialized>, DeployError> {
        let extracted = self.state.extracted.clone();
        let version = self.state.info.version.clone();
        let task_store = store.clone();
        let materialization =
            tokio::task::spawn_blocking(move || task_store.materialize(&extracted, &version))
                .await
                .map_err(join_error(Stage::Materializing))?
                .map_err(|e| DeployError::new(Stage::Materializing, e))?;

        let release = materialization.release;
        if materialization.reused
            && let Some(previous) = &self.previous
            && previous.version != release.version
        {
            let source = previous.path.clone();
            let dest = release.path.clone();
            let paths = paths.to_vec();
            tokio::task::spawn_blocking(move || preserve(&source, &dest, &paths))
                .await
                .map_err(join_error(Stage::Materializing))?
                .map_err(|e| DeployError::new(Stage::Materializing, e))?;
        }

        Ok(self.transition(Materialized {
            release,
            fresh: !materialization.reused,
        }))
    }
}

// =============================================================================
// Materialized -> CutOver
// =============================================================================

impl Deployment<Materialized> {
    /// Point the install link at the new release.
    ///
    /// On failure, returns the deployment so the caller can roll back.
    #[must_use = "deployment state must be used"]
    pub fn cut_over(self, store: &ReleaseStore) -> TransitionResult<CutOver, Materialized> {
        match cutover::swap(&store.install_path(), &self.state.release.path) {
            Ok(()) => {
                let Materialized { release, fresh } = self.state.clone();
                Ok(self.transition(CutOver { release, fresh }))
            }
            Err(e) => Err((self, DeployError::new(Stage::CuttingOver, e))),
        }
    }

    /// Restore the previous release after a failed cutover.
    pub fn roll_back(self, store: &ReleaseStore, error: DeployError) -> DeployError {
        let report = roll_back_release(
            store,
            self.previous.as_ref(),
            &self.state.release,
            self.state.fresh,
        );
        error.with_rollback(report)
    }
}

// =============================================================================
// CutOver -> HealthChecked
// =============================================================================

impl Deployment<CutOver> {
    /// Run the migration command from the release directory.
    pub async fn migrate<R: CommandRunner + ?Sized>(
        &self,
        command: &str,
        runner: &R,
    ) -> Result<(), DeployError> {
        tracing::info!("Running migrations: {}", command);
        let output = runner
            .run(command, &self.state.release.path, &HashMap::new())
            .await
            .map_err(|e| DeployError::new(Stage::CuttingOver, DeployFailure::Migration(e.to_string())))?;

        if output.success() {
            return Ok(());
        }
        Err(DeployError::new(
            Stage::CuttingOver,
            DeployFailure::Migration(format!(
                "`{}` exited with {:?}: {}",
                command,
                output.exit_code,
                output.stderr.trim()
            )),
        ))
    }

    /// Probe the live install path.
    ///
    /// On failure, returns the deployment so the caller can roll back.
    #[must_use = "deployment state must be used"]
    pub async fn health_check<R: CommandRunner + ?Sized>(
        self,
        probe: &HealthProbe,
        runner: &R,
        store: &ReleaseStore,
    ) -> TransitionResult<HealthChecked, CutOver> {
        let health = probe.check(runner, &store.install_path()).await;
        if let crate::health::HealthStatus::Unhealthy(reason) = &health {
            let error = DeployError::new(
                Stage::HealthChecking,
                DeployFailure::HealthCheckFailed(reason.clone()),
            );
            return Err((self, error));
        }

        let release = self.state.release.clone();
        Ok(self.transition(HealthChecked { release, health }))
    }

    /// Restore the previous release after a post-cutover failure.
    pub fn roll_back(self, store: &ReleaseStore, error: DeployError) -> DeployError {
        let report = roll_back_release(
            store,
            self.previous.as_ref(),
            &self.state.release,
            self.state.fresh,
        );
        error.with_rollback(report)
    }
}

// =============================================================================
// HealthChecked -> Completed
// =============================================================================

impl Deployment<HealthChecked> {
    #[must_use = "deployment state must be used"]
    pub fn complete(self) -> Deployment<Completed> {
        let release = self.state.release.clone();
        self.transition(Completed { release })
    }
}
