// ABOUTME: Drives a deploy through every stage and recovers from failures.
// ABOUTME: Holds the deploy lock for the run and reports what was deployed or pruned.

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::{Config, shell_quote};
use crate::cutover::CutoverError;
use crate::diagnostics::{Diagnostics, Warning};
use crate::hooks::{HookContext, HookPoint, HookRunner};
use crate::output::Output;
use crate::registry::{ArtifactFetcher, ReleaseSource, remove_scratch};
use crate::release::{PruneResult, Release, ReleaseStore};
use crate::runner::CommandRunner;
use crate::types::Version;

use super::cancel::CancelFlag;
use super::confirm::Confirm;
use super::error::{DeployError, DeployFailure};
use super::lock::DeployLock;
use super::stage::Stage;
use super::state::CutOver;
use super::Deployment;

/// Switches for one deploy run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    /// Deploy even when the installed version is already the latest.
    pub force: bool,
    /// Prune old releases without asking.
    pub auto_cleanup: bool,
    pub skip_migrations: bool,
    /// Answer yes to the migration and cleanup prompts.
    pub assume_yes: bool,
    pub break_lock: bool,
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// The latest version is installed and the operator chose not to redeploy.
    UpToDate { version: Version },
    Deployed(DeployReport),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub version: Version,
    pub previous: Option<Version>,
    pub release_path: PathBuf,
    /// The release directory already existed and was reused.
    pub reused: bool,
    pub preserved: Vec<PathBuf>,
    pub backup: Option<PathBuf>,
    pub pruned: Vec<Version>,
}

/// Sequences the deploy stages for one application.
pub struct Orchestrator<'a, S, R: ?Sized, C: ?Sized> {
    config: &'a Config,
    fetcher: ArtifactFetcher<S>,
    store: ReleaseStore,
    runner: &'a R,
    confirm: &'a C,
    cancel: CancelFlag,
}

impl<'a, S, R, C> Orchestrator<'a, S, R, C>
where
    S: ReleaseSource,
    R: CommandRunner + ?Sized,
    C: Confirm + ?Sized,
{
    pub fn new(config: &'a Config, source: S, runner: &'a R, confirm: &'a C) -> Self {
        let fetcher = ArtifactFetcher::new(
            source,
            config.repo.clone(),
            config.app_name.clone(),
            config.github_token.clone(),
        );
        let store = ReleaseStore::new(&config.install_dir, config.app_name.clone());

        Self {
            config,
            fetcher,
            store,
            runner,
            confirm,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Deploy the latest release.
    ///
    /// The whole run holds the deploy lock. The scratch directory is removed
    /// at the end whatever the outcome.
    pub async fn deploy(
        &self,
        options: &DeployOptions,
        output: &Output,
        diag: &mut Diagnostics,
    ) -> Result<DeployOutcome, DeployError> {
        output.progress("  → Acquiring deploy lock...");
        let lock = DeployLock::acquire(
            &self.store.lock_path(),
            self.store.app(),
            options.break_lock,
        )
        .map_err(|e| DeployError::new(Stage::Init, e))?;

        let result = self.run(options, output, diag).await;

        if let Err(e) = remove_scratch(&self.store.scratch_dir()).await {
            diag.warn(Warning::scratch(format!(
                "Failed to remove scratch directory {}: {}",
                self.store.scratch_dir().display(),
                e
            )));
        }
        if let Err(e) = lock.release() {
            diag.warn(Warning::lock_release(format!(
                "Failed to remove deploy lock: {}",
                e
            )));
        }

        match &result {
            Ok(_) => tracing::info!("stage: {}", Stage::Done),
            Err(e) => tracing::error!("stage: {} ({})", Stage::Failed, e),
        }
        result
    }

    fn checkpoint(&self, stage: Stage) -> Result<(), DeployError> {
        if self.cancel.is_cancelled() {
            tracing::warn!("Cancellation requested before {}", stage);
            return Err(DeployError::new(stage, DeployFailure::Cancelled));
        }
        tracing::debug!("stage: {}", stage);
        Ok(())
    }

    async fn run(
        &self,
        options: &DeployOptions,
        output: &Output,
        diag: &mut Diagnostics,
    ) -> Result<DeployOutcome, DeployError> {
        self.checkpoint(Stage::Init)?;
        self.check_dependencies().await?;
        let previous = self
            .store
            .active_release()
            .map_err(|e| DeployError::new(Stage::Init, e))?;

        self.checkpoint(Stage::Resolving)?;
        output.progress(&format!("  → Fetching latest release of {}...", self.config.repo));
        let deployment = Deployment::new(previous).resolve(&self.fetcher).await?;
        let version = deployment.version().clone();
        output.progress(&format!("  → Latest version: {}", version));

        self.checkpoint(Stage::CheckingVersion)?;
        match self.store.installed_version() {
            Some(installed) => {
                output.progress(&format!("  → Current version: {}", installed));
                if installed == version && !options.force {
                    output.warning(&format!("Already running the latest version ({})", version));
                    if !self.confirm.confirm("Do you want to continue anyway?", false) {
                        output.progress("Deployment cancelled");
                        return Ok(DeployOutcome::UpToDate { version });
                    }
                }
            }
            None => output.progress("  → No version file found, proceeding with deployment"),
        }

        self.checkpoint(Stage::Fetching)?;
        output.progress("  → Downloading and extracting release...");
        let deployment = deployment.fetch(&self.fetcher, &self.store).await?;

        self.checkpoint(Stage::Preserving)?;
        output.progress("  → Preserving files from the active release...");
        let deployment = deployment.preserve(&self.config.preserve).await?;
        let preserved = deployment.preserve_report().copied.clone();

        self.checkpoint(Stage::Materializing)?;
        let deployment = deployment
            .materialize(&self.store, &self.config.preserve)
            .await?;
        let release = deployment.release().clone();
        let reused = !deployment.is_fresh();
        if reused {
            output.progress(&format!("  → Reusing {}", release.path.display()));
        } else {
            output.progress(&format!("  → Created {}", release.path.display()));
            self.fix_permissions(&release, diag).await;
        }

        let backup = self.backup_previous(deployment.previous(), output, diag);

        let context = HookContext {
            app: self.config.app_name.clone(),
            version: version.clone(),
            previous_version: deployment.previous_version().cloned(),
            release_dir: release.path.clone(),
            install_path: self.store.install_path(),
        };
        let hooks = HookRunner::new(self.runner);
        hooks
            .run(
                HookPoint::BeforeDeploy,
                self.config.hooks.commands(HookPoint::BeforeDeploy),
                &context,
            )
            .await
            .map_err(|e| DeployError::new(Stage::CuttingOver, e))?;

        self.checkpoint(Stage::CuttingOver)?;
        let deployment = match deployment.cut_over(&self.store) {
            Ok(deployment) => deployment,
            Err((_, error))
                if matches!(
                    error.cause,
                    DeployFailure::Cutover(
                        CutoverError::UnexpectedInstallState(_) | CutoverError::MissingTarget(_)
                    )
                ) =>
            {
                // The link was never touched.
                return Err(error);
            }
            Err((deployment, error)) => {
                return Err(self.recover(deployment.roll_back(&self.store, error), output));
            }
        };
        output.progress(&format!(
            "  → {} now serves {}",
            self.store.install_path().display(),
            version
        ));

        self.run_soft_hooks(&hooks, HookPoint::AfterDeploy, &context, diag)
            .await;

        if let Err(error) = self.migrate(&deployment, options, output).await {
            return Err(self.recover(deployment.roll_back(&self.store, error), output));
        }

        if self.cancel.is_cancelled() {
            output.warning("Cancelled after cutover; the new release stays live and unverified");
            return Err(DeployError::new(Stage::HealthChecking, DeployFailure::Cancelled));
        }

        tracing::debug!("stage: {}", Stage::HealthChecking);
        output.progress("  → Performing health check...");
        let probe = self.config.healthcheck.probe();
        let deployment = match deployment
            .health_check(&probe, self.runner, &self.store)
            .await
        {
            Ok(deployment) => deployment,
            Err((deployment, error)) => {
                return Err(self.recover(deployment.roll_back(&self.store, error), output));
            }
        };

        self.run_soft_hooks(&hooks, HookPoint::AfterSuccess, &context, diag)
            .await;

        tracing::debug!("stage: {}", Stage::Cleaning);
        let pruned = if options.auto_cleanup
            || options.assume_yes
            || self
                .confirm
                .confirm("Deployment successful! Clean up old releases?", true)
        {
            self.prune_releases(Some(&version), output, diag)
        } else {
            Vec::new()
        };

        let completed = deployment.complete();
        Ok(DeployOutcome::Deployed(DeployReport {
            version,
            previous: completed.previous_version().cloned(),
            release_path: completed.release().path.clone(),
            reused,
            preserved,
            backup,
            pruned,
        }))
    }

    fn recover(&self, error: DeployError, output: &Output) -> DeployError {
        tracing::debug!("stage: {}", Stage::RollingBack);
        if let Some(report) = &error.rollback {
            output.warning(&format!("Deployment failed; {}", report));
        }
        error
    }

    /// Every command in `requires` must resolve with `command -v`.
    async fn check_dependencies(&self) -> Result<(), DeployError> {
        let env = HashMap::new();
        for name in &self.config.requires {
            let probe = format!("command -v {} >/dev/null 2>&1", shell_quote(name));
            let found = self
                .runner
                .run(&probe, self.store.root(), &env)
                .await
                .is_ok_and(|output| output.success());
            if !found {
                return Err(DeployError::new(
                    Stage::Init,
                    DeployFailure::MissingDependency(name.clone()),
                ));
            }
        }
        Ok(())
    }

    /// chown to the web user when running as root, then chmod. Never fatal.
    async fn fix_permissions(&self, release: &Release, diag: &mut Diagnostics) {
        let perms = &self.config.permissions;
        if !perms.enabled {
            return;
        }
        let env = HashMap::new();
        let cwd = &release.path;

        let is_root = self
            .runner
            .run("id -u", cwd, &env)
            .await
            .is_ok_and(|output| output.success() && output.stdout.trim() == "0");

        if is_root {
            let user_exists = self
                .runner
                .run(&perms.user_exists_command(), cwd, &env)
                .await
                .is_ok_and(|output| output.success());
            if user_exists {
                self.soft_command(&perms.chown_command(&release.path), cwd, diag)
                    .await;
            } else {
                diag.warn(Warning::permissions(format!(
                    "Web user '{}' does not exist, leaving ownership unchanged",
                    perms.web_user
                )));
            }
        }

        for command in perms.chmod_commands(&release.path) {
            self.soft_command(&command, cwd, diag).await;
        }
    }

    async fn soft_command(&self, command: &str, cwd: &std::path::Path, diag: &mut Diagnostics) {
        match self.runner.run(command, cwd, &HashMap::new()).await {
            Ok(output) if output.success() => {}
            Ok(output) => diag.warn(Warning::permissions(format!(
                "`{}` exited with {:?}: {}",
                command,
                output.exit_code,
                output.stderr.trim()
            ))),
            Err(e) => diag.warn(Warning::permissions(e.to_string())),
        }
    }

    fn backup_previous(
        &self,
        previous: Option<&Release>,
        output: &Output,
        diag: &mut Diagnostics,
    ) -> Option<PathBuf> {
        let backups = &self.config.backups;
        let previous = previous.filter(|_| backups.enabled)?;

        let path = match self
            .store
            .backup_preserved(previous, &self.config.preserve)
        {
            Ok(Some(manifest)) => {
                output.progress(&format!("  → Backed up to {}", manifest.path.display()));
                Some(manifest.path)
            }
            Ok(None) => None,
            Err(e) => {
                diag.warn(Warning::backup(format!(
                    "Backup of {} failed: {}",
                    previous.version, e
                )));
                None
            }
        };

        if let Err(e) = self.store.prune_backups(backups.keep) {
            diag.warn(Warning::prune(format!("Failed to prune backups: {}", e)));
        }
        path
    }

    async fn run_soft_hooks(
        &self,
        hooks: &HookRunner<'_, R>,
        point: HookPoint,
        context: &HookContext,
        diag: &mut Diagnostics,
    ) {
        let results = match hooks
            .run(point, self.config.hooks.commands(point), context)
            .await
        {
            Ok(results) => results,
            // Only fatal points return errors.
            Err(e) => {
                diag.warn(Warning::hook(e.to_string()));
                return;
            }
        };

        for result in results.iter().filter(|r| !r.success) {
            diag.warn(Warning::hook(format!(
                "{} hook `{}` failed with exit code {:?}",
                point.name(),
                result.command,
                result.exit_code
            )));
        }
    }

    async fn migrate(
        &self,
        deployment: &Deployment<CutOver>,
        options: &DeployOptions,
        output: &Output,
    ) -> Result<(), DeployError> {
        let Some(command) = self.config.migrations.command.as_deref() else {
            return Ok(());
        };
        if options.skip_migrations {
            output.progress("  → Skipping migrations");
            return Ok(());
        }
        if !options.assume_yes && !self.confirm.confirm("Run database migrations?", false) {
            output.progress("  → Migrations not run");
            return Ok(());
        }

        output.progress("  → Running migrations...");
        deployment.migrate(command, self.runner).await
    }

    fn prune_releases(
        &self,
        exclude: Option<&Version>,
        output: &Output,
        diag: &mut Diagnostics,
    ) -> Vec<Version> {
        match self.store.prune(self.config.keep_releases, exclude) {
            Ok(PruneResult { removed, failed }) => {
                for failure in failed {
                    diag.warn(Warning::prune(format!(
                        "Failed to remove {}: {}",
                        failure.release.path.display(),
                        failure.error
                    )));
                }
                for release in &removed {
                    output.progress(&format!("  → Removed old release {}", release.version));
                }
                removed.into_iter().map(|r| r.version).collect()
            }
            Err(e) => {
                diag.warn(Warning::prune(format!("Failed to list releases: {}", e)));
                Vec::new()
            }
        }
    }
}
