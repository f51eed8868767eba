// ABOUTME: End-to-end deploy tests against a temporary install root.
// ABOUTME: Uses an in-memory registry and a scripted command runner.

mod support;

use slipway::config::{Config, ConfigFile, Overrides};
use slipway::deploy::{
    AssumeDefault, CancelFlag, DeployError, DeployErrorKind, DeployFailure, DeployLock, DeployOptions,
    DeployOutcome, DeployReport, FixedAnswer, Maintenance, Orchestrator, RollbackReport, Stage,
};
use slipway::diagnostics::{Diagnostics, WarningKind};
use slipway::output::{Output, OutputMode};
use slipway::registry::RegistryError;
use slipway::runner::ScriptedRunner;
use slipway::types::{AppName, Version};
use std::fs;
use std::path::{Path, PathBuf};
use support::FakeSource;
use tempfile::TempDir;

fn v(tag: &str) -> Version {
    Version::new(tag).unwrap()
}

fn config(root: &Path, extra: &str) -> Config {
    let yaml = format!(
        "repo: acme/shop\ninstall_dir: {}\n{}",
        root.display(),
        extra
    );
    Config::resolve(
        ConfigFile::from_yaml(&yaml).unwrap(),
        Overrides::default(),
        root,
    )
    .unwrap()
}

fn install_path(root: &TempDir) -> PathBuf {
    root.path().join("shop")
}

fn release_dir(root: &TempDir, tag: &str) -> PathBuf {
    root.path().join(format!("shop-{tag}"))
}

fn link_target(root: &TempDir) -> PathBuf {
    fs::read_link(install_path(root)).unwrap()
}

async fn run_deploy(
    config: &Config,
    source: &FakeSource,
    runner: &ScriptedRunner,
    options: DeployOptions,
) -> (Result<DeployOutcome, DeployError>, Diagnostics) {
    support::init_tracing();
    let orchestrator = Orchestrator::new(config, source.clone(), runner, &AssumeDefault);
    let output = Output::new(OutputMode::Quiet);
    let mut diag = Diagnostics::default();
    let result = orchestrator.deploy(&options, &output, &mut diag).await;
    (result, diag)
}

fn deployed(result: Result<DeployOutcome, DeployError>) -> DeployReport {
    match result.expect("deploy should succeed") {
        DeployOutcome::Deployed(report) => report,
        other => panic!("expected a deploy, got {other:?}"),
    }
}

/// Test: first deploy creates the release and points the link at it.
#[tokio::test]
async fn first_deploy_creates_release_and_link() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new();

    let (result, _) = run_deploy(&config, &source, &runner, DeployOptions::default()).await;
    let report = deployed(result);

    assert_eq!(report.version, v("v1.0.0"));
    assert_eq!(report.previous, None);
    assert!(!report.reused);
    assert_eq!(link_target(&root), release_dir(&root, "v1.0.0"));
    assert_eq!(
        fs::read_to_string(install_path(&root).join("index.php")).unwrap(),
        "<?php echo 'v1.0.0';"
    );
    assert_eq!(
        fs::read_to_string(install_path(&root).join("version.txt")).unwrap(),
        "v1.0.0\n"
    );
    assert!(!root.path().join("temp").exists(), "scratch should be removed");
    assert!(!root.path().join(".slipway.lock").exists(), "lock should be released");
}

/// Test: a second run with nothing new stops at the version check.
#[tokio::test]
async fn second_run_is_up_to_date() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new();

    deployed(run_deploy(&config, &source, &runner, DeployOptions::default()).await.0);
    let (result, _) = run_deploy(&config, &source, &runner, DeployOptions::default()).await;

    assert_eq!(
        result.unwrap(),
        DeployOutcome::UpToDate {
            version: v("v1.0.0")
        }
    );
    assert_eq!(source.download_count(), 1);
    assert_eq!(link_target(&root), release_dir(&root, "v1.0.0"));
}

/// Test: --force redeploys the same version by reusing its directory.
#[tokio::test]
async fn forced_redeploy_reuses_release_directory() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new();

    deployed(run_deploy(&config, &source, &runner, DeployOptions::default()).await.0);
    fs::write(install_path(&root).join("local.txt"), "kept").unwrap();

    let options = DeployOptions {
        force: true,
        ..Default::default()
    };
    let report = deployed(run_deploy(&config, &source, &runner, options).await.0);

    assert!(report.reused);
    assert_eq!(source.download_count(), 2);
    assert_eq!(
        fs::read_to_string(release_dir(&root, "v1.0.0").join("local.txt")).unwrap(),
        "kept"
    );
}

/// Test: preserved paths carry over and the old release keeps its copy.
#[tokio::test]
async fn upgrade_preserves_env_and_backs_it_up() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new();

    deployed(run_deploy(&config, &source, &runner, DeployOptions::default()).await.0);
    fs::write(install_path(&root).join(".env"), "APP_KEY=live").unwrap();

    source.publish("shop", "v1.1.0");
    let report = deployed(run_deploy(&config, &source, &runner, DeployOptions::default()).await.0);

    assert_eq!(report.previous, Some(v("v1.0.0")));
    assert!(report.preserved.contains(&PathBuf::from(".env")));
    assert_eq!(link_target(&root), release_dir(&root, "v1.1.0"));
    assert_eq!(
        fs::read_to_string(release_dir(&root, "v1.1.0").join(".env")).unwrap(),
        "APP_KEY=live"
    );
    assert_eq!(
        fs::read_to_string(release_dir(&root, "v1.0.0").join(".env")).unwrap(),
        "APP_KEY=live"
    );

    let backup = report.backup.expect("backup should be taken");
    assert!(backup.starts_with(root.path().join("backups")));
    assert_eq!(fs::read_to_string(backup.join(".env")).unwrap(), "APP_KEY=live");
}

/// Test: a failing health check restores the previous release and drops the new one.
#[tokio::test]
async fn failed_health_check_rolls_back() {
    let root = TempDir::new().unwrap();
    let config = config(
        root.path(),
        "healthcheck:\n  command: curl -fsS http://localhost/health\n",
    );
    let source = FakeSource::publishing("shop", "v1.0.0");

    deployed(run_deploy(&config, &source, &ScriptedRunner::new(), DeployOptions::default()).await.0);

    source.publish("shop", "v2.0.0");
    let failing = ScriptedRunner::new().exit_with("curl", 7);
    let (result, _) = run_deploy(&config, &source, &failing, DeployOptions::default()).await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::HealthCheckFailed);
    assert_eq!(err.stage, Stage::HealthChecking);
    assert_eq!(
        err.rollback,
        Some(RollbackReport::RolledBack {
            to: v("v1.0.0"),
            discarded: true
        })
    );
    assert_eq!(link_target(&root), release_dir(&root, "v1.0.0"));
    assert!(!release_dir(&root, "v2.0.0").exists());

    let probe = failing
        .calls()
        .into_iter()
        .find(|c| c.command.contains("curl"))
        .unwrap();
    assert_eq!(probe.cwd, install_path(&root));
}

/// Test: after a manual rollback, a failed deploy returns to the release that was live.
#[tokio::test]
async fn failed_deploy_after_manual_rollback_restores_live_release() {
    let root = TempDir::new().unwrap();
    let config = config(
        root.path(),
        "healthcheck:\n  command: curl -fsS http://localhost/health\n",
    );
    let source = FakeSource::new();
    for tag in ["v1.0.0", "v2.0.0"] {
        source.publish("shop", tag);
        deployed(run_deploy(&config, &source, &ScriptedRunner::new(), DeployOptions::default()).await.0);
    }
    Maintenance::new(&config).rollback(false).unwrap();
    assert_eq!(link_target(&root), release_dir(&root, "v1.0.0"));

    source.publish("shop", "v3.0.0");
    let failing = ScriptedRunner::new().exit_with("curl", 7);
    let (result, _) = run_deploy(&config, &source, &failing, DeployOptions::default()).await;

    let err = result.unwrap_err();
    assert_eq!(
        err.rollback,
        Some(RollbackReport::RolledBack {
            to: v("v1.0.0"),
            discarded: true
        })
    );
    assert_eq!(link_target(&root), release_dir(&root, "v1.0.0"));
    assert!(release_dir(&root, "v2.0.0").exists());
    assert!(!release_dir(&root, "v3.0.0").exists());
}

/// Test: a tag that would not be recognised as a release directory is refused.
#[tokio::test]
async fn non_version_tag_is_refused_before_download() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    let source = FakeSource::publishing("shop", "stable-2024");
    let runner = ScriptedRunner::new();

    let (result, _) = run_deploy(&config, &source, &runner, DeployOptions::default()).await;

    let err = result.unwrap_err();
    assert_eq!(err.stage, Stage::Resolving);
    assert!(matches!(
        err.cause,
        DeployFailure::Registry(RegistryError::MalformedMetadata(_))
    ));
    assert_eq!(source.download_count(), 0);
    assert!(!install_path(&root).exists());
    assert!(!release_dir(&root, "stable-2024").exists());
}

/// Test: a failing first deploy has nothing to roll back to.
#[tokio::test]
async fn failed_first_deploy_reports_rollback_unavailable() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "healthcheck:\n  command: ./health.sh\n");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new().exit_with("health.sh", 1);

    let (result, _) = run_deploy(&config, &source, &runner, DeployOptions::default()).await;

    let err = result.unwrap_err();
    assert_eq!(err.rollback, Some(RollbackReport::Unavailable));
    assert!(!err.rolled_back());
}

/// Test: a failure before cutover leaves the live release alone.
#[tokio::test]
async fn failure_before_cutover_leaves_link_untouched() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new();

    deployed(run_deploy(&config, &source, &runner, DeployOptions::default()).await.0);

    // No top-level directory named after the app.
    source.publish_archive("v2.0.0", support::zip_archive(&[("other/readme.txt", "x")]));
    let (result, _) = run_deploy(&config, &source, &runner, DeployOptions::default()).await;

    let err = result.unwrap_err();
    assert_eq!(err.stage, Stage::Fetching);
    assert_eq!(err.kind(), DeployErrorKind::Archive);
    assert_eq!(err.rollback, None);
    assert_eq!(link_target(&root), release_dir(&root, "v1.0.0"));
    assert!(!release_dir(&root, "v2.0.0").exists());
    assert!(!root.path().join("temp").exists());
}

/// Test: a real directory at the install path is never replaced.
#[tokio::test]
async fn real_directory_at_install_path_is_refused() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    fs::create_dir(install_path(&root)).unwrap();
    fs::write(install_path(&root).join("index.php"), "legacy").unwrap();
    let source = FakeSource::publishing("shop", "v1.0.0");

    let (result, _) =
        run_deploy(&config, &source, &ScriptedRunner::new(), DeployOptions::default()).await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::Cutover);
    assert_eq!(err.rollback, None);
    assert_eq!(
        fs::read_to_string(install_path(&root).join("index.php")).unwrap(),
        "legacy"
    );
}

/// Test: old releases are pruned after a successful deploy.
#[tokio::test]
async fn successful_deploy_prunes_old_releases() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "keep_releases: 2\n");
    let source = FakeSource::new();
    let runner = ScriptedRunner::new();

    let mut last = None;
    for tag in ["v1.0.0", "v1.1.0", "v1.2.0", "v1.3.0"] {
        source.publish("shop", tag);
        last = Some(deployed(
            run_deploy(&config, &source, &runner, DeployOptions::default()).await.0,
        ));
    }

    let report = last.unwrap();
    assert_eq!(report.pruned, vec![v("v1.1.0")]);
    assert!(!release_dir(&root, "v1.0.0").exists());
    assert!(!release_dir(&root, "v1.1.0").exists());
    assert!(release_dir(&root, "v1.2.0").exists());
    assert!(release_dir(&root, "v1.3.0").exists());
}

/// Test: declining the cleanup prompt keeps every release.
#[tokio::test]
async fn declined_cleanup_keeps_releases() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "keep_releases: 0\n");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new();
    let output = Output::new(OutputMode::Quiet);

    let no = FixedAnswer(false);
    for tag in ["v1.0.0", "v1.1.0"] {
        source.publish("shop", tag);
        let orchestrator = Orchestrator::new(&config, source.clone(), &runner, &no);
        let mut diag = Diagnostics::default();
        orchestrator
            .deploy(&DeployOptions::default(), &output, &mut diag)
            .await
            .unwrap();
    }

    assert!(release_dir(&root, "v1.0.0").exists());
    assert!(release_dir(&root, "v1.1.0").exists());
}

/// Test: before_deploy failures abort, after_deploy failures only warn.
#[tokio::test]
async fn hook_failures_follow_their_point() {
    let root = TempDir::new().unwrap();
    let config = config(
        root.path(),
        "hooks:\n  before_deploy:\n    - php artisan down\n  after_deploy:\n    - php artisan view:cache\n",
    );
    let source = FakeSource::publishing("shop", "v1.0.0");

    let soft = ScriptedRunner::new().exit_with("view:cache", 1);
    let (result, diag) = run_deploy(&config, &source, &soft, DeployOptions::default()).await;
    deployed(result);
    assert_eq!(diag.of_kind(WarningKind::Hook).count(), 1);

    source.publish("shop", "v1.1.0");
    let fatal = ScriptedRunner::new().exit_with("artisan down", 1);
    let (result, _) = run_deploy(&config, &source, &fatal, DeployOptions::default()).await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::Hook);
    assert_eq!(err.rollback, None);
    assert_eq!(link_target(&root), release_dir(&root, "v1.0.0"));
    assert!(!fatal.commands().iter().any(|c| c.contains("view:cache")));

    let hook = fatal
        .calls()
        .into_iter()
        .find(|c| c.command == "php artisan down")
        .unwrap();
    assert_eq!(hook.cwd, release_dir(&root, "v1.1.0"));
    assert_eq!(hook.env.get("SLIPWAY_VERSION").map(String::as_str), Some("v1.1.0"));
    assert_eq!(
        hook.env.get("SLIPWAY_PREVIOUS_VERSION").map(String::as_str),
        Some("v1.0.0")
    );
}

/// Test: a failed migration rolls back like a failed health check.
#[tokio::test]
async fn failed_migration_rolls_back() {
    let root = TempDir::new().unwrap();
    let config = config(
        root.path(),
        "migrations:\n  command: php artisan migrate --force\n",
    );
    let source = FakeSource::publishing("shop", "v1.0.0");
    let options = DeployOptions {
        assume_yes: true,
        ..Default::default()
    };

    deployed(run_deploy(&config, &source, &ScriptedRunner::new(), options).await.0);

    source.publish("shop", "v1.1.0");
    let failing = ScriptedRunner::new().exit_with("migrate", 1);
    let (result, _) = run_deploy(&config, &source, &failing, options).await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::Migration);
    assert!(err.rolled_back());
    assert_eq!(link_target(&root), release_dir(&root, "v1.0.0"));
}

/// Test: migrations are skipped unless confirmed.
#[tokio::test]
async fn migrations_need_confirmation() {
    let root = TempDir::new().unwrap();
    let config = config(
        root.path(),
        "migrations:\n  command: php artisan migrate --force\n",
    );
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new();

    deployed(run_deploy(&config, &source, &runner, DeployOptions::default()).await.0);

    assert!(!runner.commands().iter().any(|c| c.contains("migrate")));
}

/// Test: a missing required command stops the deploy before any download.
#[tokio::test]
async fn missing_dependency_aborts_early() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "requires:\n  - composer\n");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new().exit_with("command -v", 1);

    let (result, _) = run_deploy(&config, &source, &runner, DeployOptions::default()).await;

    let err = result.unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::MissingDependency);
    assert_eq!(source.resolve_count(), 0);
}

/// Test: a cancelled deploy stops at the next stage boundary.
#[tokio::test]
async fn cancelled_deploy_stops_before_work() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let orchestrator =
        Orchestrator::new(&config, source.clone(), &runner, &AssumeDefault).with_cancel(cancel);
    let mut diag = Diagnostics::default();
    let result = orchestrator
        .deploy(
            &DeployOptions::default(),
            &Output::new(OutputMode::Quiet),
            &mut diag,
        )
        .await;

    assert_eq!(result.unwrap_err().kind(), DeployErrorKind::Cancelled);
    assert_eq!(source.download_count(), 0);
    assert!(!root.path().join(".slipway.lock").exists());
}

/// Test: a held lock blocks a deploy unless it is broken.
#[tokio::test]
async fn held_lock_blocks_deploy() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new();

    let lock_path = root.path().join(".slipway.lock");
    let held = DeployLock::acquire(&lock_path, &AppName::new("shop").unwrap(), false).unwrap();

    let (result, _) = run_deploy(&config, &source, &runner, DeployOptions::default()).await;
    assert_eq!(result.unwrap_err().kind(), DeployErrorKind::LockHeld);
    assert_eq!(source.resolve_count(), 0);

    let options = DeployOptions {
        break_lock: true,
        ..Default::default()
    };
    deployed(run_deploy(&config, &source, &runner, options).await.0);
    drop(held);
}

/// Test: manual rollback moves the link back one release.
#[tokio::test]
async fn manual_rollback_switches_to_previous_release() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    let source = FakeSource::new();
    let runner = ScriptedRunner::new();

    for tag in ["v1.0.0", "v1.1.0"] {
        source.publish("shop", tag);
        deployed(run_deploy(&config, &source, &runner, DeployOptions::default()).await.0);
    }

    let maintenance = Maintenance::new(&config);
    let outcome = maintenance.rollback(false).unwrap();

    assert_eq!(outcome.from, v("v1.1.0"));
    assert_eq!(outcome.to, v("v1.0.0"));
    assert_eq!(link_target(&root), release_dir(&root, "v1.0.0"));
    assert!(release_dir(&root, "v1.1.0").exists());

    let err = maintenance.rollback(false).unwrap_err();
    assert_eq!(err.kind(), DeployErrorKind::RollbackUnavailable);
}

/// Test: status reports the active release and every release on disk.
#[tokio::test]
async fn status_lists_releases() {
    let root = TempDir::new().unwrap();
    let config = config(root.path(), "");
    let source = FakeSource::publishing("shop", "v1.0.0");
    let runner = ScriptedRunner::new();

    let maintenance = Maintenance::new(&config);
    let empty = maintenance.status().unwrap();
    assert!(empty.active.is_none());
    assert!(empty.releases.is_empty());

    deployed(run_deploy(&config, &source, &runner, DeployOptions::default()).await.0);

    let status = maintenance.status().unwrap();
    assert_eq!(status.active.unwrap().version, v("v1.0.0"));
    assert_eq!(status.installed_version, Some(v("v1.0.0")));
    assert_eq!(status.releases.len(), 1);
    assert!(status.lock.is_none());
}
