// ABOUTME: Integration tests for hooks system.
// ABOUTME: Runs real shell hooks and checks ordering, fatality and environment passing.

use slipway::hooks::{HookContext, HookPoint, HookRunner};
use slipway::runner::ShellRunner;
use slipway::types::{AppName, Version};
use std::fs;
use tempfile::TempDir;

fn test_context(release_dir: &TempDir) -> HookContext {
    HookContext {
        app: AppName::new("shop").unwrap(),
        version: Version::new("v1.0.0").unwrap(),
        previous_version: Some(Version::new("v0.9.0").unwrap()),
        release_dir: release_dir.path().to_path_buf(),
        install_path: "/srv/shop".into(),
    }
}

fn commands(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

/// Test: hooks run in order from the release directory.
#[tokio::test]
async fn hooks_run_in_order_from_release_dir() {
    let dir = TempDir::new().unwrap();
    let runner = HookRunner::new(&ShellRunner);

    let results = runner
        .run(
            HookPoint::BeforeDeploy,
            &commands(&["echo first >> order.log", "echo second >> order.log"]),
            &test_context(&dir),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(
        fs::read_to_string(dir.path().join("order.log")).unwrap(),
        "first\nsecond\n"
    );
}

/// Test: hook receives deploy details as environment variables.
#[tokio::test]
async fn hook_receives_environment_variables() {
    let dir = TempDir::new().unwrap();
    let runner = HookRunner::new(&ShellRunner);

    let results = runner
        .run(
            HookPoint::AfterSuccess,
            &commands(&[
                "echo \"$SLIPWAY_APP $SLIPWAY_VERSION $SLIPWAY_PREVIOUS_VERSION $SLIPWAY_INSTALL_PATH\"",
            ]),
            &test_context(&dir),
        )
        .await
        .unwrap();

    assert_eq!(results[0].stdout.trim(), "shop v1.0.0 v0.9.0 /srv/shop");
}

/// Test: a failing before_deploy hook stops the list and returns an error.
#[tokio::test]
async fn failing_before_deploy_hook_is_fatal() {
    let dir = TempDir::new().unwrap();
    let runner = HookRunner::new(&ShellRunner);

    let err = runner
        .run(
            HookPoint::BeforeDeploy,
            &commands(&["echo 'blocked' >&2; exit 3", "touch should-not-exist"]),
            &test_context(&dir),
        )
        .await
        .unwrap_err();

    assert_eq!(err.exit_code, Some(3));
    assert_eq!(err.point, "before_deploy");
    assert!(err.stderr.contains("blocked"));
    assert!(!dir.path().join("should-not-exist").exists());
}

/// Test: a failing after_deploy hook does not stop the remaining hooks.
#[tokio::test]
async fn failing_after_deploy_hook_continues() {
    let dir = TempDir::new().unwrap();
    let runner = HookRunner::new(&ShellRunner);

    let results = runner
        .run(
            HookPoint::AfterDeploy,
            &commands(&["exit 1", "touch ran-anyway"]),
            &test_context(&dir),
        )
        .await
        .unwrap();

    assert!(!results[0].success);
    assert!(results[1].success);
    assert!(dir.path().join("ran-anyway").exists());
}

/// Test: an empty hook list is a no-op.
#[tokio::test]
async fn empty_hook_list_is_noop() {
    let dir = TempDir::new().unwrap();
    let runner = HookRunner::new(&ShellRunner);

    let results = runner
        .run(HookPoint::AfterSuccess, &[], &test_context(&dir))
        .await
        .unwrap();

    assert!(results.is_empty());
}
