// ABOUTME: Tests for the validated domain types.
// ABOUTME: Property tests pin down version ordering; examples cover parsing edge cases.

use proptest::prelude::*;
use slipway::types::{AppName, AppNameError, RepoRef, Version, compare_versions, is_version_like};
use std::cmp::Ordering;

fn semver_tag() -> impl Strategy<Value = String> {
    (
        any::<bool>(),
        0u64..50,
        0u64..50,
        0u64..50,
        proptest::option::of("(alpha|beta|rc)\\.[0-9]{1,2}"),
    )
        .prop_map(|(v, major, minor, patch, pre)| {
            let mut tag = format!("{}{major}.{minor}.{patch}", if v { "v" } else { "" });
            if let Some(pre) = pre {
                tag.push('-');
                tag.push_str(&pre);
            }
            tag
        })
}

fn any_tag() -> impl Strategy<Value = String> {
    prop_oneof![semver_tag(), "[a-z0-9][a-z0-9._-]{0,12}"]
}

proptest! {
    #[test]
    fn ordering_is_antisymmetric(a in any_tag(), b in any_tag()) {
        let a = Version::new(&a).unwrap();
        let b = Version::new(&b).unwrap();
        prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
    }

    #[test]
    fn ordering_is_transitive(a in any_tag(), b in any_tag(), c in any_tag()) {
        let mut versions = [
            Version::new(&a).unwrap(),
            Version::new(&b).unwrap(),
            Version::new(&c).unwrap(),
        ];
        versions.sort();
        prop_assert_ne!(compare_versions(&versions[0], &versions[2]), Ordering::Greater);
    }

    #[test]
    fn equal_only_when_tags_match(a in any_tag(), b in any_tag()) {
        let va = Version::new(&a).unwrap();
        let vb = Version::new(&b).unwrap();
        prop_assert_eq!(compare_versions(&va, &vb) == Ordering::Equal, a == b);
    }

    #[test]
    fn numeric_components_compare_as_numbers(major in 0u64..1000, minor in 0u64..1000) {
        let lower = Version::new(&format!("v{major}.{minor}.0")).unwrap();
        let higher = Version::new(&format!("v{major}.{}.0", minor + 1)).unwrap();
        prop_assert!(lower < higher);
    }
}

#[test]
fn double_digit_minor_sorts_after_single_digit() {
    let mut versions: Vec<Version> = ["v1.10.0", "v1.2.0", "v1.9.0"]
        .iter()
        .map(|t| Version::new(t).unwrap())
        .collect();
    versions.sort();

    let tags: Vec<&str> = versions.iter().map(Version::as_str).collect();
    assert_eq!(tags, vec!["v1.2.0", "v1.9.0", "v1.10.0"]);
}

#[test]
fn prerelease_ranks_below_release() {
    let rc = Version::new("v2.0.0-rc.1").unwrap();
    let release = Version::new("v2.0.0").unwrap();
    assert!(rc < release);
    assert!(rc.is_prerelease());
}

#[test]
fn leading_v_is_ignored_for_precedence() {
    let a = Version::new("v1.2").unwrap();
    let b = Version::new("1.2.1").unwrap();
    assert!(a < b);
}

#[test]
fn version_tags_reject_path_characters() {
    assert!(Version::new("").is_err());
    assert!(Version::new("..").is_err());
    assert!(Version::new("v1/../../etc").is_err());
    assert!(Version::new("v1 2").is_err());
}

#[test]
fn version_like_suffixes() {
    assert!(is_version_like("v1.2.3"));
    assert!(is_version_like("1.0"));
    assert!(!is_version_like("admin"));
    assert!(!is_version_like("v"));
}

#[test]
fn repo_ref_parses_owner_and_name() {
    let repo = RepoRef::parse("acme/shop").unwrap();
    assert_eq!(repo.owner(), "acme");
    assert_eq!(repo.name(), "shop");
    assert!(RepoRef::parse("acme").is_err());
    assert!(RepoRef::parse("acme/shop/extra").is_err());
    assert!(RepoRef::parse("/shop").is_err());
}

#[test]
fn app_names_must_be_plain() {
    assert!(AppName::new("shop").is_ok());
    assert!(AppName::new("").is_err());
    assert!(AppName::new("../shop").is_err());
}

#[test]
fn app_names_reserved_for_store_directories_are_rejected() {
    assert_eq!(
        AppName::new("temp"),
        Err(AppNameError::Reserved("temp".to_string()))
    );
    assert_eq!(
        AppName::new("backups"),
        Err(AppNameError::Reserved("backups".to_string()))
    );
    assert!(AppName::new("temp-api").is_ok());
}
