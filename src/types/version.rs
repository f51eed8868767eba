// ABOUTME: Release version tags and their precedence ordering.
// ABOUTME: Orders tags by semantic version with a lexical tie-break so the order is total.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version tag cannot be empty")]
    Empty,

    #[error("version tag cannot be '.' or '..'")]
    Reserved,

    #[error("invalid character in version tag: {0:?}")]
    InvalidChar(char),
}

/// A release version as published by the registry (e.g. `v1.10.0`).
///
/// The raw tag is kept verbatim because it names the release directory and the
/// version marker. Ordering goes through [`compare_versions`].
#[derive(Debug, Clone)]
pub struct Version {
    tag: String,
    semantic: Option<semver::Version>,
}

impl Version {
    /// Validate a tag. Tags end up in directory names, so path separators,
    /// whitespace and control characters are rejected.
    pub fn new(tag: &str) -> Result<Self, VersionError> {
        if tag.is_empty() {
            return Err(VersionError::Empty);
        }
        if tag == "." || tag == ".." {
            return Err(VersionError::Reserved);
        }
        if let Some(c) = tag
            .chars()
            .find(|c| *c == '/' || *c == '\\' || c.is_whitespace() || c.is_control())
        {
            return Err(VersionError::InvalidChar(c));
        }

        Ok(Self {
            tag: tag.to_string(),
            semantic: parse_semantic(tag),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.tag
    }

    /// The parsed semantic version, if the tag has one.
    pub fn semantic(&self) -> Option<&semver::Version> {
        self.semantic.as_ref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.semantic.as_ref().is_some_and(|v| !v.pre.is_empty())
    }
}

/// Compare two versions by release precedence.
///
/// Rules, in order:
/// 1. A leading `v`/`V` is ignored and missing minor/patch components count as
///    zero, so `v1.2` ranks with `1.2.0`.
/// 2. Tags with a semantic version compare by major, minor, patch, then
///    pre-release. A pre-release ranks below its release
///    (`1.0.0-rc.1 < 1.0.0`) and pre-release identifiers follow SemVer
///    (numeric below alphanumeric, numerics compared as numbers).
/// 3. Build metadata (`+build.5`) carries no precedence.
/// 4. Tags without a semantic version rank below every semantic one.
/// 5. Remaining ties fall back to the raw tag, so two versions compare
///    `Equal` only when their tags are identical.
pub fn compare_versions(a: &Version, b: &Version) -> Ordering {
    let precedence = match (&a.semantic, &b.semantic) {
        (Some(x), Some(y)) => (x.major, x.minor, x.patch)
            .cmp(&(y.major, y.minor, y.patch))
            .then_with(|| x.pre.cmp(&y.pre)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    };

    precedence.then_with(|| a.tag.cmp(&b.tag))
}

/// Whether a directory suffix looks like a version tag (`1.2.3`, `v1.2.3`).
pub fn is_version_like(s: &str) -> bool {
    let digits = s.strip_prefix(['v', 'V']).unwrap_or(s);
    digits.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn parse_semantic(tag: &str) -> Option<semver::Version> {
    let s = tag.strip_prefix(['v', 'V']).unwrap_or(tag);

    let (rest, build) = match s.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (s, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }

    let mut version = semver::Version::new(numbers[0], numbers[1], numbers[2]);
    if let Some(pre) = pre {
        version.pre = semver::Prerelease::new(pre).ok()?;
    }
    if let Some(build) = build {
        version.build = semver::BuildMetadata::new(build).ok()?;
    }
    Some(version)
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tag.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(self, other)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)
    }
}

impl std::str::FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::new(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.tag.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Version::new(&tag).map_err(serde::de::Error::custom)
    }
}
