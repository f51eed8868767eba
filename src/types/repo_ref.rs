// ABOUTME: Validated `owner/repo` reference for the release registry.
// ABOUTME: Rejects anything that would not form a clean API path segment.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoRefError {
    #[error("repository reference must have the form owner/repo, got '{0}'")]
    Format(String),

    #[error("invalid character in repository reference: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    owner: String,
    name: String,
}

impl RepoRef {
    pub fn parse(value: &str) -> Result<Self, RepoRefError> {
        let (owner, name) = value
            .split_once('/')
            .ok_or_else(|| RepoRefError::Format(value.to_string()))?;

        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(RepoRefError::Format(value.to_string()));
        }

        for c in owner.chars().chain(name.chars()) {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(RepoRefError::InvalidChar(c));
            }
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for RepoRef {
    type Err = RepoRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoRef::parse(s)
    }
}
