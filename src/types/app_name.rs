// ABOUTME: Application name used for the install link and release directory names.
// ABOUTME: Restricted to characters that are safe inside a single path component.

use crate::release::{BACKUPS_DIR, SCRATCH_DIR};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppNameError {
    #[error("app name cannot be empty")]
    Empty,

    #[error("app name exceeds maximum length of 100 characters")]
    TooLong,

    #[error("app name cannot start with '{0}'")]
    InvalidStart(char),

    #[error("invalid character in app name: '{0}'")]
    InvalidChar(char),

    /// The install link would share a path with the scratch or backups dir.
    #[error("app name '{0}' is reserved for slipway's own directories")]
    Reserved(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppName(String);

impl AppName {
    pub fn new(value: &str) -> Result<Self, AppNameError> {
        let first = value.chars().next().ok_or(AppNameError::Empty)?;

        if value.len() > 100 {
            return Err(AppNameError::TooLong);
        }

        // A leading dot would hide the link; a leading hyphen reads as a flag.
        if first == '.' || first == '-' {
            return Err(AppNameError::InvalidStart(first));
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' && c != '.' {
                return Err(AppNameError::InvalidChar(c));
            }
        }

        if value == SCRATCH_DIR || value == BACKUPS_DIR {
            return Err(AppNameError::Reserved(value.to_string()));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
