// ABOUTME: DNS-compatible project name validation.
// ABOUTME: Ensures project names follow RFC 1123 label requirements.

use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectNameError {
    #[error("project name cannot be empty")]
    Empty,

    #[error("project name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("project name cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("project name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("project name must be lowercase")]
    NotLowercase,

    #[error("invalid character in project name: '{0}'")]
    InvalidChar(char),
}

/// A validated project name, usable as a Kubernetes object name and as the
/// default image repository name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(value: &str) -> Result<Self, ProjectNameError> {
        if value.is_empty() {
            return Err(ProjectNameError::Empty);
        }

        if value.len() > 63 {
            return Err(ProjectNameError::TooLong);
        }

        if value.starts_with('-') {
            return Err(ProjectNameError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(ProjectNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(ProjectNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(ProjectNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    /// Derive a project name from a directory name, normalizing characters
    /// that are common in directory names but invalid in object names.
    pub fn from_directory(dir: &str) -> Result<Self, ProjectNameError> {
        let normalized: String = dir
            .chars()
            .map(|c| match c {
                '_' | '.' | ' ' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        Self::new(normalized.trim_matches('-'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ProjectName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
