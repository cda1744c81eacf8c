//! Preparation inputs and outputs.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PrepareError;

/// Everything a single preparation run reads. Built once, never mutated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreparationConfig {
    /// Directory the tool was pointed at. Used to discover the repository
    /// when the dot-git directory is not given explicitly.
    pub target_path: PathBuf,
    /// Dot-git directory of a local working copy.
    pub dot_git_directory: Option<PathBuf>,
    /// Working tree root of a local working copy.
    pub project_root_directory: Option<PathBuf>,
    /// Remote URL to clone into a dynamic repository.
    pub target_url: Option<String>,
    /// Branch to normalize, unless a build server reports one.
    pub target_branch: String,
    /// Base directory for dynamic clones. Defaults to the temp directory.
    pub dynamic_repository_clone_path: Option<PathBuf>,
    pub authentication: Credentials,
    pub no_normalize: bool,
    pub no_fetch: bool,
    /// The local directory is itself a previous dynamic clone.
    pub is_dynamic_git_repository: bool,
}

impl PreparationConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, PrepareError> {
        let contents = std::fs::read_to_string(path).map_err(|e| PrepareError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| PrepareError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Optional username/password pair for remote access.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Returns the username and password only when both are non-empty.
    /// Anything else means anonymous access.
    pub fn usable(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Directories handed to the version calculation once preparation succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparationResult {
    pub dot_git_directory: PathBuf,
    pub project_root_directory: PathBuf,
}
