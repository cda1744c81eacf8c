//! Error type for repository preparation.
//!
//! Every variant is fatal: nothing in the preparation pipeline retries. Only
//! `main` turns an error into a process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned while preparing a repository.
#[derive(Error, Debug)]
pub enum PrepareError {
    /// The configuration cannot produce a usable repository.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The remote rejected the credentials (401).
    #[error("not authorized to access {url}: {message}")]
    Authentication { url: String, message: String },
    /// The credentials were accepted but lack access (403).
    #[error("access to {url} is forbidden: {message}")]
    Authorization { url: String, message: String },
    /// The remote repository does not exist (404).
    #[error("repository not found at {url}: {message}")]
    NotFound { url: String, message: String },
    /// Any other transport failure.
    #[error("failed to access repository {url}: {source}")]
    UnknownRepository {
        url: String,
        #[source]
        source: git2::Error,
    },
    /// The requested branch exists neither locally nor on the remote.
    #[error("branch '{0}' was not found locally or on the remote")]
    BranchNotFound(String),
    /// libgit2 reported an error on a local repository.
    #[error("git operation failed: {0}")]
    Git(#[from] git2::Error),
    /// Underlying IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A configuration file could not be read or parsed.
    #[error("invalid config file {}: {message}", .path.display())]
    ConfigFile { path: PathBuf, message: String },
}

impl PrepareError {
    /// Classify a clone or fetch failure by scanning its message for HTTP status
    /// codes. libgit2 does not expose structured status codes, so the message is
    /// the only signal. The order `401`, `403`, `404` matters.
    pub fn from_transport(url: &str, source: git2::Error) -> Self {
        let message = source.message().to_string();
        let url = url.to_string();

        if message.contains("401") {
            PrepareError::Authentication { url, message }
        } else if message.contains("403") {
            PrepareError::Authorization { url, message }
        } else if message.contains("404") {
            PrepareError::NotFound { url, message }
        } else {
            PrepareError::UnknownRepository { url, source }
        }
    }
}
