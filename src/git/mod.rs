//! Git operations backing repository preparation.
//!
//! All repository access goes through libgit2. Every `Repository` handle is a
//! local value, so its file descriptors are released when it goes out of scope,
//! including on early returns.

mod clone;
mod normalize;
mod paths;
mod remotes;

pub use clone::{clone_repository, remote_callbacks};
pub use normalize::{DirectoryNormalizer, FetchNormalizer, NormalizeRequest};
pub use paths::{plan_clone_path, repository_name_from_url};
pub use remotes::{RemoteDescriptor, cleanup_remotes, list_remotes};

use std::path::Path;

use git2::Repository;

use crate::error::PrepareError;

/// Open an existing repository. Accepts a working tree or a dot-git directory.
pub fn open_repository(path: &Path) -> Result<Repository, PrepareError> {
    let repo = Repository::open(path)?;
    Ok(repo)
}

/// Find the repository containing `path`, walking up parent directories.
pub fn discover_repository(path: &Path) -> Result<Repository, PrepareError> {
    let repo = Repository::discover(path)?;
    Ok(repo)
}
