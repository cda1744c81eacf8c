use git2::Repository;
use log::info;

use crate::error::PrepareError;

const CANONICAL_REMOTE: &str = "origin";

/// A remote as configured in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    pub name: String,
    pub url: String,
}

/// List the remotes of a repository in enumeration order.
///
/// Remotes whose name or URL is not valid UTF-8 are skipped.
pub fn list_remotes(repo: &Repository) -> Result<Vec<RemoteDescriptor>, PrepareError> {
    let names = repo.remotes()?;
    let mut remotes = Vec::with_capacity(names.len());

    for name in names.iter().flatten() {
        let remote = repo.find_remote(name)?;
        if let Some(url) = remote.url() {
            remotes.push(RemoteDescriptor {
                name: name.to_string(),
                url: url.to_string(),
            });
        }
    }

    Ok(remotes)
}

/// Reduce the remotes of a repository to a single canonical one.
///
/// `origin` is kept when present (compared case-insensitively), otherwise the
/// first remote. Every other remote is deleted.
pub fn cleanup_remotes(repo: &Repository) -> Result<(), PrepareError> {
    let names: Vec<String> = repo
        .remotes()?
        .iter()
        .flatten()
        .map(str::to_string)
        .collect();

    if names.len() <= 1 {
        return Ok(());
    }

    let canonical = names
        .iter()
        .find(|name| name.eq_ignore_ascii_case(CANONICAL_REMOTE))
        .unwrap_or(&names[0])
        .clone();

    for name in names
        .iter()
        .filter(|name| !name.eq_ignore_ascii_case(&canonical))
    {
        info!("Removing remote {} (keeping {})", name, canonical);
        repo.remote_delete(name)?;
    }

    Ok(())
}
