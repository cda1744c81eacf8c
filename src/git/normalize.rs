//! Normalization: make the target branch and its history available locally.

use std::path::Path;

use git2::{AutotagOption, BranchType, FetchOptions, Repository};
use log::{info, warn};

use super::{list_remotes, open_repository, remote_callbacks};
use crate::config::Credentials;
use crate::error::PrepareError;

/// Parameters of a single normalization.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeRequest<'a> {
    /// Dot-git directory (or working tree) to normalize.
    pub path: &'a Path,
    pub credentials: &'a Credentials,
    pub no_fetch: bool,
    /// Branch to make available. Empty means "leave branches alone".
    pub target_branch: &'a str,
    pub is_dynamic_repository: bool,
}

/// Brings a repository into a state where the version calculation can read
/// the full history of the target branch.
pub trait DirectoryNormalizer {
    fn normalize(&self, request: &NormalizeRequest<'_>) -> Result<(), PrepareError>;
}

impl<T: DirectoryNormalizer + ?Sized> DirectoryNormalizer for &T {
    fn normalize(&self, request: &NormalizeRequest<'_>) -> Result<(), PrepareError> {
        (**self).normalize(request)
    }
}

/// Normalizer backed by libgit2 fetches.
///
/// Fetches all branches and tags from the canonical remote, creates the
/// target branch locally when only the remote-tracking branch exists, and
/// attaches HEAD to it for dynamic repositories or a detached HEAD. In a
/// dynamic repository the local branch follows the fetched remote branch.
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchNormalizer;

impl DirectoryNormalizer for FetchNormalizer {
    fn normalize(&self, request: &NormalizeRequest<'_>) -> Result<(), PrepareError> {
        let repo = open_repository(request.path)?;
        let remote = fetch_remote_name(&repo)?;

        if request.no_fetch {
            info!("Skipping fetching, if build fails, run without --no-fetch");
        } else {
            match remote.as_deref() {
                Some(name) => fetch_remote(&repo, name, request.credentials)?,
                None => warn!(
                    "No remotes configured in {}, skipping fetch",
                    request.path.display()
                ),
            }
        }

        let branch = request
            .target_branch
            .strip_prefix("refs/heads/")
            .unwrap_or(request.target_branch);
        if branch.is_empty() {
            return Ok(());
        }

        ensure_local_branch(&repo, branch, remote.as_deref(), request.is_dynamic_repository)?;

        if request.is_dynamic_repository || repo.head_detached()? {
            info!("Pointing HEAD at {}", branch);
            repo.set_head(&format!("refs/heads/{}", branch))?;
        }

        Ok(())
    }
}

/// `origin` when present, otherwise the first remote.
fn fetch_remote_name(repo: &Repository) -> Result<Option<String>, PrepareError> {
    let remotes = list_remotes(repo)?;
    let remote = remotes
        .iter()
        .find(|remote| remote.name.eq_ignore_ascii_case("origin"))
        .or_else(|| remotes.first());
    Ok(remote.map(|remote| remote.name.clone()))
}

fn fetch_remote(repo: &Repository, name: &str, credentials: &Credentials) -> Result<(), PrepareError> {
    let mut remote = repo.find_remote(name)?;
    let url = remote.url().unwrap_or(name).to_string();
    let refspec = format!("+refs/heads/*:refs/remotes/{}/*", name);

    info!("Fetching from remote '{}' ({}) with {}", name, url, refspec);

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(remote_callbacks(credentials));
    fetch_options.download_tags(AutotagOption::All);

    remote
        .fetch(&[refspec.as_str()], Some(&mut fetch_options), None)
        .map_err(|e| PrepareError::from_transport(&url, e))
}

/// Make `branch` exist locally. For dynamic repositories an existing local
/// branch is moved to the fetched remote-tracking commit.
fn ensure_local_branch(
    repo: &Repository,
    branch: &str,
    remote: Option<&str>,
    is_dynamic_repository: bool,
) -> Result<(), PrepareError> {
    let tracking_name = remote.map(|remote| format!("{}/{}", remote, branch));
    let tracking_commit = match tracking_name.as_deref() {
        Some(name) => match repo.find_branch(name, BranchType::Remote) {
            Ok(tracking) => Some(tracking.get().peel_to_commit()?),
            Err(_) => None,
        },
        None => None,
    };

    match (repo.find_branch(branch, BranchType::Local), tracking_commit) {
        (Ok(mut local), Some(commit)) if is_dynamic_repository => {
            if local.get().target() != Some(commit.id()) {
                let message = format!("gitprep: move {} to {}", branch, commit.id());
                local.get_mut().set_target(commit.id(), &message)?;
                info!("Moved local branch {} to {}", branch, commit.id());
            }
        }
        (Ok(_), _) => {}
        (Err(_), Some(commit)) => {
            let mut local = repo.branch(branch, &commit, false)?;
            local.set_upstream(tracking_name.as_deref())?;
            info!("Created local branch {} from its remote-tracking branch", branch);
        }
        (Err(_), None) => return Err(PrepareError::BranchNotFound(branch.to_string())),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::clone_repository;
    use crate::git::test_support::{add_commit, init_repo_with_commit};
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        source: Repository,
        clone: std::path::PathBuf,
        _dir: TempDir,
    }

    /// Source repository with `main` and `feature`, cloned without checkout.
    fn cloned_fixture() -> Fixture {
        let dir = tempdir().expect("Failed to create temp directory");
        let source_path = dir.path().join("upstream");
        let (source, head) = init_repo_with_commit(&source_path, "main");
        {
            let commit = source.find_commit(head).unwrap();
            source.branch("feature", &commit, false).unwrap();
        }

        let clone = dir.path().join("proj");
        clone_repository(
            source_path.to_str().unwrap(),
            &clone,
            &Credentials::default(),
        )
        .expect("Clone failed");

        Fixture {
            source,
            clone,
            _dir: dir,
        }
    }

    fn request<'a>(path: &'a Path, credentials: &'a Credentials, branch: &'a str) -> NormalizeRequest<'a> {
        NormalizeRequest {
            path,
            credentials,
            no_fetch: false,
            target_branch: branch,
            is_dynamic_repository: true,
        }
    }

    fn resolve(repo_path: &Path, reference: &str) -> git2::Oid {
        let repo = Repository::open(repo_path).unwrap();
        repo.refname_to_id(reference).unwrap()
    }

    #[test]
    fn creates_local_branch_and_attaches_head() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();
        let dot_git = fixture.clone.join(".git");

        FetchNormalizer
            .normalize(&request(&dot_git, &credentials, "feature"))
            .unwrap();

        let repo = Repository::open(&dot_git).unwrap();
        let head = repo.head().unwrap();
        assert_eq!(head.name(), Some("refs/heads/feature"));

        let local = repo.find_branch("feature", BranchType::Local).unwrap();
        let upstream = local.upstream().unwrap();
        assert_eq!(upstream.name().unwrap(), Some("origin/feature"));
    }

    #[test]
    fn strips_refs_heads_prefix() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();

        FetchNormalizer
            .normalize(&request(&fixture.clone, &credentials, "refs/heads/feature"))
            .unwrap();

        let repo = Repository::open(&fixture.clone).unwrap();
        assert!(repo.find_branch("feature", BranchType::Local).is_ok());
    }

    #[test]
    fn fetch_updates_remote_tracking_branches() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();
        let new_commit = add_commit(&fixture.source, "second");

        FetchNormalizer
            .normalize(&request(&fixture.clone, &credentials, "main"))
            .unwrap();

        assert_eq!(
            resolve(&fixture.clone, "refs/remotes/origin/main"),
            new_commit
        );
    }

    #[test]
    fn no_fetch_leaves_remote_tracking_branches() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();
        let before = resolve(&fixture.clone, "refs/remotes/origin/main");
        add_commit(&fixture.source, "second");

        let mut req = request(&fixture.clone, &credentials, "main");
        req.no_fetch = true;
        FetchNormalizer.normalize(&req).unwrap();

        assert_eq!(resolve(&fixture.clone, "refs/remotes/origin/main"), before);
    }

    #[test]
    fn fetch_downloads_new_branches() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();
        {
            let head = fixture.source.head().unwrap().peel_to_commit().unwrap();
            fixture.source.branch("release", &head, false).unwrap();
        }

        FetchNormalizer
            .normalize(&request(&fixture.clone, &credentials, "release"))
            .unwrap();

        let repo = Repository::open(&fixture.clone).unwrap();
        assert!(repo.find_branch("release", BranchType::Local).is_ok());
    }

    #[test]
    fn dynamic_fetch_moves_local_branch_and_head() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();
        let new_commit = add_commit(&fixture.source, "second");

        FetchNormalizer
            .normalize(&request(&fixture.clone, &credentials, "main"))
            .unwrap();

        assert_eq!(resolve(&fixture.clone, "refs/heads/main"), new_commit);
        assert_eq!(resolve(&fixture.clone, "HEAD"), new_commit);
        assert_eq!(resolve(&fixture.clone, "refs/remotes/origin/main"), new_commit);
    }

    #[test]
    fn local_checkout_branch_is_not_moved() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();
        let before = resolve(&fixture.clone, "refs/heads/main");
        let new_commit = add_commit(&fixture.source, "second");

        let mut req = request(&fixture.clone, &credentials, "main");
        req.is_dynamic_repository = false;
        FetchNormalizer.normalize(&req).unwrap();

        assert_eq!(resolve(&fixture.clone, "refs/remotes/origin/main"), new_commit);
        assert_eq!(resolve(&fixture.clone, "refs/heads/main"), before);
    }

    #[test]
    fn unknown_branch_is_an_error() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();

        let result = FetchNormalizer.normalize(&request(&fixture.clone, &credentials, "nope"));

        match result {
            Err(PrepareError::BranchNotFound(branch)) => assert_eq!(branch, "nope"),
            other => panic!("Expected BranchNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn attached_head_of_local_checkout_is_kept() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();

        let mut req = request(&fixture.clone, &credentials, "feature");
        req.is_dynamic_repository = false;
        FetchNormalizer.normalize(&req).unwrap();

        let repo = Repository::open(&fixture.clone).unwrap();
        assert_eq!(repo.head().unwrap().name(), Some("refs/heads/main"));
        assert!(repo.find_branch("feature", BranchType::Local).is_ok());
    }

    #[test]
    fn detached_head_is_attached() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();
        {
            let repo = Repository::open(&fixture.clone).unwrap();
            let head = repo.refname_to_id("HEAD").unwrap();
            repo.set_head_detached(head).unwrap();
        }

        let mut req = request(&fixture.clone, &credentials, "main");
        req.is_dynamic_repository = false;
        FetchNormalizer.normalize(&req).unwrap();

        let repo = Repository::open(&fixture.clone).unwrap();
        assert!(!repo.head_detached().unwrap());
        assert_eq!(repo.head().unwrap().name(), Some("refs/heads/main"));
    }

    #[test]
    fn repository_without_remotes_skips_fetch() {
        let dir = tempdir().expect("Failed to create temp directory");
        init_repo_with_commit(dir.path(), "main");
        let credentials = Credentials::default();

        let result = FetchNormalizer.normalize(&request(dir.path(), &credentials, "main"));
        assert!(result.is_ok(), "normalize failed: {:?}", result.err());

        let missing = FetchNormalizer.normalize(&request(dir.path(), &credentials, "feature"));
        assert!(matches!(missing, Err(PrepareError::BranchNotFound(_))));
    }

    #[test]
    fn empty_branch_only_fetches() {
        let fixture = cloned_fixture();
        let credentials = Credentials::default();
        let new_commit = add_commit(&fixture.source, "second");

        FetchNormalizer
            .normalize(&request(&fixture.clone, &credentials, ""))
            .unwrap();

        let repo = Repository::open(&fixture.clone).unwrap();
        assert_eq!(repo.head().unwrap().name(), Some("refs/heads/main"));
        assert_eq!(resolve(&fixture.clone, "refs/remotes/origin/main"), new_commit);
    }
}
