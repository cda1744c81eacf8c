//! Preparation pipeline.
//!
//! A run resolves the target branch, then either materializes a dynamic
//! repository from a remote URL or tidies the local working copy, normalizes
//! it, and checks that both output directories are known.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::build_context::{BuildContext, resolve_branch};
use crate::config::{PreparationConfig, PreparationResult};
use crate::error::PrepareError;
use crate::git::{
    DirectoryNormalizer, NormalizeRequest, cleanup_remotes, clone_repository,
    discover_repository, open_repository, plan_clone_path,
};

/// Prepares the repository described by a `PreparationConfig`.
pub struct GitPreparer<N> {
    config: PreparationConfig,
    build_context: BuildContext,
    normalizer: N,
}

impl<N: DirectoryNormalizer> GitPreparer<N> {
    pub fn new(config: PreparationConfig, build_context: BuildContext, normalizer: N) -> Self {
        Self {
            config,
            build_context,
            normalizer,
        }
    }

    /// Run the pipeline once. Nothing is retried.
    pub fn prepare(&self) -> Result<PreparationResult, PrepareError> {
        let config = &self.config;
        let target_url = config.target_url.as_deref().filter(|url| !url.is_empty());
        let is_dynamic = target_url.is_some() || config.is_dynamic_git_repository;

        let branch = resolve_branch(&self.build_context, &config.target_branch, is_dynamic);

        let (dot_git, project_root) = match target_url {
            Some(url) => {
                let (dot_git, project_root) = self.prepare_dynamic(config, url, &branch)?;
                (Some(dot_git), Some(project_root))
            }
            None => self.prepare_local(config, &branch)?,
        };

        validate(config, dot_git, project_root)
    }

    fn prepare_dynamic(
        &self,
        config: &PreparationConfig,
        url: &str,
        branch: &str,
    ) -> Result<(PathBuf, PathBuf), PrepareError> {
        if branch.is_empty() {
            return Err(PrepareError::Configuration(
                "dynamic repositories must have a target branch".to_string(),
            ));
        }

        let path = plan_clone_path(url, config.dynamic_repository_clone_path.as_deref());
        info!("Using dynamic repository at {}", path.display());

        if path.exists() {
            info!("Reusing existing clone at {}", path.display());
        } else {
            clone_repository(url, &path, &config.authentication)?;
        }

        // A reused clone may be bare or use a gitfile.
        let (dot_git, project_root) = {
            let repo = open_repository(&path)?;
            let project_root = repo.workdir().map(normalize_path).unwrap_or_else(|| path.clone());
            (normalize_path(repo.path()), project_root)
        };

        self.normalizer.normalize(&NormalizeRequest {
            path: &dot_git,
            credentials: &config.authentication,
            no_fetch: config.no_fetch,
            target_branch: branch,
            is_dynamic_repository: true,
        })?;

        Ok((dot_git, project_root))
    }

    fn prepare_local(
        &self,
        config: &PreparationConfig,
        branch: &str,
    ) -> Result<(Option<PathBuf>, Option<PathBuf>), PrepareError> {
        let (dot_git, project_root) = local_directories(config);

        if config.no_normalize {
            info!("Skipping normalization");
            return Ok((dot_git, project_root));
        }

        let Some(dot_git_dir) = dot_git.as_deref() else {
            return Ok((dot_git, project_root));
        };

        if self.build_context.should_cleanup_remotes() {
            let repo = open_repository(dot_git_dir)?;
            cleanup_remotes(&repo)?;
        }

        self.normalizer.normalize(&NormalizeRequest {
            path: dot_git_dir,
            credentials: &config.authentication,
            no_fetch: config.no_fetch,
            target_branch: branch,
            is_dynamic_repository: config.is_dynamic_git_repository,
        })?;

        Ok((dot_git, project_root))
    }
}

fn non_empty(path: &Path) -> bool {
    !path.as_os_str().is_empty()
}

/// Configured local directories, with blanks filled in by discovering the
/// repository that contains the target path.
fn local_directories(config: &PreparationConfig) -> (Option<PathBuf>, Option<PathBuf>) {
    let mut dot_git = config.dot_git_directory.clone().filter(|path| non_empty(path));
    let mut project_root = config.project_root_directory.clone().filter(|path| non_empty(path));

    if dot_git.is_some() && project_root.is_some() {
        return (dot_git, project_root);
    }

    match discover_repository(&config.target_path) {
        Ok(repo) => {
            if dot_git.is_none() {
                dot_git = Some(normalize_path(repo.path()));
            }
            if project_root.is_none() {
                project_root = repo.workdir().map(normalize_path);
            }
        }
        Err(e) => debug!(
            "No repository found from {}: {}",
            config.target_path.display(),
            e
        ),
    }

    (dot_git, project_root)
}

/// libgit2 reports directories with a trailing separator.
fn normalize_path(path: &Path) -> PathBuf {
    path.components().collect()
}

fn validate(
    config: &PreparationConfig,
    dot_git: Option<PathBuf>,
    project_root: Option<PathBuf>,
) -> Result<PreparationResult, PrepareError> {
    match (dot_git.filter(|path| non_empty(path)), project_root.filter(|path| non_empty(path))) {
        (Some(dot_git_directory), Some(project_root_directory)) => Ok(PreparationResult {
            dot_git_directory,
            project_root_directory,
        }),
        _ => Err(PrepareError::Configuration(format!(
            "cannot find the .git directory for {}",
            config.target_path.display()
        ))),
    }
}
