//! Local path planning for dynamic repositories.
//!
//! A remote URL maps to `{base}/{name}` where `name` is the last URL segment
//! without `.git`. When that directory is taken by a clone of some other
//! remote, `{name}_1`, `{name}_2`, ... are probed until a free directory or a
//! clone of the same URL is found:
//!
//! ```text
//! {base}/
//! ├── proj/        # clone of https://a/org/proj.git
//! └── proj_1/      # clone of https://b/other/proj.git
//! ```

use std::path::{Path, PathBuf};

use log::{debug, info};

use super::{list_remotes, open_repository};

const FALLBACK_NAME: &str = "repository";

/// Derive the local directory name for a remote URL.
///
/// Splits on `/` and `\` so both URLs and local paths work, then strips a
/// trailing `.git`.
pub fn repository_name_from_url(url: &str) -> String {
    let is_separator = |c: char| c == '/' || c == '\\' || c == std::path::MAIN_SEPARATOR;

    let trimmed = url.trim_end_matches(is_separator);
    let last = trimmed.rsplit(is_separator).next().unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Choose where a dynamic repository for `target_url` lives.
///
/// The base directory is `preferred_base_dir`, or the system temp directory.
/// An existing directory is reused only if one of its remotes has exactly
/// `target_url` as URL.
pub fn plan_clone_path(target_url: &str, preferred_base_dir: Option<&Path>) -> PathBuf {
    let name = repository_name_from_url(target_url);
    let base = preferred_base_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);

    let candidate = base.join(&name);
    if !candidate.exists() || has_remote_with_url(&candidate, target_url) {
        return candidate;
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = base.join(format!("{}_{}", name, suffix));
        if !candidate.exists() || has_remote_with_url(&candidate, target_url) {
            info!(
                "{} is used by another repository, using {} instead",
                base.join(&name).display(),
                candidate.display()
            );
            return candidate;
        }
        suffix += 1;
    }
}

/// Any failure to read the candidate counts as "no match".
fn has_remote_with_url(path: &Path, url: &str) -> bool {
    match open_repository(path).and_then(|repo| list_remotes(&repo)) {
        Ok(remotes) => remotes.iter().any(|remote| remote.url == url),
        Err(e) => {
            debug!("Could not inspect {}: {}", path.display(), e);
            false
        }
    }
}
