//! Build server hints and target branch resolution.

use log::info;

/// Capabilities of a detected build server.
pub trait BuildServer {
    /// Human readable name, used in log output.
    fn name(&self) -> &str;

    /// Branch the build server is building, if it knows one.
    fn current_branch(&self, is_dynamic_repository: bool) -> Option<String>;

    /// Whether redundant remotes should be dropped before normalizing.
    fn should_cleanup_remotes(&self) -> bool;
}

/// The build server the process runs under, if any.
pub enum BuildContext {
    Absent,
    Present(Box<dyn BuildServer>),
}

impl BuildContext {
    pub fn is_present(&self) -> bool {
        matches!(self, BuildContext::Present(_))
    }

    /// Cleanup policy of the build server. Always false without one.
    pub fn should_cleanup_remotes(&self) -> bool {
        match self {
            BuildContext::Absent => false,
            BuildContext::Present(server) => server.should_cleanup_remotes(),
        }
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildContext::Absent => write!(f, "Absent"),
            BuildContext::Present(server) => write!(f, "Present({})", server.name()),
        }
    }
}

/// Build server whose answers are fixed up front, e.g. from command line flags.
#[derive(Debug, Clone, Default)]
pub struct FixedBuildServer {
    pub branch: Option<String>,
    pub cleanup_remotes: bool,
}

impl BuildServer for FixedBuildServer {
    fn name(&self) -> &str {
        "fixed"
    }

    fn current_branch(&self, _is_dynamic_repository: bool) -> Option<String> {
        self.branch.clone()
    }

    fn should_cleanup_remotes(&self) -> bool {
        self.cleanup_remotes
    }
}

/// Pick the branch to prepare: the build server's branch when it reports one,
/// otherwise the explicitly configured branch (which may be empty).
pub fn resolve_branch(
    build_context: &BuildContext,
    explicit_branch: &str,
    is_dynamic_repository: bool,
) -> String {
    let branch = match build_context {
        BuildContext::Absent => explicit_branch.to_string(),
        BuildContext::Present(server) => server
            .current_branch(is_dynamic_repository)
            .unwrap_or_else(|| explicit_branch.to_string()),
    };

    info!("Branch from build environment: {}", branch);
    branch
}
