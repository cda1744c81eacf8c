//! Repository preparation for build-time version calculation.
//!
//! Turns a local working copy or a remote URL into a fetched, normalized git
//! directory and project root that history can be read from.

pub mod build_context;
pub mod config;
pub mod error;
pub mod git;
pub mod prepare;

pub use build_context::{BuildContext, BuildServer, FixedBuildServer, resolve_branch};
pub use config::{Credentials, PreparationConfig, PreparationResult};
pub use error::PrepareError;
pub use git::{DirectoryNormalizer, FetchNormalizer, NormalizeRequest};
pub use prepare::GitPreparer;
