pub mod gh;
pub mod git;
pub mod index;
pub mod oc;
pub mod process;
pub mod types;

use anyhow::Result;
use std::path::{Path, PathBuf};

pub use types::{CheckConclusion, CheckRun, CheckStatus, IndexListing, ReleaseState};

pub trait SourceControl: Send + Sync {
    /// Latest first-parent commit touching `path`, `None` when there is none.
    fn last_commit_touching(&self, path: &Path) -> Result<Option<String>>;
    fn stage(&self, paths: &[PathBuf]) -> Result<()>;
    /// Commits exactly `paths`, leaving anything else staged untouched.
    fn commit(&self, message: &str, paths: &[PathBuf], signoff: bool) -> Result<()>;
    fn head_id(&self) -> Result<String>;
    fn push(&self) -> Result<()>;
}

pub trait PackageIndex: Send + Sync {
    fn listing(&self, package: &str) -> Result<IndexListing>;
}

pub trait BuildSystem: Send + Sync {
    fn last_built_commit(&self, component: &str) -> Result<Option<String>>;
    /// First push-triggered snapshot for `component` built from `commit`.
    fn find_snapshot(&self, component: &str, commit: &str) -> Result<Option<String>>;
    /// Creates a release of `snapshot` and returns the generated release name.
    fn create_release(&self, component: &str, snapshot: &str) -> Result<String>;
    /// Reason of the release's `Released` condition, if any has been set.
    fn release_reason(&self, release: &str) -> Result<Option<String>>;
}

pub trait CheckRuns: Send + Sync {
    fn list(&self, sha: &str) -> Result<Vec<CheckRun>>;
}

/// Borrowed bundle of every external collaborator the core talks to.
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub scm: &'a dyn SourceControl,
    pub index: &'a dyn PackageIndex,
    pub build: &'a dyn BuildSystem,
    pub checks: &'a dyn CheckRuns,
}
