//! What the build system last built versus what source control last changed.

use crate::backend::{BuildSystem, SourceControl};
use std::path::Path;
use tracing::warn;

pub fn last_built_commit(build: &dyn BuildSystem, package: &str) -> Option<String> {
    build
        .last_built_commit(package)
        .unwrap_or_else(|err| {
            warn!(package, "component status query failed: {err:#}");
            None
        })
}

pub fn head_commit(scm: &dyn SourceControl, pkg_dir: &Path) -> Option<String> {
    scm.last_commit_touching(pkg_dir).unwrap_or_else(|err| {
        warn!(path = %pkg_dir.display(), "git log failed: {err:#}");
        None
    })
}

/// Snapshot built from `commit` for `package`. Lookup failures read as "no
/// artifact"; remediation resolves artifacts through the backend directly so
/// that failures there abort.
pub fn find_artifact_for_commit(
    build: &dyn BuildSystem,
    package: &str,
    commit: &str,
) -> Option<String> {
    build.find_snapshot(package, commit).unwrap_or_else(|err| {
        warn!(package, commit, "snapshot query failed: {err:#}");
        None
    })
}
