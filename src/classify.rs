use crate::{
    backend::Backends,
    build_state, oracle,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IssueType {
    NoIssue,
    NeedsRebuild,
    NeedsRelease,
    Unknown,
    /// Types written by other tools; carried through untouched.
    Other(String),
}

impl IssueType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NoIssue => "no_issue",
            Self::NeedsRebuild => "needs_rebuild",
            Self::NeedsRelease => "needs_release",
            Self::Unknown => "unknown",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for IssueType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "no_issue" => Self::NoIssue,
            "needs_rebuild" => Self::NeedsRebuild,
            "needs_release" => Self::NeedsRelease,
            "unknown" => Self::Unknown,
            _ => Self::Other(s),
        }
    }
}

impl From<IssueType> for String {
    fn from(t: IssueType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for IssueType {
    fn default() -> Self {
        Self::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionNeeded {
    None,
    Rebuild,
    Release,
    Investigate,
    Other(String),
}

impl ActionNeeded {
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Rebuild => "rebuild",
            Self::Release => "release",
            Self::Investigate => "investigate",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ActionNeeded {
    fn from(s: String) -> Self {
        match s.as_str() {
            "none" => Self::None,
            "rebuild" => Self::Rebuild,
            "release" => Self::Release,
            "investigate" => Self::Investigate,
            _ => Self::Other(s),
        }
    }
}

impl From<ActionNeeded> for String {
    fn from(a: ActionNeeded) -> Self {
        a.as_str().to_string()
    }
}

impl Default for ActionNeeded {
    fn default() -> Self {
        Self::Investigate
    }
}

/// One package's classification. Field names are the on-disk report format;
/// aliases accept reports written by the earlier tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub package_name: String,
    #[serde(default, alias = "git_version")]
    pub source_version: Option<String>,
    #[serde(default)]
    pub index_version: Option<String>,
    #[serde(default, alias = "built_commit_id")]
    pub built_commit: Option<String>,
    #[serde(default, alias = "current_commit_id")]
    pub head_commit: Option<String>,
    #[serde(default)]
    pub issue_type: IssueType,
    #[serde(default, alias = "issue_description")]
    pub description: String,
    #[serde(default)]
    pub action_needed: ActionNeeded,
}

/// Everything resolved about one package before deciding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFacts {
    pub package_name: String,
    pub source_version: Option<String>,
    pub index_version: Option<String>,
    pub built_commit: Option<String>,
    pub head_commit: Option<String>,
}

/// Decision table. A commit mismatch wins over the artifact check, which is
/// only consulted (with the head commit) once versions differ and commits
/// agree.
pub fn decide<F>(facts: PackageFacts, find_artifact: F) -> IssueRecord
where
    F: FnOnce(&str) -> Option<String>,
{
    let (issue_type, description, action_needed) =
        if facts.source_version == facts.index_version {
            (
                IssueType::NoIssue,
                "Versions match".to_string(),
                ActionNeeded::None,
            )
        } else if facts.built_commit != facts.head_commit {
            (
                IssueType::NeedsRebuild,
                format!(
                    "Commit mismatch: built commit is {}, current commit is {}",
                    display_opt(&facts.built_commit),
                    display_opt(&facts.head_commit)
                ),
                ActionNeeded::Rebuild,
            )
        } else {
            match facts.head_commit.as_deref().and_then(find_artifact) {
                Some(snapshot) => (
                    IssueType::NeedsRelease,
                    format!("Build exists but not released. Snapshot: {snapshot}"),
                    ActionNeeded::Release,
                ),
                None => (
                    IssueType::Unknown,
                    "Version mismatch but no clear action identified".to_string(),
                    ActionNeeded::Investigate,
                ),
            }
        };

    IssueRecord {
        package_name: facts.package_name,
        source_version: facts.source_version,
        index_version: facts.index_version,
        built_commit: facts.built_commit,
        head_commit: facts.head_commit,
        issue_type,
        description,
        action_needed,
    }
}

fn display_opt(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("None")
}

/// Resolves a package's facts from the backends and classifies it.
pub struct Classifier<'a> {
    backends: Backends<'a>,
    requirements_file: String,
}

impl<'a> Classifier<'a> {
    pub fn new(backends: Backends<'a>, requirements_file: &str) -> Self {
        Self {
            backends,
            requirements_file: requirements_file.to_string(),
        }
    }

    pub fn facts(&self, pkg_dir: &Path) -> PackageFacts {
        let package_name = package_name(pkg_dir);
        PackageFacts {
            source_version: oracle::source_version(pkg_dir, &self.requirements_file),
            index_version: oracle::index_version(self.backends.index, &package_name),
            built_commit: build_state::last_built_commit(self.backends.build, &package_name),
            head_commit: build_state::head_commit(self.backends.scm, pkg_dir),
            package_name,
        }
    }

    pub fn classify(&self, pkg_dir: &Path) -> IssueRecord {
        let facts = self.facts(pkg_dir);
        let package = facts.package_name.clone();
        decide(facts, |commit| {
            build_state::find_artifact_for_commit(self.backends.build, &package, commit)
        })
    }
}

pub fn package_name(pkg_dir: &Path) -> String {
    pkg_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| pkg_dir.display().to_string())
}

/// Record for a package whose classification itself blew up.
pub fn failed_record(package_name: String, reason: &str) -> IssueRecord {
    IssueRecord {
        package_name,
        issue_type: IssueType::Unknown,
        description: format!("Classification failed: {reason}"),
        action_needed: ActionNeeded::Investigate,
        ..IssueRecord::default()
    }
}
