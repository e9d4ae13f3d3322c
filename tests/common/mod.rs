#![allow(dead_code)]

use anyhow::{anyhow, Result};
use drift_check::backend::{
    BuildSystem, CheckConclusion, CheckRun, CheckRuns, CheckStatus, IndexListing, PackageIndex,
    SourceControl,
};
use drift_check::poll::Clock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct FakeClock {
    now: Mutex<Instant>,
    pub sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn slept(&self) -> Duration {
        self.sleeps.lock().unwrap().iter().sum()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, d: Duration) {
        *self.now.lock().unwrap() += d;
        self.sleeps.lock().unwrap().push(d);
    }
}

#[derive(Default)]
pub struct FakeScm {
    /// Keyed by the last path component (the package name).
    pub heads: HashMap<String, String>,
    pub fail_push: bool,
    pub fail_commit: bool,
    pub staged: Mutex<Vec<PathBuf>>,
    pub commits: Mutex<Vec<String>>,
    pub committed_paths: Mutex<Vec<Vec<PathBuf>>>,
    pub pushes: Mutex<usize>,
}

impl SourceControl for FakeScm {
    fn last_commit_touching(&self, path: &Path) -> Result<Option<String>> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        Ok(self.heads.get(&name).cloned())
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        self.staged.lock().unwrap().extend_from_slice(paths);
        Ok(())
    }

    fn commit(&self, message: &str, paths: &[PathBuf], _signoff: bool) -> Result<()> {
        if self.fail_commit {
            return Err(anyhow!("pre-commit hook failed"));
        }
        self.commits.lock().unwrap().push(message.to_string());
        self.committed_paths.lock().unwrap().push(paths.to_vec());
        Ok(())
    }

    fn head_id(&self) -> Result<String> {
        Ok("c0ffee".to_string())
    }

    fn push(&self) -> Result<()> {
        if self.fail_push {
            return Err(anyhow!("remote rejected"));
        }
        *self.pushes.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeIndex {
    pub pages: HashMap<String, IndexListing>,
    pub failing: HashSet<String>,
}

impl FakeIndex {
    pub fn with_versions(mut self, package: &str, versions: &[&str]) -> Self {
        let links: String = versions
            .iter()
            .map(|v| format!("<a href=\"{package}-{v}.tar.gz\">{package}-{v}.tar.gz</a>\n"))
            .collect();
        self.pages.insert(
            package.to_string(),
            IndexListing::Found(format!("<html><body>{links}</body></html>")),
        );
        self
    }
}

impl PackageIndex for FakeIndex {
    fn listing(&self, package: &str) -> Result<IndexListing> {
        if self.failing.contains(package) {
            return Err(anyhow!("connection reset"));
        }
        Ok(self
            .pages
            .get(package)
            .cloned()
            .unwrap_or(IndexListing::NotFound))
    }
}

#[derive(Default)]
pub struct FakeBuild {
    pub built: HashMap<String, String>,
    /// `(component, commit)` -> snapshot name.
    pub snapshots: HashMap<(String, String), String>,
    pub failing_snapshot_lookups: HashSet<String>,
    pub failing_creates: HashSet<String>,
    /// Reason sequence per component; the last entry repeats.
    pub release_reasons: HashMap<String, Vec<Option<String>>>,
    pub created: Mutex<Vec<(String, String, String)>>,
    polls: Mutex<HashMap<String, usize>>,
}

impl FakeBuild {
    pub fn with_snapshot(mut self, component: &str, commit: &str, snapshot: &str) -> Self {
        self.snapshots
            .insert((component.to_string(), commit.to_string()), snapshot.to_string());
        self
    }

    pub fn with_reasons(mut self, component: &str, reasons: &[Option<&str>]) -> Self {
        self.release_reasons.insert(
            component.to_string(),
            reasons.iter().map(|r| r.map(str::to_string)).collect(),
        );
        self
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl BuildSystem for FakeBuild {
    fn last_built_commit(&self, component: &str) -> Result<Option<String>> {
        Ok(self.built.get(component).cloned())
    }

    fn find_snapshot(&self, component: &str, commit: &str) -> Result<Option<String>> {
        if self.failing_snapshot_lookups.contains(component) {
            return Err(anyhow!("forbidden"));
        }
        Ok(self
            .snapshots
            .get(&(component.to_string(), commit.to_string()))
            .cloned())
    }

    fn create_release(&self, component: &str, snapshot: &str) -> Result<String> {
        if self.failing_creates.contains(component) {
            return Err(anyhow!("admission webhook denied the request"));
        }
        let name = format!("{component}-rel");
        self.created
            .lock()
            .unwrap()
            .push((component.to_string(), snapshot.to_string(), name.clone()));
        Ok(name)
    }

    fn release_reason(&self, release: &str) -> Result<Option<String>> {
        let component = release.trim_end_matches("-rel");
        let Some(script) = self.release_reasons.get(component) else {
            return Ok(None);
        };
        let mut polls = self.polls.lock().unwrap();
        let n = polls.entry(release.to_string()).or_insert(0);
        let reason = script
            .get(*n)
            .or_else(|| script.last())
            .cloned()
            .flatten();
        *n += 1;
        Ok(reason)
    }
}

/// Replays a scripted list of check readings; the last one repeats.
pub struct FakeChecks {
    script: Mutex<VecDeque<Result<Vec<CheckRun>, String>>>,
    last: Mutex<Vec<CheckRun>>,
    pub calls: Mutex<usize>,
}

impl FakeChecks {
    pub fn new(script: Vec<Result<Vec<CheckRun>, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Vec::new()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl CheckRuns for FakeChecks {
    fn list(&self, _sha: &str) -> Result<Vec<CheckRun>> {
        *self.calls.lock().unwrap() += 1;
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(runs)) => {
                *self.last.lock().unwrap() = runs.clone();
                Ok(runs)
            }
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}

pub fn check(name: &str, status: CheckStatus, conclusion: Option<CheckConclusion>) -> CheckRun {
    CheckRun {
        name: name.to_string(),
        status,
        conclusion,
    }
}

pub fn running(name: &str) -> CheckRun {
    check(name, CheckStatus::InProgress, None)
}

pub fn passed(name: &str) -> CheckRun {
    check(name, CheckStatus::Completed, Some(CheckConclusion::Success))
}

pub fn failed(name: &str) -> CheckRun {
    check(name, CheckStatus::Completed, Some(CheckConclusion::Failure))
}

/// Creates `packages/<name>/` with a requirements file and argfile.
pub fn write_package(packages_dir: &Path, name: &str, pinned: Option<&str>) -> PathBuf {
    let dir = packages_dir.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    if let Some(version) = pinned {
        std::fs::write(
            dir.join("requirements.txt"),
            format!("{name}=={version} \\\n    --hash=sha256:abc\n"),
        )
        .unwrap();
    }
    std::fs::write(
        dir.join("argfile.conf"),
        format!("PACKAGE_NAME={}\n", name.replace('-', "_")),
    )
    .unwrap();
    dir
}
