//! Mark packages dirty, push one commit for the batch, then wait on CI.

use crate::{
    backend::{CheckRun, CheckRuns, SourceControl},
    config::Config,
    error::DriftError,
    marker::{self, Marked},
    poll::{Cadence, Clock},
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildState {
    Marking,
    Committing,
    AwaitingChecksAppear,
    AwaitingChecksComplete,
    Succeeded,
    Failed,
}

impl RebuildState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct RebuildOutcome {
    pub commit: String,
    pub state: RebuildState,
    /// Last observed reading of the commit's check runs.
    pub checks: Vec<CheckRun>,
    pub reason: Option<String>,
}

impl RebuildOutcome {
    pub fn succeeded(&self) -> bool {
        self.state == RebuildState::Succeeded
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckRun> {
        self.checks.iter().filter(|c| !c.succeeded())
    }
}

pub struct RebuildWorkflow<'a> {
    scm: &'a dyn SourceControl,
    checks: &'a dyn CheckRuns,
    clock: &'a dyn Clock,
    packages_dir: PathBuf,
    argfile_name: String,
    signoff: bool,
    appear: Cadence,
    complete: Cadence,
}

impl<'a> RebuildWorkflow<'a> {
    pub fn new(
        cfg: &Config,
        packages_dir: &Path,
        scm: &'a dyn SourceControl,
        checks: &'a dyn CheckRuns,
        clock: &'a dyn Clock,
    ) -> Self {
        let interval = Duration::from_secs(cfg.polling.interval_seconds);
        Self {
            scm,
            checks,
            clock,
            packages_dir: packages_dir.to_path_buf(),
            argfile_name: cfg.paths.argfile_name.clone(),
            signoff: cfg.scm.signoff,
            appear: Cadence::bounded(
                interval,
                Duration::from_secs(cfg.polling.checks_appear_timeout_seconds),
            ),
            // No bound once checks exist; CI is trusted to finish eventually.
            complete: Cadence::unbounded(interval),
        }
    }

    pub fn argfile(&self, package: &str) -> PathBuf {
        self.packages_dir.join(package).join(&self.argfile_name)
    }

    /// Runs the batch to a terminal state. Marking, commit and push failures
    /// abort with an error; a check timeout or unsuccessful check is a
    /// `Failed` outcome.
    pub fn run(&self, packages: &[String]) -> Result<RebuildOutcome> {
        let mut state = RebuildState::Marking;
        let mut commit = String::new();
        let mut checks = Vec::new();
        let mut reason = None;
        let mut marked = Vec::new();

        while !state.is_terminal() {
            debug!(?state, packages = packages.len(), "rebuild batch");
            state = match state {
                RebuildState::Marking => {
                    marked = self.mark(packages)?;
                    RebuildState::Committing
                }
                RebuildState::Committing => {
                    commit = self.commit_and_push(packages, &marked)?;
                    RebuildState::AwaitingChecksAppear
                }
                RebuildState::AwaitingChecksAppear => match self.await_checks_appear(&commit) {
                    Some(found) => {
                        checks = found;
                        RebuildState::AwaitingChecksComplete
                    }
                    None => {
                        reason = Some(format!(
                            "no checks appeared for {commit} within {:?}",
                            self.appear.timeout.unwrap_or_default()
                        ));
                        RebuildState::Failed
                    }
                },
                RebuildState::AwaitingChecksComplete => {
                    checks = self.await_checks_complete(&commit, checks);
                    let failed: Vec<String> = checks
                        .iter()
                        .filter(|c| !c.succeeded())
                        .map(|c| format!("{} ({:?})", c.name, c.conclusion))
                        .collect();
                    if failed.is_empty() {
                        RebuildState::Succeeded
                    } else {
                        for f in &failed {
                            warn!(commit = %commit, "check failed: {f}");
                        }
                        reason = Some(format!("checks not successful: {}", failed.join(", ")));
                        RebuildState::Failed
                    }
                }
                RebuildState::Succeeded | RebuildState::Failed => state,
            };
        }

        info!(commit = %commit, ?state, "rebuild batch finished");
        Ok(RebuildOutcome {
            commit,
            state,
            checks,
            reason,
        })
    }

    fn mark(&self, packages: &[String]) -> Result<Vec<Marked>> {
        let paths: Vec<PathBuf> = packages.iter().map(|p| self.argfile(p)).collect();
        let marked = marker::mark_all(&paths, OffsetDateTime::now_utc())
            .map_err(|e| DriftError::mutation("marking", e))?;
        debug!(packages = packages.len(), "argfiles marked");
        Ok(marked)
    }

    /// Commits only the batch's argfiles. If staging or the commit fails the
    /// markers are taken back out, so no package stays marked without a
    /// commit recording it.
    fn commit_and_push(&self, packages: &[String], marked: &[Marked]) -> Result<String> {
        let paths: Vec<PathBuf> = marked.iter().map(|m| m.path.clone()).collect();
        let committed = self
            .scm
            .stage(&paths)
            .map_err(|e| DriftError::mutation("staging", e))
            .and_then(|()| {
                self.scm
                    .commit(&commit_message(packages), &paths, self.signoff)
                    .map_err(|e| DriftError::mutation("commit", e))
            });
        if let Err(err) = committed {
            if let Err(undo) = marker::restore(marked) {
                warn!("restoring argfiles after failed commit: {undo:#}");
            }
            return Err(err.into());
        }

        let sha = self
            .scm
            .head_id()
            .map_err(|e| DriftError::mutation("commit", e))?;
        self.scm
            .push()
            .map_err(|e| DriftError::mutation("push", e))?;
        info!(commit = %sha, packages = packages.len(), "pushed rebuild commit");
        Ok(sha)
    }

    fn await_checks_appear(&self, sha: &str) -> Option<Vec<CheckRun>> {
        let started = self.clock.now();
        loop {
            match self.checks.list(sha) {
                Ok(runs) if !runs.is_empty() => {
                    info!(commit = sha, checks = runs.len(), "checks appeared");
                    return Some(runs);
                }
                Ok(_) => debug!(commit = sha, "no checks yet"),
                Err(err) => warn!(commit = sha, "listing checks failed: {err:#}"),
            }
            if self.appear.expired(started, self.clock.now()) {
                warn!(commit = sha, "timed out waiting for checks to appear");
                return None;
            }
            self.clock.sleep(self.appear.interval);
        }
    }

    fn await_checks_complete(&self, sha: &str, mut latest: Vec<CheckRun>) -> Vec<CheckRun> {
        let started = self.clock.now();
        loop {
            let pending = latest.iter().filter(|c| c.pending()).count();
            if pending == 0 {
                return latest;
            }
            if self.complete.expired(started, self.clock.now()) {
                return latest;
            }
            debug!(commit = sha, pending, "checks still running");
            self.clock.sleep(self.complete.interval);

            match self.checks.list(sha) {
                Ok(runs) if !runs.is_empty() => latest = runs,
                Ok(_) => warn!(commit = sha, "check list came back empty; keeping last reading"),
                Err(err) => warn!(commit = sha, "listing checks failed: {err:#}"),
            }
        }
    }
}

pub fn commit_message(packages: &[String]) -> String {
    let mut msg = format!("Force rebuild of {} package(s)\n\n", packages.len());
    for p in packages {
        msg.push_str("- ");
        msg.push_str(p);
        msg.push('\n');
    }
    msg
}
