//! Release the snapshot each package was built into, then wait for every
//! release to resolve.

use crate::{
    backend::{BuildSystem, ReleaseState},
    classify::IssueRecord,
    config::Config,
    error::DriftError,
    poll::{Cadence, Clock},
};
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub package: String,
    pub snapshot: String,
    pub release: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseVerdict {
    Succeeded,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    pub releases: Vec<(ReleaseRequest, ReleaseVerdict)>,
}

impl ReleaseOutcome {
    pub fn succeeded(&self) -> bool {
        self.releases
            .iter()
            .all(|(_, v)| *v == ReleaseVerdict::Succeeded)
    }

    pub fn unsuccessful(&self) -> impl Iterator<Item = &(ReleaseRequest, ReleaseVerdict)> {
        self.releases
            .iter()
            .filter(|(_, v)| *v != ReleaseVerdict::Succeeded)
    }
}

pub struct ReleaseWorkflow<'a> {
    build: &'a dyn BuildSystem,
    clock: &'a dyn Clock,
    wait: Cadence,
}

impl<'a> ReleaseWorkflow<'a> {
    pub fn new(cfg: &Config, build: &'a dyn BuildSystem, clock: &'a dyn Clock) -> Self {
        Self {
            build,
            clock,
            wait: Cadence::bounded(
                Duration::from_secs(cfg.polling.interval_seconds),
                Duration::from_secs(cfg.polling.release_timeout_seconds),
            ),
        }
    }

    /// Every snapshot is resolved before any release is created, so one
    /// unresolvable package leaves the batch untouched. Creation failures
    /// abort too; failures while waiting only mark the outcome.
    pub fn run(&self, records: &[IssueRecord]) -> Result<ReleaseOutcome> {
        let mut resolved = Vec::with_capacity(records.len());
        for record in records {
            resolved.push((record.package_name.clone(), self.resolve_snapshot(record)?));
        }

        let mut requests = Vec::with_capacity(resolved.len());
        for (package, snapshot) in resolved {
            let release = self
                .build
                .create_release(&package, &snapshot)
                .map_err(|e| DriftError::mutation("release creation", format!("{package}: {e:#}")))?;
            info!(package = %package, snapshot = %snapshot, release = %release, "release requested");
            requests.push(ReleaseRequest {
                package,
                snapshot,
                release,
            });
        }

        let verdicts = self.await_releases(&requests);
        Ok(ReleaseOutcome {
            releases: requests.into_iter().zip(verdicts).collect(),
        })
    }

    fn resolve_snapshot(&self, record: &IssueRecord) -> Result<String> {
        let package = &record.package_name;
        let commit = record
            .built_commit
            .as_deref()
            .ok_or_else(|| DriftError::MissingBuiltCommit(package.clone()))?;
        let snapshot = self
            .build
            .find_snapshot(package, commit)
            .map_err(|e| DriftError::Query {
                system: "build system",
                message: format!("snapshot lookup for {package}: {e:#}"),
            })?
            .ok_or_else(|| DriftError::ArtifactNotFound {
                package: package.clone(),
                commit: commit.to_string(),
            })?;
        debug!(package = %package, commit, snapshot = %snapshot, "snapshot resolved");
        Ok(snapshot)
    }

    fn await_releases(&self, requests: &[ReleaseRequest]) -> Vec<ReleaseVerdict> {
        let mut verdicts: Vec<Option<ReleaseVerdict>> = vec![None; requests.len()];
        let started = self.clock.now();

        loop {
            for (req, verdict) in requests.iter().zip(verdicts.iter_mut()) {
                if verdict.is_some() {
                    continue;
                }
                match self.build.release_reason(&req.release) {
                    Ok(reason) => {
                        let state = ReleaseState::from_reason(reason.as_deref());
                        if !state.is_terminal() {
                            debug!(release = %req.release, reason = ?reason, "release pending");
                            continue;
                        }
                        if state == ReleaseState::Succeeded {
                            info!(release = %req.release, package = %req.package, "release succeeded");
                            *verdict = Some(ReleaseVerdict::Succeeded);
                        } else {
                            warn!(release = %req.release, package = %req.package, "release failed");
                            *verdict = Some(ReleaseVerdict::Failed);
                        }
                    }
                    Err(err) => {
                        warn!(release = %req.release, "release status query failed: {err:#}")
                    }
                }
            }

            if verdicts.iter().all(Option::is_some) {
                break;
            }
            if self.wait.expired(started, self.clock.now()) {
                for (req, verdict) in requests.iter().zip(verdicts.iter_mut()) {
                    if verdict.is_none() {
                        warn!(release = %req.release, package = %req.package, "timed out waiting for release");
                        *verdict = Some(ReleaseVerdict::TimedOut);
                    }
                }
                break;
            }
            self.clock.sleep(self.wait.interval);
        }

        verdicts
            .into_iter()
            .map(|v| v.unwrap_or(ReleaseVerdict::TimedOut))
            .collect()
    }
}
