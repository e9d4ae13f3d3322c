use crate::{
    classify::{IssueRecord, IssueType},
    rebuild::RebuildWorkflow,
    release::ReleaseWorkflow,
};
use anyhow::Result;
use tracing::{error, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub issue_type: IssueType,
    /// 1-based position among the batches of this issue type.
    pub number: usize,
    pub packages: Vec<String>,
    pub status: BatchStatus,
}

impl BatchResult {
    pub fn failed(&self) -> bool {
        matches!(self.status, BatchStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RemediationSummary {
    pub batches: Vec<BatchResult>,
    pub unhandled: Vec<(IssueType, Vec<String>)>,
}

impl RemediationSummary {
    pub fn any_failed(&self) -> bool {
        self.batches.iter().any(BatchResult::failed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchResult> {
        self.batches.iter().filter(|b| b.failed())
    }
}

/// Executes one remediation batch. An `Err` is a hard abort of that batch.
pub trait Remediator {
    fn rebuild(&self, batch: &[IssueRecord]) -> Result<BatchStatus>;
    fn release(&self, batch: &[IssueRecord]) -> Result<BatchStatus>;
}

/// Where user-facing progress goes.
pub trait ProgressSink {
    fn group_started(&self, issue_type: &IssueType, count: usize);
    fn batch_started(&self, issue_type: &IssueType, number: usize, packages: &[String]);
    fn batch_finished(&self, result: &BatchResult);
    fn unhandled(&self, issue_type: &IssueType, packages: &[String]);
}

/// Issues grouped by type, types in first-seen order.
pub fn group_by_type(issues: &[IssueRecord]) -> Vec<(IssueType, Vec<IssueRecord>)> {
    let mut groups: Vec<(IssueType, Vec<IssueRecord>)> = Vec::new();
    for issue in issues {
        match groups.iter_mut().find(|(t, _)| *t == issue.issue_type) {
            Some((_, members)) => members.push(issue.clone()),
            None => groups.push((issue.issue_type.clone(), vec![issue.clone()])),
        }
    }
    groups
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Rebuild,
    Release,
}

impl Action {
    fn for_type(issue_type: &IssueType) -> Option<Self> {
        match issue_type {
            IssueType::NeedsRebuild => Some(Self::Rebuild),
            IssueType::NeedsRelease => Some(Self::Release),
            _ => None,
        }
    }
}

pub struct BatchCoordinator<'a> {
    remediator: &'a dyn Remediator,
    sink: &'a dyn ProgressSink,
    batch_size: usize,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(remediator: &'a dyn Remediator, sink: &'a dyn ProgressSink, batch_size: usize) -> Self {
        Self {
            remediator,
            sink,
            batch_size: batch_size.max(1),
        }
    }

    /// Batches run one after another. A failed batch is recorded and the run
    /// moves on; callers read [`RemediationSummary::any_failed`] at the end.
    pub fn run(&self, issues: &[IssueRecord]) -> RemediationSummary {
        let mut summary = RemediationSummary::default();

        for (issue_type, members) in group_by_type(issues) {
            self.sink.group_started(&issue_type, members.len());

            let Some(action) = Action::for_type(&issue_type) else {
                let names = package_names(&members);
                warn!(issue_type = %issue_type, count = names.len(), "no remediation for issue type");
                self.sink.unhandled(&issue_type, &names);
                summary.unhandled.push((issue_type, names));
                continue;
            };

            for (i, batch) in members.chunks(self.batch_size).enumerate() {
                let number = i + 1;
                let packages = package_names(batch);
                self.sink.batch_started(&issue_type, number, &packages);
                info!(issue_type = %issue_type, batch = number, size = batch.len(), "batch started");

                let attempt = match action {
                    Action::Rebuild => self.remediator.rebuild(batch),
                    Action::Release => self.remediator.release(batch),
                };
                let status = match attempt {
                    Ok(status) => status,
                    Err(err) => BatchStatus::Failed(format!("{err:#}")),
                };
                if let BatchStatus::Failed(reason) = &status {
                    error!(issue_type = %issue_type, batch = number, "batch failed: {reason}");
                }

                let result = BatchResult {
                    issue_type: issue_type.clone(),
                    number,
                    packages,
                    status,
                };
                self.sink.batch_finished(&result);
                summary.batches.push(result);
            }
        }

        summary
    }
}

fn package_names(records: &[IssueRecord]) -> Vec<String> {
    records.iter().map(|r| r.package_name.clone()).collect()
}

/// The real workflows behind [`Remediator`].
pub struct Workflows<'a> {
    pub rebuild: RebuildWorkflow<'a>,
    pub release: ReleaseWorkflow<'a>,
}

impl Remediator for Workflows<'_> {
    fn rebuild(&self, batch: &[IssueRecord]) -> Result<BatchStatus> {
        let outcome = self.rebuild.run(&package_names(batch))?;
        Ok(if outcome.succeeded() {
            BatchStatus::Succeeded
        } else {
            BatchStatus::Failed(
                outcome
                    .reason
                    .unwrap_or_else(|| format!("rebuild of {} did not succeed", outcome.commit)),
            )
        })
    }

    fn release(&self, batch: &[IssueRecord]) -> Result<BatchStatus> {
        let outcome = self.release.run(batch)?;
        if outcome.succeeded() {
            return Ok(BatchStatus::Succeeded);
        }
        let failed: Vec<String> = outcome
            .unsuccessful()
            .map(|(req, verdict)| format!("{} ({}: {:?})", req.package, req.release, verdict))
            .collect();
        Ok(BatchStatus::Failed(format!("releases not successful: {}", failed.join(", "))))
    }
}

/// Plans batches without touching anything.
pub struct DryRun;

impl Remediator for DryRun {
    fn rebuild(&self, batch: &[IssueRecord]) -> Result<BatchStatus> {
        info!(packages = ?package_names(batch), "dry run: would mark, commit and push");
        Ok(BatchStatus::Succeeded)
    }

    fn release(&self, batch: &[IssueRecord]) -> Result<BatchStatus> {
        info!(packages = ?package_names(batch), "dry run: would release built snapshots");
        Ok(BatchStatus::Succeeded)
    }
}
