use serde::{Deserialize, Serialize};

/// Outcome of fetching a package's listing page from the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexListing {
    Found(String),
    NotFound,
    /// Any other non-success HTTP status.
    Unavailable(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
    /// Anything newer GitHub may report (`waiting`, `requested`, `pending`).
    #[serde(other)]
    Waiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    Success,
    Failure,
    Cancelled,
    Skipped,
    Neutral,
    TimedOut,
    ActionRequired,
    Stale,
    StartupFailure,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub name: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub conclusion: Option<CheckConclusion>,
}

impl CheckRun {
    pub fn pending(&self) -> bool {
        self.status != CheckStatus::Completed
    }

    pub fn succeeded(&self) -> bool {
        self.status == CheckStatus::Completed && self.conclusion == Some(CheckConclusion::Success)
    }
}

/// Terminal and non-terminal readings of a release's `Released` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseState {
    Pending,
    Succeeded,
    Failed,
}

impl ReleaseState {
    pub fn from_reason(reason: Option<&str>) -> Self {
        match reason {
            Some("Succeeded") => Self::Succeeded,
            Some("Failed") => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}
