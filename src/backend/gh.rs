use super::{process::Tool, CheckRun, CheckRuns};
use crate::config::Config;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Check runs fetched through `gh api` for a fixed repository.
pub struct GhChecks {
    tool: Tool,
    repository: String,
}

impl GhChecks {
    pub fn new(cfg: &Config) -> Self {
        Self {
            tool: Tool::new(&cfg.ci.gh_exe, cfg.ci.command_timeout_seconds),
            repository: cfg.ci.repository.clone(),
        }
    }

    pub fn version(&self) -> Result<String> {
        let out = self.tool.run(&["--version"])?;
        Ok(out.lines().next().unwrap_or_default().trim().to_string())
    }
}

impl CheckRuns for GhChecks {
    fn list(&self, sha: &str) -> Result<Vec<CheckRun>> {
        let endpoint = format!(
            "repos/{}/commits/{}/check-runs?per_page=100",
            self.repository, sha
        );
        let out = self.tool.run(&["api", "--paginate", &endpoint])?;
        parse_check_runs(&out)
    }
}

#[derive(Debug, Deserialize)]
struct CheckRunsResponse {
    #[serde(default)]
    check_runs: Vec<CheckRun>,
}

/// `gh api --paginate` prints one JSON object per page back to back; the
/// `check_runs` of every page are merged in order.
pub fn parse_check_runs(json: &str) -> Result<Vec<CheckRun>> {
    let mut runs = Vec::new();
    for page in serde_json::Deserializer::from_str(json).into_iter::<CheckRunsResponse>() {
        runs.extend(page.context("parsing check-runs response")?.check_runs);
    }
    Ok(runs)
}
