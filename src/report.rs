use crate::{
    classify::{IssueRecord, IssueType},
    error::DriftError,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_packages: usize,
    pub packages_with_issues: usize,
    pub issues_by_type: BTreeMap<String, usize>,
}

/// Output of one scan. Both record lists are sorted by package name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub issues: Vec<IssueRecord>,
    #[serde(default)]
    pub all_packages: Vec<IssueRecord>,
}

impl Report {
    pub fn from_records(mut records: Vec<IssueRecord>) -> Self {
        records.sort_by(|a, b| a.package_name.cmp(&b.package_name));

        let issues: Vec<IssueRecord> = records
            .iter()
            .filter(|r| r.issue_type != IssueType::NoIssue)
            .cloned()
            .collect();

        let mut issues_by_type = BTreeMap::new();
        for r in &records {
            *issues_by_type
                .entry(r.issue_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        Self {
            summary: Summary {
                total_packages: records.len(),
                packages_with_issues: issues.len(),
                issues_by_type,
            },
            issues,
            all_packages: records,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("writing report: {}", path.display()))
    }

    /// Reads a report written by `scan`. A missing or unparseable file is a
    /// configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DriftError::Configuration(format!(
                "issues file not found at {}",
                path.display()
            ))
            .into());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading issues file: {}", path.display()))?;
        let report: Report = serde_json::from_str(&raw).map_err(|e| {
            DriftError::Configuration(format!("invalid JSON in {}: {e}", path.display()))
        })?;
        Ok(report)
    }
}
