use crate::{batch::DEFAULT_BATCH_SIZE, error::DriftError, scanner::DEFAULT_WORKERS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub index: Index,
    #[serde(default)]
    pub build_system: BuildSystem,
    #[serde(default)]
    pub scm: Scm,
    #[serde(default)]
    pub ci: Ci,
    #[serde(default)]
    pub polling: Polling,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DriftError::Configuration(format!(
                "config file not found: {}",
                path.display()
            ))
            .into());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw)
            .map_err(|e| DriftError::Configuration(format!("parsing TOML: {e}")))?;
        Ok(cfg)
    }

    pub fn to_toml(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub workers: usize,
    pub batch_size: usize,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub packages_dir: String,
    pub requirements_file: String,
    pub argfile_name: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            packages_dir: "packages".into(),
            requirements_file: "requirements.txt".into(),
            argfile_name: "argfile.conf".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Index {
    pub url: String,
    pub timeout_seconds: u64,
}
impl Default for Index {
    fn default() -> Self {
        Self {
            url: "https://console.redhat.com/api/pulp-content/public-calunga/mypypi/simple".into(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSystem {
    pub oc_exe: String,
    /// Empty means the current `oc` project.
    pub namespace: String,
    pub release_plan: String,
    pub command_timeout_seconds: u64,
}
impl Default for BuildSystem {
    fn default() -> Self {
        Self {
            oc_exe: "oc".into(),
            namespace: "".into(),
            release_plan: "calunga-release-plan".into(),
            command_timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scm {
    pub git_exe: String,
    pub signoff: bool,
    pub remote: String,
    /// Empty pushes to the configured upstream of the current branch.
    pub branch: String,
    pub command_timeout_seconds: u64,
}
impl Default for Scm {
    fn default() -> Self {
        Self {
            git_exe: "git".into(),
            signoff: true,
            remote: "origin".into(),
            branch: "".into(),
            command_timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ci {
    pub gh_exe: String,
    /// `owner/name` of the repository the rebuild commits are pushed to.
    pub repository: String,
    pub command_timeout_seconds: u64,
}
impl Default for Ci {
    fn default() -> Self {
        Self {
            gh_exe: "gh".into(),
            repository: "calunga-project/calunga".into(),
            command_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Polling {
    pub interval_seconds: u64,
    pub checks_appear_timeout_seconds: u64,
    pub release_timeout_seconds: u64,
}
impl Default for Polling {
    fn default() -> Self {
        Self {
            interval_seconds: 30,
            checks_appear_timeout_seconds: 300,
            release_timeout_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "drift-check.log".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            dump_effective_config: false,
        }
    }
}
