use super::{process::Tool, SourceControl};
use crate::config::Config;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// `git` working tree rooted at the scan root.
pub struct Git {
    tool: Tool,
    root: PathBuf,
    remote: String,
    branch: String,
}

impl Git {
    pub fn new(cfg: &Config, root: &Path) -> Self {
        Self {
            tool: Tool::new(&cfg.scm.git_exe, cfg.scm.command_timeout_seconds).in_dir(root),
            root: root.to_path_buf(),
            remote: cfg.scm.remote.clone(),
            branch: cfg.scm.branch.clone(),
        }
    }

    pub fn version(&self) -> Result<String> {
        Ok(self.tool.run(&["--version"])?.trim().to_string())
    }

    /// Paths handed to git are relative to the working directory it runs in.
    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

impl SourceControl for Git {
    fn last_commit_touching(&self, path: &Path) -> Result<Option<String>> {
        let path = self.relative(path);
        let out = self
            .tool
            .run(&["log", "-1", "--format=%H", "--first-parent", "--", &path])?;
        let sha = out.trim();
        Ok((!sha.is_empty()).then(|| sha.to_string()))
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        let owned: Vec<String> = paths.iter().map(|p| self.relative(p)).collect();
        let mut args = vec!["add", "--"];
        args.extend(owned.iter().map(String::as_str));
        self.tool.run(&args)?;
        Ok(())
    }

    fn commit(&self, message: &str, paths: &[PathBuf], signoff: bool) -> Result<()> {
        if paths.is_empty() {
            return Err(anyhow!("refusing to commit an empty path list"));
        }
        let relative: Vec<String> = paths.iter().map(|p| self.relative(p)).collect();
        let args = commit_args(message, &relative, signoff);
        self.tool.run(&args)?;
        Ok(())
    }

    fn head_id(&self) -> Result<String> {
        let out = self.tool.run(&["rev-parse", "HEAD"])?;
        let sha = out.trim();
        if sha.is_empty() {
            return Err(anyhow!("git rev-parse HEAD returned nothing"));
        }
        Ok(sha.to_string())
    }

    fn push(&self) -> Result<()> {
        let mut args = vec!["push"];
        if !self.remote.is_empty() {
            args.push(&self.remote);
            if !self.branch.is_empty() {
                args.push(&self.branch);
            }
        }
        self.tool.run(&args)?;
        Ok(())
    }
}

/// `git commit` restricted to `paths` (pathspec commits imply `--only`).
pub fn commit_args<'a>(message: &'a str, paths: &'a [String], signoff: bool) -> Vec<&'a str> {
    let mut args = vec!["commit"];
    if signoff {
        args.push("--signoff");
    }
    args.extend(["-m", message, "--"]);
    args.extend(paths.iter().map(String::as_str));
    args
}
