use super::{IndexListing, PackageIndex};
use crate::config::Config;
use anyhow::{Context, Result};
use std::time::Duration;

/// PEP 503 "simple" index reached over blocking HTTP.
pub struct SimpleIndex {
    agent: ureq::Agent,
    base_url: String,
}

impl SimpleIndex {
    pub fn new(cfg: &Config) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(cfg.index.timeout_seconds.max(1)))
            .user_agent(concat!("drift-check/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: cfg.index.url.trim_end_matches('/').to_string(),
        }
    }

    pub fn package_url(&self, package: &str) -> String {
        format!("{}/{}/", self.base_url, package)
    }
}

impl PackageIndex for SimpleIndex {
    fn listing(&self, package: &str) -> Result<IndexListing> {
        let url = self.package_url(package);
        match self.agent.get(&url).call() {
            Ok(resp) => {
                let body = resp
                    .into_string()
                    .with_context(|| format!("reading body of {url}"))?;
                Ok(IndexListing::Found(body))
            }
            Err(ureq::Error::Status(404, _)) => Ok(IndexListing::NotFound),
            Err(ureq::Error::Status(code, _)) => Ok(IndexListing::Unavailable(code)),
            Err(err) => Err(err).with_context(|| format!("GET {url}")),
        }
    }
}
