use super::{process::Tool, BuildSystem};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const LABEL_COMMIT: &str = "pac.test.appstudio.openshift.io/sha";
pub const LABEL_COMPONENT: &str = "appstudio.openshift.io/component";
pub const LABEL_EVENT_TYPE: &str = "pac.test.appstudio.openshift.io/event-type";

const RELEASE_API_VERSION: &str = "appstudio.redhat.com/v1alpha1";

/// Build system reached through the `oc` CLI.
pub struct Oc {
    tool: Tool,
    namespace: String,
    release_plan: String,
}

impl Oc {
    pub fn new(cfg: &Config) -> Self {
        Self {
            tool: Tool::new(&cfg.build_system.oc_exe, cfg.build_system.command_timeout_seconds),
            namespace: cfg.build_system.namespace.clone(),
            release_plan: cfg.build_system.release_plan.clone(),
        }
    }

    pub fn version(&self) -> Result<String> {
        Ok(self.tool.run(&["version", "--client"])?.trim().to_string())
    }

    fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<String> {
        let mut full: Vec<&str> = Vec::with_capacity(args.len() + 2);
        if !self.namespace.is_empty() {
            full.extend(["-n", self.namespace.as_str()]);
        }
        full.extend_from_slice(args);
        self.tool.run_with_stdin(&full, stdin)
    }
}

impl BuildSystem for Oc {
    fn last_built_commit(&self, component: &str) -> Result<Option<String>> {
        let out = self.run(&["get", "component", component, "-o", "yaml"], None)?;
        parse_last_built_commit(&out)
    }

    fn find_snapshot(&self, component: &str, commit: &str) -> Result<Option<String>> {
        let selector = snapshot_selector(component, commit);
        let out = self.run(&["get", "snapshot", "-l", &selector, "-o", "json"], None)?;
        parse_first_item_name(&out)
    }

    fn create_release(&self, component: &str, snapshot: &str) -> Result<String> {
        let manifest = release_manifest(component, snapshot, &self.release_plan)?;
        let out = self.run(&["create", "-f", "-", "-o", "name"], Some(manifest.as_bytes()))?;
        parse_created_name(&out)
    }

    fn release_reason(&self, release: &str) -> Result<Option<String>> {
        let out = self.run(&["get", "release", release, "-o", "json"], None)?;
        parse_released_reason(&out)
    }
}

pub fn snapshot_selector(component: &str, commit: &str) -> String {
    format!("{LABEL_COMMIT}={commit},{LABEL_COMPONENT}={component},{LABEL_EVENT_TYPE}=push")
}

/// `status.lastBuiltCommit` of a Component rendered as YAML.
pub fn parse_last_built_commit(yaml: &str) -> Result<Option<String>> {
    let doc: serde_yaml::Value = serde_yaml::from_str(yaml).context("parsing component YAML")?;
    Ok(doc
        .get("status")
        .and_then(|s| s.get("lastBuiltCommit"))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}

#[derive(Debug, Deserialize)]
struct ItemList {
    #[serde(default)]
    items: Vec<NamedItem>,
}

#[derive(Debug, Deserialize)]
struct NamedItem {
    metadata: Metadata,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
}

/// Name of the first item of a `List`, in backend order.
pub fn parse_first_item_name(json: &str) -> Result<Option<String>> {
    let list: ItemList = serde_json::from_str(json).context("parsing snapshot list")?;
    Ok(list.items.into_iter().next().map(|i| i.metadata.name))
}

/// `oc create -o name` prints `<kind>.<group>/<name>`.
pub fn parse_created_name(out: &str) -> Result<String> {
    let line = out
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| anyhow!("oc create printed no resource name"))?;
    let name = line.rsplit('/').next().unwrap_or(line);
    if name.is_empty() {
        return Err(anyhow!("unexpected oc create output: {line}"));
    }
    Ok(name.to_string())
}

#[derive(Debug, Deserialize)]
struct ReleaseDoc {
    #[serde(default)]
    status: Option<ReleaseStatus>,
}

#[derive(Debug, Deserialize)]
struct ReleaseStatus {
    #[serde(default)]
    conditions: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    reason: Option<String>,
}

pub fn parse_released_reason(json: &str) -> Result<Option<String>> {
    let doc: ReleaseDoc = serde_json::from_str(json).context("parsing release JSON")?;
    Ok(doc
        .status
        .into_iter()
        .flat_map(|s| s.conditions)
        .find(|c| c.kind == "Released")
        .and_then(|c| c.reason)
        .filter(|r| !r.is_empty()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseManifest<'a> {
    api_version: &'a str,
    kind: &'a str,
    metadata: ReleaseMetadata,
    spec: ReleaseSpec<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseMetadata {
    generate_name: String,
    labels: std::collections::BTreeMap<&'static str, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseSpec<'a> {
    release_plan: &'a str,
    snapshot: &'a str,
}

pub fn release_manifest(component: &str, snapshot: &str, release_plan: &str) -> Result<String> {
    let manifest = ReleaseManifest {
        api_version: RELEASE_API_VERSION,
        kind: "Release",
        metadata: ReleaseMetadata {
            generate_name: format!("{component}-"),
            labels: [(LABEL_COMPONENT, component.to_string())].into_iter().collect(),
        },
        spec: ReleaseSpec {
            release_plan,
            snapshot,
        },
    };
    serde_yaml::to_string(&manifest).context("rendering release manifest")
}
