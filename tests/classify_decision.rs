mod common;

use common::{FakeBuild, FakeChecks, FakeIndex, FakeScm};
use drift_check::backend::Backends;
use drift_check::classify::{decide, ActionNeeded, Classifier, IssueRecord, IssueType, PackageFacts};
use drift_check::oracle::MISSING;
use std::cell::Cell;

fn facts(src: Option<&str>, idx: Option<&str>, built: Option<&str>, head: Option<&str>) -> PackageFacts {
    PackageFacts {
        package_name: "pkg".into(),
        source_version: src.map(Into::into),
        index_version: idx.map(Into::into),
        built_commit: built.map(Into::into),
        head_commit: head.map(Into::into),
    }
}

#[test]
fn equal_versions_are_no_issue() {
    let r = decide(facts(Some("1.2.3"), Some("1.2.3"), Some("a"), Some("b")), |_| {
        panic!("artifact lookup not expected")
    });
    assert_eq!(r.issue_type, IssueType::NoIssue);
    assert_eq!(r.action_needed, ActionNeeded::None);
}

#[test]
fn both_versions_absent_count_as_equal() {
    let r = decide(facts(None, None, None, None), |_| None);
    assert_eq!(r.issue_type, IssueType::NoIssue);
}

#[test]
fn commit_mismatch_needs_rebuild_even_with_artifact() {
    let looked_up = Cell::new(false);
    let r = decide(
        facts(Some("1.2.4"), Some("1.2.3"), Some("abc123"), Some("def456")),
        |_| {
            looked_up.set(true);
            Some("pkg-abc123".into())
        },
    );
    assert_eq!(r.issue_type, IssueType::NeedsRebuild);
    assert_eq!(r.action_needed, ActionNeeded::Rebuild);
    assert!(r.description.contains("abc123"));
    assert!(r.description.contains("def456"));
    assert!(!looked_up.get());
}

#[test]
fn built_head_with_artifact_needs_release() {
    let r = decide(
        facts(Some("1.2.4"), Some("1.2.3"), Some("abc123"), Some("abc123")),
        |commit| {
            assert_eq!(commit, "abc123");
            Some("pkg-abc123".into())
        },
    );
    assert_eq!(r.issue_type, IssueType::NeedsRelease);
    assert_eq!(r.action_needed, ActionNeeded::Release);
    assert!(r.description.contains("pkg-abc123"));
}

#[test]
fn built_head_without_artifact_is_unknown() {
    let r = decide(
        facts(Some("1.2.4"), Some(MISSING), Some("abc123"), Some("abc123")),
        |_| None,
    );
    assert_eq!(r.issue_type, IssueType::Unknown);
    assert_eq!(r.action_needed, ActionNeeded::Investigate);
}

#[test]
fn classifier_resolves_facts_from_backends() {
    let dir = tempfile::tempdir().unwrap();
    let pkg = common::write_package(dir.path(), "requests", Some("2.32.3"));

    let index = FakeIndex::default().with_versions("requests", &["2.32.2"]);
    let mut build = FakeBuild::default().with_snapshot("requests", "abc", "requests-x7k2p");
    build.built.insert("requests".into(), "abc".into());
    let mut scm = FakeScm::default();
    scm.heads.insert("requests".into(), "abc".into());
    let checks = FakeChecks::new(vec![]);

    let backends = Backends {
        scm: &scm,
        index: &index,
        build: &build,
        checks: &checks,
    };
    let record = Classifier::new(backends, "requirements.txt").classify(&pkg);

    assert_eq!(record.package_name, "requests");
    assert_eq!(record.source_version.as_deref(), Some("2.32.3"));
    assert_eq!(record.index_version.as_deref(), Some("2.32.2"));
    assert_eq!(record.issue_type, IssueType::NeedsRelease);
    assert!(record.description.contains("requests-x7k2p"));
}

#[test]
fn record_serializes_with_stable_names() {
    let r = decide(facts(Some("1.0"), Some("0.9"), Some("a"), Some("b")), |_| None);
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["package_name"], "pkg");
    assert_eq!(json["issue_type"], "needs_rebuild");
    assert_eq!(json["action_needed"], "rebuild");
    assert_eq!(json["source_version"], "1.0");
    assert_eq!(json["built_commit"], "a");
    assert_eq!(json["head_commit"], "b");
}

#[test]
fn record_accepts_legacy_field_names_and_custom_types() {
    let raw = r#"{
        "package_name": "package1",
        "git_version": "1.0",
        "built_commit_id": "aaa",
        "current_commit_id": "bbb",
        "issue_type": "custom_type",
        "issue_description": "Custom issue",
        "action_needed": "custom_action"
    }"#;
    let r: IssueRecord = serde_json::from_str(raw).unwrap();
    assert_eq!(r.source_version.as_deref(), Some("1.0"));
    assert_eq!(r.built_commit.as_deref(), Some("aaa"));
    assert_eq!(r.head_commit.as_deref(), Some("bbb"));
    assert_eq!(r.issue_type, IssueType::Other("custom_type".into()));
    assert_eq!(r.description, "Custom issue");

    let back = serde_json::to_value(&r).unwrap();
    assert_eq!(back["issue_type"], "custom_type");
    assert_eq!(back["action_needed"], "custom_action");
}
