use drift_check::classify::{ActionNeeded, IssueRecord, IssueType};
use drift_check::error::DriftError;
use drift_check::report::Report;
use tempfile::tempdir;

fn record(name: &str, issue_type: IssueType) -> IssueRecord {
    IssueRecord {
        package_name: name.to_string(),
        issue_type,
        ..IssueRecord::default()
    }
}

#[test]
fn report_counts_add_up() {
    let report = Report::from_records(vec![
        record("zope", IssueType::NeedsRebuild),
        record("attrs", IssueType::NoIssue),
        record("babel", IssueType::NeedsRelease),
        record("certifi", IssueType::NoIssue),
    ]);

    let no_issue = report.summary.issues_by_type["no_issue"];
    assert_eq!(report.issues.len() + no_issue, report.summary.total_packages);
    assert_eq!(report.summary.packages_with_issues, 2);
    let names: Vec<&str> = report.issues.iter().map(|r| r.package_name.as_str()).collect();
    assert_eq!(names, ["babel", "zope"]);
    assert_eq!(report.all_packages[0].package_name, "attrs");
}

#[test]
fn written_report_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("issues.json");
    let report = Report::from_records(vec![record("attrs", IssueType::NeedsRebuild)]);
    report.write(&path).unwrap();

    assert_eq!(Report::load(&path).unwrap(), report);
}

#[test]
fn missing_issues_file_is_a_configuration_error() {
    let dir = tempdir().unwrap();
    let err = Report::load(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DriftError>(),
        Some(DriftError::Configuration(_))
    ));
}

#[test]
fn malformed_json_is_a_configuration_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("issues.json");
    std::fs::write(&path, "{ \"issues\": [").unwrap();

    let err = Report::load(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<DriftError>(),
        Some(DriftError::Configuration(msg)) if msg.contains("invalid JSON")
    ));
}

#[test]
fn issues_only_report_with_legacy_fields_is_accepted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("issues.json");
    std::fs::write(
        &path,
        r#"{
  "issues": [
    {
      "package_name": "attrs",
      "git_version": "23.2.0",
      "index_version": "23.1.0",
      "built_commit_id": "abc",
      "current_commit_id": "def",
      "issue_type": "needs_rebuild",
      "issue_description": "Commit mismatch",
      "action_needed": "rebuild"
    },
    { "package_name": "babel", "issue_type": "license_review" }
  ]
}"#,
    )
    .unwrap();

    let report = Report::load(&path).unwrap();
    assert_eq!(report.summary.total_packages, 0);
    assert!(report.all_packages.is_empty());

    let attrs = &report.issues[0];
    assert_eq!(attrs.source_version.as_deref(), Some("23.2.0"));
    assert_eq!(attrs.built_commit.as_deref(), Some("abc"));
    assert_eq!(attrs.head_commit.as_deref(), Some("def"));
    assert_eq!(attrs.issue_type, IssueType::NeedsRebuild);
    assert_eq!(attrs.action_needed, ActionNeeded::Rebuild);

    let babel = &report.issues[1];
    assert_eq!(babel.issue_type, IssueType::Other("license_review".into()));
    assert_eq!(babel.action_needed, ActionNeeded::Investigate);
}
