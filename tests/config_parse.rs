use drift_check::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../drift-check.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.global.workers, 5);
    assert_eq!(cfg.global.batch_size, 20);
    assert_eq!(cfg.polling.interval_seconds, 30);
    assert_eq!(cfg.polling.checks_appear_timeout_seconds, 300);
    assert_eq!(cfg.polling.release_timeout_seconds, 600);
    assert!(!cfg.paths.packages_dir.is_empty());
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let cfg: Config = toml::from_str("[ci]\ngh_exe = \"gh\"\nrepository = \"acme/pkgs\"\ncommand_timeout_seconds = 5\n")
        .expect("parse TOML");
    assert_eq!(cfg.ci.repository, "acme/pkgs");
    assert_eq!(cfg.paths.argfile_name, "argfile.conf");
    assert_eq!(cfg.global.workers, 5);
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
    assert!(err.to_string().contains("config file not found"));
}

#[test]
fn partial_section_keeps_remaining_defaults() {
    let cfg: Config = toml::from_str("[polling]\ninterval_seconds = 5\n").expect("parse TOML");
    assert_eq!(cfg.polling.interval_seconds, 5);
    assert_eq!(cfg.polling.release_timeout_seconds, 600);
}

#[test]
fn poll_cadence_has_a_floor() {
    use drift_check::poll::{Cadence, MIN_INTERVAL};
    use std::time::Duration;

    assert_eq!(Cadence::unbounded(Duration::ZERO).interval, MIN_INTERVAL);
    let c = Cadence::bounded(Duration::from_millis(10), Duration::from_secs(5));
    assert_eq!(c.interval, MIN_INTERVAL);
    assert_eq!(c.timeout, Some(Duration::from_secs(5)));
    assert_eq!(Cadence::unbounded(Duration::from_secs(30)).interval, Duration::from_secs(30));
}
