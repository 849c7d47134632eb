//! Unit tests for file-based configuration loading

use seedream_gateway::config::Settings;
use std::io::Write;

#[test]
fn test_load_from_toml_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[server]
port = 9100

[auth]
enabled = false

[upstream]
seededit_model = "seededit-custom"
multi_timeout_secs = 600

[metrics]
max_history = 50
"#
    )
    .unwrap();

    let settings = Settings::load_from_path(file.path()).unwrap();

    assert_eq!(settings.server.port, 9100);
    assert_eq!(settings.server.host, "0.0.0.0");
    assert!(!settings.auth.enabled);
    assert_eq!(settings.upstream.seededit_model, "seededit-custom");
    assert_eq!(settings.upstream.multi_timeout_secs, 600);
    assert_eq!(settings.upstream.single_timeout_secs, 120);
    assert_eq!(settings.metrics.max_history, 50);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load_from_path(dir.path().join("absent.toml")).unwrap();

    assert_eq!(settings.server.port, 8003);
    assert_eq!(settings.rate_limit.requests_per_second, 100);
    assert_eq!(settings.rate_limit.burst_size, 200);
    assert_eq!(settings.logging.format, "json");
}
