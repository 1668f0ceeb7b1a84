//! Integration tests for configuration loading

use scangate::infra::Config;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_load_config_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();

    let config_content = r#"
[gate]
gate_id = "GATE_3"
location = "East wing"

[scan]
success_suppress_ms = 20000
failure_suppress_ms = 5000
command_buffer = 128

[display]
success_ms = 1500
failure_ms = 4000

[roster]
file = "tickets.json"

[egress]
file = "out/sessions.jsonl"

[metrics]
interval_secs = 30
"#;

    temp_file.write_all(config_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.gate_id(), Some("GATE_3"));
    assert_eq!(config.location(), Some("East wing"));
    assert_eq!(config.success_suppress_ms(), 20000);
    assert_eq!(config.failure_suppress_ms(), 5000);
    assert_eq!(config.command_buffer(), 128);
    assert_eq!(config.display_success_ms(), 1500);
    assert_eq!(config.display_failure_ms(), 4000);
    assert_eq!(config.roster_file(), "tickets.json");
    assert_eq!(config.egress_file(), "out/sessions.jsonl");
    assert_eq!(config.metrics_interval_secs(), 30);

    let ctx = config.gate_context();
    assert_eq!(ctx.gate_id.as_deref(), Some("GATE_3"));
    assert_eq!(ctx.location.as_deref(), Some("East wing"));
}

#[test]
fn test_missing_sections_use_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[gate]\ngate_id = \"GATE_9\"\n").unwrap();
    temp_file.flush().unwrap();

    let config = Config::from_file(temp_file.path()).unwrap();

    assert_eq!(config.gate_id(), Some("GATE_9"));
    assert_eq!(config.success_suppress_ms(), 15_000);
    assert_eq!(config.display_failure_ms(), 3_000);
    assert_eq!(config.egress_file(), "sessions.jsonl");
}

#[test]
fn test_load_from_path_fallback() {
    // Nonexistent path falls back to defaults instead of failing
    let config = Config::load_from_path("/does/not/exist.toml");

    assert_eq!(config.gate_id(), None);
    assert_eq!(config.success_suppress_ms(), 15_000);
    assert_eq!(config.config_file(), "default");
}

#[test]
fn test_from_file_rejects_invalid_toml() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"not valid toml [").unwrap();
    temp_file.flush().unwrap();

    assert!(Config::from_file(temp_file.path()).is_err());
}
