mod common;

use arbor::config::{load_config_from, save_config_to, Config};
use arbor::{get_config_path, load_config, save_config, ArborError};
use common::TestConfigContext;

/// A missing config file yields the defaults without creating anything.
#[test]
fn test_missing_file_uses_defaults() {
    let ctx = TestConfigContext::new();

    let config = load_config_from(&ctx.config_path).expect("Failed to load config");
    assert_eq!(config.server.get_bind(), "127.0.0.1:8080");
    assert_eq!(config.server.get_registration_bind(), "127.0.0.1:8090");
    assert_eq!(config.replication.get_read_threshold(), 20);
    assert!(config.replication.get_enabled());
    assert_eq!(config.storage.get_request_timeout_ms(), 5000);
    assert!(!ctx.config_path.exists());
}

/// Partial files only override the keys they set.
#[test]
fn test_partial_file_keeps_other_defaults() {
    let ctx = TestConfigContext::new();
    ctx.write(
        r#"
[replication]
read_threshold = 7
"#,
    );

    let config = load_config_from(&ctx.config_path).expect("Failed to load config");
    assert_eq!(config.replication.get_read_threshold(), 7);
    assert!(config.replication.get_enabled());
    assert_eq!(config.server.get_bind(), "127.0.0.1:8080");
}

/// save_config_to writes a file load_config_from reads back unchanged.
#[test]
fn test_save_then_load() {
    let ctx = TestConfigContext::new();
    let mut config = Config::default();
    config.server.bind = Some("0.0.0.0:9000".to_string());
    config.replication.enabled = Some(false);
    config.storage.request_timeout_ms = Some(1500);

    save_config_to(&config, &ctx.config_path).expect("Failed to save config");
    let reloaded = load_config_from(&ctx.config_path).expect("Failed to reload config");

    assert_eq!(reloaded.server.get_bind(), "0.0.0.0:9000");
    assert!(!reloaded.replication.get_enabled());
    assert_eq!(reloaded.storage.get_request_timeout_ms(), 1500);
    assert!(reloaded.replication.read_threshold.is_none());
}

/// Saving creates missing parent directories.
#[test]
fn test_save_creates_parent_directories() {
    let ctx = TestConfigContext::new();
    let nested = ctx.temp_dir.path().join("deep/er/config.toml");

    save_config_to(&Config::default(), &nested).expect("Failed to save config");
    assert!(nested.exists());
}

#[test]
fn test_malformed_file_is_a_config_error() {
    let ctx = TestConfigContext::new();
    ctx.write("[replication\nread_threshold = ");

    let err = load_config_from(&ctx.config_path).unwrap_err();
    assert!(matches!(err, ArborError::Config(_)));
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let ctx = TestConfigContext::new();
    ctx.write(
        r#"
[replication]
read_threshold = 0
"#,
    );
    assert!(matches!(
        load_config_from(&ctx.config_path),
        Err(ArborError::Config(_))
    ));

    ctx.write(
        r#"
[server]
bind = "not an address"
"#,
    );
    assert!(matches!(
        load_config_from(&ctx.config_path),
        Err(ArborError::Config(_))
    ));
}

/// The default-location helpers follow ARBOR_CONFIG_DIR.
#[test]
fn test_default_location_round_trip() {
    let ctx = TestConfigContext::new();
    std::env::set_var("ARBOR_CONFIG_DIR", ctx.temp_dir.path());

    assert_eq!(get_config_path().unwrap(), ctx.config_path);
    let mut config = load_config().expect("Failed to load config");
    config.replication.read_threshold = Some(4);
    save_config(&config).expect("Failed to save config");

    assert!(ctx.config_path.exists());
    let reloaded = load_config().expect("Failed to reload config");
    assert_eq!(reloaded.replication.get_read_threshold(), 4);

    std::env::remove_var("ARBOR_CONFIG_DIR");
}
