#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Configuration defaults, TOML parsing, and validation checks.

use netchannel::config::{NetConfig, DEFAULT_STOP_BYTE};
use netchannel::error::Error;
use netchannel::protocol::TransportMode;
use std::time::Duration;

#[test]
fn defaults_match_documented_tunables() {
    let config = NetConfig::default();

    assert_eq!(config.endpoint.connect_timeout, Duration::from_millis(1500));
    assert_eq!(config.endpoint.read_timeout, Duration::from_millis(5000));
    assert_eq!(config.listener.read_timeout, Duration::from_millis(5000));
    assert_eq!(config.listener.backlog, 100);
    assert_eq!(config.listener.mode, TransportMode::Data);
    assert!(config.listener.framing.use_stop_byte);
    assert_eq!(config.listener.framing.stop_byte, DEFAULT_STOP_BYTE);
    assert_eq!(DEFAULT_STOP_BYTE, 0x04);
}

#[test]
fn default_config_is_valid() {
    let config = NetConfig::default();
    let errors = config.validate();
    assert!(errors.is_empty(), "unexpected findings: {errors:?}");
    config.validate_strict().unwrap();
}

#[test]
fn example_config_round_trips() {
    let example = NetConfig::example_config();
    let parsed = NetConfig::from_toml(&example).unwrap();
    assert!(parsed.validate().is_empty());
}

#[test]
fn toml_overrides_are_applied() {
    let config = NetConfig::from_toml(
        r#"
        [listener]
        port = 9100
        backlog = 16
        mode = "object"
        read_timeout = 250

        [listener.framing]
        use_stop_byte = false
        stop_byte = 10

        [endpoint]
        address = "192.0.2.7"
        port = 9100
        connect_timeout = 400
        read_timeout = 250
        "#,
    )
    .unwrap();

    assert_eq!(config.listener.port, 9100);
    assert_eq!(config.listener.backlog, 16);
    assert_eq!(config.listener.mode, TransportMode::Object);
    assert_eq!(config.listener.read_timeout, Duration::from_millis(250));
    assert!(!config.listener.framing.use_stop_byte);
    assert_eq!(config.listener.framing.stop_byte, 10);
    assert_eq!(config.endpoint.address, "192.0.2.7");
    assert_eq!(config.endpoint.connect_timeout, Duration::from_millis(400));
}

#[test]
fn malformed_toml_is_a_config_error() {
    match NetConfig::from_toml("listener = \"not a table\"") {
        Err(Error::Config(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn unknown_mode_is_unsupported() {
    match "multiplex".parse::<TransportMode>() {
        Err(Error::UnsupportedMode(name)) => assert_eq!(name, "multiplex"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn validation_flags_bad_values() {
    let config = NetConfig::default_with_overrides(|c| {
        c.listener.backlog = 0;
        c.listener.read_timeout = Duration::from_millis(1);
        c.endpoint.address = String::new();
        c.logging.app_name = String::new();
    });

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("backlog")));
    assert!(errors.iter().any(|e| e.contains("Read timeout")));
    assert!(errors.iter().any(|e| e.contains("address")));
    assert!(errors.iter().any(|e| e.contains("Application name")));
    assert!(matches!(config.validate_strict(), Err(Error::Config(_))));
}

#[test]
fn env_overrides_are_applied() {
    std::env::set_var("NETCHANNEL_LISTENER_BACKLOG", "42");
    std::env::set_var("NETCHANNEL_TRANSPORT_MODE", "object");
    std::env::set_var("NETCHANNEL_READ_TIMEOUT_MS", "750");

    let config = NetConfig::from_env().unwrap();
    assert_eq!(config.listener.backlog, 42);
    assert_eq!(config.listener.mode, TransportMode::Object);
    assert_eq!(config.listener.read_timeout, Duration::from_millis(750));
    assert_eq!(config.endpoint.read_timeout, Duration::from_millis(750));

    std::env::remove_var("NETCHANNEL_LISTENER_BACKLOG");
    std::env::remove_var("NETCHANNEL_TRANSPORT_MODE");
    std::env::remove_var("NETCHANNEL_READ_TIMEOUT_MS");
}
