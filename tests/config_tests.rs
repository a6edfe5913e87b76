//! Tests for command-line configuration parsing.

use std::time::Duration;

use sockrun::config::parse_args;
use sockrun::{ErrorCategory, IoConfig, SpawnMode};

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Full Surface
// =============================================================================

#[test]
fn test_full_configuration() {
    let config = parse_args(&argv(&[
        "-e",
        "sort -u",
        "-i",
        "TCPS7000",
        "-o",
        "TCPC127.0.0.1,7001",
        "-t",
        "5",
    ]))
    .unwrap();

    assert_eq!(
        config.command,
        Some(SpawnMode::Shell {
            command: "sort -u".to_string()
        })
    );
    assert!(matches!(config.io, IoConfig::Both { .. }));
    assert_eq!(config.timeout, Some(Duration::from_secs(5)));
}

#[test]
fn test_input_only() {
    let config = parse_args(&argv(&["-e", "wc -l", "-i", "UDPS5353"])).unwrap();
    assert!(matches!(config.io, IoConfig::Input { .. }));
    assert!(config.timeout.is_none());
}

#[test]
fn test_output_only() {
    let config = parse_args(&argv(&["-e", "date", "-o", "UDSCD/tmp/out.sock"])).unwrap();
    assert!(matches!(config.io, IoConfig::Output { .. }));
}

#[test]
fn test_bidirectional() {
    let config = parse_args(&argv(&["-e", "cat", "-b", "TCPS4444"])).unwrap();
    assert!(matches!(config.io, IoConfig::Bidirectional { .. }));
}

#[test]
fn test_no_flags_is_passthrough() {
    let config = parse_args(&[]).unwrap();
    assert!(config.command.is_none());
    assert_eq!(config.io, IoConfig::Inherit);
}

#[test]
fn test_proxy_mode_with_endpoint_and_no_command() {
    let config = parse_args(&argv(&["-i", "TCPS7000"])).unwrap();
    assert!(config.command.is_none());
    assert!(matches!(config.io, IoConfig::Input { .. }));
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn test_unknown_flag_rejected() {
    let err = parse_args(&argv(&["-x", "foo"])).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
}

#[test]
fn test_flag_without_value_rejected() {
    for flags in [&["-e"][..], &["-i"], &["-o"], &["-b"], &["-t"]] {
        let err = parse_args(&argv(flags)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config, "flags {flags:?}");
    }
}

#[test]
fn test_bidirectional_conflicts() {
    assert!(parse_args(&argv(&["-b", "TCPS1000", "-i", "TCPS1001"])).is_err());
    assert!(parse_args(&argv(&["-b", "TCPS1000", "-o", "TCPC127.0.0.1,1001"])).is_err());
}

#[test]
fn test_bidirectional_requires_tcp_server_spec() {
    assert!(parse_args(&argv(&["-b", "UDPS1000"])).is_err());
    assert!(parse_args(&argv(&["-b", "UDSSS/tmp/b.sock"])).is_err());
}

#[test]
fn test_non_numeric_timeout_rejected() {
    let err = parse_args(&argv(&["-t", "soon"])).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
}

#[test]
fn test_empty_command_rejected() {
    let err = parse_args(&argv(&["-e", "   "])).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
}

#[test]
fn test_malformed_endpoint_spec_surfaces_from_flags() {
    let err = parse_args(&argv(&["-i", "TCPC127.0.0.1,9000"])).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);

    let err = parse_args(&argv(&["-o", "UDPC127.0.0.1"])).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
}

#[test]
fn test_oversized_command_rejected() {
    let long = "x".repeat(5000);
    let err = parse_args(&argv(&["-e", &long])).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Config);
}
