//! Unit tests for CLI commands
#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::cli::{db_config, run, Cli, Commands};
use crate::config::ConfigLayer;
use crate::logging::LogFormat;
use clap::Parser;
use std::fs;

#[test]
fn test_impl_command_parses() {
    let cli = Cli::try_parse_from(["svcgen", "impl", "--dir", "src/greeter"]).unwrap();
    match cli.command {
        Commands::Impl { dir, interface } => {
            assert_eq!(dir.to_string_lossy(), "src/greeter");
            assert!(interface.is_none());
        }
        other => panic!("Expected Impl command, got {other:?}"),
    }
    assert_eq!(cli.log_format, LogFormat::Pretty);
}

#[test]
fn test_db_command_with_flags() {
    let cli = Cli::try_parse_from([
        "svcgen",
        "db",
        "--dir",
        "out",
        "--driver",
        "sqlite",
        "--dsn",
        "sqlite://app.db",
        "--soft-delete",
        "--grpc",
        "--service",
        "svc.yaml",
        "--log-format",
        "json",
    ])
    .unwrap();

    assert_eq!(cli.log_format, LogFormat::Json);
    match cli.command {
        Commands::Db {
            driver,
            dsn,
            soft_delete,
            grpc,
            service,
            ..
        } => {
            assert_eq!(driver.as_deref(), Some("sqlite"));
            assert_eq!(dsn.as_deref(), Some("sqlite://app.db"));
            assert!(soft_delete);
            assert!(grpc);
            assert_eq!(service.unwrap().to_string_lossy(), "svc.yaml");
        }
        other => panic!("Expected Db command, got {other:?}"),
    }
}

#[test]
fn test_grpc_flag_requires_service() {
    let result = Cli::try_parse_from(["svcgen", "db", "--dir", "out", "--grpc"]);
    assert!(result.is_err());
}

#[test]
fn test_all_commands_parse() {
    let commands = vec![
        vec!["svcgen", "impl", "-d", "out", "-i", "svc.rs"],
        vec!["svcgen", "grpc", "--dir", "out", "--service", "svc.json"],
        vec!["svcgen", "db", "--dir", "out"],
        vec!["svcgen", "fix-imports", "lib.rs"],
    ];

    for args in commands {
        let cli = Cli::try_parse_from(&args);
        assert!(cli.is_ok(), "Failed to parse command: {:?}", args);
    }
}

#[test]
fn test_flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("svcgen.toml"),
        "driver = \"postgres\"\ndsn = \"postgres://file\"\ntable_prefix = \"app\"\n",
    )
    .unwrap();

    let flags = ConfigLayer {
        dsn: Some("postgres://flag".to_string()),
        ..ConfigLayer::default()
    };
    let config = db_config(dir.path().to_path_buf(), flags, None).unwrap();
    assert_eq!(config.driver, "postgres");
    assert_eq!(config.dsn, "postgres://flag");
    assert_eq!(config.table_prefix.as_deref(), Some("app"));
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = db_config(dir.path().to_path_buf(), ConfigLayer::default(), Some(&missing));
    assert!(err.is_err());
}

#[test]
fn test_fix_imports_command_rewrites_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("lib.rs");
    fs::write(&file, "use b;\nuse a;\nuse b;\n\nfn f() {}\n").unwrap();

    let cli = Cli::try_parse_from(["svcgen", "fix-imports", file.to_str().unwrap()]).unwrap();
    run(cli).unwrap();
    assert_eq!(fs::read_to_string(&file).unwrap(), "use a;\nuse b;\n\nfn f() {}\n");
}

#[test]
fn test_impl_command_reads_json_interface() {
    let dir = tempfile::tempdir().unwrap();
    let interface = dir.path().join("greeter.json");
    fs::write(
        &interface,
        r#"{"name":"Greeter","methods":[{"name":"hello","params":[{"name":"name","type":"String"}]},{"name":"bye"}]}"#,
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "svcgen",
        "impl",
        "--dir",
        dir.path().to_str().unwrap(),
        "--interface",
        interface.to_str().unwrap(),
    ])
    .unwrap();
    run(cli).unwrap();

    let text = fs::read_to_string(dir.path().join("svcimpl.rs")).unwrap();
    assert!(text.contains("impl Greeter for GreeterImpl {"));
    assert!(text.contains("fn hello(&self, name: String)"));
    assert!(text.contains("fn bye(&self)"));
}
