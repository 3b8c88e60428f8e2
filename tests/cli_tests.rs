#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{count, read, write, ACCOUNTS_SCHEMA_YAML, GREETER_SERVICE_YAML, GREETER_SVC};
use std::process::{Command, Output};

fn svcgen(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_svcgen"))
        .args(args)
        .env_remove("SVCGEN_DRIVER")
        .env_remove("SVCGEN_DSN")
        .env_remove("SVCGEN_TABLE_PREFIX")
        .env("SVCGEN_LOG", "warn")
        .output()
        .expect("run svcgen")
}

#[test]
fn test_cli_impl_creates_svcimpl() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "svc.rs", GREETER_SVC);

    let out = svcgen(&["impl", "--dir", dir.path().to_str().unwrap()]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let text = read(dir.path(), "svcimpl.rs");
    assert_eq!(count(&text, "fn hello("), 1);
    assert_eq!(count(&text, "fn bye("), 1);
}

#[test]
fn test_cli_grpc_uses_interface_impl_name() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "svc.rs", &GREETER_SVC.replace("Greeter", "Hello"));
    let service = write(dir.path(), "greeter.yaml", GREETER_SERVICE_YAML);
    write(
        dir.path(),
        "svcimpl.rs",
        "pub struct HelloImpl;\n\nimpl Hello for HelloImpl {\n    fn hello(&self, name: String) -> String {\n        name\n    }\n}\n",
    );

    let out = svcgen(&[
        "grpc",
        "--dir",
        dir.path().to_str().unwrap(),
        "--service",
        service.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let text = read(dir.path(), "svcimpl.rs");
    assert!(text.contains("impl pb::GreeterServer for HelloImpl {\n    fn hello(&self, name: String) -> String {"));
    assert!(!text.contains("impl Hello for HelloImpl"));
    assert_eq!(count(&text, "impl pb::GreeterServer for HelloImpl"), 1);
    assert_eq!(count(&text, "async fn say_hello("), 1);
}

#[test]
fn test_cli_db_with_config_file() {
    let root = tempfile::tempdir().unwrap();
    let schema = write(root.path(), "schema.yaml", ACCOUNTS_SCHEMA_YAML);
    let dir = root.path().join("accounts");
    write(
        &dir,
        "svcgen.toml",
        &format!("driver = \"declared\"\ndsn = \"{}\"\n", schema.display()),
    );

    let out = svcgen(&["db", "--dir", dir.to_str().unwrap(), "--soft-delete"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(read(&dir, "svc.rs").contains("pub trait Accounts {"));
    assert!(read(&dir, "query/user.rs").contains("deleted_at IS NULL"));
}

#[test]
fn test_cli_unknown_driver_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = svcgen(&[
        "db",
        "--dir",
        dir.path().to_str().unwrap(),
        "--driver",
        "oracle",
        "--dsn",
        "oracle://db",
    ]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error:"), "{stderr}");
    assert!(stderr.contains("oracle"), "{stderr}");
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[test]
fn test_cli_missing_interface_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = svcgen(&["impl", "--dir", dir.path().to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to read interface"));
}
