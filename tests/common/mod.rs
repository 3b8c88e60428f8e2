#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use svcgen::config::{ConfigLayer, GeneratorConfig};

pub const GREETER_SVC: &str = r#"pub trait Greeter {
    fn hello(&self, name: String) -> String;
    fn bye(&self);
}
"#;

pub const GREETER_SERVICE_YAML: &str = r#"name: Greeter
rpcs:
  - name: SayHello
    request: { name: HelloRequest }
    response: { name: HelloReply }
  - name: Chat
    stream: bidi_stream
    request: { name: ChatMessage }
    response: { name: ChatMessage }
  - name: Upload
    stream: client_stream
    request: { name: Chunk }
    response: { name: prost_types::Empty, imported: true }
  - name: Watch
    stream: server_stream
    request: { name: WatchRequest }
    response: { name: Event }
"#;

/// Schema document for the `declared` driver: one table with a soft-delete column
pub const ACCOUNTS_SCHEMA_YAML: &str = r#"dialect: sqlite
tables:
  - name: user
    comment: Registered users
    columns:
      - { name: id, sql_type: INTEGER, primary_key: true }
      - { name: email, sql_type: TEXT, index: unique }
      - { name: nick, sql_type: TEXT, nullable: true }
      - { name: deleted_at, sql_type: DATETIME, nullable: true }
"#;

pub fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

pub fn read(dir: &Path, rel: &str) -> String {
    fs::read_to_string(dir.join(rel)).unwrap()
}

pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// Every file under `dir` with its content, keyed by relative path
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, String> {
    let mut files = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let rel = path.strip_prefix(dir).unwrap().to_path_buf();
                files.insert(rel, fs::read_to_string(&path).unwrap());
            }
        }
    }
    files
}

pub fn db_config(dir: &Path, driver: &str, dsn: &str) -> GeneratorConfig {
    GeneratorConfig::from_layer(
        dir,
        ConfigLayer {
            driver: Some(driver.to_string()),
            dsn: Some(dsn.to_string()),
            soft_delete: Some(true),
            ..ConfigLayer::default()
        },
    )
}
