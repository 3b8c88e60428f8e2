//! # Metadata Module
//!
//! Structured descriptions of the contracts the generator works from:
//!
//! - [`InterfaceMeta`] / [`MethodMeta`] - a service trait and its methods
//! - [`ServiceMeta`] / [`RpcMeta`] - an RPC service as described by the protobuf compiler
//! - [`TableMeta`] / [`ColumnMeta`] - a database table, produced by schema introspection
//!
//! Interface metadata comes from the [`extract`] adapter (a `syn` pass over the trait
//! source) or from a JSON/YAML/TOML document written by any other extractor. Ordering
//! of methods, RPCs and columns is preserved everywhere; the generated output mirrors it.

pub mod extract;

use crate::error::{GenError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_receiver() -> String {
    "&self".to_string()
}

/// A named, typed parameter or result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// Binding name (`_` style names are kept as written)
    pub name: String,
    /// Type text as it appears in source
    #[serde(rename = "type")]
    pub ty: String,
    /// Error sentinel; never rendered as a data field
    #[serde(default)]
    pub error: bool,
}

impl FieldMeta {
    /// Data field
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            error: false,
        }
    }

    /// Error sentinel result
    pub fn error(ty: impl Into<String>) -> Self {
        Self {
            name: "err".to_string(),
            ty: ty.into(),
            error: true,
        }
    }
}

/// One method of a service trait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMeta {
    /// Method name
    pub name: String,
    /// Parameters in declaration order, receiver excluded
    #[serde(default)]
    pub params: Vec<FieldMeta>,
    /// Results in declaration order; at most one is the error sentinel
    #[serde(default)]
    pub results: Vec<FieldMeta>,
    /// `async fn`
    #[serde(default)]
    pub is_async: bool,
    /// Receiver text, `&self` unless the trait says otherwise
    #[serde(default = "default_receiver")]
    pub receiver: String,
    /// Generic parameter list including angle brackets, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generics: Option<String>,
    /// Where clause, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    /// Verbatim return type; derived from `results` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl MethodMeta {
    /// Method with no parameters or results
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            results: Vec::new(),
            is_async: false,
            receiver: default_receiver(),
            generics: None,
            where_clause: None,
            output: None,
        }
    }

    /// Results excluding the error sentinel
    pub fn data_results(&self) -> impl Iterator<Item = &FieldMeta> {
        self.results.iter().filter(|r| !r.error)
    }

    /// Error type, when the method can fail
    pub fn error_type(&self) -> Option<&str> {
        self.results.iter().find(|r| r.error).map(|r| r.ty.as_str())
    }

    /// Type of the success value: `()`, a single type, or a tuple
    pub fn data_type(&self) -> String {
        let data: Vec<&str> = self.data_results().map(|r| r.ty.as_str()).collect();
        match data.as_slice() {
            [] => "()".to_string(),
            [single] => (*single).to_string(),
            many => format!("({})", many.join(", ")),
        }
    }

    /// Return type as it should appear after `->`, or `None` for unit
    pub fn return_type(&self) -> Option<String> {
        if let Some(output) = &self.output {
            return Some(output.clone());
        }
        let data = self.data_type();
        match self.error_type() {
            Some(err) => Some(format!("Result<{data}, {err}>")),
            None if data == "()" => None,
            None => Some(data),
        }
    }

    /// Number of parameters, receiver excluded
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A service contract: one trait and its methods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceMeta {
    /// Trait name
    pub name: String,
    /// Methods in declaration order
    #[serde(default)]
    pub methods: Vec<MethodMeta>,
}

impl InterfaceMeta {
    /// Name of the implementation struct, `<Interface>Impl`
    pub fn impl_name(&self) -> String {
        format!("{}Impl", self.name)
    }

    /// Declared method names in order
    pub fn method_names(&self) -> Vec<&str> {
        self.methods.iter().map(|m| m.name.as_str()).collect()
    }
}

/// Streaming classification of an RPC
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    /// Request in, response out
    #[default]
    Unary,
    /// Stream of requests, single response
    ClientStream,
    /// Single request, stream of responses
    ServerStream,
    /// Streams both ways
    BidiStream,
}

/// Reference to a protobuf message type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    /// Message name or full path
    pub name: String,
    /// Defined outside the service's own `pb` module
    #[serde(default)]
    pub imported: bool,
}

impl MessageRef {
    /// Message declared in the service's own `pb` module
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            imported: false,
        }
    }

    /// Externally defined message, rendered by its own path
    pub fn imported(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            imported: true,
        }
    }

    /// Type path to use in generated code
    pub fn path(&self) -> String {
        if self.imported {
            self.name.clone()
        } else {
            format!("pb::{}", self.name)
        }
    }
}

/// One RPC of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcMeta {
    /// RPC name as declared in the proto (`SayHello`)
    pub name: String,
    /// Streaming kind
    #[serde(default)]
    pub stream: StreamKind,
    /// Request message
    pub request: MessageRef,
    /// Response message
    pub response: MessageRef,
}

/// An RPC service definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMeta {
    /// Service name (`Greeter`)
    pub name: String,
    /// RPCs in declaration order
    #[serde(default)]
    pub rpcs: Vec<RpcMeta>,
}

/// Index flavor of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Non-unique index
    Index,
    /// Unique index
    Unique,
}

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name
    pub name: String,
    /// Declared SQL type, as reported by the database
    pub sql_type: String,
    /// Column accepts NULL
    #[serde(default)]
    pub nullable: bool,
    /// Part of the primary key
    #[serde(default)]
    pub primary_key: bool,
    /// Index membership
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexKind>,
    /// Default expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// One table, columns in ordinal order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    /// Table name
    pub name: String,
    /// Columns
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,
    /// Table comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl TableMeta {
    /// First primary-key column
    pub fn primary_key(&self) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Load interface metadata from Rust source (`.rs`) or a metadata document
///
/// # Errors
///
/// Same as [`extract::extract_interface_file`] and [`load_document`].
pub fn load_interface(path: &Path) -> Result<InterfaceMeta> {
    match extension(path).as_str() {
        "rs" => extract::extract_interface_file(path, None),
        _ => load_document(path),
    }
}

/// Load a metadata document, choosing the format from the file extension
///
/// `.json` is parsed as JSON, `.toml` as TOML, anything else as YAML.
///
/// # Errors
///
/// Returns [`GenError::Io`] when the file cannot be read and [`GenError::Parse`]
/// when it does not describe a `T`.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
    let parsed = match extension(path).as_str() {
        "json" => serde_json::from_str(&content).map_err(|e| e.to_string()),
        "toml" => toml::from_str(&content).map_err(|e| e.to_string()),
        _ => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| GenError::Parse {
        path: path.to_path_buf(),
        message,
    })
}
