//! Generator configuration.
//!
//! A [`GeneratorConfig`] is assembled once per run from layers, highest precedence
//! first: command-line flags (clap also folds in `SVCGEN_*` environment variables),
//! an optional `svcgen.toml`, then defaults. It is immutable afterwards.

use crate::error::{GenError, Result};
use crate::generator::naming::to_pascal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the target directory
pub const CONFIG_FILE_NAME: &str = "svcgen.toml";

/// Default soft-delete column
pub const DEFAULT_SOFT_DELETE_COLUMN: &str = "deleted_at";

/// One configuration layer; unset values fall through to the next layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub driver: Option<String>,
    pub dsn: Option<String>,
    pub soft_delete: Option<bool>,
    pub soft_delete_column: Option<String>,
    pub table_prefix: Option<String>,
    pub grpc: Option<bool>,
    /// RPC service document
    pub service: Option<PathBuf>,
    /// Service trait name override
    pub service_name: Option<String>,
}

impl ConfigLayer {
    /// Fill every unset value from `lower`
    pub fn or(self, lower: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            driver: self.driver.or(lower.driver),
            dsn: self.dsn.or(lower.dsn),
            soft_delete: self.soft_delete.or(lower.soft_delete),
            soft_delete_column: self.soft_delete_column.or(lower.soft_delete_column),
            table_prefix: self.table_prefix.or(lower.table_prefix),
            grpc: self.grpc.or(lower.grpc),
            service: self.service.or(lower.service),
            service_name: self.service_name.or(lower.service_name),
        }
    }
}

/// Complete configuration of a database generation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Target directory
    pub dir: PathBuf,
    /// Registered driver name
    pub driver: String,
    /// Connection string, or schema document path for the `declared` driver
    pub dsn: String,
    pub soft_delete: bool,
    pub soft_delete_column: String,
    /// Also generate the RPC implementation
    pub grpc: bool,
    /// Namespace for every generated table accessor
    pub table_prefix: Option<String>,
    /// RPC service document
    pub service: Option<PathBuf>,
    /// Service trait name override
    pub service_name: Option<String>,
}

impl GeneratorConfig {
    /// Resolve layers (highest precedence first) against `dir`
    pub fn from_layer(dir: impl Into<PathBuf>, layer: ConfigLayer) -> Self {
        Self {
            dir: dir.into(),
            driver: layer.driver.unwrap_or_default(),
            dsn: layer.dsn.unwrap_or_default(),
            soft_delete: layer.soft_delete.unwrap_or(false),
            soft_delete_column: layer
                .soft_delete_column
                .unwrap_or_else(|| DEFAULT_SOFT_DELETE_COLUMN.to_string()),
            grpc: layer.grpc.unwrap_or(false),
            table_prefix: layer.table_prefix,
            service: layer.service,
            service_name: layer.service_name,
        }
    }

    /// Reject configurations that cannot drive a run
    ///
    /// # Errors
    ///
    /// [`GenError::Config`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.dir.as_os_str().is_empty() {
            return Err(GenError::Config("output directory is empty".to_string()));
        }
        if self.driver.trim().is_empty() {
            return Err(GenError::Config("driver is required".to_string()));
        }
        if self.dsn.trim().is_empty() {
            return Err(GenError::Config("dsn is required".to_string()));
        }
        if self.soft_delete && self.soft_delete_column.trim().is_empty() {
            return Err(GenError::Config(
                "soft delete is enabled but the soft-delete column is empty".to_string(),
            ));
        }
        if self.grpc && self.service.is_none() {
            return Err(GenError::Config(
                "grpc generation requires a service document".to_string(),
            ));
        }
        Ok(())
    }

    /// Service trait name: the override, else the directory name in UpperCamel case
    pub fn service_name(&self) -> String {
        if let Some(name) = self.service_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let base = self
            .dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .or_else(|| {
                self.dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        let name = to_pascal(&base);
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            format!("Service{name}")
        } else {
            name
        }
    }

    /// Table prefix without a trailing dot, `None` when unset or empty
    pub fn table_prefix(&self) -> Option<&str> {
        self.table_prefix
            .as_deref()
            .map(|p| p.trim().trim_end_matches('.'))
            .filter(|p| !p.is_empty())
    }

    /// `prefix.table`, or `table` without a prefix
    pub fn qualify(&self, table: &str) -> String {
        match self.table_prefix() {
            Some(prefix) => format!("{prefix}.{table}"),
            None => table.to_string(),
        }
    }

    /// Soft-delete column when soft delete is enabled
    pub fn soft_delete_column(&self) -> Option<&str> {
        self.soft_delete.then_some(self.soft_delete_column.as_str())
    }
}

/// Load a config layer from a TOML file
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// [`GenError::Io`] when the file cannot be read, [`GenError::Config`] when it is not
/// a valid config document.
pub fn load_config_file(path: &Path) -> Result<Option<ConfigLayer>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
    let layer: ConfigLayer = toml::from_str(&contents).map_err(|e| {
        GenError::Config(format!("failed to parse {}: {e}", path.display()))
    })?;
    Ok(Some(layer))
}

/// `svcgen.toml` inside `dir`, if it exists
pub fn auto_detect_config_path(dir: &Path) -> Option<PathBuf> {
    let path = dir.join(CONFIG_FILE_NAME);
    path.exists().then_some(path)
}

/// Resolve the config file path
///
/// Priority:
/// 1. Explicitly provided path (via CLI); it must exist
/// 2. `svcgen.toml` in the target directory
/// 3. None
pub fn resolve_config_path(explicit: Option<&Path>, dir: &Path) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) if path.exists() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(GenError::Config(format!(
            "config file not found: {}",
            path.display()
        ))),
        None => Ok(auto_detect_config_path(dir)),
    }
}
