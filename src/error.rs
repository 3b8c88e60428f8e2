//! Error taxonomy for a generation run.
//!
//! Every variant is fatal: the pipeline never retries and never guesses. The CLI
//! wraps these in `anyhow` for reporting and exits non-zero.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while generating or merging service code
#[derive(Debug, Error)]
pub enum GenError {
    /// Missing or inconsistent configuration; raised before any file is touched
    #[error("configuration error: {0}")]
    Config(String),

    /// The requested backend driver has no registration
    #[error("configuration error: driver not supported: {name}")]
    UnsupportedDriver {
        /// Driver name as requested
        name: String,
    },

    /// The database could not be opened or introspected
    #[error("connection error ({driver}): {message}")]
    Connect {
        /// Driver that attempted the connection
        driver: String,
        /// Underlying driver message
        message: String,
    },

    /// Existing source could not be parsed, so the implemented set is unknown
    #[error("parse error in {path}: {message}")]
    Parse {
        /// File that failed to parse
        path: PathBuf,
        /// Parser diagnostic with line and column
        message: String,
    },

    /// Template rendering failed or produced invalid Rust
    #[error("render error ({template}): {message}")]
    Render {
        /// Template or artifact being rendered
        template: String,
        /// What went wrong
        message: String,
    },

    /// Reading a file or directory failed
    #[error("i/o error on {path}: {source}")]
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Writing a generated file failed
    #[error("write error on {path}: {source}")]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl GenError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, err: &syn::Error) -> Self {
        let start = err.span().start();
        GenError::Parse {
            path: path.into(),
            message: format!("{}:{}: {err}", start.line, start.column + 1),
        }
    }

    pub(crate) fn render(template: impl Into<String>, message: impl ToString) -> Self {
        GenError::Render {
            template: template.into(),
            message: message.to_string(),
        }
    }

    /// True for errors raised before any generation work started
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            GenError::Config(_) | GenError::UnsupportedDriver { .. }
        )
    }
}

/// Result alias used throughout the library
pub type Result<T, E = GenError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_driver_message_names_driver() {
        let err = GenError::UnsupportedDriver {
            name: "oracle".into(),
        };
        assert!(err.to_string().contains("driver not supported"));
        assert!(err.to_string().contains("oracle"));
        assert!(err.is_config());
    }

    #[test]
    fn parse_error_carries_position() {
        let err = match syn::parse_file("struct Broken {\n    a: u8,\n    fn oops() {}\n}\n") {
            Err(e) => e,
            Ok(_) => panic!("expected a parse failure"),
        };
        let gen = GenError::parse("svcimpl.rs", &err);
        let text = gen.to_string();
        assert!(text.starts_with("parse error in svcimpl.rs: 3:"), "{text}");
        assert!(!gen.is_config());
    }
}
