//! Source text paired with a line index.
//!
//! `syn` reports positions as line/column pairs (columns counted in characters). The
//! merge engine edits raw text, so every span is mapped back to a byte offset here.

use crate::error::{GenError, Result};
use proc_macro2::{LineColumn, Span};
use std::fs;
use std::path::{Path, PathBuf};

/// Text of one Rust source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Wrap in-memory text; `path` is only used in diagnostics
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let mut text = text.into();
        if let Some(stripped) = text.strip_prefix('\u{feff}') {
            text = stripped.to_string();
        }
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            path: path.into(),
            text,
            line_starts,
        }
    }

    /// Read a file from disk
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
        Ok(Self::new(path, text))
    }

    /// Path used in diagnostics
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume into the underlying text
    pub fn into_text(self) -> String {
        self.text
    }

    /// Parse as a Rust file
    pub fn parse(&self) -> Result<syn::File> {
        syn::parse_file(&self.text).map_err(|e| GenError::parse(&self.path, &e))
    }

    /// Byte offset of a line/column position
    pub fn offset(&self, pos: LineColumn) -> usize {
        let Some(&line_start) = pos.line.checked_sub(1).and_then(|l| self.line_starts.get(l))
        else {
            return self.text.len();
        };
        self.text[line_start..]
            .char_indices()
            .nth(pos.column)
            .map(|(i, _)| line_start + i)
            .unwrap_or(self.text.len())
    }

    /// Byte offset where a span starts
    pub fn start(&self, span: Span) -> usize {
        self.offset(span.start())
    }

    /// Byte offset just past the end of a span
    pub fn end(&self, span: Span) -> usize {
        self.offset(span.end())
    }

    /// Verbatim text covered by a span
    pub fn slice(&self, span: Span) -> &str {
        let start = self.start(span);
        let end = self.end(span).max(start);
        &self.text[start..end]
    }

    /// Byte offset of the start of the line containing `offset`
    pub fn line_start(&self, offset: usize) -> usize {
        self.text[..offset].rfind('\n').map_or(0, |i| i + 1)
    }

    /// Byte offset just past the newline ending the line containing `offset`
    pub fn line_end(&self, offset: usize) -> usize {
        self.text[offset..]
            .find('\n')
            .map_or(self.text.len(), |i| offset + i + 1)
    }
}
