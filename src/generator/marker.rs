//! Marker comments that separate regenerable code from user-owned code.
//!
//! A `DO NOT EDIT` marker means the item or file is rewritten on every run. A
//! `YOU CAN EDIT` marker means it was generated once and now belongs to the user.
//! Deleting a `DO NOT EDIT` marker hands that code over to the user as well.

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker for code that is regenerated on every run
pub const DO_NOT_EDIT: &str = "// Code generated by svcgen. DO NOT EDIT.";

/// Marker for code generated once and then owned by the user
pub const YOU_CAN_EDIT: &str = "// Code generated by svcgen. YOU CAN EDIT.";

static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*// Code generated by svcgen\. (DO NOT EDIT|YOU CAN EDIT)\.\s*$")
        .expect("marker regex should be valid")
});

/// Ownership of a generated file or item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Regenerated wholesale
    DoNotEdit,
    /// Generated once, user-owned afterwards
    YouCanEdit,
}

impl Marker {
    /// Comment line for this marker
    pub fn line(self) -> &'static str {
        match self {
            Marker::DoNotEdit => DO_NOT_EDIT,
            Marker::YouCanEdit => YOU_CAN_EDIT,
        }
    }

    /// Classify a single line
    pub fn of_line(line: &str) -> Option<Marker> {
        let caps = MARKER_RE.captures(line)?;
        match caps.get(1)?.as_str() {
            "DO NOT EDIT" => Some(Marker::DoNotEdit),
            _ => Some(Marker::YouCanEdit),
        }
    }
}

/// File-level marker: the first marker found in the leading comment block
pub fn file_marker(text: &str) -> Option<Marker> {
    text.lines()
        .take_while(|l| {
            let t = l.trim();
            t.is_empty() || t.starts_with("//")
        })
        .find_map(Marker::of_line)
}

/// Prepend `marker` unless the leading comment block already carries one
pub fn ensure_file_marker(text: &str, marker: Marker) -> String {
    if file_marker(text).is_some() {
        return text.to_string();
    }
    format!("{}\n{text}", marker.line())
}

/// True when the line directly above the line holding `offset` is a `DO NOT EDIT` marker
pub fn regenerable_at(text: &str, offset: usize) -> bool {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    if line_start == 0 {
        return false;
    }
    let prev = &text[..line_start - 1];
    let prev_line = prev.rfind('\n').map_or(prev, |i| &prev[i + 1..]);
    Marker::of_line(prev_line) == Some(Marker::DoNotEdit)
}
