//! Import Fixer.
//!
//! Collects every top-level `use` item of a file plus the imports a generator
//! requires, flattens use trees into one canonical path per import, deduplicates
//! them, and writes them back as a single sorted block where the first `use` used to
//! be. Items carrying attributes (`#[cfg(test)] use ...`) are left where they are.
//!
//! Running the fixer on its own output changes nothing.

use crate::error::Result;
use crate::source::SourceFile;
use std::collections::{BTreeMap, BTreeSet};
use syn::spanned::Spanned;
use syn::{Item, UseTree, Visibility};

/// One flattened import, `std::sync::Arc` or `crate::transport::grpc as pb`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UseEntry {
    path: String,
    vis: String,
}

impl UseEntry {
    /// Private import
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            vis: String::new(),
        }
    }

    /// `pub use` re-export
    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            vis: "pub".to_string(),
        }
    }

    /// Canonical path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The import as a single `use` line
    pub fn render(&self) -> String {
        if self.vis.is_empty() {
            format!("use {};", self.path)
        } else {
            format!("{} use {};", self.vis, self.path)
        }
    }
}

/// `pub` over `pub(...)` over private
fn vis_rank(vis: &str) -> u8 {
    match vis {
        "" => 0,
        "pub" => 2,
        _ => 1,
    }
}

/// One entry per path, keeping the widest visibility; a path imported twice with
/// different visibilities would be defined twice
fn dedup<'a>(entries: impl IntoIterator<Item = &'a UseEntry>) -> Vec<&'a UseEntry> {
    let mut by_path: BTreeMap<&str, &UseEntry> = BTreeMap::new();
    for entry in entries {
        by_path
            .entry(entry.path.as_str())
            .and_modify(|kept| {
                if vis_rank(&entry.vis) > vis_rank(&kept.vis) {
                    *kept = entry;
                }
            })
            .or_insert(entry);
    }
    by_path.into_values().collect()
}

/// Render a sorted block, one `use` per line, newline-terminated
pub fn render_block<'a>(entries: impl IntoIterator<Item = &'a UseEntry>) -> String {
    let mut block = String::new();
    for entry in dedup(entries) {
        block.push_str(&entry.render());
        block.push('\n');
    }
    block
}

fn flatten(tree: &UseTree, prefix: &str, out: &mut Vec<String>) {
    match tree {
        UseTree::Path(p) => flatten(&p.tree, &format!("{prefix}{}::", p.ident), out),
        UseTree::Name(n) if n.ident == "self" => {
            out.push(prefix.trim_end_matches("::").to_string());
        }
        UseTree::Name(n) => out.push(format!("{prefix}{}", n.ident)),
        UseTree::Rename(r) if r.ident == "self" => {
            out.push(format!("{} as {}", prefix.trim_end_matches("::"), r.rename));
        }
        UseTree::Rename(r) => out.push(format!("{prefix}{} as {}", r.ident, r.rename)),
        UseTree::Glob(_) => out.push(format!("{prefix}*")),
        UseTree::Group(g) => {
            for item in &g.items {
                flatten(item, prefix, out);
            }
        }
    }
}

fn vis_text(src: &SourceFile, vis: &Visibility) -> String {
    match vis {
        Visibility::Inherited => String::new(),
        Visibility::Public(_) => "pub".to_string(),
        Visibility::Restricted(r) => src.slice(r.span()).to_string(),
    }
}

/// Flattened imports currently declared at the top level of a file
pub fn collect(src: &SourceFile, file: &syn::File) -> BTreeSet<UseEntry> {
    let mut entries = BTreeSet::new();
    for item in &file.items {
        let Item::Use(u) = item else { continue };
        if !u.attrs.is_empty() {
            continue;
        }
        let vis = vis_text(src, &u.vis);
        let prefix = if u.leading_colon.is_some() { "::" } else { "" };
        let mut paths = Vec::new();
        flatten(&u.tree, prefix, &mut paths);
        entries.extend(paths.into_iter().map(|path| UseEntry {
            path,
            vis: vis.clone(),
        }));
    }
    entries
}

/// Byte range of an item, widened to whole lines when it sits alone on them
fn item_range(src: &SourceFile, span: proc_macro2::Span) -> (usize, usize, bool) {
    let text = src.text();
    let (start, end) = (src.start(span), src.end(span));
    let (line_start, line_end) = (src.line_start(start), src.line_end(end));
    let alone = text[line_start..start].trim().is_empty() && text[end..line_end].trim().is_empty();
    if alone {
        (line_start, line_end, true)
    } else {
        (start, end, false)
    }
}

/// Where a block goes when the file has no `use` items: after inner attributes and
/// plain `//` header comments
fn preamble_end(src: &SourceFile, file: &syn::File) -> usize {
    let text = src.text();
    let mut offset = file
        .attrs
        .iter()
        .map(|a| src.line_end(src.end(a.span())))
        .max()
        .unwrap_or(0);
    while offset < text.len() {
        let next = src.line_end(offset);
        let line = text[offset..next].trim();
        if !line.starts_with("//") || line.starts_with("///") || line.starts_with("//!") {
            break;
        }
        offset = next;
    }
    offset
}

fn skip_blank_lines(mut tail: &str) -> &str {
    while let Some(i) = tail.find('\n') {
        if !tail[..i].trim().is_empty() {
            break;
        }
        tail = &tail[i + 1..];
    }
    tail
}

/// Merge all top-level imports of `src` with `required` into one sorted block
///
/// # Errors
///
/// Returns [`GenError::Parse`](crate::error::GenError::Parse) when `src` is not valid Rust.
pub fn fix_imports(src: &SourceFile, required: &[UseEntry]) -> Result<String> {
    let file = src.parse()?;
    let text = src.text();

    let mut entries = collect(src, &file);
    entries.extend(required.iter().cloned());
    if entries.is_empty() {
        return Ok(text.to_string());
    }

    let ranges: Vec<(usize, usize, bool)> = file
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Use(u) if u.attrs.is_empty() => Some(item_range(src, u.span())),
            _ => None,
        })
        .collect();

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut insert_at = None;
    for (i, &(start, end, whole)) in ranges.iter().enumerate() {
        out.push_str(&text[cursor..start]);
        let mut end = end;
        if i == 0 {
            insert_at = Some(out.len());
        } else if whole && (out.is_empty() || out.ends_with("\n\n")) && text[end..].starts_with('\n') {
            // removing a line between two blank lines leaves a single blank line
            end += 1;
        }
        cursor = end;
    }
    out.push_str(&text[cursor..]);

    let insert_at = match insert_at {
        Some(at) => at,
        None => preamble_end(src, &file),
    };
    let (head, tail) = out.split_at(insert_at);
    let tail = skip_blank_lines(tail);

    let mut fixed = String::with_capacity(out.len() + 64);
    fixed.push_str(head);
    if !head.is_empty() && !head.ends_with('\n') && ranges.is_empty() {
        fixed.push('\n');
    }
    fixed.push_str(&render_block(&entries));
    if !tail.trim().is_empty() {
        fixed.push('\n');
        fixed.push_str(tail);
    }
    let end = fixed.trim_end().len();
    fixed.truncate(end);
    fixed.push('\n');
    Ok(fixed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use proptest::prelude::*;

    fn fix(text: &str, required: &[UseEntry]) -> String {
        fix_imports(&SourceFile::new("t.rs", text), required).unwrap()
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.lines().filter(|l| l.trim() == needle).count()
    }

    #[test]
    fn merges_two_overlapping_blocks() {
        let text = "use context;\nuse pkg_a;\n\nfn f() {}\n\nuse pkg_a;\nuse pkg_b;\n";
        let fixed = fix(text, &[]);
        assert_eq!(fixed, "use context;\nuse pkg_a;\nuse pkg_b;\n\nfn f() {}\n");
    }

    #[test]
    fn flattens_groups_renames_and_self() {
        let text = "use std::{fmt, io::{self, Write}};\nuse crate::transport::grpc as pb;\npub use user::User;\nuse ::serde::*;\n";
        let fixed = fix(text, &[]);
        assert_eq!(
            fixed,
            "use ::serde::*;\nuse crate::transport::grpc as pb;\nuse std::fmt;\nuse std::io;\nuse std::io::Write;\npub use user::User;\n"
        );
    }

    #[test]
    fn adds_required_after_header_when_no_imports() {
        let text = "// Code generated by svcgen. YOU CAN EDIT.\n\npub struct A;\n";
        let fixed = fix(text, &[UseEntry::new("std::sync::Arc")]);
        assert_eq!(
            fixed,
            "// Code generated by svcgen. YOU CAN EDIT.\nuse std::sync::Arc;\n\npub struct A;\n"
        );
    }

    #[test]
    fn attributed_imports_stay_in_place() {
        let text = "use b;\n\n#[cfg(test)]\nuse a;\n\nfn f() {}\n";
        let fixed = fix(text, &[]);
        assert_eq!(fixed, text);
    }

    #[test]
    fn comments_between_items_survive() {
        let text = "use b;\n// keep me\nuse a;\n\n/// docs\nfn f() {}\n";
        let fixed = fix(text, &[]);
        assert!(fixed.starts_with("use a;\nuse b;\n"));
        assert!(fixed.contains("// keep me\n"));
        assert!(fixed.contains("/// docs\nfn f() {}\n"));
        assert_eq!(fix(&fixed, &[]), fixed);
    }

    #[test]
    fn same_path_keeps_the_widest_visibility() {
        let text = "use user::User;\npub(crate) use team::Team;\n\npub mod team;\npub mod user;\n";
        let fixed = fix(
            text,
            &[UseEntry::public("user::User"), UseEntry::public("team::Team")],
        );
        assert_eq!(
            fixed,
            "pub use team::Team;\npub use user::User;\n\npub mod team;\npub mod user;\n"
        );
        assert_eq!(fix(&fixed, &[UseEntry::new("user::User")]), fixed);
    }

    #[test]
    fn file_without_imports_is_untouched() {
        let text = "fn f() {}\n";
        assert_eq!(fix(text, &[]), text);
    }

    fn path_strategy() -> impl Strategy<Value = String> {
        "[a-c]{1,2}(::[A-C][a-c]{0,2})?"
    }

    proptest! {
        #[test]
        fn union_without_duplicates_and_idempotent(
            first in prop::collection::btree_set(path_strategy(), 0..5),
            second in prop::collection::btree_set(path_strategy(), 0..5),
        ) {
            let mut text = String::new();
            for p in &first {
                text.push_str(&format!("use {p};\n"));
            }
            text.push_str("\nfn body() {}\n\n");
            for p in &second {
                text.push_str(&format!("use {p};\n"));
            }

            let fixed = fix(&text, &[]);
            for p in first.union(&second) {
                prop_assert_eq!(count(&fixed, &format!("use {p};")), 1);
            }
            prop_assert_eq!(count(&fixed, "fn body() {}"), 1);
            prop_assert!(syn::parse_file(&fixed).is_ok());
            prop_assert_eq!(fix(&fixed, &[]), fixed.clone());
        }
    }
}
