//! Text surgery located by the syntax tree.
//!
//! Files are never reprinted from the AST: positions come from a `syn` parse and the
//! edits are applied to the original text, so comments, formatting and hand-written
//! bodies outside the edited ranges survive byte for byte.

use syn::spanned::Spanned;
use syn::{Fields, FnArg, ImplItem, Item, ItemImpl, TraitItem};

use super::scan::is_type;
use crate::source::SourceFile;

/// One method or field inside a braced item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    /// Start of the member, leading attributes and doc comments included
    pub start: usize,
    /// Just past the member
    pub end: usize,
    /// Typed parameters, receiver excluded; zero for fields
    pub arity: usize,
}

/// A braced item with its members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Just past the opening brace
    pub open: usize,
    /// Offset of the closing brace
    pub close: usize,
    pub members: Vec<Member>,
}

impl Container {
    /// Member by name
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// An `impl` block for a given type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplBlock {
    /// Start of the block, attributes included
    pub start: usize,
    /// Trait path as written, with its byte range, for trait impls
    pub trait_path: Option<(String, usize, usize)>,
    /// Attributes as written
    pub attrs: Vec<String>,
    pub body: Container,
}

impl ImplBlock {
    /// Last segment of the implemented trait's path
    pub fn trait_name(&self) -> Option<&str> {
        let (path, _, _) = self.trait_path.as_ref()?;
        Some(last_segment(path))
    }
}

/// `pb::greeter::GreeterServer` -> `GreeterServer`
pub fn last_segment(path: &str) -> &str {
    let path = path.split('<').next().unwrap_or(path).trim();
    path.rsplit("::").next().unwrap_or(path).trim()
}

/// A single replacement of `start..end` by `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    /// Insert `text` at `at`
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
        }
    }

    /// Replace `start..end`
    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Apply non-overlapping edits
pub fn apply_edits(text: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
    let mut out = text.to_string();
    for edit in edits {
        out.replace_range(edit.start..edit.end, &edit.text);
    }
    out
}

fn container(src: &SourceFile, brace: &syn::token::Brace, members: Vec<Member>) -> Container {
    Container {
        open: src.end(brace.span.open()),
        close: src.start(brace.span.close()),
        members,
    }
}

fn impl_block(src: &SourceFile, item: &ItemImpl) -> ImplBlock {
    let members = item
        .items
        .iter()
        .filter_map(|it| match it {
            ImplItem::Fn(f) => Some(Member {
                name: f.sig.ident.to_string(),
                start: src.start(f.span()),
                end: src.end(f.span()),
                arity: f
                    .sig
                    .inputs
                    .iter()
                    .filter(|a| matches!(a, FnArg::Typed(_)))
                    .count(),
            }),
            _ => None,
        })
        .collect();
    let trait_path = item.trait_.as_ref().map(|(_, path, _)| {
        let span = path.span();
        (src.slice(span).to_string(), src.start(span), src.end(span))
    });
    ImplBlock {
        start: src.start(item.span()),
        trait_path,
        attrs: item
            .attrs
            .iter()
            .map(|a| src.slice(a.span()).to_string())
            .collect(),
        body: container(src, &item.brace_token, members),
    }
}

/// Top-level `impl` blocks whose self type is `impl_name`, in file order
pub fn impl_blocks(src: &SourceFile, file: &syn::File, impl_name: &str) -> Vec<ImplBlock> {
    file.items
        .iter()
        .filter_map(|item| match item {
            Item::Impl(i) if is_type(&i.self_ty, impl_name) => Some(impl_block(src, i)),
            _ => None,
        })
        .collect()
}

/// Body of the top-level trait named `name`
pub fn trait_body(src: &SourceFile, file: &syn::File, name: &str) -> Option<Container> {
    file.items.iter().find_map(|item| match item {
        Item::Trait(t) if t.ident == name => {
            let members = t
                .items
                .iter()
                .filter_map(|ti| match ti {
                    TraitItem::Fn(f) => Some(Member {
                        name: f.sig.ident.to_string(),
                        start: src.start(f.span()),
                        end: src.end(f.span()),
                        arity: f
                            .sig
                            .inputs
                            .iter()
                            .filter(|a| matches!(a, FnArg::Typed(_)))
                            .count(),
                    }),
                    _ => None,
                })
                .collect();
            Some(container(src, &t.brace_token, members))
        }
        _ => None,
    })
}

/// Named fields of the top-level struct `name`, plus whether the last one has a
/// trailing comma
pub fn struct_fields(src: &SourceFile, file: &syn::File, name: &str) -> Option<(Container, bool)> {
    file.items.iter().find_map(|item| match item {
        Item::Struct(s) if s.ident == name => match &s.fields {
            Fields::Named(named) => {
                let members = named
                    .named
                    .iter()
                    .map(|f| Member {
                        name: f.ident.as_ref().map(ToString::to_string).unwrap_or_default(),
                        start: src.start(f.span()),
                        end: src.end(f.span()),
                        arity: 0,
                    })
                    .collect();
                let trailing = named.named.empty_or_trailing();
                Some((container(src, &named.brace_token, members), trailing))
            }
            _ => None,
        },
        _ => None,
    })
}

/// Edit placing `block` (indented, no trailing newline) before the closing brace
///
/// When the brace sits alone on its line the block goes on its own lines above it,
/// separated from existing members by one blank line.
pub fn insert_members(text: &str, body: &Container, block: &str) -> Edit {
    let line_start = text[..body.close].rfind('\n').map_or(0, |i| i + 1);
    let brace_alone = line_start > body.open && text[line_start..body.close].trim().is_empty();
    if brace_alone {
        let between = text[body.open..line_start].trim();
        if between.is_empty() {
            Edit::insert(line_start, format!("{block}\n"))
        } else {
            Edit::insert(line_start, format!("\n{block}\n"))
        }
    } else {
        Edit::insert(body.close, format!("\n{block}\n"))
    }
}

/// Append an item at the end of the file, separated by one blank line
pub fn append_item(text: &str, item: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        format!("{item}\n")
    } else {
        format!("{trimmed}\n\n{item}\n")
    }
}
