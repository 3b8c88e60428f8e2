//! Existing-code scanner.
//!
//! Parses every `.rs` file directly inside the output directory and records which
//! methods are already implemented for the implementation type, in any `impl` block
//! (trait or inherent) and any file. Matching is by method name.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use syn::{FnArg, ImplItem, Item, Type};
use tracing::{debug, warn};

use crate::error::{GenError, Result};
use crate::source::SourceFile;

/// Methods already implemented for one type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImplementedSet {
    arity: BTreeMap<String, usize>,
    orphans: Vec<String>,
}

impl ImplementedSet {
    /// True when a method named `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.arity.contains_key(name)
    }

    /// Parameter count of the implemented method, receiver excluded
    pub fn arity(&self, name: &str) -> Option<usize> {
        self.arity.get(name).copied()
    }

    /// Implemented methods the interface does not declare
    pub fn orphans(&self) -> &[String] {
        &self.orphans
    }

    /// Number of implemented methods
    pub fn len(&self) -> usize {
        self.arity.len()
    }

    /// True when nothing is implemented
    pub fn is_empty(&self) -> bool {
        self.arity.is_empty()
    }

    fn insert(&mut self, name: String, arity: usize) {
        self.arity.entry(name).or_insert(arity);
    }
}

/// True when `ty` names `impl_name` (last path segment)
pub(crate) fn is_type(ty: &Type, impl_name: &str) -> bool {
    match ty {
        Type::Path(tp) => tp
            .path
            .segments
            .last()
            .is_some_and(|s| s.ident == impl_name),
        _ => false,
    }
}

/// Methods implemented for `impl_name` in one parsed file
///
/// Only top-level `impl` blocks count; blocks nested in modules or function bodies
/// (test helpers and the like) are not part of the implementation.
pub fn scan_file(file: &syn::File, impl_name: &str) -> Vec<(String, usize)> {
    file.items
        .iter()
        .filter_map(|item| match item {
            Item::Impl(block) if is_type(&block.self_ty, impl_name) => Some(block),
            _ => None,
        })
        .flat_map(|block| &block.items)
        .filter_map(|item| match item {
            ImplItem::Fn(f) => Some((f.sig.ident.to_string(), arity(&f.sig))),
            _ => None,
        })
        .collect()
}

fn arity(sig: &syn::Signature) -> usize {
    sig.inputs
        .iter()
        .filter(|a| matches!(a, FnArg::Typed(_)))
        .count()
}

/// `.rs` files directly inside `dir`, sorted by name
pub fn rust_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(GenError::io(dir, e)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| GenError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "rs") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Scan `dir` for methods of `impl_name`
///
/// `declared` is the interface's method list; implemented methods outside it are
/// reported as orphans and never touched.
///
/// # Errors
///
/// Any unreadable or unparsable file is fatal: with an unknown implemented set the
/// merge could duplicate methods.
pub fn scan_dir(dir: &Path, impl_name: &str, declared: &[&str]) -> Result<ImplementedSet> {
    let mut set = ImplementedSet::default();
    for path in rust_files(dir)? {
        let src = SourceFile::read(&path)?;
        let file = src.parse()?;
        for (name, arity) in scan_file(&file, impl_name) {
            set.insert(name, arity);
        }
    }
    set.orphans = set
        .arity
        .keys()
        .filter(|name| !declared.contains(&name.as_str()))
        .cloned()
        .collect();
    for orphan in &set.orphans {
        debug!(impl_name, method = %orphan, "Implemented method is not declared by the interface");
    }
    debug!(impl_name, implemented = set.len(), "Scanned existing implementation");
    Ok(set)
}

/// Warn for every implemented method whose parameter count differs from its
/// declaration; the method is left as it is
pub fn warn_arity_drift<'a>(
    set: &ImplementedSet,
    declared: impl IntoIterator<Item = (&'a str, usize)>,
) {
    for (name, expected) in declared {
        if let Some(found) = set.arity(name) {
            if found != expected {
                warn!(
                    method = name,
                    expected, found, "Implemented method signature differs from the interface"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn collects_methods_from_all_blocks_and_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("svcimpl.rs"),
            "impl Greeter for GreeterImpl {\n    fn hello(&self, name: String) -> String { name }\n}\nimpl GreeterImpl {\n    fn new() -> Self { GreeterImpl }\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("extra.rs"),
            "impl crate::svcimpl::GreeterImpl {\n    fn bye(&self) {}\n}\nimpl Other for Unrelated {\n    fn ping(&self) {}\n}\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not rust {").unwrap();

        let set = scan_dir(dir.path(), "GreeterImpl", &["hello", "bye", "ping"]).unwrap();
        assert!(set.contains("hello"));
        assert!(set.contains("bye"));
        assert!(!set.contains("ping"));
        assert_eq!(set.arity("hello"), Some(1));
        assert_eq!(set.orphans(), ["new".to_string()]);
    }

    #[test]
    fn nested_impl_blocks_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("svcimpl.rs"),
            "impl Greeter for GreeterImpl {\n    fn hello(&self) {}\n}\n\n#[cfg(test)]\nmod tests {\n    impl super::GreeterImpl {\n        fn bye(&self) {}\n    }\n}\n\nfn helper() {\n    impl GreeterImpl {\n        fn ping(&self) {}\n    }\n}\n",
        )
        .unwrap();

        let set = scan_dir(dir.path(), "GreeterImpl", &["hello", "bye", "ping"]).unwrap();
        assert!(set.contains("hello"));
        assert!(!set.contains("bye"));
        assert!(!set.contains("ping"));
    }

    #[test]
    fn unparsable_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.rs"), "struct A {\n    fn\n}\n").unwrap();
        let err = scan_dir(dir.path(), "GreeterImpl", &[]).unwrap_err();
        assert!(matches!(err, GenError::Parse { .. }));
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = scan_dir(&dir.path().join("absent"), "GreeterImpl", &[]).unwrap();
        assert!(set.is_empty());
    }
}
