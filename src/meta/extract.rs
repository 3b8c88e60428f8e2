//! `syn` adapter producing [`InterfaceMeta`] from a trait definition.
//!
//! Parameter and return types are sliced verbatim from the source so the generated
//! signatures match what the author wrote, spacing included.

use super::{FieldMeta, InterfaceMeta, MethodMeta};
use crate::error::{GenError, Result};
use crate::source::SourceFile;
use std::path::Path;
use syn::spanned::Spanned;
use syn::{FnArg, GenericArgument, Item, Pat, PathArguments, ReturnType, TraitItem, Type};

/// Read `path` and extract the named trait (or the first trait when `name` is `None`)
pub fn extract_interface_file(path: &Path, name: Option<&str>) -> Result<InterfaceMeta> {
    let src = SourceFile::read(path)?;
    extract_interface(&src, name)
}

/// Extract the named trait (or the first trait) from parsed source
///
/// # Errors
///
/// [`GenError::Parse`] when the source is not valid Rust or holds no matching trait.
pub fn extract_interface(src: &SourceFile, name: Option<&str>) -> Result<InterfaceMeta> {
    let file = src.parse()?;
    let item = file
        .items
        .iter()
        .find_map(|item| match item {
            Item::Trait(t) if name.map_or(true, |n| t.ident == n) => Some(t),
            _ => None,
        })
        .ok_or_else(|| GenError::Parse {
            path: src.path().to_path_buf(),
            message: match name {
                Some(n) => format!("trait `{n}` not found"),
                None => "no trait found".to_string(),
            },
        })?;

    let methods = item
        .items
        .iter()
        .filter_map(|ti| match ti {
            TraitItem::Fn(f) => Some(method_meta(src, &f.sig)),
            _ => None,
        })
        .collect();

    Ok(InterfaceMeta {
        name: item.ident.to_string(),
        methods,
    })
}

fn method_meta(src: &SourceFile, sig: &syn::Signature) -> MethodMeta {
    let mut meta = MethodMeta::new(sig.ident.to_string());
    meta.is_async = sig.asyncness.is_some();
    // associated functions have no receiver
    meta.receiver.clear();

    if !sig.generics.params.is_empty() {
        meta.generics = Some(src.slice(sig.generics.span()).to_string());
    }
    if let Some(wc) = &sig.generics.where_clause {
        meta.where_clause = Some(src.slice(wc.span()).to_string());
    }

    for (i, arg) in sig.inputs.iter().enumerate() {
        match arg {
            FnArg::Receiver(r) => meta.receiver = src.slice(r.span()).to_string(),
            FnArg::Typed(pt) => {
                let name = match &*pt.pat {
                    Pat::Ident(id) => id.ident.to_string(),
                    Pat::Wild(_) => format!("_arg{i}"),
                    other => src.slice(other.span()).to_string(),
                };
                meta.params.push(FieldMeta::new(name, src.slice(pt.ty.span())));
            }
        }
    }

    if let ReturnType::Type(_, ty) = &sig.output {
        meta.output = Some(src.slice(ty.span()).to_string());
        meta.results = results_of(src, ty);
    }
    meta
}

/// Split a return type into data results and an optional error sentinel
///
/// `Result<T, E>` yields `T` plus error `E`; a one-argument alias such as
/// `anyhow::Result<T>` yields error `anyhow::Error`. Tuples become one result per
/// element.
fn results_of(src: &SourceFile, ty: &Type) -> Vec<FieldMeta> {
    let Some((data, err)) = split_result(src, ty) else {
        return data_results(src, ty);
    };
    let mut results = data.map(|d| data_results(src, d)).unwrap_or_default();
    results.push(FieldMeta::error(err));
    results
}

fn split_result<'a>(src: &SourceFile, ty: &'a Type) -> Option<(Option<&'a Type>, String)> {
    let Type::Path(tp) = ty else {
        return None;
    };
    let last = tp.path.segments.last()?;
    if last.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    let types: Vec<&Type> = args
        .args
        .iter()
        .filter_map(|a| match a {
            GenericArgument::Type(t) => Some(t),
            _ => None,
        })
        .collect();
    match types.as_slice() {
        [data, err] => Some((Some(*data), src.slice(err.span()).to_string())),
        [data] => {
            let prefix: Vec<String> = tp
                .path
                .segments
                .iter()
                .take(tp.path.segments.len() - 1)
                .map(|s| s.ident.to_string())
                .collect();
            let err = if prefix.is_empty() {
                "Error".to_string()
            } else {
                format!("{}::Error", prefix.join("::"))
            };
            Some((Some(*data), err))
        }
        _ => None,
    }
}

fn data_results(src: &SourceFile, ty: &Type) -> Vec<FieldMeta> {
    match ty {
        Type::Tuple(t) if t.elems.is_empty() => Vec::new(),
        Type::Tuple(t) => t
            .elems
            .iter()
            .enumerate()
            .map(|(i, e)| FieldMeta::new(format!("data{i}"), src.slice(e.span())))
            .collect(),
        other => vec![FieldMeta::new("data", src.slice(other.span()))],
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const GREETER: &str = r#"use crate::dto::Profile;

/// Greeting service
pub trait Greeter {
    /// Say hello
    async fn hello(&self, name: String) -> anyhow::Result<String>;
    fn bye(&self) -> Result<(), Error>;
    fn profile(&mut self, id: i64, _: bool) -> Result<(Profile,  u32), crate::Error>;
    fn ping(&self);
    fn items<T: Clone>(&self, seed: T) -> Vec<T> where T: Send;
}
"#;

    fn greeter() -> InterfaceMeta {
        extract_interface(&SourceFile::new("svc.rs", GREETER), None).unwrap()
    }

    #[test]
    fn keeps_declaration_order() {
        let iface = greeter();
        assert_eq!(iface.name, "Greeter");
        assert_eq!(
            iface.method_names(),
            vec!["hello", "bye", "profile", "ping", "items"]
        );
    }

    #[test]
    fn alias_result_uses_module_error() {
        let iface = greeter();
        let hello = &iface.methods[0];
        assert!(hello.is_async);
        assert_eq!(hello.params, vec![FieldMeta::new("name", "String")]);
        assert_eq!(hello.error_type(), Some("anyhow::Error"));
        assert_eq!(hello.data_type(), "String");
        assert_eq!(hello.output.as_deref(), Some("anyhow::Result<String>"));
    }

    #[test]
    fn unit_result_has_only_error() {
        let iface = greeter();
        let bye = &iface.methods[1];
        assert_eq!(bye.data_results().count(), 0);
        assert_eq!(bye.error_type(), Some("Error"));
    }

    #[test]
    fn tuple_results_and_receiver_are_verbatim() {
        let iface = greeter();
        let profile = &iface.methods[2];
        assert_eq!(profile.receiver, "&mut self");
        assert_eq!(profile.params[1].name, "_arg2");
        assert_eq!(profile.data_type(), "(Profile, u32)");
        assert_eq!(profile.error_type(), Some("crate::Error"));
        assert_eq!(
            profile.output.as_deref(),
            Some("Result<(Profile,  u32), crate::Error>")
        );
    }

    #[test]
    fn generics_and_where_clause_are_captured() {
        let iface = greeter();
        assert_eq!(iface.methods[3].return_type(), None);
        let items = &iface.methods[4];
        assert_eq!(items.generics.as_deref(), Some("<T: Clone>"));
        assert_eq!(items.where_clause.as_deref(), Some("where T: Send"));
        assert_eq!(items.data_type(), "Vec<T>");
    }

    #[test]
    fn missing_trait_is_a_parse_error() {
        let err = extract_interface(&SourceFile::new("svc.rs", GREETER), Some("Nope"))
            .unwrap_err();
        assert!(err.to_string().contains("trait `Nope` not found"));
    }
}
