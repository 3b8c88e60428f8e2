//! Service implementation generation.
//!
//! `svcimpl.rs` is generated once with every declared method and then owned by the
//! user. Later runs only add what is missing: methods the interface declares that no
//! `impl` block in the directory defines yet. Methods still preceded by the
//! `DO NOT EDIT` marker are refreshed in place.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::imports::{fix_imports, render_block, UseEntry};
use super::marker::{ensure_file_marker, regenerable_at, Marker, YOU_CAN_EDIT};
use super::merge::{
    append_item, apply_edits, impl_blocks, insert_members, last_segment, struct_fields, Edit,
};
use super::scan::{scan_dir, warn_arity_drift};
use super::stubs::{method_stub, render_items, rpc_stub, FnStub};
use super::templates::{render_file, render_fragment, ImplBlockTemplateData, SvcImplTemplateData};
use super::writer::{write_atomic, WriteOutcome};
use crate::error::{GenError, Result};
use crate::meta::{InterfaceMeta, ServiceMeta};
use crate::source::SourceFile;

/// File name of the generated implementation
pub const SVCIMPL_FILE: &str = "svcimpl.rs";

/// Protocol flavor of an implementation file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flavor {
    /// Plain request/response service
    Plain,
    /// RPC service implementing the stub compiler's server trait
    Rpc {
        /// RPC service name
        service: String,
    },
    /// Database-backed service holding a connection pool
    Database {
        /// Pool type, `sqlx::SqlitePool` etc.
        pool_type: String,
    },
}

/// Everything needed to create or extend one implementation file
#[derive(Debug, Clone)]
pub struct ImplPlan {
    /// Implementing struct, `<Interface>Impl`
    pub impl_name: String,
    /// Trait path written in the impl header
    pub trait_path: String,
    /// Attributes written above a fresh impl header
    pub trait_attrs: Vec<String>,
    /// Declared methods in order
    pub stubs: Vec<FnStub>,
    /// Imports the generated code needs
    pub imports: Vec<UseEntry>,
    pub flavor: Flavor,
    /// An existing impl of this trait is rewritten to implement `trait_path` instead
    pub retarget_from: Option<String>,
}

fn base_imports() -> Vec<UseEntry> {
    vec![
        UseEntry::new("crate::config::Config"),
        UseEntry::new("std::sync::Arc"),
    ]
}

impl ImplPlan {
    /// Plain implementation of `iface`
    pub fn plain(iface: &InterfaceMeta) -> Self {
        let mut imports = base_imports();
        imports.push(UseEntry::new(format!("crate::svc::{}", iface.name)));
        Self {
            impl_name: iface.impl_name(),
            trait_path: iface.name.clone(),
            trait_attrs: Vec::new(),
            stubs: iface.methods.iter().map(method_stub).collect(),
            imports,
            flavor: Flavor::Plain,
            retarget_from: None,
        }
    }

    /// RPC implementation of `service` on the struct `impl_name`
    ///
    /// `interface` names the plain service trait whose impl block, when present, is
    /// rewritten to implement the server trait.
    pub fn rpc(impl_name: impl Into<String>, interface: Option<&str>, service: &ServiceMeta) -> Self {
        let mut imports = base_imports();
        imports.extend(
            [
                "tonic::Request",
                "tonic::Response",
                "tonic::Status",
                "crate::transport::grpc as pb",
            ]
            .into_iter()
            .map(UseEntry::new),
        );
        Self {
            impl_name: impl_name.into(),
            trait_path: format!("pb::{}Server", service.name),
            trait_attrs: vec!["#[tonic::async_trait]".to_string()],
            stubs: service
                .rpcs
                .iter()
                .map(|rpc| rpc_stub(&service.name, rpc))
                .collect(),
            imports,
            flavor: Flavor::Rpc {
                service: service.name.clone(),
            },
            retarget_from: interface.map(str::to_string),
        }
    }

    /// Database-backed implementation of `iface`
    ///
    /// Methods with a CRUD counterpart in `crud` take the regenerable CRUD body; the
    /// rest get placeholder bodies.
    pub fn database(iface: &InterfaceMeta, crud: &[FnStub], pool_type: &str) -> Self {
        let mut plan = Self::plain(iface);
        plan.stubs = iface
            .methods
            .iter()
            .map(|m| match crud.iter().find(|c| c.name == m.name) {
                Some(c) => c.clone(),
                None => method_stub(m),
            })
            .collect();
        plan.imports.extend(
            ["crate::dto", "crate::model", "crate::query"]
                .into_iter()
                .map(UseEntry::new),
        );
        plan.flavor = Flavor::Database {
            pool_type: pool_type.to_string(),
        };
        plan
    }

    fn trait_name(&self) -> &str {
        last_segment(&self.trait_path)
    }

    fn fields(&self) -> Vec<String> {
        let mut fields = vec!["conf: Arc<Config>".to_string()];
        if let Flavor::Database { pool_type } = &self.flavor {
            fields.push(format!("pool: {pool_type}"));
        }
        fields
    }

    fn unimplemented_trait(&self) -> Option<String> {
        match &self.flavor {
            Flavor::Rpc { service } => Some(format!("pb::Unimplemented{service}Server")),
            _ => None,
        }
    }

    fn impl_block(&self, stubs: &[&FnStub]) -> Result<String> {
        let data = ImplBlockTemplateData {
            attrs: self.trait_attrs.clone(),
            trait_path: self.trait_path.clone(),
            impl_name: self.impl_name.clone(),
            methods: render_items(stubs.iter().copied())?,
        };
        render_fragment("impl_block", &data)
    }

    fn unimplemented_block(&self) -> Result<Option<String>> {
        let Some(trait_path) = self.unimplemented_trait() else {
            return Ok(None);
        };
        let data = ImplBlockTemplateData {
            attrs: Vec::new(),
            trait_path,
            impl_name: self.impl_name.clone(),
            methods: String::new(),
        };
        render_fragment("impl_block", &data).map(Some)
    }

    /// Full file for a directory without `svcimpl.rs`
    pub fn render_fresh(&self) -> Result<String> {
        let fields = self.fields();
        let ctor_fields = fields
            .iter()
            .filter_map(|f| f.split(':').next())
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(", ");
        let stubs: Vec<&FnStub> = self.stubs.iter().collect();
        let data = SvcImplTemplateData {
            header: YOU_CAN_EDIT.to_string(),
            imports: render_block(&self.imports),
            impl_name: self.impl_name.clone(),
            ctor_params: fields.join(", "),
            fields,
            ctor_fields,
            impl_block: self.impl_block(&stubs)?,
            extra_items: self.unimplemented_block()?.into_iter().collect(),
        };
        render_file(SVCIMPL_FILE, &data)
    }
}

/// Parse failures of generated text are rendering bugs, not user errors
fn as_render(e: GenError) -> GenError {
    match e {
        GenError::Parse { message, .. } => GenError::render(SVCIMPL_FILE, message),
        other => other,
    }
}

fn reparse(path: &Path, text: String) -> Result<(SourceFile, syn::File)> {
    let src = SourceFile::new(path, text);
    let file = src.parse().map_err(as_render)?;
    Ok((src, file))
}

/// Point an impl of `retarget_from` at the plan's trait
fn retarget_trait(path: &Path, text: String, plan: &ImplPlan) -> Result<String> {
    let Some(from) = &plan.retarget_from else {
        return Ok(text);
    };
    let (src, file) = reparse(path, text)?;
    let blocks = impl_blocks(&src, &file, &plan.impl_name);
    if blocks.iter().any(|b| b.trait_name() == Some(plan.trait_name())) {
        return Ok(src.into_text());
    }
    let Some(old) = blocks
        .iter()
        .find(|b| b.trait_name() == Some(from.as_str()))
    else {
        return Ok(src.into_text());
    };
    let Some((_, start, end)) = &old.trait_path else {
        return Ok(src.into_text());
    };
    let mut edits = vec![Edit::replace(*start, *end, plan.trait_path.clone())];
    let missing_attrs: Vec<&String> = plan
        .trait_attrs
        .iter()
        .filter(|a| !old.attrs.contains(a))
        .collect();
    if !missing_attrs.is_empty() {
        let at = src.line_start(old.start);
        let lines: String = missing_attrs.iter().map(|a| format!("{a}\n")).collect();
        edits.push(Edit::insert(at, lines));
    }
    info!(impl_name = %plan.impl_name, trait_path = %plan.trait_path, "Retargeted impl block");
    Ok(apply_edits(src.text(), edits))
}

/// Re-render methods still preceded by the `DO NOT EDIT` marker
fn refresh_regenerable(path: &Path, text: String, plan: &ImplPlan) -> Result<String> {
    if !plan.stubs.iter().any(|s| s.regenerable) {
        return Ok(text);
    }
    let (src, file) = reparse(path, text)?;
    let mut edits = Vec::new();
    for block in impl_blocks(&src, &file, &plan.impl_name) {
        for member in &block.body.members {
            let Some(stub) = plan
                .stubs
                .iter()
                .find(|s| s.regenerable && s.name == member.name)
            else {
                continue;
            };
            if regenerable_at(src.text(), member.start) {
                edits.push(Edit::replace(
                    member.start,
                    member.end,
                    stub.render_unmarked()?,
                ));
            }
        }
    }
    Ok(apply_edits(src.text(), edits))
}

/// Insert missing stubs into the primary impl block, or append a new block
fn insert_missing(path: &Path, text: String, plan: &ImplPlan, missing: &[&FnStub]) -> Result<String> {
    if missing.is_empty() {
        return Ok(text);
    }
    let (src, file) = reparse(path, text)?;
    let primary = impl_blocks(&src, &file, &plan.impl_name)
        .into_iter()
        .find(|b| b.trait_name() == Some(plan.trait_name()));
    match primary {
        Some(block) => {
            let methods = render_items(missing.iter().copied())?;
            let edit = insert_members(src.text(), &block.body, &methods);
            Ok(apply_edits(src.text(), vec![edit]))
        }
        None => Ok(append_item(src.text(), &plan.impl_block(missing)?)),
    }
}

/// Ensure flavor-specific items: the RPC fallback impl, the database pool field
fn ensure_flavor_items(path: &Path, text: String, plan: &ImplPlan) -> Result<String> {
    let (src, file) = reparse(path, text)?;
    match &plan.flavor {
        Flavor::Plain => Ok(src.into_text()),
        Flavor::Rpc { .. } => {
            let Some(trait_path) = plan.unimplemented_trait() else {
                return Ok(src.into_text());
            };
            let wanted = last_segment(&trait_path);
            let present = impl_blocks(&src, &file, &plan.impl_name)
                .iter()
                .any(|b| b.trait_name() == Some(wanted));
            match plan.unimplemented_block()? {
                Some(block) if !present => Ok(append_item(src.text(), &block)),
                _ => Ok(src.into_text()),
            }
        }
        Flavor::Database { pool_type } => {
            let Some((body, trailing)) = struct_fields(&src, &file, &plan.impl_name) else {
                warn!(impl_name = %plan.impl_name, "Implementation struct not found; pool field not added");
                return Ok(src.into_text());
            };
            if body.member("pool").is_some() {
                return Ok(src.into_text());
            }
            let mut edits = Vec::new();
            if let (false, Some(last)) = (trailing, body.members.last()) {
                edits.push(Edit::insert(last.end, ","));
            }
            let field = format!("    pool: {pool_type},");
            let line_start = src.line_start(body.close);
            if line_start > body.open && src.text()[line_start..body.close].trim().is_empty() {
                edits.push(Edit::insert(line_start, format!("{field}\n")));
            } else {
                edits.push(insert_members(src.text(), &body, &field));
            }
            warn!(
                impl_name = %plan.impl_name,
                "Added `pool` field; update the constructor to initialize it"
            );
            Ok(apply_edits(src.text(), edits))
        }
    }
}

/// Merge the plan into existing text
pub fn merge_existing(dir: &Path, path: &Path, text: String, plan: &ImplPlan) -> Result<String> {
    let declared: Vec<&str> = plan.stubs.iter().map(|s| s.name.as_str()).collect();
    let implemented = scan_dir(dir, &plan.impl_name, &declared)?;
    warn_arity_drift(
        &implemented,
        plan.stubs.iter().map(|s| (s.name.as_str(), s.arity())),
    );
    let missing: Vec<&FnStub> = plan
        .stubs
        .iter()
        .filter(|s| !implemented.contains(&s.name))
        .collect();
    info!(
        impl_name = %plan.impl_name,
        declared = declared.len(),
        missing = missing.len(),
        "Computed missing methods"
    );

    let text = retarget_trait(path, text, plan)?;
    let text = refresh_regenerable(path, text, plan)?;
    let text = insert_missing(path, text, plan, &missing)?;
    let text = ensure_flavor_items(path, text, plan)?;
    let text = fix_imports(&SourceFile::new(path, text), &plan.imports).map_err(as_render)?;
    Ok(ensure_file_marker(&text, Marker::YouCanEdit))
}

/// Create or extend `<dir>/svcimpl.rs` according to `plan`
///
/// # Errors
///
/// Read, parse and write failures are fatal. The merged text is re-parsed before it
/// is written; a result that is not valid Rust is a [`GenError::Render`].
pub fn generate_impl(dir: &Path, plan: &ImplPlan) -> Result<WriteOutcome> {
    let path: PathBuf = dir.join(SVCIMPL_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(existing) => {
            warn!(
                path = %path.display(),
                "New content will be appended to existing file"
            );
            merge_existing(dir, &path, existing, plan)?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => plan.render_fresh()?,
        Err(e) => return Err(GenError::io(&path, e)),
    };
    let (src, _) = reparse(&path, text)?;
    write_atomic(&path, src.text())
}

/// Plain implementation of `iface` in `dir`
pub fn generate_svc_impl(dir: &Path, iface: &InterfaceMeta) -> Result<WriteOutcome> {
    generate_impl(dir, &ImplPlan::plain(iface))
}

/// RPC implementation of `service` in `dir` on the struct `impl_name`
///
/// An existing `impl <interface> for <impl_name>` block becomes the server impl.
pub fn generate_rpc_impl(
    dir: &Path,
    impl_name: &str,
    interface: Option<&str>,
    service: &ServiceMeta,
) -> Result<WriteOutcome> {
    generate_impl(dir, &ImplPlan::rpc(impl_name, interface, service))
}
