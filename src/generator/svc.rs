//! Service trait file (`svc.rs`) for database-backed services.
//!
//! Created once with a declaration per CRUD method. Later runs append declarations
//! that are missing from the trait and refresh the ones still carrying the
//! `DO NOT EDIT` marker; everything else in the file belongs to the user.

use std::fs;
use std::path::Path;

use tracing::warn;

use super::imports::{fix_imports, render_block, UseEntry};
use super::marker::{ensure_file_marker, regenerable_at, Marker, YOU_CAN_EDIT};
use super::merge::{append_item, apply_edits, insert_members, trait_body, Edit};
use super::stubs::{render_decls, FnStub};
use super::templates::{render_file, render_fragment, SvcTraitTemplateData};
use super::writer::{write_atomic, WriteOutcome};
use crate::error::{GenError, Result};
use crate::source::SourceFile;

/// File name of the service trait
pub const SVC_FILE: &str = "svc.rs";

fn trait_data(header: &str, imports: &str, name: &str, decls: &[FnStub]) -> Result<SvcTraitTemplateData> {
    Ok(SvcTraitTemplateData {
        header: header.to_string(),
        imports: imports.to_string(),
        name: name.to_string(),
        methods: render_decls(decls)?,
    })
}

fn merge(path: &Path, text: String, name: &str, decls: &[FnStub], imports: &[UseEntry]) -> Result<String> {
    let src = SourceFile::new(path, text);
    let file = src.parse()?;
    let text = match trait_body(&src, &file, name) {
        None => {
            let data = trait_data("", "", name, decls)?;
            append_item(src.text(), &render_fragment(SVC_FILE, &data)?)
        }
        Some(body) => {
            let mut edits = Vec::new();
            for member in &body.members {
                let Some(decl) = decls
                    .iter()
                    .find(|d| d.regenerable && d.name == member.name)
                else {
                    continue;
                };
                if regenerable_at(src.text(), member.start) {
                    edits.push(Edit::replace(
                        member.start,
                        member.end,
                        decl.render_decl_unmarked()?,
                    ));
                }
            }
            let missing: Vec<FnStub> = decls
                .iter()
                .filter(|d| body.member(&d.name).is_none())
                .cloned()
                .collect();
            if !missing.is_empty() {
                edits.push(insert_members(src.text(), &body, &render_decls(&missing)?));
            }
            apply_edits(src.text(), edits)
        }
    };
    let text = fix_imports(&SourceFile::new(path, text), imports)?;
    Ok(ensure_file_marker(&text, Marker::YouCanEdit))
}

/// Create or extend `<dir>/svc.rs` so the trait `name` declares every method in `decls`
///
/// # Errors
///
/// Read, parse and write failures are fatal.
pub fn generate_service_trait(
    dir: &Path,
    name: &str,
    decls: &[FnStub],
    imports: &[UseEntry],
) -> Result<WriteOutcome> {
    let path = dir.join(SVC_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(existing) => {
            warn!(
                path = %path.display(),
                "New content will be appended to existing file"
            );
            merge(&path, existing, name, decls, imports)?
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let data = trait_data(YOU_CAN_EDIT, &render_block(imports), name, decls)?;
            render_file(SVC_FILE, &data)?
        }
        Err(e) => return Err(GenError::io(&path, e)),
    };
    SourceFile::new(&path, text.as_str())
        .parse()
        .map_err(|e| GenError::render(SVC_FILE, e))?;
    write_atomic(&path, &text)
}
