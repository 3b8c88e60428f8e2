//! Relational backend shared by every SQL dialect.

use std::fs;
use std::path::{Path, PathBuf};

use syn::spanned::Spanned;
use syn::Item;
use tracing::{info, warn};

use super::introspect::SchemaIntrospector;
use super::OrmGenerator;
use crate::config::GeneratorConfig;
use crate::error::{GenError, Result};
use crate::generator::imports::{fix_imports, UseEntry};
use crate::generator::merge::{apply_edits, Edit};
use crate::generator::stubs::FnStub;
use crate::generator::svc::{generate_service_trait, SVC_FILE};
use crate::generator::svcimpl::{generate_impl, ImplPlan};
use crate::generator::tables::{crud_stubs, render_mod, ModKind, TableModel};
use crate::generator::writer::{write_atomic, write_if_absent, write_regenerable, WriteOutcome};
use crate::meta::extract::extract_interface_file;
use crate::meta::ServiceMeta;
use crate::source::SourceFile;

/// SQL backend parameterized by the dialect's schema introspector
#[derive(Debug)]
pub struct SqlGenerator<I> {
    introspector: I,
    config: Option<GeneratorConfig>,
    tables: Vec<TableModel>,
}

impl<I: SchemaIntrospector> SqlGenerator<I> {
    /// Generator that will introspect through `introspector`
    pub fn new(introspector: I) -> Self {
        Self {
            introspector,
            config: None,
            tables: Vec::new(),
        }
    }

    /// Tables collected by [`OrmGenerator::initialize`]
    pub fn tables(&self) -> &[TableModel] {
        &self.tables
    }

    fn config(&self) -> Result<&GeneratorConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| GenError::Config("generator used before initialize".to_string()))
    }

    fn crud(&self) -> Vec<FnStub> {
        self.tables.iter().flat_map(crud_stubs).collect()
    }

    fn write_tables(&self, dir: &Path, kind: ModKind) -> Result<()> {
        let base = dir.join(kind.dir_name());
        for table in &self.tables {
            let path = base.join(format!("{}.rs", table.module));
            let outcome = match kind {
                ModKind::Model => write_regenerable(&path, &table.render_model()?)?,
                ModKind::Query => write_regenerable(&path, &table.render_query()?)?,
                ModKind::Dto => write_if_absent(&path, &table.render_dto()?)?,
            };
            log_outcome(&path, outcome);
        }
        let mod_path = base.join("mod.rs");
        let outcome = match kind {
            ModKind::Model | ModKind::Query => {
                write_regenerable(&mod_path, &render_mod(kind, &self.tables)?)?
            }
            ModKind::Dto => merge_mod(&mod_path, kind, &self.tables)?,
        };
        log_outcome(&mod_path, outcome);
        Ok(())
    }
}

fn log_outcome(path: &Path, outcome: WriteOutcome) {
    if !outcome.wrote() {
        info!(path = %path.display(), ?outcome, "Not written");
    }
}

/// Extend an existing `mod.rs` with missing module declarations and re-exports
fn merge_mod(path: &Path, kind: ModKind, tables: &[TableModel]) -> Result<WriteOutcome> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return write_atomic(path, &render_mod(kind, tables)?);
        }
        Err(e) => return Err(GenError::io(path, e)),
    };
    let src = SourceFile::new(path, text);
    let file = src.parse()?;

    let declared: Vec<String> = file
        .items
        .iter()
        .filter_map(|item| match item {
            Item::Mod(m) => Some(m.ident.to_string()),
            _ => None,
        })
        .collect();
    let missing: String = tables
        .iter()
        .filter(|t| !declared.contains(&t.module))
        .map(|t| format!("pub mod {};\n", t.module))
        .collect();

    let text = if missing.is_empty() {
        src.text().to_string()
    } else {
        let last_mod = file
            .items
            .iter()
            .rev()
            .find(|item| matches!(item, Item::Mod(_)));
        let edit = match (last_mod, file.items.first()) {
            (Some(m), _) => Edit::insert(src.line_end(src.end(m.span())), missing),
            (None, Some(first)) => {
                Edit::insert(src.line_start(src.start(first.span())), format!("{missing}\n"))
            }
            (None, None) => Edit::insert(src.text().len(), missing),
        };
        apply_edits(src.text(), vec![edit])
    };

    let exports: Vec<UseEntry> = tables.iter().map(|t| kind.export(t)).collect();
    let text = fix_imports(&SourceFile::new(path, text), &exports)?;
    write_atomic(path, &text)
}

impl<I: SchemaIntrospector> OrmGenerator for SqlGenerator<I> {
    fn initialize(&mut self, config: &GeneratorConfig) -> Result<()> {
        let tables = self.introspector.introspect(config)?;
        let dialect = self.introspector.dialect();
        self.tables = tables
            .iter()
            .map(|t| TableModel::new(t, dialect, config))
            .collect();
        if self.tables.is_empty() {
            warn!(dialect = dialect.name(), dsn = %config.dsn, "No tables found");
        } else {
            info!(dialect = dialect.name(), tables = self.tables.len(), "Introspected schema");
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn generate_dto(&mut self) -> Result<()> {
        let dir = self.config()?.dir.clone();
        for kind in [ModKind::Model, ModKind::Query, ModKind::Dto] {
            self.write_tables(&dir, kind)?;
        }
        Ok(())
    }

    fn generate_service(&mut self) -> Result<()> {
        let config = self.config()?;
        generate_service_trait(
            &config.dir,
            &config.service_name(),
            &self.crud(),
            &[UseEntry::new("crate::dto")],
        )?;
        Ok(())
    }

    fn generate_service_impl(&mut self) -> Result<()> {
        let config = self.config()?;
        let svc_path: PathBuf = config.dir.join(SVC_FILE);
        let iface = extract_interface_file(&svc_path, Some(&config.service_name()))?;
        let plan = ImplPlan::database(
            &iface,
            &self.crud(),
            self.introspector.dialect().pool_type(),
        );
        generate_impl(&config.dir, &plan)?;
        Ok(())
    }

    fn generate_rpc_impl(&mut self, service: &ServiceMeta) -> Result<()> {
        let config = self.config()?;
        // the database impl of the service trait stays as it is
        let plan = ImplPlan::rpc(format!("{}Impl", config.service_name()), None, service);
        generate_impl(&config.dir, &plan)?;
        Ok(())
    }
}
