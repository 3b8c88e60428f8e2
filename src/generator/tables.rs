//! Table-bound artifacts: models, DTOs, query bindings and CRUD method stubs.
//!
//! Models and query bindings are regenerated on every run; DTOs are generated once.
//! CRUD methods carry the `DO NOT EDIT` marker so they are refreshed in place until
//! the user removes it.

use tracing::warn;

use super::imports::{render_block, UseEntry};
use super::marker::{DO_NOT_EDIT, YOU_CAN_EDIT};
use super::naming::{field_ident, plural, to_pascal, to_snake};
use super::stubs::FnStub;
use super::templates::{
    render_file, DtoTemplateData, FieldView, ModRsTemplateData, ModelTemplateData,
    QueryTemplateData,
};
use crate::config::GeneratorConfig;
use crate::driver::Dialect;
use crate::error::Result;
use crate::meta::{FieldMeta, TableMeta};

/// One column as it appears in generated code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldModel {
    pub column: String,
    pub ident: String,
    pub ty: String,
    pub doc: String,
    pub primary_key: bool,
}

/// One table as it appears in generated code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    pub table: String,
    /// Table accessor, `prefix.table` when a prefix is configured
    pub qualified: String,
    /// Module name, snake case
    pub module: String,
    /// Struct name, UpperCamel case
    pub struct_name: String,
    pub comment: String,
    pub fields: Vec<FieldModel>,
    /// Soft-delete column present in this table
    pub soft_delete: Option<String>,
    pub dialect: Dialect,
}

impl TableModel {
    /// Build from introspected metadata
    pub fn new(table: &TableMeta, dialect: Dialect, config: &GeneratorConfig) -> Self {
        let soft_delete_column = config.soft_delete_column();
        let fields = table
            .columns
            .iter()
            .map(|c| {
                let is_soft_delete = soft_delete_column == Some(c.name.as_str());
                let ty = if is_soft_delete {
                    "DeletedAt".to_string()
                } else {
                    dialect.rust_type(&c.sql_type, c.nullable)
                };
                let mut doc = format!("`{}` {}", c.name, c.sql_type);
                if c.primary_key {
                    doc.push_str(", primary key");
                }
                match c.index {
                    Some(crate::meta::IndexKind::Unique) => doc.push_str(", unique"),
                    Some(crate::meta::IndexKind::Index) => doc.push_str(", indexed"),
                    None => {}
                }
                if c.nullable {
                    doc.push_str(", nullable");
                }
                if let Some(default) = &c.default {
                    doc.push_str(&format!(", default {default}"));
                }
                FieldModel {
                    column: c.name.clone(),
                    ident: field_ident(&c.name),
                    ty,
                    doc,
                    primary_key: c.primary_key,
                }
            })
            .collect::<Vec<_>>();
        let soft_delete = soft_delete_column
            .filter(|col| fields.iter().any(|f| f.column == *col))
            .map(str::to_string);

        Self {
            table: table.name.clone(),
            qualified: config.qualify(&table.name),
            module: field_ident(&table.name).trim_start_matches("r#").to_string(),
            struct_name: to_pascal(&table.name),
            comment: table.comment.clone().unwrap_or_default(),
            fields,
            soft_delete,
            dialect,
        }
    }

    /// First primary-key field
    pub fn primary_key(&self) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Query binding type name, `<Struct>Query`
    pub fn query_name(&self) -> String {
        format!("{}Query", self.struct_name)
    }

    fn views(&self) -> Vec<FieldView> {
        self.fields
            .iter()
            .map(|f| FieldView {
                column: f.column.clone(),
                ident: f.ident.clone(),
                ty: f.ty.clone(),
                doc: f.doc.clone(),
            })
            .collect()
    }

    fn column_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.column.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `WHERE`/`AND` condition hiding soft-deleted rows
    fn visible(&self) -> Option<String> {
        self.soft_delete.as_ref().map(|col| format!("{col} IS NULL"))
    }

    /// Model file, regenerated every run
    pub fn render_model(&self) -> Result<String> {
        let imports = [
            UseEntry::new("serde::Deserialize"),
            UseEntry::new("serde::Serialize"),
            UseEntry::new("super::is_zero"),
        ]
        .into_iter()
        .chain(self.soft_delete.as_ref().map(|_| UseEntry::new("super::DeletedAt")))
        .collect::<Vec<_>>();
        let data = ModelTemplateData {
            header: DO_NOT_EDIT.to_string(),
            imports: render_block(&imports),
            qualified: self.qualified.clone(),
            comment: self.comment.clone(),
            struct_name: self.struct_name.clone(),
            fields: self.views(),
        };
        render_file("model", &data)
    }

    /// DTO file, generated once
    pub fn render_dto(&self) -> Result<String> {
        let imports = [
            UseEntry::new("crate::model"),
            UseEntry::new("crate::model::is_zero"),
            UseEntry::new("serde::Deserialize"),
            UseEntry::new("serde::Serialize"),
        ]
        .into_iter()
        .chain(
            self.soft_delete
                .as_ref()
                .map(|_| UseEntry::new("crate::model::DeletedAt")),
        )
        .collect::<Vec<_>>();
        let data = DtoTemplateData {
            header: YOU_CAN_EDIT.to_string(),
            imports: render_block(&imports),
            comment: self.comment.clone(),
            struct_name: self.struct_name.clone(),
            fields: self.views(),
        };
        render_file("dto", &data)
    }

    /// Query binding file, regenerated every run
    pub fn render_query(&self) -> Result<String> {
        let d = self.dialect;
        let cols = self.column_list();
        let visible = self.visible();
        let where_visible = visible
            .as_ref()
            .map(|v| format!(" WHERE {v}"))
            .unwrap_or_default();
        let and_visible = visible
            .as_ref()
            .map(|v| format!(" AND {v}"))
            .unwrap_or_default();

        let pk = self.primary_key();
        let order = pk
            .map(|p| p.column.clone())
            .or_else(|| self.fields.first().map(|f| f.column.clone()))
            .unwrap_or_else(|| "1".to_string());

        let mut data = QueryTemplateData {
            header: DO_NOT_EDIT.to_string(),
            imports: render_block(&[UseEntry::new(format!(
                "crate::model::{}",
                self.struct_name
            ))]),
            qualified: self.qualified.clone(),
            columns: cols.clone(),
            struct_name: self.struct_name.clone(),
            query_name: self.query_name(),
            pool: d.pool_type().to_string(),
            count_sql: format!("SELECT COUNT(*) FROM {}{where_visible}", self.qualified),
            page_sql: format!(
                "SELECT {cols} FROM {}{where_visible} ORDER BY {order} LIMIT {} OFFSET {}",
                self.qualified,
                d.placeholder(1),
                d.placeholder(2)
            ),
            has_pk: false,
            pk_ident: String::new(),
            pk_ty: String::new(),
            returning: d.supports_returning(),
            pk_generated: false,
            insert_sql: String::new(),
            insert_binds: Vec::new(),
            find_sql: String::new(),
            update_sql: String::new(),
            update_binds: Vec::new(),
            delete_sql: String::new(),
            delete_doc: String::new(),
        };

        if let Some(pk) = pk {
            let integer_pk = matches!(
                pk.ty.as_str(),
                "i64" | "i32" | "i16" | "i8" | "u64" | "u32" | "u16" | "u8"
            );
            // an integer key is left to the database
            let inserted: Vec<&FieldModel> = self
                .fields
                .iter()
                .filter(|f| !(f.primary_key && integer_pk))
                .collect();
            let placeholders = (1..=inserted.len())
                .map(|n| d.placeholder(n))
                .collect::<Vec<_>>()
                .join(", ");
            let insert_cols = inserted
                .iter()
                .map(|f| f.column.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let mut insert_sql = format!(
                "INSERT INTO {} ({insert_cols}) VALUES ({placeholders})",
                self.qualified
            );
            if d.supports_returning() {
                insert_sql.push_str(&format!(" RETURNING {}", pk.column));
            }

            let updated: Vec<&FieldModel> =
                self.fields.iter().filter(|f| !f.primary_key).collect();
            let assignments = updated
                .iter()
                .enumerate()
                .map(|(i, f)| format!("{} = {}", f.column, d.placeholder(i + 1)))
                .collect::<Vec<_>>()
                .join(", ");
            let pk_slot = d.placeholder(updated.len() + 1);

            data.has_pk = true;
            data.pk_ident = pk.ident.clone();
            data.pk_ty = pk.ty.clone();
            data.pk_generated = integer_pk;
            data.insert_sql = insert_sql;
            data.insert_binds = inserted.iter().map(|f| f.ident.clone()).collect();
            data.find_sql = format!(
                "SELECT {cols} FROM {} WHERE {} = {}{and_visible}",
                self.qualified,
                pk.column,
                d.placeholder(1)
            );
            data.update_sql = if updated.is_empty() {
                format!(
                    "UPDATE {} SET {} = {} WHERE {} = {}",
                    self.qualified,
                    pk.column,
                    d.placeholder(1),
                    pk.column,
                    d.placeholder(2)
                )
            } else {
                format!(
                    "UPDATE {} SET {assignments} WHERE {} = {pk_slot}",
                    self.qualified, pk.column
                )
            };
            data.update_binds = if updated.is_empty() {
                vec![pk.ident.clone(), pk.ident.clone()]
            } else {
                updated
                    .iter()
                    .map(|f| f.ident.clone())
                    .chain(std::iter::once(pk.ident.clone()))
                    .collect()
            };
            match &self.soft_delete {
                Some(col) => {
                    data.delete_sql = format!(
                        "UPDATE {} SET {col} = CURRENT_TIMESTAMP WHERE {} = {}",
                        self.qualified,
                        pk.column,
                        d.placeholder(1)
                    );
                    data.delete_doc = format!("Mark the row deleted by setting `{col}`");
                }
                None => {
                    data.delete_sql = format!(
                        "DELETE FROM {} WHERE {} = {}",
                        self.qualified,
                        pk.column,
                        d.placeholder(1)
                    );
                    data.delete_doc = "Delete the row matching the primary key".to_string();
                }
            }
        } else {
            warn!(table = %self.table, "Table has no primary key; by-id queries are not generated");
        }
        render_file("query", &data)
    }
}

/// CRUD operation generated for every table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudOp {
    Create,
    CreateBatch,
    GetById,
    Update,
    Delete,
    List,
}

impl CrudOp {
    /// All operations in generation order
    pub const ALL: [CrudOp; 6] = [
        CrudOp::Create,
        CrudOp::CreateBatch,
        CrudOp::GetById,
        CrudOp::Update,
        CrudOp::Delete,
        CrudOp::List,
    ];

    /// Needs a primary key
    pub fn by_id(self) -> bool {
        !matches!(self, CrudOp::List)
    }

    /// Method name for `module`: `post_user`, `get_user_id`, `get_users`, ...
    pub fn method_name(self, module: &str) -> String {
        let module = to_snake(module);
        match self {
            CrudOp::Create => format!("post_{module}"),
            CrudOp::CreateBatch => format!("post_{}", plural(&module)),
            CrudOp::GetById => format!("get_{module}_id"),
            CrudOp::Update => format!("put_{module}"),
            CrudOp::Delete => format!("delete_{module}_id"),
            CrudOp::List => format!("get_{}", plural(&module)),
        }
    }
}

/// CRUD stub for one table and operation, `None` when the operation needs a primary
/// key the table lacks
pub fn crud_stub(op: CrudOp, table: &TableModel) -> Option<FnStub> {
    let pk_ty = match (op.by_id(), table.primary_key()) {
        (true, None) => return None,
        (_, pk) => pk.map(|p| p.ty.clone()).unwrap_or_default(),
    };
    let s = &table.struct_name;
    let dto = format!("dto::{s}");
    let query = format!("query::{}", table.query_name());

    let mut stub = FnStub::new(op.method_name(&table.module));
    stub.is_async = true;
    stub.regenerable = true;
    let (doc, params, data, body): (String, Vec<FieldMeta>, String, Vec<String>) = match op {
        CrudOp::Create => (
            format!("Create one `{}` row and return its primary key", table.table),
            vec![FieldMeta::new("body", dto.clone())],
            pk_ty.clone(),
            vec![
                format!("let m = model::{s}::from(body);"),
                format!("{query}::insert(&self.pool, &m).await"),
            ],
        ),
        CrudOp::CreateBatch => (
            format!("Create `{}` rows and return their primary keys", table.table),
            vec![FieldMeta::new("body", format!("Vec<{dto}>"))],
            format!("Vec<{pk_ty}>"),
            vec![
                "let mut data = Vec::with_capacity(body.len());".to_string(),
                "for item in body {".to_string(),
                format!("    let m = model::{s}::from(item);"),
                format!("    data.push({query}::insert(&self.pool, &m).await?);"),
                "}".to_string(),
                "Ok(data)".to_string(),
            ],
        ),
        CrudOp::GetById => (
            format!("Fetch one `{}` row by primary key", table.table),
            vec![FieldMeta::new("id", pk_ty.clone())],
            dto.clone(),
            vec![format!(
                "{query}::find(&self.pool, id).await.map({dto}::from)"
            )],
        ),
        CrudOp::Update => (
            format!("Overwrite one `{}` row", table.table),
            vec![FieldMeta::new("body", dto.clone())],
            "()".to_string(),
            vec![
                format!("let m = model::{s}::from(body);"),
                format!("{query}::update(&self.pool, &m).await"),
            ],
        ),
        CrudOp::Delete => (
            format!("Delete one `{}` row by primary key", table.table),
            vec![FieldMeta::new("id", pk_ty.clone())],
            "()".to_string(),
            vec![format!("{query}::delete(&self.pool, id).await")],
        ),
        CrudOp::List => (
            format!("One page of `{}` rows", table.table),
            vec![FieldMeta::new("parameter", "dto::Parameter")],
            format!("dto::Page<{dto}>"),
            vec![
                format!(
                    "let (items, total) = {query}::page(&self.pool, parameter.offset(), parameter.size()).await?;"
                ),
                format!(
                    "Ok(dto::Page::new(&parameter, total, items.into_iter().map({dto}::from).collect()))"
                ),
            ],
        ),
    };
    stub.doc = vec![doc];
    stub.params = params;
    stub.output = Some(format!("Result<{data}, sqlx::Error>"));
    stub.body = body;
    Some(stub)
}

/// Every CRUD stub for `table` in generation order
pub fn crud_stubs(table: &TableModel) -> Vec<FnStub> {
    let stubs: Vec<FnStub> = CrudOp::ALL
        .iter()
        .filter_map(|op| crud_stub(*op, table))
        .collect();
    if stubs.len() < CrudOp::ALL.len() {
        warn!(table = %table.table, "Table has no primary key; by-id methods are not generated");
    }
    stubs
}

/// Kind of per-table directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModKind {
    Model,
    Query,
    Dto,
}

impl ModKind {
    /// Directory name
    pub fn dir_name(self) -> &'static str {
        match self {
            ModKind::Model => "model",
            ModKind::Query => "query",
            ModKind::Dto => "dto",
        }
    }

    /// Re-export for one table
    pub fn export(self, table: &TableModel) -> UseEntry {
        let item = match self {
            ModKind::Query => table.query_name(),
            ModKind::Model | ModKind::Dto => table.struct_name.clone(),
        };
        UseEntry::public(format!("{}::{item}", table.module))
    }
}

/// `mod.rs` for one per-table directory
pub fn render_mod(kind: ModKind, tables: &[TableModel]) -> Result<String> {
    let exports: Vec<UseEntry> = tables.iter().map(|t| kind.export(t)).collect();
    let data = ModRsTemplateData {
        header: match kind {
            ModKind::Dto => YOU_CAN_EDIT,
            ModKind::Model | ModKind::Query => DO_NOT_EDIT,
        }
        .to_string(),
        modules: tables.iter().map(|t| t.module.clone()).collect(),
        exports: render_block(&exports),
        model_helpers: kind == ModKind::Model,
        dto_helpers: kind == ModKind::Dto,
    };
    render_file(kind.dir_name(), &data)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::config::ConfigLayer;
    use crate::meta::ColumnMeta;

    fn column(name: &str, sql_type: &str) -> ColumnMeta {
        ColumnMeta {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: false,
            primary_key: false,
            index: None,
            default: None,
        }
    }

    fn users() -> TableMeta {
        let mut id = column("id", "INTEGER");
        id.primary_key = true;
        let mut deleted = column("deleted_at", "DATETIME");
        deleted.nullable = true;
        TableMeta {
            name: "user_account".to_string(),
            columns: vec![id, column("name", "TEXT"), column("type", "TEXT"), deleted],
            comment: Some("Registered users".to_string()),
        }
    }

    fn config(soft_delete: bool) -> GeneratorConfig {
        GeneratorConfig::from_layer(
            "svc",
            ConfigLayer {
                soft_delete: Some(soft_delete),
                table_prefix: Some("app".to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn model_maps_columns() {
        let t = TableModel::new(&users(), Dialect::Sqlite, &config(true));
        assert_eq!(t.struct_name, "UserAccount");
        assert_eq!(t.qualified, "app.user_account");
        assert_eq!(t.fields[0].ty, "i64");
        assert_eq!(t.fields[2].ident, "r#type");
        assert_eq!(t.fields[3].ty, "DeletedAt");

        let model = t.render_model().unwrap();
        assert!(model.starts_with(DO_NOT_EDIT));
        assert!(model.contains("pub const TABLE_NAME: &str = \"app.user_account\";"));
        assert!(model.contains("use super::DeletedAt;"));
        assert!(model.contains("    #[sqlx(rename = \"type\")]\n    pub r#type: String,"));
        assert!(syn::parse_file(&model).is_ok());
    }

    #[test]
    fn soft_delete_changes_delete_and_reads() {
        let t = TableModel::new(&users(), Dialect::Postgres, &config(true));
        let query = t.render_query().unwrap();
        assert!(query.contains(
            "UPDATE app.user_account SET deleted_at = CURRENT_TIMESTAMP WHERE id = $1"
        ));
        assert!(query.contains("WHERE id = $1 AND deleted_at IS NULL"));
        assert!(query.contains("RETURNING id"));
        assert!(syn::parse_file(&query).is_ok());

        let hard = TableModel::new(&users(), Dialect::Mysql, &config(false));
        let query = hard.render_query().unwrap();
        assert!(query.contains("DELETE FROM app.user_account WHERE id = ?"));
        assert!(query.contains("Ok(done.last_insert_id() as i32)"));
        assert!(!query.contains("IS NULL"));
        assert!(syn::parse_file(&query).is_ok());
    }

    #[test]
    fn crud_names_and_shapes() {
        let t = TableModel::new(&users(), Dialect::Sqlite, &config(false));
        let stubs = crud_stubs(&t);
        let names: Vec<&str> = stubs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "post_user_account",
                "post_user_accounts",
                "get_user_account_id",
                "put_user_account",
                "delete_user_account_id",
                "get_user_accounts"
            ]
        );
        assert!(stubs.iter().all(|s| s.regenerable));
        assert_eq!(
            stubs[2].signature(),
            "async fn get_user_account_id(&self, id: i64) -> Result<dto::UserAccount, sqlx::Error>"
        );
    }

    #[test]
    fn table_without_primary_key_only_lists() {
        let mut table = users();
        table.columns[0].primary_key = false;
        let t = TableModel::new(&table, Dialect::Sqlite, &config(false));
        let stubs = crud_stubs(&t);
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].name, "get_user_accounts");
        let query = t.render_query().unwrap();
        assert!(!query.contains("pub async fn insert"));
        assert!(syn::parse_file(&query).is_ok());
    }

    #[test]
    fn mod_files_declare_and_export() {
        let t = TableModel::new(&users(), Dialect::Sqlite, &config(false));
        let dto_mod = render_mod(ModKind::Dto, std::slice::from_ref(&t)).unwrap();
        assert!(dto_mod.contains("pub mod user_account;\n\npub use user_account::UserAccount;\n"));
        assert!(dto_mod.contains("pub struct Page<T>"));
        assert!(!dto_mod.contains("is_zero"));
        assert!(syn::parse_file(&dto_mod).is_ok());

        let query_mod = render_mod(ModKind::Query, std::slice::from_ref(&t)).unwrap();
        assert!(query_mod.contains("pub use user_account::UserAccountQuery;"));
    }
}
