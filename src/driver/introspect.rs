//! Schema introspection, one implementation per dialect family.
//!
//! Each run opens a single connection, reads every base table in name order and
//! closes the connection again. Any connection or query failure is fatal.

use std::future::Future;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sqlx::{Connection, Row};
use tracing::{debug, info};

use super::Dialect;
use crate::config::GeneratorConfig;
use crate::error::{GenError, Result};
use crate::meta::{load_document, ColumnMeta, IndexKind, TableMeta};

/// Reads table metadata for one dialect
pub trait SchemaIntrospector: Send {
    /// Dialect of the generated query bindings
    fn dialect(&self) -> Dialect;

    /// Every base table of the configured database, in name order
    ///
    /// Called once per run, before [`dialect`](Self::dialect) is consulted.
    ///
    /// # Errors
    ///
    /// [`GenError::Connect`] when the database cannot be reached or queried.
    fn introspect(&mut self, config: &GeneratorConfig) -> Result<Vec<TableMeta>>;
}

fn connect_err(driver: &str) -> impl Fn(sqlx::Error) -> GenError + '_ {
    move |e| GenError::Connect {
        driver: driver.to_string(),
        message: e.to_string(),
    }
}

/// Run `future` to completion on a current-thread runtime
pub(crate) fn block_on<F: Future>(driver: &str, future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| GenError::Connect {
            driver: driver.to_string(),
            message: format!("failed to start runtime: {e}"),
        })?;
    Ok(runtime.block_on(future))
}

fn apply_index(columns: &mut [ColumnMeta], column: &str, unique: bool) {
    if let Some(c) = columns.iter_mut().find(|c| c.name == column) {
        // a unique index outranks a plain one on the same column
        if unique || c.index.is_none() {
            c.index = Some(if unique {
                IndexKind::Unique
            } else {
                IndexKind::Index
            });
        }
    }
}

/// SQLite files and in-memory databases
#[derive(Debug, Clone, Default)]
pub struct SqliteIntrospector;

impl SqliteIntrospector {
    async fn run(dsn: &str) -> std::result::Result<Vec<TableMeta>, sqlx::Error> {
        let mut conn = sqlx::SqliteConnection::connect(dsn).await?;
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&mut conn)
        .await?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let rows = sqlx::query(
                "SELECT name, type, \"notnull\", pk, dflt_value FROM pragma_table_info(?1) ORDER BY cid",
            )
            .bind(&name)
            .fetch_all(&mut conn)
            .await?;
            let mut columns = Vec::with_capacity(rows.len());
            for row in rows {
                let primary_key = row.try_get::<i64, _>("pk")? > 0;
                columns.push(ColumnMeta {
                    name: row.try_get("name")?,
                    sql_type: row.try_get("type")?,
                    nullable: row.try_get::<i64, _>("notnull")? == 0 && !primary_key,
                    primary_key,
                    index: None,
                    default: row.try_get("dflt_value")?,
                });
            }

            let indexes = sqlx::query(
                "SELECT ii.name AS column_name, il.\"unique\" AS is_unique \
                 FROM pragma_index_list(?1) AS il JOIN pragma_index_info(il.name) AS ii",
            )
            .bind(&name)
            .fetch_all(&mut conn)
            .await?;
            for row in indexes {
                let column: String = row.try_get("column_name")?;
                let unique = row.try_get::<i64, _>("is_unique")? != 0;
                apply_index(&mut columns, &column, unique);
            }

            tables.push(TableMeta {
                name,
                columns,
                comment: None,
            });
        }
        conn.close().await?;
        Ok(tables)
    }
}

impl SchemaIntrospector for SqliteIntrospector {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn introspect(&mut self, config: &GeneratorConfig) -> Result<Vec<TableMeta>> {
        let tables = block_on("sqlite", Self::run(&config.dsn))?.map_err(connect_err("sqlite"))?;
        info!(driver = "sqlite", tables = tables.len(), "Introspected schema");
        Ok(tables)
    }
}

/// PostgreSQL; a table prefix selects the schema through `search_path`
#[derive(Debug, Clone, Default)]
pub struct PostgresIntrospector;

fn quote_pg_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl PostgresIntrospector {
    async fn run(
        dsn: &str,
        schema: Option<&str>,
    ) -> std::result::Result<Vec<TableMeta>, sqlx::Error> {
        let mut conn = sqlx::PgConnection::connect(dsn).await?;
        if let Some(schema) = schema {
            let sql = format!("SET search_path TO {}", quote_pg_ident(schema));
            sqlx::raw_sql(&sql).execute(&mut conn).await?;
            debug!(schema, "Switched search_path");
        }

        let rows = sqlx::query(
            "SELECT t.table_name::text AS table_name, \
                    obj_description(to_regclass(quote_ident(t.table_name)), 'pg_class')::text AS comment \
             FROM information_schema.tables t \
             WHERE t.table_schema = current_schema() AND t.table_type = 'BASE TABLE' \
             ORDER BY t.table_name",
        )
        .fetch_all(&mut conn)
        .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("table_name")?;
            let comment: Option<String> = row.try_get("comment")?;

            let column_rows = sqlx::query(
                "SELECT column_name::text AS column_name, data_type::text AS data_type, \
                        is_nullable::text AS is_nullable, column_default::text AS column_default \
                 FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 ORDER BY ordinal_position",
            )
            .bind(&name)
            .fetch_all(&mut conn)
            .await?;
            let mut columns = Vec::with_capacity(column_rows.len());
            for c in column_rows {
                columns.push(ColumnMeta {
                    name: c.try_get("column_name")?,
                    sql_type: c.try_get("data_type")?,
                    nullable: c.try_get::<String, _>("is_nullable")? == "YES",
                    primary_key: false,
                    index: None,
                    default: c.try_get("column_default")?,
                });
            }

            let index_rows = sqlx::query(
                "SELECT a.attname::text AS column_name, i.indisprimary AS is_primary, \
                        i.indisunique AS is_unique \
                 FROM pg_index i \
                 JOIN pg_class c ON c.oid = i.indrelid \
                 JOIN pg_namespace n ON n.oid = c.relnamespace \
                 JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey) \
                 WHERE n.nspname = current_schema() AND c.relname = $1",
            )
            .bind(&name)
            .fetch_all(&mut conn)
            .await?;
            for ix in index_rows {
                let column: String = ix.try_get("column_name")?;
                if ix.try_get::<bool, _>("is_primary")? {
                    if let Some(c) = columns.iter_mut().find(|c| c.name == column) {
                        c.primary_key = true;
                        c.nullable = false;
                    }
                } else {
                    apply_index(&mut columns, &column, ix.try_get("is_unique")?);
                }
            }

            tables.push(TableMeta {
                name,
                columns,
                comment: comment.filter(|c| !c.is_empty()),
            });
        }
        conn.close().await?;
        Ok(tables)
    }
}

impl SchemaIntrospector for PostgresIntrospector {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn introspect(&mut self, config: &GeneratorConfig) -> Result<Vec<TableMeta>> {
        let tables = block_on("postgres", Self::run(&config.dsn, config.table_prefix()))?
            .map_err(connect_err("postgres"))?;
        info!(driver = "postgres", tables = tables.len(), "Introspected schema");
        Ok(tables)
    }
}

/// MySQL and TiDB; a table prefix selects the database
#[derive(Debug, Clone)]
pub struct MysqlIntrospector {
    driver: String,
}

impl MysqlIntrospector {
    /// Introspector reporting itself as `driver` (`mysql`, `tidb`)
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
        }
    }

    async fn run(
        dsn: &str,
        database: Option<&str>,
    ) -> std::result::Result<Vec<TableMeta>, sqlx::Error> {
        let mut conn = sqlx::MySqlConnection::connect(dsn).await?;
        let rows = sqlx::query(
            "SELECT CAST(TABLE_NAME AS CHAR) AS table_name, CAST(TABLE_COMMENT AS CHAR) AS comment \
             FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_TYPE = 'BASE TABLE' \
             ORDER BY TABLE_NAME",
        )
        .bind(database)
        .fetch_all(&mut conn)
        .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("table_name")?;
            let comment: Option<String> = row.try_get("comment")?;
            let column_rows = sqlx::query(
                "SELECT CAST(COLUMN_NAME AS CHAR) AS column_name, CAST(COLUMN_TYPE AS CHAR) AS column_type, \
                        CAST(IS_NULLABLE AS CHAR) AS is_nullable, CAST(COLUMN_KEY AS CHAR) AS column_key, \
                        CAST(COLUMN_DEFAULT AS CHAR) AS column_default \
                 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = COALESCE(?, DATABASE()) AND TABLE_NAME = ? \
                 ORDER BY ORDINAL_POSITION",
            )
            .bind(database)
            .bind(&name)
            .fetch_all(&mut conn)
            .await?;

            let mut columns = Vec::with_capacity(column_rows.len());
            for c in column_rows {
                let key: String = c.try_get::<Option<String>, _>("column_key")?.unwrap_or_default();
                columns.push(ColumnMeta {
                    name: c.try_get("column_name")?,
                    sql_type: c.try_get("column_type")?,
                    nullable: c.try_get::<String, _>("is_nullable")? == "YES",
                    primary_key: key == "PRI",
                    index: match key.as_str() {
                        "UNI" => Some(IndexKind::Unique),
                        "MUL" => Some(IndexKind::Index),
                        _ => None,
                    },
                    default: c.try_get("column_default")?,
                });
            }
            tables.push(TableMeta {
                name,
                columns,
                comment: comment.filter(|c| !c.is_empty()),
            });
        }
        conn.close().await?;
        Ok(tables)
    }
}

impl SchemaIntrospector for MysqlIntrospector {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn introspect(&mut self, config: &GeneratorConfig) -> Result<Vec<TableMeta>> {
        let tables = block_on(&self.driver, Self::run(&config.dsn, config.table_prefix()))?
            .map_err(connect_err(&self.driver))?;
        info!(driver = %self.driver, tables = tables.len(), "Introspected schema");
        Ok(tables)
    }
}

/// Schema document read from the DSN path instead of a live database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredSchema {
    /// Dialect of the generated query bindings
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(default)]
    pub tables: Vec<TableMeta>,
}

/// Introspector backed by a [`DeclaredSchema`] document
#[derive(Debug, Clone, Default)]
pub struct DeclaredIntrospector {
    dialect: Option<Dialect>,
}

impl DeclaredIntrospector {
    fn load(path: &Path) -> Result<DeclaredSchema> {
        if !path.exists() {
            return Err(GenError::Connect {
                driver: "declared".to_string(),
                message: format!("schema document not found: {}", path.display()),
            });
        }
        load_document(path)
    }
}

impl SchemaIntrospector for DeclaredIntrospector {
    fn dialect(&self) -> Dialect {
        self.dialect.unwrap_or_default()
    }

    fn introspect(&mut self, config: &GeneratorConfig) -> Result<Vec<TableMeta>> {
        let schema = Self::load(Path::new(&config.dsn))?;
        self.dialect = Some(schema.dialect);
        let mut tables = schema.tables;
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        info!(driver = "declared", tables = tables.len(), "Loaded declared schema");
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::config::ConfigLayer;

    fn config(driver: &str, dsn: &str) -> GeneratorConfig {
        GeneratorConfig::from_layer(
            "svc",
            ConfigLayer {
                driver: Some(driver.to_string()),
                dsn: Some(dsn.to_string()),
                ..Default::default()
            },
        )
    }

    #[test]
    fn sqlite_tables_columns_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("app.db");
        let dsn = format!("sqlite://{}?mode=rwc", db.display());
        block_on("sqlite", async {
            let mut conn = sqlx::SqliteConnection::connect(&dsn).await.unwrap();
            sqlx::raw_sql(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE, nick TEXT); \
                 CREATE INDEX users_nick ON users (nick); \
                 CREATE TABLE audit (at DATETIME NOT NULL, what TEXT);",
            )
            .execute(&mut conn)
            .await
            .unwrap();
            conn.close().await.unwrap();
        })
        .unwrap();

        let tables = SqliteIntrospector.introspect(&config("sqlite", &dsn)).unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["audit", "users"]);

        let users = &tables[1];
        assert_eq!(users.primary_key().map(|c| c.name.as_str()), Some("id"));
        assert!(!users.columns[0].nullable);
        assert_eq!(users.columns[1].index, Some(IndexKind::Unique));
        assert!(!users.columns[1].nullable);
        assert_eq!(users.columns[2].index, Some(IndexKind::Index));
        assert!(users.columns[2].nullable);
        assert!(tables[0].primary_key().is_none());
    }

    #[test]
    fn unreachable_database_is_a_connect_error() {
        let dir = tempfile::tempdir().unwrap();
        let dsn = format!("sqlite://{}?mode=ro", dir.path().join("missing.db").display());
        let err = SqliteIntrospector
            .introspect(&config("sqlite", &dsn))
            .unwrap_err();
        assert!(matches!(err, GenError::Connect { .. }));
    }

    #[test]
    fn declared_schema_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");
        std::fs::write(
            &path,
            "dialect: postgres\ntables:\n  - name: zeta\n  - name: alpha\n",
        )
        .unwrap();
        let cfg = config("declared", &path.display().to_string());
        let mut declared = DeclaredIntrospector::default();
        let tables = declared.introspect(&cfg).unwrap();
        assert_eq!(declared.dialect(), Dialect::Postgres);
        assert_eq!(tables[0].name, "alpha");
    }
}
