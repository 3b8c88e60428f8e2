//! SQL dialect specifics used when rendering query bindings.

use serde::{Deserialize, Serialize};

/// Relational dialect family of a driver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Sqlite,
    Postgres,
    /// MySQL and wire-compatible databases (TiDB)
    #[serde(alias = "tidb")]
    Mysql,
}

impl Dialect {
    /// Lowercase name
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
            Dialect::Mysql => "mysql",
        }
    }

    /// Pool type used by generated code
    pub fn pool_type(self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlx::SqlitePool",
            Dialect::Postgres => "sqlx::PgPool",
            Dialect::Mysql => "sqlx::MySqlPool",
        }
    }

    /// Bind placeholder for the 1-based parameter `n`
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${n}"),
            Dialect::Sqlite | Dialect::Mysql => "?".to_string(),
        }
    }

    /// `INSERT ... RETURNING` is available
    pub fn supports_returning(self) -> bool {
        !matches!(self, Dialect::Mysql)
    }

    /// Rust type for a column's declared SQL type, `Option`-wrapped when nullable
    pub fn rust_type(self, sql_type: &str, nullable: bool) -> String {
        let base = self.base_type(sql_type);
        if nullable {
            format!("Option<{base}>")
        } else {
            base.to_string()
        }
    }

    fn base_type(self, sql_type: &str) -> &'static str {
        let lower = sql_type.trim().to_ascii_lowercase();
        let unsigned = lower.contains("unsigned");
        let name = lower
            .split('(')
            .next()
            .unwrap_or_default()
            .trim_end_matches("unsigned")
            .trim();

        if lower.starts_with("tinyint(1)") || matches!(name, "bool" | "boolean") {
            return "bool";
        }
        match (self, name) {
            (Dialect::Sqlite, "int" | "integer" | "bigint" | "smallint" | "tinyint" | "mediumint") => {
                "i64"
            }
            (_, "tinyint") if unsigned => "u8",
            (_, "tinyint") => "i8",
            (_, "smallint" | "int2" | "smallserial") if unsigned => "u16",
            (_, "smallint" | "int2" | "smallserial") => "i16",
            (_, "int" | "integer" | "int4" | "mediumint" | "serial") if unsigned => "u32",
            (_, "int" | "integer" | "int4" | "mediumint" | "serial") => "i32",
            (_, "bigint" | "int8" | "bigserial") if unsigned => "u64",
            (_, "bigint" | "int8" | "bigserial") => "i64",
            (Dialect::Sqlite, "real" | "float" | "double") => "f64",
            (_, "real" | "float" | "float4") => "f32",
            (_, "double" | "double precision" | "float8") => "f64",
            (_, "date") => "chrono::NaiveDate",
            (_, "time" | "time without time zone") => "chrono::NaiveTime",
            (_, "timestamptz" | "timestamp with time zone") => "chrono::DateTime<chrono::Utc>",
            (_, "datetime" | "timestamp" | "timestamp without time zone") => "chrono::NaiveDateTime",
            (_, "blob" | "tinyblob" | "mediumblob" | "longblob" | "bytea" | "binary" | "varbinary") => {
                "Vec<u8>"
            }
            (_, "json" | "jsonb") => "serde_json::Value",
            (Dialect::Postgres, "uuid") => "uuid::Uuid",
            _ => "String",
        }
    }
}
