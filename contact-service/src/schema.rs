//! Table declarations and schema synchronization.
//!
//! Models declare a static [`TableSchema`]; this module renders it to DDL for
//! the project's dialect and reconciles the live database with it.

use common::config::Dialect;
use common::errors::{AppError, AppResult};

use crate::database::DbPool;

/// Column storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Auto-increment integer primary key.
    Id,
    Varchar(u16),
    Text,
    Bool,
    Timestamp,
    /// String restricted to the listed values.
    Enum(&'static [&'static str]),
}

/// Literal column default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Bool(bool),
    Str(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
}

impl Column {
    pub const fn id() -> Self {
        Self::required("id", ColumnKind::Id)
    }

    pub const fn required(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: true,
            default: None,
        }
    }

    pub const fn with_default(self, default: DefaultValue) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    pub columns: &'static [&'static str],
    pub unique: bool,
}

impl Index {
    pub const fn on(columns: &'static [&'static str]) -> Self {
        Self {
            columns,
            unique: false,
        }
    }

    pub const fn unique(columns: &'static [&'static str]) -> Self {
        Self {
            columns,
            unique: true,
        }
    }

    fn name(&self, table: &str) -> String {
        let prefix = if self.unique { "uq" } else { "idx" };
        format!("{}_{}_{}", prefix, table, self.columns.join("_"))
    }
}

/// Declared shape of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indexes: &'static [Index],
}

/// How far [`sync_table`] may go when reconciling an existing table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Add declared columns missing from existing tables.
    pub alter: bool,
    /// Drop and recreate tables. Destroys data.
    pub force: bool,
}

impl SyncOptions {
    /// Create missing tables only.
    pub fn create() -> Self {
        Self::default()
    }

    pub fn alter() -> Self {
        Self {
            alter: true,
            force: false,
        }
    }

    pub fn force() -> Self {
        Self {
            alter: false,
            force: true,
        }
    }
}

fn quote(dialect: Dialect, ident: &str) -> String {
    match dialect {
        Dialect::Sqlite => format!("\"{}\"", ident),
        Dialect::MySql => format!("`{}`", ident),
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl TableSchema {
    /// Column definition as used in CREATE TABLE or ADD COLUMN.
    fn column_sql(&self, dialect: Dialect, column: &Column, adding: bool) -> String {
        let name = quote(dialect, column.name);
        if column.kind == ColumnKind::Id {
            return match dialect {
                Dialect::Sqlite => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", name),
                Dialect::MySql => format!("{} BIGINT NOT NULL AUTO_INCREMENT", name),
            };
        }

        let ty = match (dialect, column.kind) {
            (_, ColumnKind::Varchar(len)) => format!("VARCHAR({})", len),
            (_, ColumnKind::Text) => "TEXT".to_string(),
            (Dialect::Sqlite, ColumnKind::Bool) => "BOOLEAN".to_string(),
            (Dialect::MySql, ColumnKind::Bool) => "TINYINT(1)".to_string(),
            (_, ColumnKind::Timestamp) => "DATETIME".to_string(),
            (Dialect::Sqlite, ColumnKind::Enum(values)) => format!(
                "VARCHAR(32) CHECK ({} IN ({}))",
                name,
                values.iter().map(|v| quote_literal(v)).collect::<Vec<_>>().join(", ")
            ),
            (Dialect::MySql, ColumnKind::Enum(values)) => format!(
                "ENUM({})",
                values.iter().map(|v| quote_literal(v)).collect::<Vec<_>>().join(", ")
            ),
            (_, ColumnKind::Id) => unreachable!("handled above"),
        };

        let mut sql = format!("{} {}", name, ty);
        // Columns added to populated tables cannot be NOT NULL without a default.
        if !column.nullable && (!adding || column.default.is_some()) {
            sql.push_str(" NOT NULL");
        }
        match column.default {
            Some(DefaultValue::Bool(b)) => sql.push_str(if b { " DEFAULT 1" } else { " DEFAULT 0" }),
            Some(DefaultValue::Str(s)) => {
                sql.push_str(" DEFAULT ");
                sql.push_str(&quote_literal(s));
            }
            None => {}
        }
        sql
    }

    /// `CREATE TABLE IF NOT EXISTS` for the dialect. MySQL indexes are inline.
    pub fn create_sql(&self, dialect: Dialect) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| self.column_sql(dialect, c, false))
            .collect();

        if dialect == Dialect::MySql {
            if let Some(id) = self.columns.iter().find(|c| c.kind == ColumnKind::Id) {
                parts.push(format!("PRIMARY KEY ({})", quote(dialect, id.name)));
            }
            for index in self.indexes {
                let columns = index
                    .columns
                    .iter()
                    .map(|c| quote(dialect, c))
                    .collect::<Vec<_>>()
                    .join(", ");
                let keyword = if index.unique { "UNIQUE KEY" } else { "KEY" };
                parts.push(format!(
                    "{} {} ({})",
                    keyword,
                    quote(dialect, &index.name(self.name)),
                    columns
                ));
            }
        }

        let mut sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote(dialect, self.name),
            parts.join(", ")
        );
        if dialect == Dialect::MySql {
            sql.push_str(" ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci");
        }
        sql
    }

    /// Standalone index statements (SQLite only; MySQL declares them inline).
    pub fn index_sql(&self, dialect: Dialect) -> Vec<String> {
        if dialect == Dialect::MySql {
            return Vec::new();
        }
        self.indexes
            .iter()
            .map(|index| {
                format!(
                    "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
                    if index.unique { "UNIQUE " } else { "" },
                    quote(dialect, &index.name(self.name)),
                    quote(dialect, self.name),
                    index
                        .columns
                        .iter()
                        .map(|c| quote(dialect, c))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
            .collect()
    }

    pub fn drop_sql(&self, dialect: Dialect) -> String {
        format!("DROP TABLE IF EXISTS {}", quote(dialect, self.name))
    }

    /// `ALTER TABLE .. ADD COLUMN` for every declared column not in `existing`.
    pub fn add_column_sql(&self, dialect: Dialect, existing: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !existing.iter().any(|e| e.eq_ignore_ascii_case(c.name)))
            .map(|c| {
                format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    quote(dialect, self.name),
                    self.column_sql(dialect, c, true)
                )
            })
            .collect()
    }
}

/// Reconciles one table with its declaration.
pub async fn sync_table(pool: &DbPool, schema: &TableSchema, options: SyncOptions) -> AppResult<()> {
    let dialect = pool.dialect();
    let run = |sql: String| async move {
        tracing::debug!(table = schema.name, sql = %sql, "sync statement");
        pool.execute(&sql)
            .await
            .map_err(|e| AppError::Sync(format!("{}: {}", schema.name, e)))
    };

    if options.force {
        run(schema.drop_sql(dialect)).await?;
    }

    let existing = pool
        .column_names(schema.name)
        .await
        .map_err(|e| AppError::Sync(format!("{}: {}", schema.name, e)))?;

    if existing.is_empty() {
        run(schema.create_sql(dialect)).await?;
    } else if options.alter {
        for sql in schema.add_column_sql(dialect, &existing) {
            run(sql).await?;
        }
    }

    for sql in schema.index_sql(dialect) {
        run(sql).await?;
    }
    Ok(())
}
