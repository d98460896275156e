//! Versioned SQLite schema management.
//!
//! Tables are declared as consts, grouped into [`SchemaVersion`]s, and the
//! whole list is handed to [`Database::open`]. A fresh file gets the latest
//! schema, an existing file is validated against the version recorded in
//! `PRAGMA user_version` and migrated forward.

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Default expression for `created`-style columns.
pub const UNIX_NOW: &str = "(cast(strftime('%s','now') as int))";

/// Offset added to `PRAGMA user_version` so a foreign SQLite file is never
/// mistaken for one of ours.
pub const BASE_DB_VERSION: usize = 52000;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    fn ddl(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        }
    }

    fn parse(s: &str) -> Option<SqlType> {
        match s {
            "TEXT" => Some(SqlType::Text),
            "INTEGER" => Some(SqlType::Integer),
            "REAL" => Some(SqlType::Real),
            "BLOB" => Some(SqlType::Blob),
            _ => None,
        }
    }
}

#[allow(unused)]
pub enum OnDelete {
    NoAction,
    Restrict,
    SetNull,
    SetDefault,
    Cascade,
}

impl OnDelete {
    fn ddl(&self) -> &'static str {
        match self {
            OnDelete::NoAction => "NO ACTION",
            OnDelete::Restrict => "RESTRICT",
            OnDelete::SetNull => "SET NULL",
            OnDelete::SetDefault => "SET DEFAULT",
            OnDelete::Cascade => "CASCADE",
        }
    }
}

pub struct FkRef {
    pub table: &'static str,
    pub column: &'static str,
    pub on_delete: OnDelete,
}

pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
    pub default_expr: Option<&'static str>,
    pub references: Option<&'static FkRef>,
}

#[macro_export]
macro_rules! sql_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {{
        // unused_mut fires when no optional field assignments are passed
        #[allow(unused_mut)]
        let mut column = $crate::sqlite_persistence::ColumnDef {
            name: $name,
            sql_type: $sql_type,
            primary_key: false,
            not_null: false,
            unique: false,
            default_expr: None,
            references: None,
        };
        $( column.$field = $value; )*
        column
    }};
}

pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
    /// Multi-column UNIQUE constraints, one inner slice per constraint.
    pub uniques: &'static [&'static [&'static str]],
    /// `(index_name, column_name)` pairs.
    pub indices: &'static [(&'static str, &'static str)],
}

impl TableDef {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let mut ddl = format!("CREATE TABLE {} (", self.name);
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                ddl.push_str(", ");
            }
            ddl.push_str(column.name);
            ddl.push(' ');
            ddl.push_str(column.sql_type.ddl());
            if column.primary_key {
                ddl.push_str(" PRIMARY KEY");
            }
            if column.not_null {
                ddl.push_str(" NOT NULL");
            }
            if column.unique {
                ddl.push_str(" UNIQUE");
            }
            if let Some(default_expr) = column.default_expr {
                ddl.push_str(&format!(" DEFAULT {}", default_expr));
            }
            if let Some(fk) = column.references {
                ddl.push_str(&format!(
                    " REFERENCES {}({}) ON DELETE {}",
                    fk.table,
                    fk.column,
                    fk.on_delete.ddl()
                ));
            }
        }
        for unique in self.uniques {
            ddl.push_str(&format!(", UNIQUE ({})", unique.join(", ")));
        }
        ddl.push_str(");");
        conn.execute(&ddl, params![])?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, self.name, column_name),
                params![],
            )?;
        }
        Ok(())
    }

    /// Compares the live table shape against this definition. Only name,
    /// type, NOT NULL and primary key are checked; SQLite's `table_info`
    /// pragma does not report single-column UNIQUE or foreign keys.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual = stmt
            .query_map(params![], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)? == 1,
                    row.get::<_, i32>(5)? == 1,
                ))
            })?
            .collect::<Result<Vec<(String, String, bool, bool)>, _>>()?;

        if actual.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found: [{}], expected: [{}]",
                self.name,
                actual.len(),
                self.columns.len(),
                actual.iter().map(|c| c.0.as_str()).collect::<Vec<_>>().join(", "),
                self.columns.iter().map(|c| c.name).collect::<Vec<_>>().join(", "),
            );
        }

        for ((name, sql_type, not_null, primary_key), expected) in
            actual.iter().zip(self.columns.iter())
        {
            if name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    name
                );
            }
            if SqlType::parse(sql_type) != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    sql_type
                );
            }
            if *not_null != expected.not_null {
                bail!(
                    "Table {} column {} NOT NULL mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.not_null,
                    not_null
                );
            }
            if *primary_key != expected.primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.primary_key,
                    primary_key
                );
            }
        }
        Ok(())
    }
}

pub struct SchemaVersion {
    pub version: usize,
    pub tables: &'static [TableDef],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl SchemaVersion {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Shared handle to a versioned SQLite database. Cheap to clone; every store
/// built on the same handle shares one connection behind a mutex, so a
/// `MutexGuard` is the scope of any multi-statement transaction.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at `path` and brings it to the last
    /// entry of `schemas`: fresh files get the latest schema directly,
    /// existing files are validated at their recorded version and migrated
    /// forward one version at a time.
    pub fn open<P: AsRef<Path>>(path: P, schemas: &'static [SchemaVersion]) -> Result<Database> {
        let conn = if path.as_ref().exists() {
            Connection::open_with_flags(
                path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(path)?;
            schemas
                .last()
                .context("Empty schema list")?
                .create(&conn)?;
            conn
        };
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;

        let raw_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<_, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;
        if raw_version < 0 {
            bail!(
                "Database version {} predates base version {}",
                raw_version + BASE_DB_VERSION as i64,
                BASE_DB_VERSION
            );
        }
        let version = raw_version as usize;
        if version >= schemas.len() {
            bail!("Database version {} is too new", version);
        }

        schemas[version].validate(&conn)?;
        Self::migrate(&conn, schemas, version)?;

        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate(conn: &Connection, schemas: &'static [SchemaVersion], from: usize) -> Result<()> {
        let mut reached = from;
        for schema in schemas.iter().skip(from + 1) {
            if let Some(migration_fn) = schema.migration {
                info!("Migrating db from version {} to {}", reached, schema.version);
                migration_fn(conn)
                    .with_context(|| format!("Migration to version {} failed", schema.version))?;
                reached = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + reached),
            [],
        )?;
        Ok(())
    }

    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}
