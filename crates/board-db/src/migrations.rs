use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{DbError, DbResult};

struct Column {
    name: &'static str,
    decl: &'static str,
    primary: bool,
}

struct Table {
    name: &'static str,
    columns: &'static [Column],
    indexes: &'static [&'static str],
}

const fn col(name: &'static str, decl: &'static str) -> Column {
    Column { name, decl, primary: false }
}

const fn pk(name: &'static str) -> Column {
    Column { name, decl: "INTEGER PRIMARY KEY AUTOINCREMENT", primary: true }
}

// Every non-key column carries a constant default so it can be added to a
// populated table with ALTER TABLE.
const EPOCH: &str = "TEXT NOT NULL DEFAULT '1970-01-01 00:00:00'";

const USERS: Table = Table {
    name: "users",
    columns: &[
        pk("id"),
        col("name", "TEXT NOT NULL DEFAULT ''"),
        col("email", "TEXT"),
        col("age", "INTEGER NOT NULL DEFAULT 0"),
        col("created_at", EPOCH),
        col("updated_at", EPOCH),
    ],
    indexes: &["CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email)"],
};

const MSG_CONTENTS: Table = Table {
    name: "msg_contents",
    columns: &[
        pk("msg_id"),
        col("user_id", "TEXT NOT NULL DEFAULT ''"),
        col("user_ip", "TEXT NOT NULL DEFAULT ''"),
        col("content", "TEXT NOT NULL DEFAULT ''"),
        col("created_at", EPOCH),
    ],
    indexes: &[],
};

const TABLES: &[Table] = &[USERS, MSG_CONTENTS];

/// Bring every known table up to its declared shape. Missing tables are
/// created and missing columns added; nothing is ever dropped.
pub fn run(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction().map_err(migration_error)?;

    for table in TABLES {
        if table_exists(&tx, table.name)? {
            add_missing_columns(&tx, table)?;
        } else {
            create_table(&tx, table)?;
        }

        for index in table.indexes {
            tx.execute_batch(index).map_err(migration_error)?;
        }
    }

    tx.commit().map_err(migration_error)?;

    info!("Database migrations complete");
    Ok(())
}

/// Fail unless every known table is present.
pub fn validate(conn: &Connection) -> DbResult<()> {
    for table in TABLES {
        if !table_exists(conn, table.name)? {
            return Err(DbError::Migration(format!("table {} does not exist", table.name)));
        }
    }
    Ok(())
}

fn create_table(conn: &Connection, table: &Table) -> DbResult<()> {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.decl))
        .collect();
    let sql = format!("CREATE TABLE {} ({})", table.name, columns.join(", "));

    conn.execute_batch(&sql).map_err(migration_error)?;
    info!("Created table {}", table.name);
    Ok(())
}

fn add_missing_columns(conn: &Connection, table: &Table) -> DbResult<()> {
    let existing = column_names(conn, table.name)?;

    for column in table.columns.iter().filter(|c| !existing.contains(c.name)) {
        if column.primary {
            return Err(DbError::Migration(format!(
                "table {} has no {} key column and cannot be altered in place",
                table.name, column.name
            )));
        }

        conn.execute_batch(&format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table.name, column.name, column.decl
        ))
        .map_err(migration_error)?;
        info!("Added column {}.{}", table.name, column.name);
    }

    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> DbResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()
        .map_err(migration_error)?;
    Ok(found.is_some())
}

fn column_names(conn: &Connection, table: &str) -> DbResult<HashSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", table))
        .map_err(migration_error)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))
        .map_err(migration_error)?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(migration_error)?;
    Ok(names)
}

fn migration_error(e: rusqlite::Error) -> DbError {
    DbError::Migration(e.to_string())
}
