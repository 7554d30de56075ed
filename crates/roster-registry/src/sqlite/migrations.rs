//! Schema setup, versioned with `PRAGMA user_version`.

use rusqlite::Connection;

use crate::errors::Result;

const MIGRATIONS: &[&str] = &[
    // v1
    "CREATE TABLE IF NOT EXISTS connections (
         connection_id TEXT PRIMARY KEY NOT NULL,
         user_name     TEXT NOT NULL,
         joined_at     TEXT NOT NULL
     ) WITHOUT ROWID;",
];

/// Apply pending migrations. Returns the number applied.
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let current = usize::try_from(current).unwrap_or(0);
    let mut applied = 0;
    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current) {
        conn.execute_batch(sql)?;
        conn.execute_batch(&format!("PRAGMA user_version = {};", index + 1))?;
        applied += 1;
    }
    Ok(applied)
}
