//! Database schema migrations for focusloop.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_VERSION: i32 = 1;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Migration v1: settings, tasks, the interval log and the kv table.
///
/// `seq` columns preserve insertion order; tasks are upserted by `id`
/// without touching `seq`, intervals are insert-only.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS settings (
            id                          INTEGER PRIMARY KEY CHECK (id = 1),
            work_minutes                INTEGER NOT NULL,
            short_break_minutes         INTEGER NOT NULL,
            long_break_minutes          INTEGER NOT NULL,
            intervals_before_long_break INTEGER NOT NULL,
            auto_start_breaks           INTEGER NOT NULL DEFAULT 0,
            auto_start_work             INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS tasks (
            seq                 INTEGER PRIMARY KEY AUTOINCREMENT,
            id                  TEXT NOT NULL UNIQUE,
            name                TEXT NOT NULL,
            estimated_intervals INTEGER NOT NULL,
            completed_intervals INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            completed_at        TEXT,
            tags                TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS intervals (
            seq              INTEGER PRIMARY KEY AUTOINCREMENT,
            id               TEXT NOT NULL UNIQUE,
            task_name        TEXT NOT NULL,
            task_id          TEXT,
            kind             TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            started_at       TEXT NOT NULL,
            ended_at         TEXT NOT NULL,
            completed        INTEGER NOT NULL,
            interrupted      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_intervals_started_at ON intervals(started_at);
        CREATE INDEX IF NOT EXISTS idx_tasks_name ON tasks(name);",
    )?;

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [1])?;

    tx.commit()?;
    Ok(())
}
