//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations for the given cache table
pub fn run_migrations(conn: &Connection, table: &str) -> Result<()> {
    // Create migrations table
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(
        conn,
        &format!("001_quote_cache:{}", table),
        &create_quote_cache_table(table),
    )?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    // Check if migration already applied
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

/// `ttl` holds the absolute expiry, `timestamp` the write time (epoch seconds)
fn create_quote_cache_table(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS "{table}" (
    symbol TEXT NOT NULL,
    date TEXT NOT NULL,
    data TEXT NOT NULL,
    ttl INTEGER NOT NULL,
    timestamp INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (symbol, date)
);
CREATE INDEX IF NOT EXISTS "idx_{table}_ttl" ON "{table}"(ttl);
"#
    )
}
