//! SQLite connection utilities

use rusqlite::Connection;
use std::path::Path;

/// Open a file-backed connection tuned for concurrent readers
pub fn create_connection(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;

    // journal_mode answers with the resulting mode, so it has to be read
    let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
    conn.execute_batch("PRAGMA synchronous=NORMAL;")?;

    Ok(conn)
}
