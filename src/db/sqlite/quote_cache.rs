//! Quote cache rows

use crate::cache::CacheEntry;
use crate::error::Result;
use chrono::DateTime;
use rusqlite::{params, Connection};

/// Get the row for `(symbol, day)`, expired or not
pub fn get_entry(
    conn: &Connection,
    table: &str,
    symbol: &str,
    day: &str,
) -> Result<Option<CacheEntry>> {
    let result = conn.query_row(
        &format!(
            r#"SELECT data, ttl, timestamp FROM "{}" WHERE symbol = ?1 AND date = ?2"#,
            table
        ),
        params![symbol, day],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
            ))
        },
    );

    match result {
        Ok((data, expires_at, written_at)) => Ok(Some(CacheEntry {
            symbol: symbol.to_string(),
            day: day.to_string(),
            data: serde_json::from_str(&data)?,
            expires_at,
            written_at,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Insert or overwrite the row for the entry's key
pub fn upsert_entry(conn: &Connection, table: &str, entry: &CacheEntry) -> Result<()> {
    let data = serde_json::to_string(&entry.data)?;
    let updated_at = DateTime::from_timestamp(entry.written_at, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    conn.execute(
        &format!(
            r#"INSERT INTO "{}" (symbol, date, data, ttl, timestamp, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT(symbol, date) DO UPDATE SET
                   data = excluded.data,
                   ttl = excluded.ttl,
                   timestamp = excluded.timestamp,
                   updated_at = excluded.updated_at"#,
            table
        ),
        params![
            entry.symbol,
            entry.day,
            data,
            entry.expires_at,
            entry.written_at,
            updated_at
        ],
    )?;

    Ok(())
}

/// Delete rows whose expiry is at or before `now`
pub fn delete_expired(conn: &Connection, table: &str, now: i64) -> Result<usize> {
    let deleted = conn.execute(
        &format!(r#"DELETE FROM "{}" WHERE ttl <= ?1"#, table),
        params![now],
    )?;
    Ok(deleted)
}

/// Count all rows
pub fn count_entries(conn: &Connection, table: &str) -> Result<i64> {
    let count = conn.query_row(
        &format!(r#"SELECT COUNT(*) FROM "{}""#, table),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
