//! SQLite database module

mod connection;
mod migrations;
mod quote_cache;

use crate::cache::{CacheEntry, QuoteStore};
use crate::config::validate_table_name;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite database wrapper holding the quote cache table
pub struct SqliteDb {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteDb {
    /// Open (or create) a file-backed cache database
    pub fn new(path: &Path, table: &str) -> Result<Self> {
        validate_table_name(table)?;
        let conn = connection::create_connection(path)?;
        Self::with_connection(conn, table)
    }

    /// Cache database that lives only as long as this value
    pub fn open_in_memory(table: &str) -> Result<Self> {
        validate_table_name(table)?;
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        };

        // Run migrations
        db.run_migrations()?;

        Ok(db)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn, &self.table)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    // ========== Quote Cache Methods ==========

    /// Get a cache row, expired or not
    pub fn get_cache_entry(&self, symbol: &str, day: &str) -> Result<Option<CacheEntry>> {
        let conn = self.conn.lock();
        quote_cache::get_entry(&conn, &self.table, symbol, day)
    }

    /// Store a cache row, replacing any existing one for the key
    pub fn put_cache_entry(&self, entry: &CacheEntry) -> Result<()> {
        let conn = self.conn.lock();
        quote_cache::upsert_entry(&conn, &self.table, entry)
    }

    /// Remove expired cache rows
    pub fn delete_expired_entries(&self, now: i64) -> Result<usize> {
        let conn = self.conn.lock();
        quote_cache::delete_expired(&conn, &self.table, now)
    }

    /// Number of cache rows, expired included
    pub fn count_cache_entries(&self) -> Result<i64> {
        let conn = self.conn.lock();
        quote_cache::count_entries(&conn, &self.table)
    }
}

#[async_trait]
impl QuoteStore for SqliteDb {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self, symbol: &str, day: &str) -> Result<Option<CacheEntry>> {
        self.get_cache_entry(symbol, day)
    }

    async fn save(&self, entry: &CacheEntry) -> Result<()> {
        self.put_cache_entry(entry)
    }

    async fn purge_expired(&self, now: i64) -> Result<usize> {
        self.delete_expired_entries(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::QuoteRecord;
    use tempfile::tempdir;

    fn entry(symbol: &str, written_at: i64) -> CacheEntry {
        CacheEntry {
            symbol: symbol.to_string(),
            day: "2024-05-03".to_string(),
            data: QuoteRecord::new(symbol),
            expires_at: written_at + 45,
            written_at,
        }
    }

    #[test]
    fn test_rejects_bad_table_name() {
        assert!(SqliteDb::open_in_memory("quotes\"; DROP TABLE x; --").is_err());
    }

    #[tokio::test]
    async fn test_store_trait_roundtrip() {
        let db = SqliteDb::open_in_memory("stock-price-cache").unwrap();
        db.save(&entry("AAPL", 1_000)).await.unwrap();

        let loaded = db.load("AAPL", "2024-05-03").await.unwrap().unwrap();
        assert_eq!(loaded.expires_at, 1_045);
        assert_eq!(db.purge_expired(1_100).await.unwrap(), 1);
        assert_eq!(db.count_cache_entries().unwrap(), 0);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quote-cache.db");

        {
            let db = SqliteDb::new(&path, "quotes").unwrap();
            db.put_cache_entry(&entry("MSFT", 5_000)).unwrap();
        }

        let db = SqliteDb::new(&path, "quotes").unwrap();
        let loaded = db.get_cache_entry("MSFT", "2024-05-03").unwrap().unwrap();
        assert_eq!(loaded.written_at, 5_000);
        assert_eq!(db.table(), "quotes");
    }
}
