//! SQLite index backend for persistent storage.

use super::{format_date, parse_date, IndexBackend, IndexEntry, IndexStats};
use crate::core::date::DateSource;
use crate::core::hasher::ContentHash;
use crate::error::IndexError;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SELECT_COLUMNS: &str = "SELECT hash, file_name, file_path, file_size, media_type,
        date_added, date_taken, date_source FROM media_hashes";

const ORDER: &str = "ORDER BY date_taken, file_name";

/// SQLite-backed persistent index
///
/// Uses WAL (Write-Ahead Logging) mode so a second reader (e.g. the `index`
/// subcommand) can inspect the database while a run is writing.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteIndex {
    /// Open or create an index database at the given path
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IndexError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| IndexError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             CREATE TABLE IF NOT EXISTS media_hashes (
                hash TEXT PRIMARY KEY,
                file_name TEXT NOT NULL,
                file_path TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                media_type TEXT NOT NULL,
                date_added TEXT NOT NULL,
                date_taken TEXT,
                date_source TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_date_taken ON media_hashes(date_taken);",
        )
        .map_err(|e| Self::classify(path, e))?;

        tracing::debug!(path = %path.display(), "Opened index");
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    /// Open an existing database without write access
    pub fn open_read_only(path: &Path) -> Result<Self, IndexError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| IndexError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        // Touch the table so a foreign or damaged file fails here, not mid-run
        conn.query_row("SELECT COUNT(*) FROM media_hashes", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| Self::classify(path, e))?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn classify(path: &Path, e: rusqlite::Error) -> IndexError {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::NotADatabase) | Some(rusqlite::ErrorCode::DatabaseCorrupt) => {
                IndexError::Corrupted {
                    path: path.to_path_buf(),
                }
            }
            _ => IndexError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, IndexError> {
        self.conn.lock().map_err(|_| IndexError::Corrupted {
            path: self.db_path.clone(),
        })
    }

    fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<IndexEntry> {
        let hash_text: String = row.get(0)?;
        let hash = hash_text
            .parse::<ContentHash>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

        let date_added: String = row.get(5)?;
        let date_taken: Option<String> = row.get(6)?;
        let date_source: Option<String> = row.get(7)?;

        Ok(IndexEntry {
            hash,
            file_name: row.get(1)?,
            file_path: PathBuf::from(row.get::<_, String>(2)?),
            file_size: row.get::<_, i64>(3)? as u64,
            media_type: row.get(4)?,
            date_added: parse_date(&date_added).unwrap_or_default(),
            date_taken: date_taken.as_deref().and_then(parse_date),
            date_source: date_source.as_deref().and_then(DateSource::from_tag),
        })
    }

    fn query(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<IndexEntry>, IndexError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        let entries = stmt
            .query_map(args, Self::row_to_entry)
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        Ok(entries)
    }
}

impl IndexBackend for SqliteIndex {
    fn get(&self, hash: &ContentHash) -> Result<Option<IndexEntry>, IndexError> {
        let sql = format!("{} WHERE hash = ?1", SELECT_COLUMNS);
        Ok(self.query(&sql, &[&hash.to_hex()])?.into_iter().next())
    }

    fn upsert(&self, entry: &IndexEntry) -> Result<(), IndexError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO media_hashes
             (hash, file_name, file_path, file_size, media_type, date_added, date_taken, date_source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.hash.to_hex(),
                entry.file_name,
                entry.file_path.to_string_lossy(),
                entry.file_size as i64,
                entry.media_type,
                format_date(&entry.date_added),
                entry.date_taken.as_ref().map(format_date),
                entry.date_source.map(|s| s.tag()),
            ],
        )
        .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    fn remove(&self, hash: &ContentHash) -> Result<bool, IndexError> {
        let conn = self.lock()?;
        let removed = conn
            .execute("DELETE FROM media_hashes WHERE hash = ?1", [hash.to_hex()])
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?;
        Ok(removed > 0)
    }

    fn update_path(&self, hash: &ContentHash, new_path: &Path) -> Result<bool, IndexError> {
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE media_hashes SET file_path = ?1 WHERE hash = ?2",
                params![new_path.to_string_lossy(), hash.to_hex()],
            )
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?;
        Ok(updated > 0)
    }

    fn entries(&self) -> Result<Vec<IndexEntry>, IndexError> {
        self.query(&format!("{} {}", SELECT_COLUMNS, ORDER), &[])
    }

    fn search_by_name(&self, fragment: &str) -> Result<Vec<IndexEntry>, IndexError> {
        let escaped = fragment
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);
        let sql = format!(
            "{} WHERE file_name LIKE ?1 ESCAPE '\\' {}",
            SELECT_COLUMNS, ORDER
        );
        self.query(&sql, &[&pattern])
    }

    fn search_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<IndexEntry>, IndexError> {
        let sql = format!(
            "{} WHERE substr(date_taken, 1, 10) BETWEEN ?1 AND ?2 {}",
            SELECT_COLUMNS, ORDER
        );
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        self.query(&sql, &[&start, &end])
    }

    fn stats(&self) -> Result<IndexStats, IndexError> {
        let conn = self.lock()?;

        let (total, distinct, earliest, latest) = conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT hash), MIN(date_taken), MAX(date_taken)
                 FROM media_hashes",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)? as usize,
                        row.get::<_, i64>(1)? as usize,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        Ok(IndexStats {
            total_entries: total,
            distinct_hashes: distinct,
            duplicate_entries: total - distinct,
            earliest_taken: earliest.as_deref().and_then(parse_date),
            latest_taken: latest.as_deref().and_then(parse_date),
        })
    }

    fn cleanup(&self) -> Result<usize, IndexError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT hash, file_path FROM media_hashes")
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?
            .collect::<Result<_, _>>()
            .map_err(|e| IndexError::QueryFailed(e.to_string()))?;

        drop(stmt);

        let mut count = 0;
        for (hash, path) in rows {
            if !Path::new(&path).exists() {
                conn.execute("DELETE FROM media_hashes WHERE hash = ?1", [&hash])
                    .map_err(|e| IndexError::QueryFailed(e.to_string()))?;
                tracing::debug!(path = %path, "Removed index entry for missing file");
                count += 1;
            }
        }

        Ok(count)
    }
}
