//! SQLite table of cached APOD entries.

use crate::{Error, Result};
use chrono::NaiveDate;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS apod_images (
        id INTEGER PRIMARY KEY,
        date TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        explanation TEXT NOT NULL,
        file_path TEXT NOT NULL,
        content_hash TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_apod_images_content_hash ON apod_images(content_hash);
";

const RECORD_COLUMNS: &str = "id, date, title, explanation, file_path, content_hash";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApodRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub title: String,
    pub explanation: String,
    pub file_path: PathBuf,
    pub content_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewApodRecord<'a> {
    pub date: NaiveDate,
    pub title: &'a str,
    pub explanation: &'a str,
    pub file_path: &'a Path,
    pub content_hash: Option<&'a str>,
}

pub struct ApodStore {
    conn: Connection,
}

impl ApodStore {
    /// Opens the store at `path`, creating the file and table if missing.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| Error::StoreInitFailed(format!("{}: {}", path.display(), e)))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::StoreInitFailed(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::StoreInitFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Inserts a new record and returns its id. Fails with `AlreadyCached` if the
    /// date is already present.
    pub fn insert(&self, record: &NewApodRecord<'_>) -> Result<i64> {
        let date = date_key(record.date);
        let inserted = self.conn.execute(
            "INSERT INTO apod_images (date, title, explanation, file_path, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                date,
                record.title,
                record.explanation,
                record.file_path.to_string_lossy(),
                record.content_hash,
            ],
        );

        match inserted {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(e) => Err(insert_error(e, date)),
        }
    }

    /// Points an existing record at a different image file. Only used to repair
    /// a record whose file went missing and came back with different content.
    pub fn update_file(&self, id: i64, file_path: &Path, content_hash: &str) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE apod_images SET file_path = ?1, content_hash = ?2 WHERE id = ?3",
            params![file_path.to_string_lossy(), content_hash, id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("APOD record {}", id)));
        }
        Ok(())
    }

    pub fn find_by_date(&self, date: NaiveDate) -> Result<Option<ApodRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM apod_images WHERE date = ?1"),
                params![date_key(date)],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<ApodRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM apod_images WHERE id = ?1"),
                params![id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Oldest record with the given content hash.
    pub fn find_by_hash(&self, content_hash: &str) -> Result<Option<ApodRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM apod_images WHERE content_hash = ?1 ORDER BY id LIMIT 1"
                ),
                params![content_hash],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Every record whose image lives at `file_path`.
    pub fn find_by_path(&self, file_path: &Path) -> Result<Vec<ApodRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM apod_images WHERE file_path = ?1 ORDER BY id"
        ))?;
        let records = stmt
            .query_map(params![file_path.to_string_lossy()], record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Titles in insertion order.
    pub fn list_all_titles(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT title FROM apod_images ORDER BY id")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    pub fn list_all(&self) -> Result<Vec<ApodRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {RECORD_COLUMNS} FROM apod_images ORDER BY id"))?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM apod_images", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Most recent APOD date present in the store.
    pub fn latest_date(&self) -> Result<Option<NaiveDate>> {
        let latest: Option<String> =
            self.conn
                .query_row("SELECT MAX(date) FROM apod_images", [], |row| row.get(0))?;
        Ok(latest.and_then(|date| NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()))
    }
}

fn insert_error(e: rusqlite::Error, date: String) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::AlreadyCached(date)
        }
        e => e.into(),
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn record_from_row(row: &Row) -> rusqlite::Result<ApodRecord> {
    let date: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let file_path: String = row.get(4)?;

    Ok(ApodRecord {
        id: row.get(0)?,
        date,
        title: row.get(2)?,
        explanation: row.get(3)?,
        file_path: PathBuf::from(file_path),
        content_hash: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn new_record<'a>(day: &str, title: &'a str, path: &'a Path) -> NewApodRecord<'a> {
        NewApodRecord {
            date: date(day),
            title,
            explanation: "explanation",
            file_path: path,
            content_hash: Some("abc123"),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let store = ApodStore::open_in_memory().unwrap();
        let path = Path::new("/tmp/cache/Orion.jpg");
        let id = store.insert(&new_record("2021-01-01", "Orion", path)).unwrap();
        assert!(id > 0);

        let by_id = store.find_by_id(id).unwrap().unwrap();
        assert_eq!(by_id.title, "Orion");
        assert_eq!(by_id.date, date("2021-01-01"));
        assert_eq!(by_id.file_path, path);
        assert_eq!(by_id.content_hash.as_deref(), Some("abc123"));

        let by_date = store.find_by_date(date("2021-01-01")).unwrap().unwrap();
        assert_eq!(by_date, by_id);
        assert_eq!(store.find_by_hash("abc123").unwrap().unwrap().id, id);
    }

    #[test]
    fn test_insert_duplicate_date_fails() {
        let store = ApodStore::open_in_memory().unwrap();
        let path = Path::new("/tmp/cache/Orion.jpg");
        store.insert(&new_record("2021-01-01", "Orion", path)).unwrap();

        let result = store.insert(&new_record("2021-01-01", "Other", path));
        assert!(matches!(result, Err(Error::AlreadyCached(d)) if d == "2021-01-01"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_not_null_violation_is_not_already_cached() {
        let store = ApodStore::open_in_memory().unwrap();
        let err = store
            .conn
            .execute(
                "INSERT INTO apod_images (date, title, explanation, file_path)
                 VALUES ('2021-01-01', NULL, 'x', '/tmp/x.jpg')",
                [],
            )
            .unwrap_err();
        assert!(matches!(
            insert_error(err, "2021-01-01".to_string()),
            Error::Database(_)
        ));
    }

    #[test]
    fn test_find_by_path_and_update_file() {
        let store = ApodStore::open_in_memory().unwrap();
        let shared = Path::new("/tmp/cache/Orion.jpg");
        let first = store.insert(&new_record("2021-01-01", "Orion", shared)).unwrap();
        let second = store.insert(&new_record("2021-01-02", "Orion", shared)).unwrap();

        let owners: Vec<i64> = store.find_by_path(shared).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(owners, vec![first, second]);

        let moved = Path::new("/tmp/cache/Orion_2021-01-02.jpg");
        store.update_file(second, moved, "def456").unwrap();
        let record = store.find_by_id(second).unwrap().unwrap();
        assert_eq!(record.file_path, moved);
        assert_eq!(record.content_hash.as_deref(), Some("def456"));
        assert_eq!(store.find_by_path(shared).unwrap().len(), 1);

        assert!(matches!(store.update_file(99, moved, "x"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_missing_records() {
        let store = ApodStore::open_in_memory().unwrap();
        assert!(store.find_by_id(42).unwrap().is_none());
        assert!(store.find_by_date(date("2021-01-01")).unwrap().is_none());
        assert!(store.find_by_hash("nope").unwrap().is_none());
        assert!(store.find_by_path(Path::new("/nope.jpg")).unwrap().is_empty());
        assert!(store.latest_date().unwrap().is_none());
    }

    #[test]
    fn test_titles_in_insertion_order() {
        let store = ApodStore::open_in_memory().unwrap();
        let path = Path::new("/tmp/x.jpg");
        store.insert(&new_record("2021-03-01", "Zeta", path)).unwrap();
        store.insert(&new_record("2021-01-01", "Alpha", path)).unwrap();
        store.insert(&new_record("2021-02-01", "Mu", path)).unwrap();

        assert_eq!(store.list_all_titles().unwrap(), vec!["Zeta", "Alpha", "Mu"]);
        assert_eq!(store.list_all().unwrap().len(), 3);
        assert_eq!(store.latest_date().unwrap(), Some(date("2021-03-01")));
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("apod_cache.db");
        let path = Path::new("/tmp/x.jpg");

        let id = {
            let store = ApodStore::open(&db_path).unwrap();
            store.insert(&new_record("2021-01-01", "Orion", path)).unwrap()
        };

        let store = ApodStore::open(&db_path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.find_by_id(id).unwrap().unwrap().title, "Orion");
    }
}
