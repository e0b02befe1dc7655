//! SQLite database wrapper with WAL mode and migration support, plus the
//! record store built on it.

use super::{RecordStore, RecordValue};
use crate::state::schema;
use anyhow::{bail, Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

/// The minion record database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Create the schema on first open; refuse files from a newer release.
    fn migrate(&mut self) -> Result<()> {
        let version = self.schema_version();

        if version == 0 {
            info!("Creating database schema v{}", schema::SCHEMA_VERSION);
            self.conn
                .execute_batch(schema::CREATE_SCHEMA)
                .context("Failed to create schema")?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::SCHEMA_VERSION],
            )?;
        } else if version > schema::SCHEMA_VERSION {
            bail!(
                "Database schema v{} is newer than supported v{}",
                version,
                schema::SCHEMA_VERSION
            );
        }

        Ok(())
    }

    /// Get the current schema version (0 if uninitialized).
    fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Open a write transaction unless one is already running.
    pub fn begin(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn
                .execute_batch("BEGIN IMMEDIATE")
                .context("Failed to begin transaction")?;
        }
        Ok(())
    }

    /// Commit the running transaction, if any.
    pub fn commit(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT")
                .context("Failed to commit transaction")?;
        }
        Ok(())
    }

    /// Roll back the running transaction, if any.
    pub fn rollback(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("ROLLBACK")
                .context("Failed to roll back transaction")?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    /// Get the scalar stored at `path`.
    pub fn record_get(&self, owner: &str, path: &str) -> Result<Option<RecordValue>> {
        let value: Option<SqlValue> = self
            .conn
            .query_row(
                "SELECT value FROM records WHERE owner = ?1 AND path = ?2",
                params![owner, path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(from_sql))
    }

    /// Set the scalar at `path` (upsert).
    pub fn record_set(&self, owner: &str, path: &str, value: &RecordValue) -> Result<()> {
        self.conn.execute(
            "INSERT INTO records (owner, path, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(owner, path) DO UPDATE SET value = ?3",
            params![owner, path, to_sql(value)],
        )?;
        Ok(())
    }

    /// Delete the scalar stored exactly at `path`, leaving descendants alone.
    pub fn record_delete(&self, owner: &str, path: &str) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM records WHERE owner = ?1 AND path = ?2",
            params![owner, path],
        )?;
        Ok(removed)
    }

    /// Delete `path` and every path below it. An empty path clears the owner.
    pub fn record_clear(&self, owner: &str, path: &str) -> Result<usize> {
        let removed = if path.is_empty() {
            self.conn
                .execute("DELETE FROM records WHERE owner = ?1", params![owner])?
        } else {
            self.conn.execute(
                "DELETE FROM records WHERE owner = ?1
                 AND (path = ?2 OR substr(path, 1, length(?2) + 1) = ?2 || '.')",
                params![owner, path],
            )?
        };
        Ok(removed)
    }

    /// Every path strictly below `prefix`, in insertion order.
    pub fn record_paths_under(&self, owner: &str, prefix: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT path FROM records WHERE owner = ?1
             AND (?2 = '' OR substr(path, 1, length(?2) + 1) = ?2 || '.')
             ORDER BY rowid",
        )?;
        let paths = stmt
            .query_map(params![owner, prefix], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(paths)
    }
}

fn to_sql(value: &RecordValue) -> SqlValue {
    match value {
        RecordValue::Str(s) => SqlValue::Text(s.clone()),
        RecordValue::Int(i) => SqlValue::Integer(*i),
        RecordValue::Float(f) => SqlValue::Real(*f),
    }
}

fn from_sql(value: SqlValue) -> Option<RecordValue> {
    match value {
        SqlValue::Text(s) => Some(RecordValue::Str(s)),
        SqlValue::Integer(i) => Some(RecordValue::Int(i)),
        SqlValue::Real(f) => Some(RecordValue::Float(f)),
        SqlValue::Null | SqlValue::Blob(_) => None,
    }
}

/// Record store for one owner inside a shared [`Database`].
///
/// Writes land immediately unless a batch was opened with `begin`, in which
/// case `save` commits them and `rollback` discards them together.
pub struct SqliteRecordStore {
    db: Database,
    owner: String,
}

impl SqliteRecordStore {
    pub fn new(db: Database, owner: &str) -> Self {
        Self {
            db,
            owner: owner.to_string(),
        }
    }
}

impl RecordStore for SqliteRecordStore {
    fn get(&self, path: &str) -> Result<Option<RecordValue>> {
        self.db.record_get(&self.owner, path)
    }

    fn set(&mut self, path: &str, value: RecordValue) -> Result<()> {
        // A scalar replaces any section that lived at the same path, and
        // any scalar that lived at one of its ancestors.
        self.db.record_clear(&self.owner, path)?;
        let mut ancestor = path;
        while let Some((parent, _)) = ancestor.rsplit_once('.') {
            self.db.record_delete(&self.owner, parent)?;
            ancestor = parent;
        }
        self.db.record_set(&self.owner, path, &value)
    }

    fn clear(&mut self, path: &str) -> Result<()> {
        self.db.record_clear(&self.owner, path)?;
        Ok(())
    }

    fn keys(&self, path: &str) -> Result<Option<Vec<String>>> {
        let paths = self.db.record_paths_under(&self.owner, path)?;
        if paths.is_empty() {
            return Ok(None);
        }

        let skip = if path.is_empty() { 0 } else { path.len() + 1 };
        let mut keys: Vec<String> = Vec::new();
        for full in &paths {
            let rest = &full[skip..];
            let child = rest.split('.').next().unwrap_or(rest);
            if !keys.iter().any(|k| k == child) {
                keys.push(child.to_string());
            }
        }
        Ok(Some(keys))
    }

    fn begin(&mut self) -> Result<()> {
        self.db.begin()
    }

    fn rollback(&mut self) -> Result<()> {
        self.db.rollback()
    }

    fn save(&mut self) -> Result<()> {
        self.db.commit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::records::{self, MinionRecord};
    use crate::types::{MinionId, Position};

    fn store(owner: &str) -> SqliteRecordStore {
        SqliteRecordStore::new(Database::open_memory().unwrap(), owner)
    }

    #[test]
    fn test_values_keep_their_type() {
        let mut s = store("steve");
        s.set("m.id", "COAL-2".into()).unwrap();
        s.set("m.location.x", 0.5.into()).unwrap();
        s.set("m.items.0.count", 7u32.into()).unwrap();

        assert_eq!(s.get("m.id").unwrap(), Some(RecordValue::Str("COAL-2".into())));
        assert_eq!(s.get("m.location.x").unwrap(), Some(RecordValue::Float(0.5)));
        assert_eq!(s.get("m.items.0.count").unwrap(), Some(RecordValue::Int(7)));
        assert_eq!(s.get("m.items").unwrap(), None);
    }

    #[test]
    fn test_keys_are_direct_children() {
        let mut s = store("steve");
        s.set("m.items.0.id", "A".into()).unwrap();
        s.set("m.items.0.count", 1u32.into()).unwrap();
        s.set("m.items.1.id", "B".into()).unwrap();
        s.set("n.id", "X-1".into()).unwrap();

        assert_eq!(s.keys("").unwrap(), Some(vec!["m".into(), "n".into()]));
        assert_eq!(s.keys("m.items").unwrap(), Some(vec!["0".into(), "1".into()]));
        assert_eq!(s.keys("m.other").unwrap(), None);
    }

    #[test]
    fn test_clear_does_not_touch_siblings_with_shared_prefix() {
        let mut s = store("steve");
        s.set("m.id", "A-1".into()).unwrap();
        s.set("m2.id", "B-1".into()).unwrap();

        s.clear("m").unwrap();
        assert_eq!(s.get("m.id").unwrap(), None);
        assert_eq!(s.get("m2.id").unwrap(), Some(RecordValue::Str("B-1".into())));
    }

    #[test]
    fn test_owners_are_isolated() {
        let db = Database::open_memory().unwrap();
        db.record_set("alex", "m.id", &"A-1".into()).unwrap();
        db.record_set("steve", "m.id", &"B-1".into()).unwrap();
        db.record_clear("alex", "").unwrap();

        assert_eq!(db.record_get("alex", "m.id").unwrap(), None);
        assert_eq!(
            db.record_get("steve", "m.id").unwrap(),
            Some(RecordValue::Str("B-1".into()))
        );
    }

    #[test]
    fn test_section_replaces_scalar_ancestor() {
        let mut s = store("steve");
        s.set("a", 1i64.into()).unwrap();
        s.set("a.b", 2i64.into()).unwrap();

        assert_eq!(s.get("a").unwrap(), None);
        assert_eq!(s.get("a.b").unwrap(), Some(RecordValue::Int(2)));
        assert_eq!(s.keys("a").unwrap(), Some(vec!["b".into()]));
        assert_eq!(s.keys("").unwrap(), Some(vec!["a".into()]));
    }

    #[test]
    fn test_rollback_discards_batch() {
        let mut s = store("steve");
        s.set("m.id", "COAL-1".into()).unwrap();

        s.begin().unwrap();
        s.clear("m").unwrap();
        s.set("m.id", "COAL-2".into()).unwrap();
        s.rollback().unwrap();

        assert_eq!(s.get("m.id").unwrap(), Some(RecordValue::Str("COAL-1".into())));
    }

    #[test]
    fn test_failed_resave_keeps_previous_record() {
        let mut s = store("steve");
        let record = MinionRecord {
            id: MinionId::from("m"),
            blueprint: "COAL".into(),
            level: 2,
            position: Position::new(1.0, 2.0, 3.0),
            items: vec![("COAL".into(), 64), ("COAL".into(), 5)],
        };
        records::save_minion(&mut s, &record).unwrap();

        s.db.conn
            .execute_batch(
                "CREATE TRIGGER fail_second_count BEFORE INSERT ON records
                 WHEN NEW.path = 'm.items.1.count'
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
            )
            .unwrap();

        let err = records::save_minion(&mut s, &record).unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));
        assert!(s.db.conn.is_autocommit());
        assert_eq!(records::load_record(&s, &record.id).unwrap(), Some(record));
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        {
            let db = Database::open(&path).unwrap();
            db.conn
                .execute("UPDATE schema_version SET version = ?1", params![schema::SCHEMA_VERSION + 1])
                .unwrap();
        }
        assert!(Database::open(&path).is_err());
    }

    #[test]
    fn test_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        {
            let mut s = SqliteRecordStore::new(Database::open(&path).unwrap(), "steve");
            s.set("m.id", "COAL-1".into()).unwrap();
            s.save().unwrap();
        }
        let s = SqliteRecordStore::new(Database::open(&path).unwrap(), "steve");
        assert_eq!(s.get("m.id").unwrap(), Some(RecordValue::Str("COAL-1".into())));
    }
}
