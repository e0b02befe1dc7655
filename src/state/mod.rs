//! Per-owner record stores and the minion persistence gateway.
//!
//! A record store is a tree of scalars addressed by dot-separated key paths
//! (`<id>.items.0.count`). Two backends exist: one YAML document per owner,
//! or a shared SQLite file with rows keyed by `(owner, path)`.

pub mod database;
pub mod records;
pub mod schema;
pub mod yaml;

pub use database::{Database, SqliteRecordStore};
pub use records::MinionRecord;
pub use yaml::YamlRecordStore;

use crate::config::{MinionsConfig, StoreBackend};
use anyhow::Result;
use std::fmt;
use std::path::Path;

/// A scalar stored at a key path.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl RecordValue {
    pub fn as_string(&self) -> String {
        self.to_string()
    }

    /// Integer view; numeric strings are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Float(_) => None,
            Self::Str(s) => s.trim().parse().ok(),
        }
    }

    /// Float view; integers and numeric strings are accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<&str> for RecordValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for RecordValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for RecordValue {
    fn from(value: u32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for RecordValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Hierarchical key-path store scoped to one owner.
pub trait RecordStore: Send {
    /// Scalar at `path`, or `None` when absent or a section.
    fn get(&self, path: &str) -> Result<Option<RecordValue>>;

    /// Write a scalar, creating parent sections as needed.
    fn set(&mut self, path: &str, value: RecordValue) -> Result<()>;

    /// Delete `path` and everything below it.
    fn clear(&mut self, path: &str) -> Result<()>;

    /// Direct child keys of the section at `path` (`""` is the root), or
    /// `None` when no such section exists.
    fn keys(&self, path: &str) -> Result<Option<Vec<String>>>;

    /// Start a batch. Writes until the next `save` land together or, after
    /// `rollback`, not at all.
    fn begin(&mut self) -> Result<()>;

    /// Discard every write since `begin`.
    fn rollback(&mut self) -> Result<()>;

    /// Flush pending changes to durable storage, committing an open batch.
    fn save(&mut self) -> Result<()>;
}

/// File name of the per-owner YAML document.
pub const RECORD_FILE: &str = "minions.yml";

/// Open the configured store for `owner`.
pub fn open_store(config: &MinionsConfig, owner: &str) -> Result<Box<dyn RecordStore>> {
    match config.store_backend {
        StoreBackend::Yaml => {
            let path = Path::new(&config.resolved_data_dir())
                .join(owner)
                .join(RECORD_FILE);
            Ok(Box::new(YamlRecordStore::open(&path)?))
        }
        StoreBackend::Sqlite => {
            let db = Database::open(Path::new(&config.resolved_db_path()))?;
            Ok(Box::new(SqliteRecordStore::new(db, owner)))
        }
    }
}

/// Join key-path segments, skipping empty ones.
pub(crate) fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(".")
}
