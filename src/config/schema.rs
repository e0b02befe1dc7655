//! Configuration schema for minions.toml.

use serde::{Deserialize, Serialize};

/// Where minion records are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// One `minions.yml` document per owner under `data_dir`.
    #[default]
    Yaml,
    /// A shared SQLite database at `db_path`.
    Sqlite,
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinionsConfig {
    /// Owner whose minions the CLI manages when none is given.
    pub owner: String,

    /// Directory holding per-owner record files.
    pub data_dir: String,

    /// Path to the blueprint and item catalog (YAML).
    pub catalog_path: String,

    /// Record store backend.
    pub store_backend: StoreBackend,

    /// Path to the SQLite database (sqlite backend only).
    pub db_path: String,

    /// Wall-clock length of one scheduler tick, in milliseconds.
    pub tick_millis: u64,

    /// Log level (debug, info, warn, error).
    pub log_level: String,

    /// Config version.
    pub version: u32,
}

impl Default for MinionsConfig {
    fn default() -> Self {
        Self {
            owner: "player".into(),
            data_dir: "~/.minions/players".into(),
            catalog_path: "~/.minions/catalog.yml".into(),
            store_backend: StoreBackend::Yaml,
            db_path: "~/.minions/records.db".into(),
            tick_millis: 50,
            log_level: "info".into(),
            version: 1,
        }
    }
}

impl MinionsConfig {
    /// Defaults with every path rooted at `home` instead of `~/.minions`.
    pub fn for_home(home: &std::path::Path) -> Self {
        let under = |name: &str| home.join(name).to_string_lossy().into_owned();
        Self {
            data_dir: under("players"),
            catalog_path: under("catalog.yml"),
            db_path: under("records.db"),
            ..Self::default()
        }
    }

    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    /// Resolved record directory.
    pub fn resolved_data_dir(&self) -> String {
        self.resolve_path(&self.data_dir)
    }

    /// Resolved catalog path.
    pub fn resolved_catalog_path(&self) -> String {
        self.resolve_path(&self.catalog_path)
    }

    /// Resolved database path.
    pub fn resolved_db_path(&self) -> String {
        self.resolve_path(&self.db_path)
    }

    /// Tick length as a duration, never shorter than 1ms.
    pub fn tick_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_millis.max(1))
    }
}
