pub mod schema;

pub use schema::{MinionsConfig, StoreBackend};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default minions home directory (~/.minions).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".minions"))
        .unwrap_or_else(|| PathBuf::from(".minions"))
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<MinionsConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read minions config file")?;
        let config: MinionsConfig =
            toml::from_str(&contents).context("Failed to parse minions config (TOML)")?;
        Ok(config)
    } else {
        Ok(MinionsConfig::default())
    }
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &MinionsConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("minions.toml")).unwrap();
        assert_eq!(cfg.tick_millis, 50);
        assert_eq!(cfg.store_backend, StoreBackend::Yaml);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minions.toml");
        std::fs::write(&path, "owner = \"alex\"\nstore_backend = \"sqlite\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.owner, "alex");
        assert_eq!(cfg.store_backend, StoreBackend::Sqlite);
        assert_eq!(cfg.log_level, "info");
    }

    #[test]
    fn test_for_home_roots_paths() {
        let cfg = MinionsConfig::for_home(Path::new("/srv/minions"));
        assert_eq!(cfg.resolved_data_dir(), "/srv/minions/players");
        assert_eq!(cfg.resolved_db_path(), "/srv/minions/records.db");
        assert_eq!(cfg.tick_millis, 50);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("minions.toml");
        let mut cfg = MinionsConfig::default();
        cfg.tick_millis = 25;
        save_config(&cfg, &path).unwrap();
        assert_eq!(load_config(&path).unwrap().tick_millis, 25);
    }
}
