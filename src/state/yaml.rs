//! YAML-document record store, one file per owner.

use super::{RecordStore, RecordValue};
use anyhow::{bail, Context, Result};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Record store backed by a single YAML mapping.
pub struct YamlRecordStore {
    path: Option<PathBuf>,
    root: Mapping,
    /// Document as it was at `begin`, restored by `rollback`.
    snapshot: Option<Mapping>,
}

fn key_str(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Find the key in `map` that renders as `segment`, however it was typed.
fn find_key(map: &Mapping, segment: &str) -> Option<Value> {
    map.keys()
        .find(|k| key_str(k).as_deref() == Some(segment))
        .cloned()
}

fn to_record(value: &Value) -> Option<RecordValue> {
    match value {
        Value::String(s) => Some(RecordValue::Str(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(RecordValue::Int)
            .or_else(|| n.as_f64().map(RecordValue::Float)),
        Value::Bool(b) => Some(RecordValue::Str(b.to_string())),
        _ => None,
    }
}

fn to_yaml(value: RecordValue) -> Value {
    match value {
        RecordValue::Str(s) => Value::String(s),
        RecordValue::Int(i) => Value::Number(i.into()),
        RecordValue::Float(f) => Value::Number(f.into()),
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

impl YamlRecordStore {
    /// Open the document at `path`; a missing file is an empty document.
    pub fn open(path: &Path) -> Result<Self> {
        let root = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read record file {}", path.display()))?;
            match serde_yaml::from_str::<Value>(&contents)
                .with_context(|| format!("Failed to parse record file {}", path.display()))?
            {
                Value::Mapping(map) => map,
                Value::Null => Mapping::new(),
                _ => bail!("Record file {} is not a mapping", path.display()),
            }
        } else {
            Mapping::new()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            root,
            snapshot: None,
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            root: Mapping::new(),
            snapshot: None,
        }
    }

    /// Render the whole document.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(&self.root).context("Failed to serialize records")
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        let segs = segments(path);
        let (last, parents) = segs.split_last()?;
        let mut map = &self.root;
        for segment in parents {
            let key = find_key(map, segment)?;
            match map.get(&key)? {
                Value::Mapping(m) => map = m,
                _ => return None,
            }
        }
        let key = find_key(map, last)?;
        map.get(&key)
    }
}

impl RecordStore for YamlRecordStore {
    fn get(&self, path: &str) -> Result<Option<RecordValue>> {
        Ok(self.lookup(path).and_then(to_record))
    }

    fn set(&mut self, path: &str, value: RecordValue) -> Result<()> {
        let segs = segments(path);
        let Some((last, parents)) = segs.split_last() else {
            bail!("Cannot set a value at the document root");
        };

        let mut map = &mut self.root;
        for segment in parents {
            let key = find_key(map, segment).unwrap_or_else(|| Value::String(segment.to_string()));
            if !matches!(map.get(&key), Some(Value::Mapping(_))) {
                map.insert(key.clone(), Value::Mapping(Mapping::new()));
            }
            map = match map.get_mut(&key) {
                Some(Value::Mapping(m)) => m,
                _ => bail!("Section '{}' in '{}' is not a mapping", segment, path),
            };
        }
        let key = find_key(map, last).unwrap_or_else(|| Value::String(last.to_string()));
        map.insert(key, to_yaml(value));
        Ok(())
    }

    fn clear(&mut self, path: &str) -> Result<()> {
        let segs = segments(path);
        let Some((last, parents)) = segs.split_last() else {
            self.root = Mapping::new();
            return Ok(());
        };

        let mut map = &mut self.root;
        for segment in parents {
            let Some(key) = find_key(map, segment) else {
                return Ok(());
            };
            map = match map.get_mut(&key) {
                Some(Value::Mapping(m)) => m,
                _ => return Ok(()),
            };
        }
        if let Some(key) = find_key(map, last) {
            map.remove(&key);
        }
        Ok(())
    }

    fn keys(&self, path: &str) -> Result<Option<Vec<String>>> {
        let section = if segments(path).is_empty() {
            Some(&self.root)
        } else {
            match self.lookup(path) {
                Some(Value::Mapping(m)) => Some(m),
                _ => None,
            }
        };
        Ok(section.map(|m| m.keys().filter_map(key_str).collect()))
    }

    fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.root.clone());
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if let Some(snapshot) = self.snapshot.take() {
            self.root = snapshot;
        }
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            self.snapshot = None;
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = self.to_yaml_string()?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write record file {}", path.display()))?;
        debug!("Saved records to {}", path.display());
        self.snapshot = None;
        Ok(())
    }
}
