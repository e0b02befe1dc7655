//! Reading and writing minion records.
//!
//! Layout under each minion identifier:
//!
//! ```yaml
//! <id>:
//!   id: "<blueprint>-<level>"
//!   location: { x: 0.0, y: 64.0, z: 0.0 }
//!   items:
//!     "0": { id: COBBLESTONE, count: 64 }
//!     "1": { id: COBBLESTONE, count: 12 }
//! ```
//!
//! Item keys are contiguous from 0 and give the stack order, which is also
//! the merge priority once the inventory is live again.

use super::{join_path, RecordStore};
use crate::catalog::ItemRegistry;
use crate::error::MinionError;
use crate::types::{ItemStack, MinionId, Position};
use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

/// Everything persisted about one minion.
#[derive(Debug, Clone, PartialEq)]
pub struct MinionRecord {
    pub id: MinionId,
    pub blueprint: String,
    pub level: u32,
    pub position: Position,
    /// `(kind, count)` in stack order.
    pub items: Vec<(String, u32)>,
}

impl MinionRecord {
    /// The `"<blueprint>-<level>"` tag stored under `<id>.id`.
    pub fn type_tag(&self) -> String {
        format!("{}-{}", self.blueprint, self.level)
    }
}

/// Split `"<blueprint>-<level>"`; the blueprint part may itself contain dashes.
pub fn parse_type_tag(tag: &str) -> Result<(String, u32)> {
    let (blueprint, level) = tag
        .rsplit_once('-')
        .with_context(|| format!("Malformed minion type '{}'", tag))?;
    let level = level
        .parse::<u32>()
        .with_context(|| format!("Malformed level in minion type '{}'", tag))?;
    if blueprint.is_empty() {
        bail!("Missing blueprint in minion type '{}'", tag);
    }
    Ok((blueprint.to_string(), level))
}

/// Run `write` as one batch: either all of it reaches the store or none.
fn write_batch<F>(store: &mut dyn RecordStore, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn RecordStore) -> Result<()>,
{
    store.begin()?;
    let outcome = write(&mut *store).and_then(|()| store.save());
    if let Err(e) = outcome {
        if let Err(rollback) = store.rollback() {
            warn!("Rollback after failed save also failed: {:#}", rollback);
        }
        return Err(e);
    }
    Ok(())
}

/// Overwrite the record for `record.id` and flush the store. A failed save
/// leaves the previous record in place.
pub fn save_minion(store: &mut dyn RecordStore, record: &MinionRecord) -> Result<()> {
    let id = record.id.as_str();
    write_batch(store, |store| {
        store.clear(id)?;
        store.set(&join_path(&[id, "id"]), record.type_tag().into())?;
        store.set(&join_path(&[id, "location", "x"]), record.position.x.into())?;
        store.set(&join_path(&[id, "location", "y"]), record.position.y.into())?;
        store.set(&join_path(&[id, "location", "z"]), record.position.z.into())?;
        for (i, (kind, count)) in record.items.iter().enumerate() {
            let slot = i.to_string();
            store.set(&join_path(&[id, "items", &slot, "id"]), kind.as_str().into())?;
            store.set(&join_path(&[id, "items", &slot, "count"]), (*count).into())?;
        }
        Ok(())
    })
    .with_context(|| format!("Failed to save minion records for {}", id))?;
    debug!("Saved minion {} ({} stacks)", id, record.items.len());
    Ok(())
}

/// Delete the record for `id` entirely and flush the store.
pub fn remove_minion(store: &mut dyn RecordStore, id: &MinionId) -> Result<()> {
    write_batch(store, |store| store.clear(id.as_str()))
        .with_context(|| format!("Failed to remove minion records for {}", id))?;
    info!("Removed minion {} from records", id);
    Ok(())
}

/// Persisted `(kind, count)` pairs for `id`, ordered by their numeric key.
/// A minion with no items section has an empty inventory.
pub fn load_items(store: &dyn RecordStore, id: &MinionId) -> Result<Vec<(String, u32)>> {
    let section = join_path(&[id.as_str(), "items"]);
    let Some(keys) = store.keys(&section)? else {
        return Ok(Vec::new());
    };

    let mut items: Vec<(i64, String, u32)> = Vec::with_capacity(keys.len());
    for key in keys {
        let order = key
            .parse::<i64>()
            .with_context(|| format!("Item key '{}' of minion {} is not a number", key, id))?;
        let kind = store
            .get(&join_path(&[&section, &key, "id"]))?
            .with_context(|| format!("Item {} of minion {} has no id", key, id))?
            .as_string();
        let count = store
            .get(&join_path(&[&section, &key, "count"]))?
            .and_then(|v| v.as_i64())
            .and_then(|c| u32::try_from(c).ok())
            .with_context(|| format!("Item {} of minion {} has no valid count", key, id))?;
        items.push((order, kind, count));
    }
    items.sort_by_key(|(order, _, _)| *order);

    Ok(items.into_iter().map(|(_, kind, count)| (kind, count)).collect())
}

/// Load the stacks for `id`, resolving each kind through the registry.
pub fn load_inventory(
    store: &dyn RecordStore,
    id: &MinionId,
    registry: &dyn ItemRegistry,
) -> Result<Vec<ItemStack>> {
    let mut stacks = Vec::new();
    for (kind, count) in load_items(store, id)? {
        let item = registry
            .resolve(&kind)
            .ok_or_else(|| MinionError::UnknownItem(kind.clone()))
            .with_context(|| format!("Failed to load inventory of minion {}", id))?;
        stacks.push(ItemStack::new(item.id, count, item.max_stack));
    }
    Ok(stacks)
}

/// Read the full record for `id`, if one exists.
pub fn load_record(store: &dyn RecordStore, id: &MinionId) -> Result<Option<MinionRecord>> {
    let Some(tag) = store.get(&join_path(&[id.as_str(), "id"]))? else {
        return Ok(None);
    };
    let (blueprint, level) = parse_type_tag(&tag.as_string())?;

    let coord = |axis: &str| -> Result<f64> {
        store
            .get(&join_path(&[id.as_str(), "location", axis]))?
            .and_then(|v| v.as_f64())
            .with_context(|| format!("Minion {} has no valid location.{}", id, axis))
    };
    let position = Position::new(coord("x")?, coord("y")?, coord("z")?);

    Ok(Some(MinionRecord {
        id: id.clone(),
        blueprint,
        level,
        position,
        items: load_items(store, id)?,
    }))
}

/// Every minion recorded for this owner.
pub fn list_records(store: &dyn RecordStore) -> Result<Vec<MinionRecord>> {
    let mut records = Vec::new();
    for key in store.keys("")?.unwrap_or_default() {
        let id = MinionId::from(key);
        if let Some(record) = load_record(store, &id)? {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, default_catalog};
    use crate::state::{Database, SqliteRecordStore, YamlRecordStore};

    fn record() -> MinionRecord {
        MinionRecord {
            id: MinionId::from("01HZX"),
            blueprint: "COBBLESTONE".into(),
            level: 4,
            position: Position::new(10.5, 64.0, -3.5),
            items: vec![
                ("COBBLESTONE".into(), 64),
                ("COAL".into(), 3),
                ("COBBLESTONE".into(), 12),
            ],
        }
    }

    #[test]
    fn test_parse_type_tag() {
        assert_eq!(parse_type_tag("COAL-3").unwrap(), ("COAL".into(), 3));
        assert_eq!(parse_type_tag("SNOW-GOLEM-11").unwrap(), ("SNOW-GOLEM".into(), 11));
        assert!(parse_type_tag("COAL").is_err());
        assert!(parse_type_tag("COAL-x").is_err());
        assert!(parse_type_tag("-2").is_err());
    }

    #[test]
    fn test_round_trip_yaml() {
        let mut store = YamlRecordStore::in_memory();
        save_minion(&mut store, &record()).unwrap();
        assert_eq!(load_record(&store, &record().id).unwrap(), Some(record()));
    }

    #[test]
    fn test_round_trip_sqlite() {
        let mut store = SqliteRecordStore::new(Database::open_memory().unwrap(), "steve");
        save_minion(&mut store, &record()).unwrap();
        assert_eq!(list_records(&store).unwrap(), vec![record()]);
    }

    #[test]
    fn test_resave_overwrites_rather_than_merges() {
        let mut store = YamlRecordStore::in_memory();
        save_minion(&mut store, &record()).unwrap();

        let mut smaller = record();
        smaller.items.truncate(1);
        save_minion(&mut store, &smaller).unwrap();

        assert_eq!(load_items(&store, &smaller.id).unwrap(), smaller.items);
        assert_eq!(store.keys("01HZX.items").unwrap(), Some(vec!["0".into()]));
    }

    #[test]
    fn test_save_is_idempotent() {
        let mut store = YamlRecordStore::in_memory();
        save_minion(&mut store, &record()).unwrap();
        let first = store.to_yaml_string().unwrap();
        save_minion(&mut store, &record()).unwrap();
        assert_eq!(store.to_yaml_string().unwrap(), first);
    }

    #[test]
    fn test_items_sorted_by_numeric_key() {
        let mut store = YamlRecordStore::in_memory();
        for (key, kind) in [("10", "C"), ("2", "B"), ("0", "A")] {
            store.set(&format!("m.items.{key}.id"), kind.into()).unwrap();
            store.set(&format!("m.items.{key}.count"), 1u32.into()).unwrap();
        }
        let kinds: Vec<String> = load_items(&store, &MinionId::from("m"))
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(kinds, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_missing_items_is_empty() {
        let mut store = YamlRecordStore::in_memory();
        store.set("m.id", "COAL-1".into()).unwrap();
        assert!(load_items(&store, &MinionId::from("m")).unwrap().is_empty());
        assert!(load_items(&store, &MinionId::from("nobody")).unwrap().is_empty());
    }

    #[test]
    fn test_count_stored_as_text_is_accepted() {
        let mut store = YamlRecordStore::in_memory();
        store.set("m.items.0.id", "COAL".into()).unwrap();
        store.set("m.items.0.count", "17".into()).unwrap();
        assert_eq!(
            load_items(&store, &MinionId::from("m")).unwrap(),
            vec![("COAL".to_string(), 17)]
        );
    }

    #[test]
    fn test_non_numeric_item_key_is_an_error() {
        let mut store = YamlRecordStore::in_memory();
        store.set("m.items.first.id", "COAL".into()).unwrap();
        store.set("m.items.first.count", 1u32.into()).unwrap();
        assert!(load_items(&store, &MinionId::from("m")).is_err());
    }

    #[test]
    fn test_load_inventory_resolves_kinds() {
        let catalog = Catalog::from_file(default_catalog()).unwrap();
        let mut store = YamlRecordStore::in_memory();
        save_minion(&mut store, &record()).unwrap();

        let stacks = load_inventory(&store, &record().id, &catalog).unwrap();
        assert_eq!(stacks[0], ItemStack::new("COBBLESTONE", 64, 64));
        assert_eq!(stacks[1], ItemStack::new("COAL", 3, 64));

        let mut bad = record();
        bad.items = vec![("DIAMOND".into(), 1)];
        save_minion(&mut store, &bad).unwrap();
        let err = load_inventory(&store, &bad.id, &catalog).unwrap_err();
        assert!(format!("{err:#}").contains("DIAMOND"));
    }

    #[test]
    fn test_failed_save_rolls_back_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minions.yml");
        let mut store = YamlRecordStore::open(&path).unwrap();
        save_minion(&mut store, &record()).unwrap();

        // The file path turning into a directory makes the write fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let mut other = record();
        other.id = MinionId::from("01HZY");
        assert!(save_minion(&mut store, &other).is_err());
        assert_eq!(store.keys("").unwrap(), Some(vec!["01HZX".into()]));
        assert_eq!(load_record(&store, &record().id).unwrap(), Some(record()));
    }

    #[test]
    fn test_remove_deletes_everything() {
        let mut store = YamlRecordStore::in_memory();
        save_minion(&mut store, &record()).unwrap();
        remove_minion(&mut store, &record().id).unwrap();
        assert_eq!(load_record(&store, &record().id).unwrap(), None);
        assert_eq!(store.keys("").unwrap(), Some(vec![]));
    }
}
