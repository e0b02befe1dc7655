//! Minion blueprints and item kinds, loaded from `catalog.yml`.

pub mod blueprint;
pub mod items;

pub use blueprint::{BehaviorKind, Blueprint, DropEntry, EquipmentSlot};
pub use items::{ItemKind, ItemRegistry};

use crate::error::MinionError;
use crate::inventory::MAX_TABLE_LEVEL;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// On-disk shape of `catalog.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub items: Vec<ItemKind>,
    #[serde(default)]
    pub blueprints: Vec<Blueprint>,
}

/// Validated lookup tables for blueprints and item kinds.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<String, ItemKind>,
    blueprints: HashMap<String, Arc<Blueprint>>,
}

impl Catalog {
    /// Build a catalog, rejecting definitions the runtime could not honour.
    pub fn from_file(file: CatalogFile) -> Result<Self> {
        let mut catalog = Self::default();
        for item in file.items {
            if item.max_stack == 0 {
                bail!("Item '{}' has a max stack of 0", item.id);
            }
            if catalog.items.insert(item.id.clone(), item.clone()).is_some() {
                bail!("Duplicate item kind '{}'", item.id);
            }
        }
        for bp in file.blueprints {
            catalog.validate_blueprint(&bp)?;
            let id = bp.id.clone();
            if catalog.blueprints.insert(id.clone(), Arc::new(bp)).is_some() {
                bail!("Duplicate blueprint '{}'", id);
            }
        }
        Ok(catalog)
    }

    fn validate_blueprint(&self, bp: &Blueprint) -> Result<()> {
        let levels = bp.levels();
        if levels == 0 || levels > MAX_TABLE_LEVEL {
            bail!(
                "Blueprint '{}' defines {} levels (expected 1..={})",
                bp.id,
                levels,
                MAX_TABLE_LEVEL
            );
        }
        if bp.head_assets.len() as u32 != levels {
            bail!(
                "Blueprint '{}' has {} head assets for {} levels",
                bp.id,
                bp.head_assets.len(),
                levels
            );
        }
        if bp.time_between_actions.iter().any(|t| *t == 0) {
            bail!("Blueprint '{}' has a zero time between actions", bp.id);
        }
        for (slot, item) in bp.item_in_hand.iter().map(|i| (EquipmentSlot::MainHand, i)).chain(
            bp.equipment.iter().map(|(slot, item)| (*slot, item)),
        ) {
            if !self.items.contains_key(item) {
                bail!("Blueprint '{}' equips unknown item '{}' in {}", bp.id, item, slot);
            }
        }
        if bp.drops.is_empty() {
            bail!("Blueprint '{}' has an empty drop table", bp.id);
        }
        for drop in &bp.drops {
            let kind = self
                .items
                .get(&drop.kind)
                .with_context(|| format!("Blueprint '{}' drops unknown item '{}'", bp.id, drop.kind))?;
            if drop.min == 0 || drop.min > drop.max || drop.max > kind.max_stack {
                bail!(
                    "Blueprint '{}' drop '{}' has quantity {}..={} (allowed 1..={})",
                    bp.id,
                    drop.kind,
                    drop.min,
                    drop.max,
                    kind.max_stack
                );
            }
            if !(drop.chance > 0.0 && drop.chance <= 1.0) {
                bail!(
                    "Blueprint '{}' drop '{}' has chance {} outside (0, 1]",
                    bp.id,
                    drop.kind,
                    drop.chance
                );
            }
        }
        Ok(())
    }

    pub fn blueprint(&self, id: &str) -> Result<Arc<Blueprint>, MinionError> {
        self.blueprints
            .get(id)
            .cloned()
            .ok_or_else(|| MinionError::UnknownBlueprint(id.to_string()))
    }

    pub fn blueprint_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.blueprints.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl ItemRegistry for Catalog {
    fn resolve(&self, kind: &str) -> Option<ItemKind> {
        self.items.get(kind).cloned()
    }
}

/// Load the catalog from YAML, falling back to the built-in one when the
/// file does not exist.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    if !path.exists() {
        debug!("No catalog at {:?}, using defaults", path);
        return Catalog::from_file(default_catalog());
    }

    let contents = std::fs::read_to_string(path).context("Failed to read catalog.yml")?;
    let file: CatalogFile =
        serde_yaml::from_str(&contents).context("Failed to parse catalog.yml")?;
    let catalog = Catalog::from_file(file)
        .with_context(|| format!("Invalid catalog at {}", path.display()))?;

    info!(
        "Loaded catalog: {} items, {} blueprints",
        catalog.items.len(),
        catalog.blueprints.len()
    );
    Ok(catalog)
}

/// Built-in catalog used when no `catalog.yml` exists.
pub fn default_catalog() -> CatalogFile {
    let heads = |prefix: &str| (1..=11).map(|l| format!("{prefix}_{l}")).collect::<Vec<_>>();

    CatalogFile {
        items: vec![
            ItemKind::new("COBBLESTONE", "Cobblestone", 64),
            ItemKind::new("COAL", "Coal", 64),
            ItemKind::new("WHEAT", "Wheat", 64),
            ItemKind::new("SEEDS", "Seeds", 64),
            ItemKind::new("ENDER_PEARL", "Ender Pearl", 16),
            ItemKind::new("WOODEN_PICKAXE", "Wooden Pickaxe", 1),
            ItemKind::new("WOODEN_HOE", "Wooden Hoe", 1),
        ],
        blueprints: vec![
            Blueprint {
                id: "COBBLESTONE".into(),
                behavior: BehaviorKind::BlockField,
                field_radius: 2,
                time_between_actions: vec![280, 280, 240, 240, 200, 200, 180, 180, 160, 160, 140],
                head_assets: heads("cobblestone_minion"),
                item_in_hand: Some("WOODEN_PICKAXE".into()),
                equipment: Default::default(),
                drops: vec![DropEntry::fixed("COBBLESTONE", 1)],
            },
            Blueprint {
                id: "COAL".into(),
                behavior: BehaviorKind::BlockField,
                field_radius: 2,
                time_between_actions: vec![300, 300, 260, 260, 220, 220, 200, 200, 180, 180, 160],
                head_assets: heads("coal_minion"),
                item_in_hand: Some("WOODEN_PICKAXE".into()),
                equipment: Default::default(),
                drops: vec![DropEntry::fixed("COAL", 1)],
            },
            Blueprint {
                id: "WHEAT".into(),
                behavior: BehaviorKind::BlockField,
                field_radius: 2,
                time_between_actions: vec![300, 300, 280, 280, 260, 260, 240, 240, 220, 220, 200],
                head_assets: heads("wheat_minion"),
                item_in_hand: Some("WOODEN_HOE".into()),
                equipment: Default::default(),
                drops: vec![
                    DropEntry::fixed("WHEAT", 1),
                    DropEntry {
                        kind: "SEEDS".into(),
                        min: 1,
                        max: 2,
                        chance: 0.5,
                    },
                ],
            },
            Blueprint {
                id: "ENDERMAN".into(),
                behavior: BehaviorKind::Instant,
                field_radius: 1,
                time_between_actions: vec![640, 640, 600, 600, 560, 560, 520, 520, 480, 480, 440],
                head_assets: heads("enderman_minion"),
                item_in_hand: None,
                equipment: Default::default(),
                drops: vec![DropEntry {
                    kind: "ENDER_PEARL".into(),
                    min: 1,
                    max: 2,
                    chance: 1.0,
                }],
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = Catalog::from_file(default_catalog()).unwrap();
        assert_eq!(
            catalog.blueprint_ids(),
            vec!["COAL", "COBBLESTONE", "ENDERMAN", "WHEAT"]
        );
        assert_eq!(catalog.max_stack_size("ENDER_PEARL"), Some(16));
        assert!(catalog.resolve("DIAMOND").is_none());
    }

    #[test]
    fn test_unknown_blueprint() {
        let catalog = Catalog::from_file(default_catalog()).unwrap();
        assert_eq!(
            catalog.blueprint("NOPE").unwrap_err(),
            MinionError::UnknownBlueprint("NOPE".into())
        );
    }

    #[test]
    fn test_rejects_drop_over_stack_limit() {
        let mut file = default_catalog();
        file.blueprints[3].drops[0].max = 17;
        let err = Catalog::from_file(file).unwrap_err();
        assert!(err.to_string().contains("ENDER_PEARL"));
    }

    #[test]
    fn test_rejects_levels_beyond_capacity_table() {
        let mut file = default_catalog();
        file.blueprints[0].time_between_actions = vec![100; 13];
        file.blueprints[0].head_assets = vec!["h".into(); 13];
        assert!(Catalog::from_file(file).is_err());
    }

    #[test]
    fn test_rejects_mismatched_head_assets() {
        let mut file = default_catalog();
        file.blueprints[0].head_assets.pop();
        assert!(Catalog::from_file(file).is_err());
    }

    #[test]
    fn test_parses_yaml() {
        let yaml = r#"
items:
  - id: SAND
    name: Sand
blueprints:
  - id: SAND
    behavior: instant
    time_between_actions: [100, 90]
    head_assets: [sand_1, sand_2]
    equipment:
      chest: SAND
    drops:
      - kind: SAND
        max: 3
"#;
        let file: CatalogFile = serde_yaml::from_str(yaml).unwrap();
        let catalog = Catalog::from_file(file).unwrap();
        let bp = catalog.blueprint("SAND").unwrap();
        assert_eq!(bp.behavior, BehaviorKind::Instant);
        assert_eq!(bp.levels(), 2);
        assert_eq!(bp.drops()[0].min, 1);
        assert_eq!(bp.drops()[0].max, 3);
        assert_eq!(bp.equipment().get(&EquipmentSlot::Chest).map(String::as_str), Some("SAND"));
        assert_eq!(catalog.max_stack_size("SAND"), Some(64));
    }
}
