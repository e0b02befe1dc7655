//! Static minion definitions: timing, visuals, equipment and drops.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which resource behaviour a blueprint's minions run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    /// Grows a ring of resource blocks and breaks one per harvest.
    #[default]
    BlockField,
    /// Always ready to harvest.
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Head,
    Chest,
    Legs,
    Feet,
    MainHand,
    OffHand,
}

impl fmt::Display for EquipmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => write!(f, "head"),
            Self::Chest => write!(f, "chest"),
            Self::Legs => write!(f, "legs"),
            Self::Feet => write!(f, "feet"),
            Self::MainHand => write!(f, "main_hand"),
            Self::OffHand => write!(f, "off_hand"),
        }
    }
}

/// One line of a drop table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEntry {
    pub kind: String,
    #[serde(default = "one")]
    pub min: u32,
    #[serde(default = "one")]
    pub max: u32,
    /// Probability in `(0, 1]` that this entry drops at all.
    #[serde(default = "certain")]
    pub chance: f64,
}

fn one() -> u32 {
    1
}

fn certain() -> f64 {
    1.0
}

impl DropEntry {
    pub fn fixed(kind: impl Into<String>, amount: u32) -> Self {
        Self {
            kind: kind.into(),
            min: amount,
            max: amount,
            chance: 1.0,
        }
    }
}

/// A minion type as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    #[serde(default)]
    pub behavior: BehaviorKind,
    /// Radius of the block ring around the minion (block-field behaviour).
    #[serde(default = "one")]
    pub field_radius: u32,
    /// Ticks between actions, indexed by `level - 1`.
    pub time_between_actions: Vec<u64>,
    /// Head texture per level, indexed by `level - 1`.
    pub head_assets: Vec<String>,
    #[serde(default)]
    pub item_in_hand: Option<String>,
    #[serde(default)]
    pub equipment: BTreeMap<EquipmentSlot, String>,
    pub drops: Vec<DropEntry>,
}

impl Blueprint {
    /// Highest level this blueprint supports.
    pub fn levels(&self) -> u32 {
        self.time_between_actions.len() as u32
    }

    /// Ticks between actions at `level`, if the level exists.
    pub fn time_between_actions(&self, level: u32) -> Option<u64> {
        let idx = level.checked_sub(1)? as usize;
        self.time_between_actions.get(idx).copied()
    }

    pub fn head_asset(&self, level: u32) -> Option<&str> {
        let idx = level.checked_sub(1)? as usize;
        self.head_assets.get(idx).map(String::as_str)
    }

    pub fn equipment(&self) -> &BTreeMap<EquipmentSlot, String> {
        &self.equipment
    }

    pub fn drops(&self) -> &[DropEntry] {
        &self.drops
    }

    /// Block kind the minion grows around itself: the first drop.
    pub fn resource_block(&self) -> Option<&str> {
        self.drops.first().map(|d| d.kind.as_str())
    }

    /// Roll the drop table once, yielding `(kind, quantity)` pairs in table order.
    pub fn roll_drops<R: Rng>(&self, rng: &mut R) -> Vec<(String, u32)> {
        let mut rolled = Vec::with_capacity(self.drops.len());
        for d in &self.drops {
            if d.chance < 1.0 && !rng.gen_bool(d.chance.clamp(0.0, 1.0)) {
                continue;
            }
            let amount = if d.min >= d.max {
                d.min
            } else {
                rng.gen_range(d.min..=d.max)
            };
            rolled.push((d.kind.clone(), amount));
        }
        rolled
    }
}
