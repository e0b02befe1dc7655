//! Per-variant resource behaviour driven by the minion state machine.

use crate::catalog::{BehaviorKind, Blueprint};
use crate::types::Position;
use crate::world::VisualHost;
use std::sync::Arc;
use tracing::trace;

/// Hooks a minion variant implements. The state machine only talks to
/// its resource through these.
pub trait MinionBehavior: Send {
    /// Collect one unit of regenerated stock. Loot is generated by the
    /// caller right after this returns.
    fn on_harvest(&mut self);

    /// Regenerate one step. Returns true once stock is fully regenerated.
    fn on_replenish_tick(&mut self) -> bool;

    fn is_fully_regenerated(&self) -> bool;

    /// Undo any world changes when the minion is removed.
    fn teardown(&mut self) {}
}

/// Build the behaviour a blueprint asks for.
pub fn for_blueprint(
    blueprint: &Blueprint,
    host: Arc<dyn VisualHost>,
    position: Position,
) -> Box<dyn MinionBehavior> {
    match blueprint.behavior {
        BehaviorKind::Instant => Box::new(Instant),
        BehaviorKind::BlockField => Box::new(BlockField::new(
            host,
            position,
            blueprint.field_radius,
            blueprint.resource_block().unwrap_or(blueprint.id.as_str()),
        )),
    }
}

/// Resource that is always ready.
#[derive(Debug, Default, Clone, Copy)]
pub struct Instant;

impl MinionBehavior for Instant {
    fn on_harvest(&mut self) {}

    fn on_replenish_tick(&mut self) -> bool {
        true
    }

    fn is_fully_regenerated(&self) -> bool {
        true
    }
}

/// Square ring of resource blocks one level below the minion.
///
/// Replenishing fills the first empty slot; harvesting breaks the last
/// filled one.
pub struct BlockField {
    host: Arc<dyn VisualHost>,
    block: String,
    slots: Vec<Position>,
    filled: Vec<bool>,
}

impl BlockField {
    pub fn new(host: Arc<dyn VisualHost>, center: Position, radius: u32, block: &str) -> Self {
        let r = radius.max(1) as i64;
        let mut slots = Vec::new();
        for dx in -r..=r {
            for dz in -r..=r {
                if dx == 0 && dz == 0 {
                    continue;
                }
                slots.push(center.offset(dx as f64, -1.0, dz as f64));
            }
        }
        let filled = vec![false; slots.len()];
        Self {
            host,
            block: block.to_string(),
            slots,
            filled,
        }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    pub fn grown(&self) -> usize {
        self.filled.iter().filter(|f| **f).count()
    }
}

impl MinionBehavior for BlockField {
    fn on_harvest(&mut self) {
        if let Some(idx) = self.filled.iter().rposition(|f| *f) {
            self.filled[idx] = false;
            self.host.set_block(self.slots[idx], None);
            trace!("Broke {} at {}", self.block, self.slots[idx]);
        }
    }

    fn on_replenish_tick(&mut self) -> bool {
        if let Some(idx) = self.filled.iter().position(|f| !*f) {
            self.filled[idx] = true;
            self.host.set_block(self.slots[idx], Some(&self.block));
            trace!("Placed {} at {}", self.block, self.slots[idx]);
        }
        self.is_fully_regenerated()
    }

    fn is_fully_regenerated(&self) -> bool {
        self.filled.iter().all(|f| *f)
    }

    fn teardown(&mut self) {
        for (slot, filled) in self.slots.iter().zip(self.filled.iter_mut()) {
            if *filled {
                self.host.set_block(*slot, None);
                *filled = false;
            }
        }
    }
}
