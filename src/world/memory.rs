//! In-process world that records what was placed where.

use super::{VisualHandle, VisualHost};
use crate::catalog::Blueprint;
use crate::types::Position;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// What a handle points at.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Minion {
        blueprint: String,
        position: Position,
        head: Option<String>,
        equipment: Vec<String>,
    },
    Overlay {
        position: Position,
        text: String,
    },
}

#[derive(Default)]
struct WorldState {
    next_handle: u64,
    entities: HashMap<VisualHandle, Entity>,
    blocks: BTreeMap<(i64, i64, i64), String>,
}

/// A [`VisualHost`] that keeps everything in memory and logs each change.
#[derive(Default)]
pub struct InMemoryWorld {
    state: Mutex<WorldState>,
}

fn block_key(p: Position) -> (i64, i64, i64) {
    (p.x.floor() as i64, p.y.floor() as i64, p.z.floor() as i64)
}

impl InMemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&self, handle: VisualHandle) -> Option<Entity> {
        self.state.lock().entities.get(&handle).cloned()
    }

    pub fn is_live(&self, handle: VisualHandle) -> bool {
        self.state.lock().entities.contains_key(&handle)
    }

    /// Text of every live overlay.
    pub fn overlay_texts(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut texts: Vec<(VisualHandle, String)> = state
            .entities
            .iter()
            .filter_map(|(h, e)| match e {
                Entity::Overlay { text, .. } => Some((*h, text.clone())),
                Entity::Minion { .. } => None,
            })
            .collect();
        texts.sort_by_key(|(h, _)| *h);
        texts.into_iter().map(|(_, t)| t).collect()
    }

    pub fn minion_count(&self) -> usize {
        self.state
            .lock()
            .entities
            .values()
            .filter(|e| matches!(e, Entity::Minion { .. }))
            .count()
    }

    pub fn block_at(&self, position: Position) -> Option<String> {
        self.state.lock().blocks.get(&block_key(position)).cloned()
    }

    pub fn block_count(&self) -> usize {
        self.state.lock().blocks.len()
    }

    fn allocate(&self, entity: Entity) -> VisualHandle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = VisualHandle::new(state.next_handle);
        state.entities.insert(handle, entity);
        handle
    }
}

impl VisualHost for InMemoryWorld {
    fn place(&self, position: Position, blueprint: &Blueprint) -> VisualHandle {
        let equipment = blueprint
            .item_in_hand
            .iter()
            .chain(blueprint.equipment().values())
            .cloned()
            .collect();
        let handle = self.allocate(Entity::Minion {
            blueprint: blueprint.id.clone(),
            position,
            head: blueprint.head_asset(1).map(str::to_string),
            equipment,
        });
        debug!("Placed {} minion {} at {}", blueprint.id, handle, position);
        handle
    }

    fn remove(&self, handle: VisualHandle) {
        if self.state.lock().entities.remove(&handle).is_some() {
            debug!("Removed entity {}", handle);
        }
    }

    fn place_overlay(&self, position: Position) -> VisualHandle {
        let handle = self.allocate(Entity::Overlay {
            position,
            text: String::new(),
        });
        debug!("Placed overlay {} at {}", handle, position);
        handle
    }

    fn set_overlay_text(&self, handle: VisualHandle, text: &str) {
        if let Some(Entity::Overlay { text: current, .. }) =
            self.state.lock().entities.get_mut(&handle)
        {
            *current = text.to_string();
            debug!("Overlay {} now reads {:?}", handle, text);
        }
    }

    fn set_head_asset(&self, handle: VisualHandle, asset: &str) {
        if let Some(Entity::Minion { head, .. }) = self.state.lock().entities.get_mut(&handle) {
            *head = Some(asset.to_string());
        }
    }

    fn set_block(&self, position: Position, kind: Option<&str>) {
        let mut state = self.state.lock();
        match kind {
            Some(kind) => {
                state.blocks.insert(block_key(position), kind.to_string());
            }
            None => {
                state.blocks.remove(&block_key(position));
            }
        }
    }
}
