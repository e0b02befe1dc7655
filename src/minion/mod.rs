//! The minion state machine.
//!
//! A working minion alternates between replenishing its resource and
//! harvesting it into the inventory, one step per scheduled action. When a
//! harvest cannot be stored the minion marks itself full, cancels its
//! schedule and shows a status overlay until something calls
//! [`Minion::start_working`] again with room available.

pub mod behavior;
pub mod leveling;
pub mod status;

pub use behavior::MinionBehavior;
pub use status::StatusAnnouncer;

use crate::catalog::{Blueprint, ItemRegistry};
use crate::error::MinionError;
use crate::inventory::{capacity_for_level, Inventory};
use crate::scheduler::{ScheduleHandle, Scheduler};
use crate::state::records::{self, MinionRecord};
use crate::state::RecordStore;
use crate::types::{ItemStack, MinionId, Phase, Position, RemoveReason};
use crate::world::{VisualHandle, VisualHost};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, trace, warn};

/// Overlay text shown while a minion cannot store any more loot.
pub const FULL_MESSAGE: &str = "/!\\ Minion is full!";

/// A minion shared between its owner and its scheduled callbacks.
pub type SharedMinion = Arc<Mutex<Minion>>;

/// Collaborators every minion talks to.
#[derive(Clone)]
pub struct MinionServices {
    pub registry: Arc<dyn ItemRegistry>,
    pub host: Arc<dyn VisualHost>,
    pub scheduler: Arc<dyn Scheduler>,
}

/// Where and what to spawn.
#[derive(Debug, Clone)]
pub struct Placement {
    pub id: MinionId,
    pub owner: String,
    pub blueprint: Arc<Blueprint>,
    pub level: u32,
    pub position: Position,
}

impl Placement {
    /// A brand-new minion with a freshly generated identifier.
    pub fn new(owner: &str, blueprint: Arc<Blueprint>, level: u32, position: Position) -> Self {
        Self {
            id: MinionId::generate(),
            owner: owner.to_string(),
            blueprint,
            level,
            position,
        }
    }

    /// Re-create a persisted minion.
    pub fn from_record(owner: &str, blueprint: Arc<Blueprint>, record: &MinionRecord) -> Self {
        Self {
            id: record.id.clone(),
            owner: owner.to_string(),
            blueprint,
            level: record.level,
            position: record.position,
        }
    }
}

pub struct Minion {
    id: MinionId,
    owner: String,
    blueprint: Arc<Blueprint>,
    position: Position,
    level: u32,
    inventory: Inventory,
    time_between_actions: u64,
    phase: Phase,
    full: bool,
    body: VisualHandle,
    status: StatusAnnouncer,
    work: Option<ScheduleHandle>,
    behavior: Box<dyn MinionBehavior>,
    registry: Arc<dyn ItemRegistry>,
    host: Arc<dyn VisualHost>,
    scheduler: Arc<dyn Scheduler>,
    me: Weak<Mutex<Minion>>,
}

impl Minion {
    /// Validate the placement, load the saved inventory, place the minion in
    /// the world and start it working.
    pub fn spawn(
        placement: Placement,
        services: MinionServices,
        store: &dyn RecordStore,
    ) -> Result<SharedMinion> {
        let Placement {
            id,
            owner,
            blueprint,
            level,
            position,
        } = placement;

        let max = blueprint.levels();
        let out_of_range = || MinionError::LevelOutOfRange {
            blueprint: blueprint.id.clone(),
            level,
            max,
        };
        if level == 0 || level > max {
            return Err(out_of_range().into());
        }
        let time_between_actions = blueprint
            .time_between_actions(level)
            .ok_or_else(out_of_range)?;
        let capacity = capacity_for_level(level);
        if capacity == 0 {
            return Err(out_of_range().into());
        }

        let stacks = records::load_inventory(store, &id, services.registry.as_ref())
            .with_context(|| format!("Failed to spawn minion {}", id))?;
        let inventory = Inventory::with_stacks(capacity, stacks);

        let body = services.host.place(position, &blueprint);
        if let Some(asset) = blueprint.head_asset(level) {
            services.host.set_head_asset(body, asset);
        }
        let behavior = behavior::for_blueprint(&blueprint, services.host.clone(), position);
        let status = StatusAnnouncer::new(services.host.clone(), services.scheduler.clone(), position);

        info!(
            "Spawned {} minion {} (level {}, {} stacks) at {} for {}",
            blueprint.id,
            id,
            level,
            inventory.len(),
            position,
            owner
        );

        let minion = Arc::new_cyclic(|me| {
            Mutex::new(Minion {
                id,
                owner,
                blueprint,
                position,
                level,
                inventory,
                time_between_actions,
                phase: Phase::Replenish,
                full: false,
                body,
                status,
                work: None,
                behavior,
                registry: services.registry,
                host: services.host,
                scheduler: services.scheduler,
                me: me.clone(),
            })
        });

        {
            let mut m = minion.lock();
            if m.inventory.is_full() {
                m.set_full();
            }
            m.start_working();
        }
        Ok(minion)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &MinionId {
        &self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// True while a tick schedule is installed.
    pub fn is_working(&self) -> bool {
        self.work.as_ref().is_some_and(|w| !w.is_cancelled())
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn capacity(&self) -> usize {
        self.inventory.capacity()
    }

    pub fn time_between_actions(&self) -> u64 {
        self.time_between_actions
    }

    pub fn body(&self) -> VisualHandle {
        self.body
    }

    pub fn status(&self) -> &StatusAnnouncer {
        &self.status
    }

    /// Snapshot of what gets persisted.
    pub fn record(&self) -> MinionRecord {
        MinionRecord {
            id: self.id.clone(),
            blueprint: self.blueprint.id.clone(),
            level: self.level,
            position: self.position,
            items: self
                .inventory
                .stacks()
                .iter()
                .map(|s| (s.kind.clone(), s.count))
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    /// Install a fresh tick schedule, replacing any previous one.
    ///
    /// Does nothing while the minion is full.
    pub fn start_working(&mut self) {
        if self.full {
            debug!("Minion {} is full, not starting", self.id);
            return;
        }

        self.status.clear();
        if let Some(previous) = self.work.take() {
            previous.cancel();
        }

        self.phase = if self.behavior.is_fully_regenerated() {
            Phase::Harvest
        } else {
            Phase::Replenish
        };

        let me = self.me.clone();
        let period = self.time_between_actions;
        self.work = Some(self.scheduler.schedule_repeating(
            Box::new(move || {
                let Some(shared) = me.upgrade() else {
                    return;
                };
                let mut minion = shared.lock();
                if let Err(e) = minion.tick() {
                    error!("Minion {} tick failed: {}", minion.id, e);
                }
            }),
            period,
            period,
        ));

        debug!(
            "Minion {} working every {} ticks, starting in {}",
            self.id, period, self.phase
        );
    }

    /// Run one scheduled action.
    pub fn tick(&mut self) -> Result<(), MinionError> {
        if self.full {
            return Ok(());
        }

        match self.phase {
            Phase::Harvest => {
                self.behavior.on_harvest();
                self.phase = Phase::Replenish;
                self.generate_loot()?;
            }
            Phase::Replenish => {
                if self.behavior.on_replenish_tick() {
                    self.phase = Phase::Harvest;
                }
            }
        }
        trace!("Minion {} next phase: {}", self.id, self.phase);
        Ok(())
    }

    /// Roll the drop table and store every drop, pausing on the first one
    /// that does not fit.
    fn generate_loot(&mut self) -> Result<(), MinionError> {
        let drops = self.blueprint.roll_drops(&mut rand::thread_rng());
        for (kind, amount) in drops {
            self.store_loot(&kind, amount)?;
        }
        Ok(())
    }

    /// Place `amount` of `kind` into the inventory. Returns false, and marks
    /// the minion full, when it did not all fit.
    pub fn store_loot(&mut self, kind: &str, amount: u32) -> Result<bool, MinionError> {
        let item = self
            .registry
            .resolve(kind)
            .ok_or_else(|| MinionError::UnknownItem(kind.to_string()))?;
        let placed = self.inventory.add(&item, amount)?;
        if placed {
            trace!("Minion {} stored {} x{}", self.id, kind, amount);
        } else {
            self.set_full();
        }
        Ok(placed)
    }

    fn set_full(&mut self) {
        if !self.full {
            warn!(
                "Minion {} is full ({} / {} stacks)",
                self.id,
                self.inventory.len(),
                self.inventory.capacity()
            );
        }
        self.full = true;
        if let Some(work) = &self.work {
            work.cancel();
        }
        self.status.set_message(FULL_MESSAGE, None);
    }

    /// Show a status message above the minion for `duration` ticks, or until
    /// cleared when `None`.
    pub fn set_message(&mut self, text: &str, duration: Option<u64>) {
        self.status.set_message(text, duration);
    }

    /// Take everything out of the inventory. A full minion resumes working.
    pub fn collect_all(&mut self) -> Vec<ItemStack> {
        let items = self.inventory.drain();
        info!("Collected {} stacks from minion {}", items.len(), self.id);
        if self.full {
            self.full = false;
            self.start_working();
        }
        items
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn save(&self, store: &mut dyn RecordStore) -> Result<()> {
        records::save_minion(store, &self.record())
            .with_context(|| format!("Failed to save minion {}", self.id))?;
        info!("Saved minion {}", self.id);
        Ok(())
    }

    /// Replace the inventory with what the store holds and restart.
    pub fn reload(&mut self, store: &dyn RecordStore) -> Result<()> {
        let stacks = records::load_inventory(store, &self.id, self.registry.as_ref())
            .with_context(|| format!("Failed to reload minion {}", self.id))?;
        self.inventory = Inventory::with_stacks(self.inventory.capacity(), stacks);
        self.full = false;
        if self.inventory.is_full() {
            self.set_full();
        }
        info!("Reloaded minion {} ({} stacks)", self.id, self.inventory.len());
        self.start_working();
        Ok(())
    }

    /// Take the minion out of the world. `Quit` keeps its record; any
    /// other reason deletes it.
    pub fn remove(&mut self, reason: RemoveReason, store: &mut dyn RecordStore) -> Result<()> {
        if let Some(work) = self.work.take() {
            work.cancel();
        }
        self.status.clear();
        self.behavior.teardown();
        self.host.remove(self.body);
        info!("Removing minion {} ({})", self.id, reason);

        match reason {
            RemoveReason::Quit => self.save(store),
            RemoveReason::Pickup => records::remove_minion(store, &self.id),
        }
    }
}

impl fmt::Debug for Minion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Minion")
            .field("id", &self.id)
            .field("blueprint", &self.blueprint.id)
            .field("level", &self.level)
            .field("phase", &self.phase)
            .field("full", &self.full)
            .field("stacks", &self.inventory.len())
            .finish_non_exhaustive()
    }
}

/// A minion dropped without [`Minion::remove`] still takes its schedule,
/// overlay and resource blocks with it. The body and the record stay.
impl Drop for Minion {
    fn drop(&mut self) {
        if let Some(work) = self.work.take() {
            work.cancel();
        }
        self.status.clear();
        self.behavior.teardown();
    }
}
