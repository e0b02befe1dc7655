//! In-place minion upgrades.

use super::Minion;
use crate::error::MinionError;
use crate::inventory::capacity_for_level;
use tracing::info;

impl Minion {
    /// Raise the minion to `level`, refreshing its head, capacity and timing,
    /// then restart work on the new timing.
    ///
    /// A full minion whose new capacity leaves room is un-paused; only the
    /// flag is checked, so it resumes even if every existing stack is
    /// saturated and the room is an empty slot.
    pub fn set_level(&mut self, level: u32) -> Result<(), MinionError> {
        if level <= self.level {
            return Err(MinionError::LevelNotIncreasing {
                current: self.level,
                requested: level,
            });
        }

        let out_of_range = || MinionError::LevelOutOfRange {
            blueprint: self.blueprint.id.clone(),
            level,
            max: self.blueprint.levels(),
        };
        let time_between_actions = self
            .blueprint
            .time_between_actions(level)
            .ok_or_else(out_of_range)?;
        let capacity = capacity_for_level(level);
        if capacity == 0 {
            return Err(out_of_range());
        }

        let previous = self.level;
        self.level = level;
        if let Some(asset) = self.blueprint.head_asset(level) {
            self.host.set_head_asset(self.body, asset);
        }
        self.inventory.set_capacity(capacity);
        self.time_between_actions = time_between_actions;

        if self.full && !self.inventory.is_full() {
            self.full = false;
        }

        info!(
            "Minion {} upgraded {} -> {} (capacity {}, every {} ticks)",
            self.id, previous, level, capacity, time_between_actions
        );
        self.start_working();
        Ok(())
    }
}
