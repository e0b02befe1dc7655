//! Capacity-bounded minion inventory with merge-before-append stacking.

use crate::catalog::ItemKind;
use crate::error::{MinionError, Result};
use crate::types::ItemStack;
use tracing::warn;

/// Number of stacks a minion can hold at the given level.
///
/// Levels outside the table yield 0, which callers treat as a catalog error.
pub fn capacity_for_level(level: u32) -> usize {
    match level {
        1 => 1,
        2 | 3 => 3,
        4 | 5 => 6,
        6 | 7 => 9,
        8 | 9 => 12,
        10..=12 => 15,
        _ => 0,
    }
}

/// Highest level covered by [`capacity_for_level`].
pub const MAX_TABLE_LEVEL: u32 = 12;

/// Ordered stacks plus the number of stacks allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    stacks: Vec<ItemStack>,
    capacity: usize,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            stacks: Vec::new(),
            capacity,
        }
    }

    /// Build an inventory from already-ordered stacks (e.g. a loaded record).
    ///
    /// Stacks beyond `capacity` are kept so nothing is lost; such an
    /// inventory can only merge into existing stacks until it is emptied.
    pub fn with_stacks(capacity: usize, stacks: Vec<ItemStack>) -> Self {
        let inventory = Self { stacks, capacity };
        if inventory.overflow() > 0 {
            warn!(
                "Loaded {} stacks into an inventory of {} slots",
                inventory.stacks.len(),
                capacity
            );
        }
        inventory
    }

    /// Stacks held beyond capacity.
    pub fn overflow(&self) -> usize {
        self.stacks.len().saturating_sub(self.capacity)
    }

    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    /// Total count of one kind across all stacks.
    pub fn count_of(&self, kind: &str) -> u32 {
        self.stacks
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.count)
            .sum()
    }

    /// True when every slot is used and no stack can absorb anything more.
    /// An over-capacity inventory counts as using every slot.
    pub fn is_full(&self) -> bool {
        self.stacks.len() >= self.capacity && self.stacks.iter().all(ItemStack::is_saturated)
    }

    /// Place `amount` of `kind`, topping up existing stacks in order before
    /// appending a new one.
    ///
    /// Returns `Ok(false)` when capacity ran out before everything was
    /// placed. Whatever was merged into existing stacks stays there.
    pub fn add(&mut self, kind: &ItemKind, amount: u32) -> Result<bool> {
        if amount == 0 || amount > kind.max_stack {
            return Err(MinionError::InvalidQuantity {
                kind: kind.id.clone(),
                amount,
                max_stack: kind.max_stack,
            });
        }

        let mut remaining = amount;
        for stack in self.stacks.iter_mut() {
            if stack.is_saturated() || stack.kind != kind.id {
                continue;
            }
            let headroom = stack.headroom();
            if remaining <= headroom {
                stack.count += remaining;
                return Ok(true);
            }
            stack.count = stack.max_stack;
            remaining -= headroom;
        }

        if remaining == 0 {
            return Ok(true);
        }

        if self.stacks.len() < self.capacity {
            self.stacks
                .push(ItemStack::new(kind.id.clone(), remaining, kind.max_stack));
            return Ok(true);
        }

        Ok(false)
    }

    /// Empty the inventory, handing back everything it held.
    pub fn drain(&mut self) -> Vec<ItemStack> {
        std::mem::take(&mut self.stacks)
    }
}
