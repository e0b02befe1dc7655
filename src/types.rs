//! Shared types used across the minion runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Stable identifier of a placed minion. Assigned once at creation and used
/// as the persistence key; never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinionId(String);

impl MinionId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MinionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MinionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for MinionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// World position
// ---------------------------------------------------------------------------

/// A point in the world. Immutable once a minion is placed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Return this position shifted by the given offsets.
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Minion state machine
// ---------------------------------------------------------------------------

/// Sub-state of an active minion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Regenerating resource stock toward its maximum.
    Replenish,
    /// Collecting regenerated stock into the inventory.
    Harvest,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replenish => write!(f, "replenish"),
            Self::Harvest => write!(f, "harvest"),
        }
    }
}

/// Why a minion leaves the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveReason {
    /// The owner left or the host is shutting down; state is saved.
    Quit,
    /// The owner picked the minion up; its record is deleted.
    Pickup,
}

impl fmt::Display for RemoveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quit => write!(f, "quit"),
            Self::Pickup => write!(f, "pickup"),
        }
    }
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// One inventory slot: a resource kind and how many of it are held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: String,
    pub count: u32,
    /// Maximum count for this kind, captured from the item registry.
    pub max_stack: u32,
}

impl ItemStack {
    pub fn new(kind: impl Into<String>, count: u32, max_stack: u32) -> Self {
        Self {
            kind: kind.into(),
            count,
            max_stack,
        }
    }

    /// Room left before this stack is saturated.
    pub fn headroom(&self) -> u32 {
        self.max_stack.saturating_sub(self.count)
    }

    pub fn is_saturated(&self) -> bool {
        self.count >= self.max_stack
    }
}
