//! Minions: autonomous resource-generating automatons.
//!
//! Each minion alternates between replenishing and harvesting on a fixed
//! tick schedule, stores its loot in a stacking inventory whose size grows
//! with its level, and persists that inventory per owner between sessions.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod inventory;
pub mod minion;
pub mod scheduler;
pub mod state;
pub mod types;
pub mod world;
