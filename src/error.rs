//! Precondition failures raised by minion operations.
//!
//! Every variant is returned before the operation mutates any state.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MinionError {
    /// Level outside `1..=max` for the blueprint.
    #[error("Level {level} is out of range for blueprint '{blueprint}' (max {max})")]
    LevelOutOfRange { blueprint: String, level: u32, max: u32 },

    /// `set_level` called with a level that is not strictly greater.
    #[error("New minion level has to be larger than the current one ({current} -> {requested})")]
    LevelNotIncreasing { current: u32, requested: u32 },

    /// Quantity not in `1..=max_stack` for the kind.
    #[error("Cannot place {amount} of '{kind}' (allowed 1..={max_stack})")]
    InvalidQuantity { kind: String, amount: u32, max_stack: u32 },

    #[error("Unknown item kind: {0}")]
    UnknownItem(String),

    #[error("Unknown blueprint: {0}")]
    UnknownBlueprint(String),
}

pub type Result<T> = std::result::Result<T, MinionError>;
