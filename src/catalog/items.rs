//! Item-kind registry.

use serde::{Deserialize, Serialize};

/// A resource kind that can be stacked in a minion inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemKind {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
}

fn default_max_stack() -> u32 {
    64
}

impl ItemKind {
    pub fn new(id: impl Into<String>, name: impl Into<String>, max_stack: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_stack,
        }
    }
}

/// Resolves kind identifiers to item templates.
pub trait ItemRegistry: Send + Sync {
    fn resolve(&self, kind: &str) -> Option<ItemKind>;

    fn max_stack_size(&self, kind: &str) -> Option<u32> {
        self.resolve(kind).map(|k| k.max_stack)
    }
}
