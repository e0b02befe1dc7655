//! The visual side of a minion: its body, its status overlay and the
//! resource blocks it grows. The runtime only holds opaque handles.

pub mod memory;

pub use memory::InMemoryWorld;

use crate::catalog::Blueprint;
use crate::types::Position;
use std::fmt;

/// Opaque reference to something the host placed in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisualHandle(u64);

impl VisualHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for VisualHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// World operations a minion needs from its host.
pub trait VisualHost: Send + Sync {
    /// Place a minion body dressed with the blueprint's equipment.
    fn place(&self, position: Position, blueprint: &Blueprint) -> VisualHandle;

    /// Remove a body or overlay. Removing an unknown handle is a no-op.
    fn remove(&self, handle: VisualHandle);

    /// Place an empty text overlay at `position`.
    fn place_overlay(&self, position: Position) -> VisualHandle;

    fn set_overlay_text(&self, handle: VisualHandle, text: &str);

    /// Swap the head texture shown on a minion body.
    fn set_head_asset(&self, handle: VisualHandle, asset: &str);

    /// Put a resource block at `position`, or clear it with `None`.
    fn set_block(&self, position: Position, kind: Option<&str>);
}
