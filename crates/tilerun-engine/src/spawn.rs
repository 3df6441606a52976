//! Deferred item spawning.
//!
//! Tile reactions run inside a physics step, where bodies cannot be created.
//! They enqueue a [`SpawnRequest`] instead; the driver drains at most one per
//! tick after the step has finished.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::physics::Position;

/// Item variants a tile can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Mushroom,
}

impl ItemKind {
    /// Parse a `contains` property value.
    pub fn from_property(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mushroom" => Some(ItemKind::Mushroom),
            _ => None,
        }
    }
}

/// Instruction to materialise an item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub position: Position,
    pub item: ItemKind,
}

/// Unbounded FIFO of pending spawns.
#[derive(Debug, Default)]
pub struct SpawnQueue {
    pending: VecDeque<SpawnRequest>,
}

impl SpawnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: SpawnRequest) {
        debug!(?request, queued = self.pending.len() + 1, "spawn requested");
        self.pending.push_back(request);
    }

    /// Take the oldest request, if any.
    pub fn drain_one(&mut self) -> Option<SpawnRequest> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
