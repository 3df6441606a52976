//! Sparse graphic tile map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::level::TilePlacement;
use crate::physics::{Position, PIXELS_PER_METRE};

/// Edge length of one map cell, in pixels.
pub const TILE_SIZE: f32 = 16.0;

/// Graphic id of a coin block that has been emptied.
pub const BLANK_COIN_TILE: u32 = 28;

/// A map cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub column: i32,
    pub row: i32,
}

impl Cell {
    pub fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// The cell containing a point given in metres.
    pub fn containing(position: Position) -> Self {
        Self {
            column: (position.x * PIXELS_PER_METRE / TILE_SIZE).floor() as i32,
            row: (position.y * PIXELS_PER_METRE / TILE_SIZE).floor() as i32,
        }
    }
}

/// Graphic tile ids keyed by cell. Empty cells are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileMap {
    cells: BTreeMap<Cell, u32>,
}

impl TileMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_placements(placements: &[TilePlacement]) -> Self {
        let mut map = Self::new();
        for p in placements {
            map.set_tile(Cell::new(p.column, p.row), p.id);
        }
        map
    }

    pub fn tile(&self, cell: Cell) -> Option<u32> {
        self.cells.get(&cell).copied()
    }

    pub fn set_tile(&mut self, cell: Cell, id: u32) {
        self.cells.insert(cell, id);
    }

    pub fn clear(&mut self, cell: Cell) {
        self.cells.remove(&cell);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
