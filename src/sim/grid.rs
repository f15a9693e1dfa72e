//! 3x3 grid cell addressing
//!
//! Cells are 0-based: `index = row * 3 + col`, row 0 at the top of the
//! mirrored frame, col 0 on the player's left as displayed.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{CELL_COUNT, GRID_SIZE};

/// One cell of the play grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub row: u8,
    pub col: u8,
}

impl Cell {
    /// All nine cells in index order
    pub const ALL: [Cell; CELL_COUNT] = [
        Cell::new(0, 0),
        Cell::new(0, 1),
        Cell::new(0, 2),
        Cell::new(1, 0),
        Cell::new(1, 1),
        Cell::new(1, 2),
        Cell::new(2, 0),
        Cell::new(2, 1),
        Cell::new(2, 2),
    ];

    /// Create a cell; coordinates are clamped onto the grid
    pub const fn new(row: u8, col: u8) -> Self {
        let max = GRID_SIZE - 1;
        Self {
            row: if row > max { max } else { row },
            col: if col > max { max } else { col },
        }
    }

    /// Cell from a flat 0-based index (`None` outside 0..9)
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Flat 0-based index
    #[inline]
    pub fn index(&self) -> usize {
        self.row as usize * GRID_SIZE as usize + self.col as usize
    }

    /// Center of the cell in normalized display coordinates
    pub fn center(&self) -> Vec2 {
        let side = 1.0 / GRID_SIZE as f32;
        Vec2::new(
            (self.col as f32 + 0.5) * side,
            (self.row as f32 + 0.5) * side,
        )
    }

    /// Whether a normalized display position falls inside this cell's bounds
    pub fn contains(&self, pos: Vec2) -> bool {
        let side = 1.0 / GRID_SIZE as f32;
        let min = Vec2::new(self.col as f32 * side, self.row as f32 * side);
        let max = min + Vec2::splat(side);
        pos.x >= min.x && pos.x < max.x && pos.y >= min.y && pos.y < max.y
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for (i, cell) in Cell::ALL.iter().enumerate() {
            assert_eq!(cell.index(), i);
            assert_eq!(Cell::from_index(i), Some(*cell));
        }
        assert_eq!(Cell::from_index(9), None);
    }

    #[test]
    fn test_new_clamps() {
        assert_eq!(Cell::new(7, 1), Cell::new(2, 1));
    }

    #[test]
    fn test_center_is_contained() {
        for cell in Cell::ALL {
            assert!(cell.contains(cell.center()));
            for other in Cell::ALL.iter().filter(|c| **c != cell) {
                assert!(!other.contains(cell.center()));
            }
        }
    }
}
