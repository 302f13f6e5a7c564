//! Local mirror of stones the engine has confirmed.

use crate::protocol::{Color, Position, BOARD_SIZE};

const CELLS: usize = BOARD_SIZE as usize;

/// Rejected write to the mirror.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    #[error("Cell {position} already holds {existing}")]
    Occupied { position: Position, existing: Color },
}

/// 15x15 grid of confirmed stones.
///
/// Cells are write-once: nothing is ever removed short of replacing the
/// whole mirror on reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardMirror {
    cells: [[Option<Color>; CELLS]; CELLS],
    stones: usize,
}

impl BoardMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stone at `position`, if any.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<Color> {
        self.cells[usize::from(position.y())][usize::from(position.x())]
    }

    #[must_use]
    pub fn is_empty_at(&self, position: Position) -> bool {
        self.get(position).is_none()
    }

    /// Record a confirmed stone.
    ///
    /// # Errors
    ///
    /// Returns `BoardError::Occupied` if the cell already holds a stone.
    pub fn place(&mut self, position: Position, color: Color) -> Result<(), BoardError> {
        let cell = &mut self.cells[usize::from(position.y())][usize::from(position.x())];
        if let Some(existing) = *cell {
            return Err(BoardError::Occupied { position, existing });
        }
        *cell = Some(color);
        self.stones += 1;
        Ok(())
    }

    /// Number of stones on the board.
    #[must_use]
    pub fn stone_count(&self) -> usize {
        self.stones
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stones == 0
    }

    /// Rows from top to bottom, each cell left to right.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<Color>; CELLS]> {
        self.cells.iter()
    }
}
