use alloc::vec::Vec;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Bomb positions for one round. Built once per round and never mutated.
///
/// Serialized as the grid and the ascending bomb indices, and checked again on the way in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LayoutShape", into = "LayoutShape")]
pub struct BombLayout {
    grid: Grid,
    bomb_mask: Array2<bool>,
    bomb_count: CellCount,
}

#[derive(Serialize, Deserialize)]
struct LayoutShape {
    grid: Grid,
    bombs: Vec<CellIndex>,
}

impl TryFrom<LayoutShape> for BombLayout {
    type Error = ConfigError;

    fn try_from(shape: LayoutShape) -> core::result::Result<Self, Self::Error> {
        Self::from_indices(shape.grid, &shape.bombs)
    }
}

impl From<BombLayout> for LayoutShape {
    fn from(layout: BombLayout) -> Self {
        Self {
            bombs: layout.indices(),
            grid: layout.grid,
        }
    }
}

impl BombLayout {
    pub fn from_indices(grid: Grid, bombs: &[CellIndex]) -> core::result::Result<Self, ConfigError> {
        let mut bomb_mask = Array2::from_elem(grid.dim(), false);

        for &index in bombs {
            if !grid.contains(index) {
                return Err(ConfigError::InvalidCell(index));
            }
            let cell = &mut bomb_mask[grid.nd_index(index)];
            if *cell {
                return Err(ConfigError::DuplicateBomb(index));
            }
            *cell = true;
        }

        let bomb_count = CellCount::try_from(bombs.len()).map_err(|_| ConfigError::TooManyBombs {
            bombs: CellCount::MAX,
            total: grid.total_cells(),
        })?;
        grid.check_bombs(bomb_count)?;

        Ok(Self {
            grid,
            bomb_mask,
            bomb_count,
        })
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn bomb_count(&self) -> CellCount {
        self.bomb_count
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.grid.total_cells() - self.bomb_count
    }

    pub fn contains_bomb(&self, index: CellIndex) -> bool {
        self.grid.contains(index) && self.bomb_mask[self.grid.nd_index(index)]
    }

    /// Bomb indices in ascending order.
    pub fn indices(&self) -> Vec<CellIndex> {
        self.iter_bombs().collect()
    }

    pub fn iter_bombs(&self) -> impl Iterator<Item = CellIndex> + '_ {
        (0..self.grid.total_cells()).filter(|&index| self.bomb_mask[self.grid.nd_index(index)])
    }
}
