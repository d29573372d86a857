use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Single coordinate axis used for grid rows and columns.
pub type Coord = u8;

/// Count type used for bomb counts and total-cell counts.
pub type CellCount = u16;

/// Flat row-major cell index, `row * cols + col`.
pub type CellIndex = CellCount;

/// Wallet amounts, in the smallest unit the host wallet tracks.
pub type Amount = u64;

/// Two-dimensional coordinates `(row, col)`.
pub type Coord2 = (Coord, Coord);

pub const fn mult(a: Coord, b: Coord) -> CellCount {
    let a = a as CellCount;
    let b = b as CellCount;
    a.saturating_mul(b)
}

/// Shape of the board for one round.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "GridShape")]
pub struct Grid {
    rows: Coord,
    cols: Coord,
}

#[derive(Deserialize)]
struct GridShape {
    rows: Coord,
    cols: Coord,
}

impl TryFrom<GridShape> for Grid {
    type Error = ConfigError;

    fn try_from(shape: GridShape) -> Result<Self, Self::Error> {
        Self::new(shape.rows, shape.cols)
    }
}

impl Grid {
    pub const fn new_unchecked(rows: Coord, cols: Coord) -> Self {
        Self { rows, cols }
    }

    pub fn new(rows: Coord, cols: Coord) -> Result<Self, ConfigError> {
        if rows == 0 || cols == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        Ok(Self::new_unchecked(rows, cols))
    }

    pub fn square(size: Coord) -> Result<Self, ConfigError> {
        Self::new(size, size)
    }

    pub const fn rows(&self) -> Coord {
        self.rows
    }

    pub const fn cols(&self) -> Coord {
        self.cols
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.rows, self.cols)
    }

    pub const fn contains(&self, index: CellIndex) -> bool {
        index < self.total_cells()
    }

    pub fn index_of(&self, (row, col): Coord2) -> Option<CellIndex> {
        (row < self.rows && col < self.cols)
            .then(|| CellIndex::from(row) * CellIndex::from(self.cols) + CellIndex::from(col))
    }

    pub fn coords_of(&self, index: CellIndex) -> Option<Coord2> {
        if !self.contains(index) {
            return None;
        }
        let cols = CellIndex::from(self.cols);
        let row = Coord::try_from(index / cols).ok()?;
        let col = Coord::try_from(index % cols).ok()?;
        Some((row, col))
    }

    /// Checks that `bombs` leaves at least one safe cell and at least one bomb.
    pub fn check_bombs(&self, bombs: CellCount) -> Result<(), ConfigError> {
        let total = self.total_cells();
        if bombs == 0 {
            Err(ConfigError::NoBombs)
        } else if bombs >= total {
            Err(ConfigError::TooManyBombs { bombs, total })
        } else {
            Ok(())
        }
    }

    pub(crate) fn dim(&self) -> (usize, usize) {
        (self.rows.into(), self.cols.into())
    }

    pub(crate) fn nd_index(&self, index: CellIndex) -> [usize; 2] {
        let cols = usize::from(self.cols);
        let index = usize::from(index);
        [index / cols, index % cols]
    }
}
