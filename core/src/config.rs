use serde::{Deserialize, Serialize};

use crate::*;

/// Table rules shared by every round a game plays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    /// Fraction of the fair payout kept by the house, applied once at payout.
    pub house_edge: HouseEdge,
    pub min_stake: Amount,
    pub max_stake: Amount,
    pub min_bombs: CellCount,
    /// Defaults to one less than the number of cells.
    pub max_bombs: Option<CellCount>,
    /// Board offered when the player has not picked one.
    pub grid: Grid,
    pub bombs: CellCount,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            house_edge: HouseEdge::FAIR,
            min_stake: 1,
            max_stake: Amount::MAX,
            min_bombs: 1,
            max_bombs: None,
            grid: Grid::new_unchecked(5, 5),
            bombs: 5,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> core::result::Result<(), ConfigError> {
        if self.min_stake == 0 {
            return Err(ConfigError::ZeroStake);
        }
        if self.min_stake > self.max_stake {
            return Err(ConfigError::InvertedStakeLimits);
        }
        self.check_bombs(self.grid, self.bombs)?;
        Ok(())
    }

    /// Checks a round request against the table rules and returns its odds. Also refuses
    /// stakes whose full-clear payout would not fit in [`Amount`].
    pub fn check_round(
        &self,
        stake: Amount,
        grid: Grid,
        bombs: CellCount,
    ) -> core::result::Result<Odds, ConfigError> {
        if stake == 0 {
            return Err(ConfigError::ZeroStake);
        }
        if stake < self.min_stake || stake > self.max_stake {
            return Err(ConfigError::StakeOutOfRange {
                stake,
                min: self.min_stake,
                max: self.max_stake,
            });
        }
        self.check_bombs(grid, bombs)?;
        let odds = Odds::for_grid(grid, bombs)?;
        if odds.payout(stake, odds.safe_cells(), self.house_edge).is_none() {
            return Err(ConfigError::PayoutOverflow { stake });
        }
        Ok(odds)
    }

    fn check_bombs(&self, grid: Grid, bombs: CellCount) -> core::result::Result<(), ConfigError> {
        grid.check_bombs(bombs)?;

        let most = grid.total_cells() - 1;
        let max = self.max_bombs.map_or(most, |max| max.min(most));
        if bombs < self.min_bombs || bombs > max {
            return Err(ConfigError::BombsOutOfRange {
                bombs,
                min: self.min_bombs,
                max,
            });
        }
        Ok(())
    }
}
