//! Payout multipliers for sequential reveals without replacement.
//!
//! After `k` safe reveals on a board of `n` cells hiding `b` bombs the fair multiplier is
//! `C(n, k) / C(n - b, k)`, the inverse of the probability of surviving all `k` picks. A
//! configured [`HouseEdge`] is applied once to that cumulative value, never per step.
//!
//! The `f64` multipliers are for display. Amounts are settled by [`Odds::payout`], which
//! works on the exact fraction.

use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::*;

/// Board odds: total cells and bombs, with `1 <= bombs < total`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Odds {
    total: CellCount,
    bombs: CellCount,
}

impl Odds {
    pub fn new(total: CellCount, bombs: CellCount) -> core::result::Result<Self, ConfigError> {
        if total == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if bombs == 0 {
            return Err(ConfigError::NoBombs);
        }
        if bombs >= total {
            return Err(ConfigError::TooManyBombs { bombs, total });
        }
        Ok(Self { total, bombs })
    }

    pub fn for_grid(grid: Grid, bombs: CellCount) -> core::result::Result<Self, ConfigError> {
        Self::new(grid.total_cells(), bombs)
    }

    pub const fn total(&self) -> CellCount {
        self.total
    }

    pub const fn bombs(&self) -> CellCount {
        self.bombs
    }

    pub const fn safe_cells(&self) -> CellCount {
        self.total - self.bombs
    }

    /// Probability that the next pick is safe after `revealed` safe picks.
    pub fn next_safe_probability(&self, revealed: CellCount) -> Option<f64> {
        if revealed >= self.safe_cells() {
            return None;
        }
        let remaining_safe = f64::from(self.safe_cells() - revealed);
        let remaining = f64::from(self.total - revealed);
        Some(remaining_safe / remaining)
    }

    /// Probability of surviving `revealed` consecutive picks from a fresh board.
    pub fn survival_probability(&self, revealed: CellCount) -> Option<f64> {
        self.fair_multiplier(revealed).map(|multiplier| 1.0 / multiplier)
    }

    /// Fair multiplier after `revealed` safe picks, `None` past the number of safe cells.
    pub fn fair_multiplier(&self, revealed: CellCount) -> Option<f64> {
        if revealed > self.safe_cells() {
            return None;
        }
        let multiplier = (0..revealed)
            .map(|i| f64::from(self.total - i) / f64::from(self.safe_cells() - i))
            .product();
        Some(multiplier)
    }

    pub fn max_multiplier(&self) -> f64 {
        self.fair_multiplier(self.safe_cells()).unwrap_or(1.0)
    }

    /// Multiplier actually paid after `revealed` safe picks with `edge` retained by the
    /// house. Never below `1.0` once anything has been revealed.
    pub fn payout_multiplier(&self, revealed: CellCount, edge: HouseEdge) -> Option<f64> {
        let fair = self.fair_multiplier(revealed)?;
        if revealed == 0 {
            return Some(1.0);
        }
        Some(edge.apply(fair).max(1.0))
    }

    /// Amount paid for `stake` after `revealed` safe picks: `stake` times the fair
    /// multiplier less the edge, rounded down and never below `stake`.
    ///
    /// `None` past the number of safe cells or when the amount does not fit in [`Amount`].
    pub fn payout(&self, stake: Amount, revealed: CellCount, edge: HouseEdge) -> Option<Amount> {
        if revealed > self.safe_cells() {
            return None;
        }
        if revealed == 0 {
            return Some(stake);
        }
        let (numer, denom) = (0..revealed).fold(
            (BigUint::from(stake), BigUint::from(1u32)),
            |(numer, denom), i| (numer * (self.total - i), denom * (self.safe_cells() - i)),
        );
        let amount = numer * edge.player_share() / (denom * EDGE_SCALE);
        amount.to_u64().map(|amount| amount.max(stake))
    }
}

/// Fair multiplier for `revealed` safe picks, `None` when the inputs do not describe a
/// playable board.
pub fn fair_multiplier(total: CellCount, bombs: CellCount, revealed: CellCount) -> Option<f64> {
    Odds::new(total, bombs).ok()?.fair_multiplier(revealed)
}

/// Resolution of [`HouseEdge`]: parts per million.
pub const EDGE_SCALE: u32 = 1_000_000;

/// Share of the fair payout kept by the house, as a fraction in `[0, 1]` held to
/// [`EDGE_SCALE`] resolution.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct HouseEdge {
    ppm: u32,
}

impl HouseEdge {
    pub const FAIR: Self = Self { ppm: 0 };

    pub fn new(fraction: f64) -> core::result::Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ConfigError::InvalidHouseEdge(fraction));
        }
        // non-negative, so the cast rounds to nearest
        let ppm = (fraction * f64::from(EDGE_SCALE) + 0.5) as u32;
        Ok(Self { ppm })
    }

    pub fn from_percent(percent: f64) -> core::result::Result<Self, ConfigError> {
        Self::new(percent / 100.0).map_err(|_| ConfigError::InvalidHouseEdge(percent))
    }

    pub fn from_ppm(ppm: u32) -> core::result::Result<Self, ConfigError> {
        if ppm > EDGE_SCALE {
            return Err(ConfigError::InvalidHouseEdge(
                f64::from(ppm) / f64::from(EDGE_SCALE),
            ));
        }
        Ok(Self { ppm })
    }

    pub const fn ppm(self) -> u32 {
        self.ppm
    }

    pub fn fraction(self) -> f64 {
        f64::from(self.ppm) / f64::from(EDGE_SCALE)
    }

    pub const fn is_fair(self) -> bool {
        self.ppm == 0
    }

    pub fn apply(self, fair_multiplier: f64) -> f64 {
        fair_multiplier * f64::from(self.player_share()) / f64::from(EDGE_SCALE)
    }

    /// What the player keeps, in parts per million.
    const fn player_share(self) -> u32 {
        EDGE_SCALE - self.ppm
    }
}

impl TryFrom<f64> for HouseEdge {
    type Error = ConfigError;

    fn try_from(fraction: f64) -> core::result::Result<Self, Self::Error> {
        Self::new(fraction)
    }
}

impl From<HouseEdge> for f64 {
    fn from(edge: HouseEdge) -> Self {
        edge.fraction()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        let diff = if a > b { a - b } else { b - a };
        diff <= 1e-9 * b.max(1.0)
    }

    #[test]
    fn no_reveals_is_even_money() {
        for (total, bombs) in [(25, 1), (25, 5), (25, 24), (9, 3), (2, 1)] {
            assert_eq!(fair_multiplier(total, bombs, 0), Some(1.0));
        }
    }

    #[test]
    fn strictly_increasing() {
        for (total, bombs) in [(25, 1), (25, 5), (36, 10), (9, 8)] {
            let odds = Odds::new(total, bombs).unwrap();
            let mut previous = 0.0;
            for k in 0..=odds.safe_cells() {
                let multiplier = odds.fair_multiplier(k).unwrap();
                assert!(multiplier > previous, "({total}, {bombs}) at k={k}");
                previous = multiplier;
            }
        }
    }

    #[test]
    fn full_clear_matches_binomial() {
        // C(n, n - b) / C(b, 0)
        assert!(close(fair_multiplier(25, 5, 20).unwrap(), 53_130.0));
        assert!(close(fair_multiplier(9, 1, 8).unwrap(), 9.0));
        assert!(close(fair_multiplier(16, 3, 13).unwrap(), 560.0));
        assert!(close(fair_multiplier(25, 24, 1).unwrap(), 25.0));
    }

    #[test]
    fn three_reveals_on_default_board() {
        let multiplier = fair_multiplier(25, 5, 3).unwrap();
        assert!(close(multiplier, 115.0 / 57.0));

        let odds = Odds::new(25, 5).unwrap();
        assert_eq!(odds.payout(1_000, 3, HouseEdge::FAIR), Some(2_017));
        assert_eq!(odds.payout(1_000, 0, HouseEdge::FAIR), Some(1_000));
        assert_eq!(odds.payout(1_000, 21, HouseEdge::FAIR), None);
    }

    fn binomial(n: u128, k: u128) -> u128 {
        (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
    }

    #[test]
    fn full_clear_pays_stake_times_binomial() {
        // (8, 1) and (7, 2) land just below the whole number in floating point
        for total in 2..=36u16 {
            for bombs in 1..total.min(8) {
                let odds = Odds::new(total, bombs).unwrap();
                let exact = binomial(u128::from(total), u128::from(bombs));
                for stake in [1, 3, 7, 10, 100, 1_000] {
                    assert_eq!(
                        odds.payout(stake, odds.safe_cells(), HouseEdge::FAIR),
                        Some((u128::from(stake) * exact) as Amount),
                        "({total}, {bombs}) stake {stake}"
                    );
                }
            }
        }
    }

    #[test]
    fn stakes_beyond_float_precision_are_exact() {
        let odds = Odds::new(8, 1).unwrap();
        let stake = (1 << 53) + 1;

        assert_eq!(odds.payout(stake, 7, HouseEdge::FAIR), Some(8 * stake));
        assert_eq!(odds.payout(Amount::MAX, 7, HouseEdge::FAIR), None);
        assert_eq!(odds.payout(Amount::MAX, 0, HouseEdge::FAIR), Some(Amount::MAX));
    }

    #[test]
    fn edge_payout_rounds_down_once() {
        let odds = Odds::new(25, 5).unwrap();
        let edge = HouseEdge::from_percent(1.0).unwrap();

        // 1000 * 115 / 57 * 0.99 = 1997.37
        assert_eq!(odds.payout(1_000, 3, edge), Some(1_997));
        // 25 / 24 * 0.95 < 1, clamped to the stake
        let single = Odds::new(25, 1).unwrap();
        assert_eq!(single.payout(1_000, 1, HouseEdge::new(0.05).unwrap()), Some(1_000));
        assert_eq!(odds.payout(1_000, 3, HouseEdge::new(1.0).unwrap()), Some(1_000));
    }

    #[test]
    fn past_the_safe_cells_is_invalid() {
        assert_eq!(fair_multiplier(25, 5, 21), None);
        assert_eq!(fair_multiplier(5, 5, 0), None);
        assert_eq!(fair_multiplier(5, 0, 0), None);
    }

    #[test]
    fn survival_is_inverse_of_fair_multiplier() {
        let odds = Odds::new(25, 5).unwrap();
        let survival = odds.survival_probability(2).unwrap();
        assert!(close(survival, (20.0 / 25.0) * (19.0 / 24.0)));
        assert!(close(odds.next_safe_probability(2).unwrap(), 18.0 / 23.0));
        assert_eq!(odds.next_safe_probability(20), None);
    }

    #[test]
    fn edge_applies_once_to_cumulative_value() {
        let odds = Odds::new(25, 5).unwrap();
        let edge = HouseEdge::from_percent(1.0).unwrap();

        let fair = odds.fair_multiplier(4).unwrap();
        let paid = odds.payout_multiplier(4, edge).unwrap();
        assert!(close(paid, fair * 0.99));
        assert_eq!(odds.payout_multiplier(0, edge), Some(1.0));
    }

    #[test]
    fn edge_never_pays_below_stake() {
        let odds = Odds::new(25, 1).unwrap();
        let edge = HouseEdge::new(0.05).unwrap();

        // 25 / 24 * 0.95 < 1
        assert_eq!(odds.payout_multiplier(1, edge), Some(1.0));
        assert!(odds.payout_multiplier(12, edge).unwrap() > 1.0);
    }

    #[test]
    fn house_edge_bounds() {
        assert!(HouseEdge::new(0.0).unwrap().is_fair());
        assert!(HouseEdge::new(1.0).is_ok());
        assert_eq!(HouseEdge::new(1.5), Err(ConfigError::InvalidHouseEdge(1.5)));
        assert!(HouseEdge::new(f64::NAN).is_err());
        assert_eq!(HouseEdge::from_percent(2.5).unwrap().ppm(), 25_000);
        assert_eq!(HouseEdge::from_ppm(10_000).unwrap().fraction(), 0.01);
        assert!(HouseEdge::from_ppm(EDGE_SCALE + 1).is_err());
        assert_eq!(
            HouseEdge::from_percent(-1.0),
            Err(ConfigError::InvalidHouseEdge(-1.0))
        );
    }
}
