use alloc::string::ToString;
use alloc::vec::Vec;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::*;

/// Uniform sampling over every `C(total, bombs)` layout, keyed from a cryptographic
/// entropy source. Entropy failures are reported, never papered over.
#[derive(Clone, Debug, Default)]
pub struct SecureSource<R = OsRng> {
    entropy: R,
}

impl SecureSource<OsRng> {
    pub fn new() -> Self {
        Self { entropy: OsRng }
    }
}

impl<R: RngCore + CryptoRng> SecureSource<R> {
    pub fn with_entropy(entropy: R) -> Self {
        Self { entropy }
    }

    pub fn draw(&mut self, grid: Grid, bombs: CellCount) -> core::result::Result<BombLayout, FairnessError> {
        grid.check_bombs(bombs)?;

        let mut key = <ChaCha20Rng as SeedableRng>::Seed::default();
        self.entropy.try_fill_bytes(&mut key).map_err(|err| {
            log::error!("Entropy source failed, refusing to place bombs: {err}");
            FairnessError::EntropyUnavailable(err.to_string())
        })?;
        let mut stream = ChaCha20Rng::from_seed(key);

        // sampling without replacement, uniform over subsets
        let picks: Vec<CellIndex> = rand::seq::index::sample(
            &mut stream,
            grid.total_cells().into(),
            bombs.into(),
        )
        .iter()
        .filter_map(|index| CellIndex::try_from(index).ok())
        .collect();

        Ok(BombLayout::from_indices(grid, &picks)?)
    }
}

impl<R: RngCore + CryptoRng> FairnessSource for SecureSource<R> {
    fn sample(&mut self, grid: Grid, bombs: CellCount) -> core::result::Result<SampledLayout, FairnessError> {
        Ok(SampledLayout {
            layout: self.draw(grid, bombs)?,
            commitment: None,
        })
    }
}
