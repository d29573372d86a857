use crate::*;
pub use secure::*;
pub use seeded::*;

mod secure;
mod seeded;

/// Layout drawn for a round, with the commitment a player can later check it against.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledLayout {
    pub layout: BombLayout,
    pub commitment: Option<Commitment>,
}

/// Where bomb layouts come from.
pub trait FairnessSource {
    /// Draws the layout for the next round. Must not consume per-round state, since the
    /// round may still be refused by the wallet; see [`FairnessSource::advance`].
    fn sample(&mut self, grid: Grid, bombs: CellCount) -> core::result::Result<SampledLayout, FairnessError>;

    /// Called once the sampled round has actually started.
    fn advance(&mut self) {}

    /// Replaces seed state for upcoming rounds, returning the retired seeds if the source
    /// had any to reveal.
    fn reseed(&mut self, _material: SeedMaterial) -> Option<Seeds> {
        None
    }
}

impl<F: FairnessSource + ?Sized> FairnessSource for &mut F {
    fn sample(&mut self, grid: Grid, bombs: CellCount) -> core::result::Result<SampledLayout, FairnessError> {
        (**self).sample(grid, bombs)
    }

    fn advance(&mut self) {
        (**self).advance()
    }

    fn reseed(&mut self, material: SeedMaterial) -> Option<Seeds> {
        (**self).reseed(material)
    }
}

/// One-shot layout sampling: uniform from the operating system when `seeds` is `None`,
/// otherwise the provably fair layout those seeds determine.
pub fn sample_layout(
    grid: Grid,
    bombs: CellCount,
    seeds: Option<&Seeds>,
) -> core::result::Result<BombLayout, FairnessError> {
    match seeds {
        Some(seeds) => seeds.layout(grid, bombs),
        None => SecureSource::new().draw(grid, bombs),
    }
}
