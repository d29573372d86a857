use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::*;

const DIGEST_LEN: usize = 32;
const WORD_LEN: usize = 4;

/// Everything that determines a provably fair layout. The server seed stays secret
/// until the seeds are rotated; players see its [`Commitment`] up front.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seeds {
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
}

impl Seeds {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
        }
    }

    pub fn commitment(&self) -> Commitment {
        Commitment {
            server_seed_hash: hash_server_seed(&self.server_seed),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
        }
    }

    pub fn stream(&self) -> HashStream<'_> {
        HashStream {
            seeds: self,
            chunk: 0,
            block: [0; DIGEST_LEN],
            offset: DIGEST_LEN,
        }
    }

    /// Scores every cell with one stream word and takes the `bombs` lowest scores.
    pub fn layout(&self, grid: Grid, bombs: CellCount) -> core::result::Result<BombLayout, FairnessError> {
        grid.check_bombs(bombs)?;

        let mut scored: Vec<(u32, CellIndex)> = self.stream().zip(0..grid.total_cells()).collect();
        // ties keep index order, same as a stable sort on the score alone
        scored.sort_unstable();

        let picks: Vec<CellIndex> = scored
            .iter()
            .take(bombs.into())
            .map(|&(_, index)| index)
            .collect();
        Ok(BombLayout::from_indices(grid, &picks)?)
    }
}

/// Published before a round: the server seed hash plus the public inputs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commitment {
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
}

impl Commitment {
    pub fn matches(&self, seeds: &Seeds) -> bool {
        self.nonce == seeds.nonce
            && self.client_seed == seeds.client_seed
            && self.server_seed_hash == hash_server_seed(&seeds.server_seed)
    }
}

/// Hex SHA-256 of the server seed.
pub fn hash_server_seed(server_seed: &str) -> String {
    hex::encode(Sha256::digest(server_seed.as_bytes()))
}

/// Checks a finished round: the revealed seeds must match what was committed, and must
/// reproduce the layout that was played.
pub fn verify_layout(commitment: &Commitment, seeds: &Seeds, played: &BombLayout) -> bool {
    if !commitment.matches(seeds) {
        return false;
    }
    match seeds.layout(played.grid(), played.bomb_count()) {
        Ok(layout) => layout == *played,
        Err(_) => false,
    }
}

/// Normalizes a stream word to `[0, 1)`.
pub fn to_unit_interval(word: u32) -> f64 {
    f64::from(word) / 4_294_967_296.0
}

/// Endless stream of big-endian `u32` words cut from
/// `sha256("{server}|{client}|{nonce}|chunk:{n}")` for `n = 0, 1, ...`.
#[derive(Clone, Debug)]
pub struct HashStream<'a> {
    seeds: &'a Seeds,
    chunk: u64,
    block: [u8; DIGEST_LEN],
    offset: usize,
}

impl HashStream<'_> {
    pub fn unit_values(self) -> impl Iterator<Item = f64> {
        self.map(to_unit_interval)
    }

    fn refill(&mut self) {
        let message = format!(
            "{}|{}|{}|chunk:{}",
            self.seeds.server_seed, self.seeds.client_seed, self.seeds.nonce, self.chunk
        );
        self.block = Sha256::digest(message.as_bytes()).into();
        self.chunk += 1;
        self.offset = 0;
    }
}

impl Iterator for HashStream<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset + WORD_LEN > DIGEST_LEN {
            self.refill();
        }
        let bytes = &self.block[self.offset..self.offset + WORD_LEN];
        self.offset += WORD_LEN;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Seeds for the next rotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedMaterial {
    pub server_seed: String,
    pub client_seed: String,
}

impl SeedMaterial {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>) -> Self {
        Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
        }
    }

    /// Fresh 256-bit server seed from the operating system.
    pub fn generate(client_seed: impl Into<String>) -> core::result::Result<Self, FairnessError> {
        Self::generate_with(&mut OsRng, client_seed)
    }

    pub fn generate_with<R: RngCore + CryptoRng>(
        entropy: &mut R,
        client_seed: impl Into<String>,
    ) -> core::result::Result<Self, FairnessError> {
        let mut server_seed = [0u8; DIGEST_LEN];
        entropy
            .try_fill_bytes(&mut server_seed)
            .map_err(|err| FairnessError::EntropyUnavailable(err.to_string()))?;
        Ok(Self::new(hex::encode(server_seed), client_seed))
    }
}

/// Provably fair layouts from a server/client seed pair. The nonce moves forward once
/// per started round and restarts at zero whenever the seeds are rotated.
#[derive(Clone, Debug)]
pub struct SeededSource {
    seeds: Seeds,
}

impl SeededSource {
    pub fn new(material: SeedMaterial) -> Self {
        Self::resume(Seeds::new(material.server_seed, material.client_seed, 0))
    }

    /// Continues from previously persisted seeds.
    pub fn resume(seeds: Seeds) -> Self {
        Self { seeds }
    }

    pub fn commitment(&self) -> Commitment {
        self.seeds.commitment()
    }

    pub fn client_seed(&self) -> &str {
        &self.seeds.client_seed
    }

    pub fn nonce(&self) -> u64 {
        self.seeds.nonce
    }
}

impl FairnessSource for SeededSource {
    fn sample(&mut self, grid: Grid, bombs: CellCount) -> core::result::Result<SampledLayout, FairnessError> {
        Ok(SampledLayout {
            layout: self.seeds.layout(grid, bombs)?,
            commitment: Some(self.seeds.commitment()),
        })
    }

    fn advance(&mut self) {
        self.seeds.nonce += 1;
    }

    fn reseed(&mut self, material: SeedMaterial) -> Option<Seeds> {
        let next = Seeds::new(material.server_seed, material.client_seed, 0);
        log::info!(
            "Rotating seeds, next server seed hash {}",
            hash_server_seed(&next.server_seed)
        );
        Some(core::mem::replace(&mut self.seeds, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn demo() -> Seeds {
        Seeds::new("demo", "demo", 0)
    }

    #[test]
    fn stream_matches_sha256_words() {
        let seeds = demo();
        let words: Vec<u32> = seeds.stream().take(3).collect();

        // sha256("demo|demo|0|chunk:0") = c21c0fd6 640c9379 e640bd7d ...
        assert_eq!(words, vec![0xc21c_0fd6, 1_678_545_785, 3_863_002_493]);
    }

    #[test]
    fn stream_crosses_chunk_boundaries() {
        let seeds = demo();
        let words: Vec<u32> = seeds.stream().take(17).collect();

        assert_eq!(words.len(), 17);
        assert_ne!(words[0], words[8]);
        assert_ne!(words[8], words[16]);
    }

    #[test]
    fn unit_values_stay_below_one() {
        assert_eq!(to_unit_interval(0), 0.0);
        assert!(to_unit_interval(u32::MAX) < 1.0);
        assert!(demo().stream().unit_values().take(64).all(|u| (0.0..1.0).contains(&u)));
    }

    #[test]
    fn known_layouts() {
        let grid = Grid::square(5).unwrap();

        assert_eq!(demo().layout(grid, 5).unwrap().indices(), vec![4, 7, 9, 10, 24]);
        assert_eq!(
            Seeds::new("demo", "demo", 1).layout(grid, 5).unwrap().indices(),
            vec![1, 4, 8, 20, 22]
        );
        assert_eq!(
            Seeds::new("server-seed", "player-1", 7).layout(grid, 3).unwrap().indices(),
            vec![0, 2, 9]
        );
        assert_eq!(
            demo().layout(Grid::square(3).unwrap(), 1).unwrap().indices(),
            vec![7]
        );
    }

    #[test]
    fn commitment_is_hex_sha256_of_server_seed() {
        let commitment = demo().commitment();

        assert_eq!(
            commitment.server_seed_hash,
            "2a97516c354b68848cdbd8f54a226a0a55b21ed138e207ad6c5cbb9c00aa5aea"
        );
        assert!(commitment.matches(&demo()));
        assert!(!commitment.matches(&Seeds::new("other", "demo", 0)));
        assert!(!commitment.matches(&Seeds::new("demo", "demo", 1)));
    }

    #[test]
    fn verify_accepts_played_layout_only() {
        let grid = Grid::square(5).unwrap();
        let seeds = demo();
        let commitment = seeds.commitment();
        let played = seeds.layout(grid, 5).unwrap();
        let forged = BombLayout::from_indices(grid, &[0, 1, 2, 3, 4]).unwrap();

        assert!(verify_layout(&commitment, &seeds, &played));
        assert!(!verify_layout(&commitment, &seeds, &forged));
        assert!(!verify_layout(&commitment, &Seeds::new("x", "demo", 0), &played));
    }

    #[test]
    fn source_advances_nonce_only_when_told() {
        let grid = Grid::square(5).unwrap();
        let mut source = SeededSource::new(SeedMaterial::new("demo", "demo"));

        let first = source.sample(grid, 5).unwrap();
        let again = source.sample(grid, 5).unwrap();
        assert_eq!(first, again);
        assert_eq!(first.commitment.as_ref().map(|c| c.nonce), Some(0));

        source.advance();
        let next = source.sample(grid, 5).unwrap();
        assert_eq!(next.layout.indices(), vec![1, 4, 8, 20, 22]);
        assert_eq!(source.nonce(), 1);
    }

    #[test]
    fn reseed_reveals_retired_seeds() {
        let mut source = SeededSource::new(SeedMaterial::new("demo", "demo"));
        source.advance();
        source.advance();

        let retired = source.reseed(SeedMaterial::new("fresh", "player")).unwrap();

        assert_eq!(retired, Seeds::new("demo", "demo", 2));
        assert_eq!(source.nonce(), 0);
        assert_eq!(source.client_seed(), "player");
        assert_eq!(source.commitment().server_seed_hash, hash_server_seed("fresh"));
    }

    #[test]
    fn generated_material_is_hex() {
        use rand::SeedableRng;
        let mut entropy = rand_chacha::ChaCha20Rng::seed_from_u64(3);

        let material = SeedMaterial::generate_with(&mut entropy, "me").unwrap();
        assert_eq!(material.server_seed.len(), 64);
        assert!(material.server_seed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(material.client_seed, "me");
    }
}
