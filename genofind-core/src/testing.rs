use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reproducible random lower-case DNA
pub fn random_dna(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| b"acgt"[rng.gen_range(0..4)]).collect()
}
