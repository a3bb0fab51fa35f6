#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reproducible random lower-case DNA
pub fn random_dna(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| b"acgt"[rng.gen_range(0..4)]).collect()
}

pub fn named(name: &str, seq: Vec<u8>) -> (String, Vec<u8>) {
    (name.to_string(), seq)
}

/// Write `records` as a FASTA file
pub fn write_fasta(path: &std::path::Path, records: &[(&str, &[u8])]) {
    let mut text = String::new();
    for (name, seq) in records {
        text.push('>');
        text.push_str(name);
        text.push('\n');
        for line in seq.chunks(60) {
            text.push_str(std::str::from_utf8(line).unwrap());
            text.push('\n');
        }
    }
    std::fs::write(path, text).unwrap();
}
