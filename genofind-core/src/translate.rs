//! DNA to protein translation with the standard genetic code

use crate::tile::{reverse_complement, Alphabet};
use crate::types::Strand;

/// Standard code indexed by `16*b1 + 4*b2 + b3` with T=0, C=1, A=2, G=3
const STANDARD_CODE: &[u8; 64] =
    b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

/// Amino acid for one codon; `X` if any base is not A, C, G or T.
#[inline]
pub fn lookup_codon(codon: &[u8]) -> u8 {
    let mut index = 0usize;
    for &base in &codon[..3] {
        match Alphabet::Dna.symbol_value(base) {
            Some(v) => index = index * 4 + v as usize,
            None => return b'X',
        }
    }
    STANDARD_CODE[index]
}

/// Translate `dna` starting at `frame` (0, 1 or 2). Trailing partial codons
/// are dropped.
pub fn translate_frame(dna: &[u8], frame: usize) -> Vec<u8> {
    if frame >= dna.len() {
        return Vec::new();
    }
    dna[frame..].chunks_exact(3).map(lookup_codon).collect()
}

/// Three forward or three reverse frames of `dna`
pub fn translate_strand(dna: &[u8], strand: Strand) -> [Vec<u8>; 3] {
    let oriented;
    let seq = match strand {
        Strand::Forward => dna,
        Strand::Reverse => {
            oriented = reverse_complement(dna);
            &oriented[..]
        }
    };
    [
        translate_frame(seq, 0),
        translate_frame(seq, 1),
        translate_frame(seq, 2),
    ]
}

/// Replace soft-masked (lower-case) bases with `N` so their codons translate
/// to `X`. Unmasked bases come back lower-case.
pub fn mask_repeats_to_n(dna: &mut [u8]) {
    for base in dna.iter_mut() {
        *base = if base.is_ascii_lowercase() {
            b'N'
        } else {
            base.to_ascii_lowercase()
        };
    }
}
