//! Tile codec
//!
//! Packs fixed-length windows of DNA (2 bits per base) or protein (base 20)
//! into integer keys. A window holding any symbol outside the alphabet,
//! notably `N` or `X`, has no key.
//!
//! Large tiles are split into an indexed head and a tail that is stored
//! next to every position and compared exactly, which keeps the per-tile
//! tables at a practical size.

use crate::error::{GenoFindError, GfResult};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Base values. T=0, C=1, A=2, G=3 matches the `.ooc` interchange files, and
/// makes the complement of a value `v ^ 2`.
pub const T_BASE_VAL: u32 = 0;
pub const C_BASE_VAL: u32 = 1;
pub const A_BASE_VAL: u32 = 2;
pub const G_BASE_VAL: u32 = 3;

/// Residues in value order
pub const AMINO_ACIDS: &[u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";

const INVALID: u8 = u8::MAX;

static NT_VAL: [u8; 256] = {
    let mut table = [INVALID; 256];
    table[b't' as usize] = T_BASE_VAL as u8;
    table[b'T' as usize] = T_BASE_VAL as u8;
    table[b'c' as usize] = C_BASE_VAL as u8;
    table[b'C' as usize] = C_BASE_VAL as u8;
    table[b'a' as usize] = A_BASE_VAL as u8;
    table[b'A' as usize] = A_BASE_VAL as u8;
    table[b'g' as usize] = G_BASE_VAL as u8;
    table[b'G' as usize] = G_BASE_VAL as u8;
    table
};

static AA_VAL: [u8; 256] = {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < AMINO_ACIDS.len() {
        let upper = AMINO_ACIDS[i];
        table[upper as usize] = i as u8;
        table[upper.to_ascii_lowercase() as usize] = i as u8;
        i += 1;
    }
    table
};

/// Symbol alphabet of an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alphabet {
    #[default]
    Dna,
    Protein,
}

impl Alphabet {
    pub fn size(self) -> u32 {
        match self {
            Alphabet::Dna => 4,
            Alphabet::Protein => 20,
        }
    }

    /// Value of one symbol, case-insensitive
    #[inline]
    pub fn symbol_value(self, symbol: u8) -> Option<u32> {
        let v = match self {
            Alphabet::Dna => NT_VAL[symbol as usize],
            Alphabet::Protein => AA_VAL[symbol as usize],
        };
        (v != INVALID).then_some(v as u32)
    }

    /// Symbol written for a value, lower-case for DNA
    pub fn value_symbol(self, value: u32) -> u8 {
        match self {
            Alphabet::Dna => b"tcag"[value as usize & 3],
            Alphabet::Protein => AMINO_ACIDS[value as usize % 20],
        }
    }

    pub fn tile_size_range(self) -> RangeInclusive<usize> {
        match self {
            Alphabet::Dna => 6..=18,
            Alphabet::Protein => 3..=8,
        }
    }

    /// Largest head that still gets a full flat table
    pub fn max_head_size(self) -> usize {
        match self {
            Alphabet::Dna => 12,
            Alphabet::Protein => 5,
        }
    }

    pub(crate) fn code(self) -> u32 {
        match self {
            Alphabet::Dna => 0,
            Alphabet::Protein => 1,
        }
    }

    pub(crate) fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Alphabet::Dna),
            1 => Some(Alphabet::Protein),
            _ => None,
        }
    }
}

/// Abort with a configuration error unless the tile size suits the alphabet.
pub fn check_tile_size(tile_size: usize, alphabet: Alphabet) -> GfResult<()> {
    let range = alphabet.tile_size_range();
    if range.contains(&tile_size) {
        return Ok(());
    }
    let kind = match alphabet {
        Alphabet::Dna => "DNA",
        Alphabet::Protein => "protein",
    };
    Err(GenoFindError::config(format!(
        "{} tileSize must be between {} and {}, got {}",
        kind,
        range.start(),
        range.end(),
        tile_size
    )))
}

/// Number of distinct keys for `n` symbols
pub fn tile_space_size(n: usize, alphabet: Alphabet) -> usize {
    (alphabet.size() as usize).pow(n as u32)
}

/// Pack `window` into a key. Every symbol of the window is used.
#[inline]
pub fn encode(window: &[u8], alphabet: Alphabet) -> Option<u32> {
    let size = alphabet.size();
    let mut tile = 0u32;
    for &symbol in window {
        tile = tile * size + alphabet.symbol_value(symbol)?;
    }
    Some(tile)
}

#[inline]
pub fn dna_tile(window: &[u8]) -> Option<u32> {
    let mut tile = 0u32;
    for &base in window {
        tile = (tile << 2) | Alphabet::Dna.symbol_value(base)?;
    }
    Some(tile)
}

#[inline]
pub fn pep_tile(window: &[u8]) -> Option<u32> {
    encode(window, Alphabet::Protein)
}

/// Geometry of a possibly segmented tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileShape {
    pub alphabet: Alphabet,
    pub tile_size: usize,
    /// Tail length, zero for the flat layout
    pub seg_size: usize,
}

impl TileShape {
    /// Validate the tile size and pick the segment size. `forced_seg`
    /// overrides the default split.
    pub fn new(alphabet: Alphabet, tile_size: usize, forced_seg: Option<usize>) -> GfResult<Self> {
        check_tile_size(tile_size, alphabet)?;
        let default_seg = tile_size.saturating_sub(alphabet.max_head_size());
        let seg_size = forced_seg.unwrap_or(default_seg);
        if seg_size >= tile_size {
            return Err(GenoFindError::config(format!(
                "segment size {} must be smaller than tile size {}",
                seg_size, tile_size
            )));
        }
        if tile_size - seg_size > alphabet.max_head_size() {
            return Err(GenoFindError::config(format!(
                "segment size {} leaves a head of {} symbols, at most {} fit the tile table",
                seg_size,
                tile_size - seg_size,
                alphabet.max_head_size()
            )));
        }
        if tile_space_size(seg_size, alphabet) > u16::MAX as usize + 1 {
            return Err(GenoFindError::config(format!(
                "segment size {} is too large for 16-bit tails",
                seg_size
            )));
        }
        Ok(Self {
            alphabet,
            tile_size,
            seg_size,
        })
    }

    #[inline]
    pub fn head_size(&self) -> usize {
        self.tile_size - self.seg_size
    }

    #[inline]
    pub fn is_segmented(&self) -> bool {
        self.seg_size > 0
    }

    /// Entries in the per-tile tables
    pub fn tile_space_size(&self) -> usize {
        tile_space_size(self.head_size(), self.alphabet)
    }

    /// Encode a full tile window as (head, tail). The tail is 0 for flat tiles.
    #[inline]
    pub fn split(&self, window: &[u8]) -> Option<(u32, u16)> {
        let head_size = self.head_size();
        let head = encode(&window[..head_size], self.alphabet)?;
        let tail = encode(&window[head_size..self.tile_size], self.alphabet)?;
        Some((head, tail as u16))
    }
}

/// Rolling 2-bit window over DNA that resets on invalid bases
pub struct RollingDnaTile {
    tile_size: usize,
    mask: u32,
    bits: u32,
    valid_run: usize,
}

impl RollingDnaTile {
    pub fn new(tile_size: usize) -> Self {
        debug_assert!(tile_size <= 16);
        let mask = if tile_size >= 16 {
            u32::MAX
        } else {
            (1u32 << (2 * tile_size)) - 1
        };
        Self {
            tile_size,
            mask,
            bits: 0,
            valid_run: 0,
        }
    }

    /// Add one base; returns the tile ending at this base once a full valid
    /// window is available.
    #[inline]
    pub fn push(&mut self, base: u8) -> Option<u32> {
        match Alphabet::Dna.symbol_value(base) {
            Some(v) => {
                self.bits = ((self.bits << 2) | v) & self.mask;
                self.valid_run += 1;
                (self.valid_run >= self.tile_size).then_some(self.bits)
            }
            None => {
                self.reset();
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.bits = 0;
        self.valid_run = 0;
    }
}

/// Tiles made of period one or two symbol repeats, e.g. `aaaa`, `acac`
pub fn simple_repeat_tiles(tile_size: usize, alphabet: Alphabet) -> Vec<u32> {
    let size = alphabet.size();
    let mut tiles = Vec::with_capacity((size * size) as usize);
    for i in 0..size {
        for j in 0..size {
            let mut tile = 0u32;
            for k in 0..tile_size {
                tile = tile * size + if k & 1 == 1 { j } else { i };
            }
            tiles.push(tile);
        }
    }
    tiles
}

/// Complement one base, keeping its case
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        b'U' => b'A',
        b'u' => b'a',
        other => other,
    }
}

pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence.iter().rev().map(|&b| complement(b)).collect()
}
