//! Overused tile (`.ooc`) files
//!
//! Format: `u32` signature, `u32` tile size, then one `u32` per overused tile
//! in ascending order. Files from hosts of either endianness are accepted;
//! the signature tells which.

use crate::error::{GenoFindError, GfResult};
use crate::index::build::count_tiles;
use crate::io::fasta;
use crate::tile::{reverse_complement, Alphabet, TileShape};
use crate::translate::translate_strand;
use crate::types::Strand;
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub const OOC_SIG: u32 = 0x584155f2;

/// What the counted sequences are
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OocKind {
    /// DNA, both strands
    Dna,
    /// Protein, as given
    Protein,
    /// DNA translated in three frames on both strands
    Translated,
}

impl OocKind {
    pub fn alphabet(self) -> Alphabet {
        match self {
            OocKind::Dna => Alphabet::Dna,
            OocKind::Protein | OocKind::Translated => Alphabet::Protein,
        }
    }
}

/// Read the tile list of an `.ooc` file built for `tile_size`.
pub fn read_ooc(path: &Path, tile_size: usize) -> GfResult<Vec<u32>> {
    let bytes = std::fs::read(path).map_err(|e| GenoFindError::ooc(path, e.to_string()))?;
    if bytes.len() < 8 || bytes.len() % 4 != 0 {
        return Err(GenoFindError::ooc(
            path,
            format!("truncated file of {} bytes", bytes.len()),
        ));
    }
    let swapped = match LittleEndian::read_u32(&bytes[..4]) {
        OOC_SIG => false,
        sig if sig == OOC_SIG.swap_bytes() => true,
        sig => {
            return Err(GenoFindError::ooc(
                path,
                format!("bad signature {:#x}, not an ooc file", sig),
            ))
        }
    };
    let word = |chunk: &[u8]| {
        if swapped {
            BigEndian::read_u32(chunk)
        } else {
            LittleEndian::read_u32(chunk)
        }
    };
    let file_tile_size = word(&bytes[4..8]) as usize;
    if file_tile_size != tile_size {
        return Err(GenoFindError::ooc(
            path,
            format!(
                "built for tile size {}, index uses {}",
                file_tile_size, tile_size
            ),
        ));
    }
    Ok(bytes[8..].chunks_exact(4).map(word).collect())
}

/// Freeze every tile listed in `path` at `max_pat`. Returns the number of
/// tiles frozen.
pub fn mask_counts(
    path: &Path,
    counts: &mut [u32],
    tile_size: usize,
    max_pat: u32,
) -> GfResult<usize> {
    let tiles = read_ooc(path, tile_size)?;
    let (mut frozen, mut duplicates, mut out_of_range) = (0, 0, 0);
    for tile in tiles {
        match counts.get_mut(tile as usize) {
            None => out_of_range += 1,
            Some(count) if *count == max_pat => duplicates += 1,
            Some(count) => {
                *count = max_pat;
                frozen += 1;
            }
        }
    }
    if duplicates > 0 {
        log::warn!("{} tiles listed more than once in {}", duplicates, path.display());
    }
    if out_of_range > 0 {
        log::warn!(
            "{} tiles in {} are outside the tile space, ignored",
            out_of_range,
            path.display()
        );
    }
    Ok(frozen)
}

/// Write `tiles` (ascending) as an `.ooc` file, replacing `path` atomically.
pub fn write_ooc(path: &Path, tile_size: usize, tiles: &[u32]) -> GfResult<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        writer.write_u32::<LittleEndian>(OOC_SIG)?;
        writer.write_u32::<LittleEndian>(tile_size as u32)?;
        for &tile in tiles {
            writer.write_u32::<LittleEndian>(tile)?;
        }
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| GenoFindError::Io(e.error))?;
    Ok(())
}

/// Tile counter for building `.ooc` files
pub struct OocCounter {
    kind: OocKind,
    shape: TileShape,
    max_pat: u32,
    counts: Vec<u32>,
}

impl OocCounter {
    pub fn new(kind: OocKind, tile_size: usize, max_pat: u32) -> GfResult<Self> {
        let shape = TileShape::new(kind.alphabet(), tile_size, None)?;
        if shape.is_segmented() {
            return Err(GenoFindError::config(format!(
                "can't make overused tile files for tile size {}",
                tile_size
            )));
        }
        if max_pat == 0 {
            return Err(GenoFindError::config("maxPat must be at least 1"));
        }
        Ok(Self {
            kind,
            counts: vec![0; shape.tile_space_size()],
            shape,
            max_pat,
        })
    }

    /// Count non-overlapping tiles of one sequence.
    pub fn add(&mut self, seq: &[u8]) {
        let step = self.shape.tile_size;
        match self.kind {
            OocKind::Dna => {
                count_tiles(&mut self.counts, &self.shape, step, self.max_pat, seq);
                let rc = reverse_complement(seq);
                count_tiles(&mut self.counts, &self.shape, step, self.max_pat, &rc);
            }
            OocKind::Protein => {
                count_tiles(&mut self.counts, &self.shape, step, self.max_pat, seq);
            }
            OocKind::Translated => {
                for strand in [Strand::Forward, Strand::Reverse] {
                    for frame in translate_strand(seq, strand) {
                        count_tiles(&mut self.counts, &self.shape, step, self.max_pat, &frame);
                    }
                }
            }
        }
    }

    /// Tiles that reached the cutoff, ascending
    pub fn overused(&self) -> Vec<u32> {
        self.counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c >= self.max_pat)
            .map(|(tile, _)| tile as u32)
            .collect()
    }

    pub fn write(&self, path: &Path) -> GfResult<usize> {
        let tiles = self.overused();
        write_ooc(path, self.shape.tile_size, &tiles)?;
        Ok(tiles.len())
    }
}

/// Count the tiles of every record in `files` and write the overused ones
/// to `out`. Returns the number written.
pub fn make_ooc<P: AsRef<Path>>(
    out: &Path,
    files: &[P],
    tile_size: usize,
    max_pat: u32,
    kind: OocKind,
) -> GfResult<usize> {
    let mut counter = OocCounter::new(kind, tile_size, max_pat)?;
    for file in files {
        let path = file.as_ref();
        fasta::check_sequence_file(path)?;
        log::info!("Counting {}", path.display());
        fasta::for_each_record(path, |_, seq| {
            counter.add(seq);
            Ok(())
        })?;
    }
    let written = counter.write(out)?;
    log::info!(
        "Wrote {} overused {}-mers to {}",
        written,
        tile_size,
        out.display()
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{dna_tile, pep_tile};
    use std::io::Write as _;

    #[test]
    fn repeated_tiles_are_overused() {
        let mut counter = OocCounter::new(OocKind::Dna, 6, 3).unwrap();
        counter.add(b"gattacgattacgattacccccgg");
        let mut expected = vec![dna_tile(b"gattac").unwrap(), dna_tile(b"gtaatc").unwrap()];
        expected.sort_unstable();
        // both strands carry three aligned copies
        assert_eq!(counter.overused(), expected);
    }

    #[test]
    fn reverse_strand_is_counted() {
        let mut counter = OocCounter::new(OocKind::Dna, 6, 2).unwrap();
        // gtaatc is the reverse complement of gattac
        counter.add(b"gattac");
        counter.add(b"gtaatc");
        let tiles = counter.overused();
        assert!(tiles.contains(&dna_tile(b"gattac").unwrap()));
        assert!(tiles.contains(&dna_tile(b"gtaatc").unwrap()));
    }

    #[test]
    fn protein_counts_one_strand() {
        let mut counter = OocCounter::new(OocKind::Protein, 3, 2).unwrap();
        counter.add(b"MKWMKW");
        assert_eq!(counter.overused(), vec![pep_tile(b"MKW").unwrap()]);
    }

    #[test]
    fn segmented_tile_sizes_are_rejected() {
        assert!(OocCounter::new(OocKind::Dna, 16, 1024).is_err());
        assert!(OocCounter::new(OocKind::Translated, 6, 1024).is_err());
    }

    #[test]
    fn write_then_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("6.ooc");
        write_ooc(&path, 6, &[3, 17, 4095]).unwrap();
        assert_eq!(read_ooc(&path, 6).unwrap(), vec![3, 17, 4095]);

        let mut counts = vec![0u32; 4096];
        assert_eq!(mask_counts(&path, &mut counts, 6, 50).unwrap(), 3);
        assert_eq!(counts[17], 50);
        assert_eq!(counts[18], 0);
    }

    #[test]
    fn big_endian_files_are_read() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for w in [OOC_SIG, 6, 9, 9, 100_000] {
            f.write_all(&w.to_be_bytes()).unwrap();
        }
        f.flush().unwrap();
        assert_eq!(read_ooc(f.path(), 6).unwrap(), vec![9, 9, 100_000]);
        let mut counts = vec![0u32; 4096];
        // duplicate and out of range tiles only warn
        assert_eq!(mask_counts(f.path(), &mut counts, 6, 8).unwrap(), 1);
    }

    #[test]
    fn bad_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("11.ooc");
        write_ooc(&path, 11, &[1]).unwrap();
        assert!(matches!(
            read_ooc(&path, 10),
            Err(GenoFindError::Ooc { .. })
        ));
        std::fs::write(&path, [1u8, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert!(matches!(read_ooc(&path, 11), Err(GenoFindError::Ooc { .. })));
        assert!(read_ooc(&dir.path().join("missing.ooc"), 11).is_err());
    }
}
