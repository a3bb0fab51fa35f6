//! In-silico PCR over a flat DNA index
//!
//! The reverse primer is reverse-complemented so both primers read along the
//! forward strand. Every pair of tile hits that places a product of an
//! acceptable length inside one source is recorded, and overlapping products
//! of the same source are merged.

use crate::clump::Clump;
use crate::error::{GenoFindError, GfResult};
use crate::index::{GenoFind, IndexLayout};
use crate::tile::{dna_tile, reverse_complement, Alphabet};
use crate::types::{GenomicPos, Offset};
use std::collections::BTreeMap;

/// Disjoint half-open intervals keyed by start
#[derive(Debug, Default)]
struct MergedIntervals {
    spans: BTreeMap<GenomicPos, GenomicPos>,
}

impl MergedIntervals {
    /// Insert `[start, end)`, absorbing every interval it overlaps.
    fn add(&mut self, mut start: GenomicPos, mut end: GenomicPos) {
        let overlapping: Vec<(GenomicPos, GenomicPos)> = self
            .spans
            .range(..end)
            .rev()
            .take_while(|&(_, &e)| e > start)
            .map(|(&s, &e)| (s, e))
            .collect();
        for (s, e) in overlapping {
            self.spans.remove(&s);
            start = start.min(s);
            end = end.max(e);
        }
        self.spans.insert(start, end);
    }

    fn iter(&self) -> impl Iterator<Item = (GenomicPos, GenomicPos)> + '_ {
        self.spans.iter().map(|(&s, &e)| (s, e))
    }
}

/// Primer start (or end) positions implied by each tile hit
fn anchored<O: Offset>(list: &[O], tile_offset: usize, shift: u64, out: &mut Vec<GenomicPos>) {
    for &pos in list {
        let pos = pos.to_u64();
        if pos >= tile_offset as u64 {
            out.push(pos - tile_offset as u64 + shift);
        }
    }
}

/// Candidate products of a primer pair as hit-less clumps in global
/// coordinates, ordered by source then start.
pub fn find_primer_pairs<O: Offset>(
    index: &GenoFind<O>,
    forward: &[u8],
    reverse: &[u8],
    min_distance: u64,
    max_distance: u64,
) -> GfResult<Vec<Clump>> {
    let tables = match index.layout() {
        _ if index.alphabet() != Alphabet::Dna => {
            return Err(GenoFindError::config(
                "PCR needs a DNA index, not a protein or translated one",
            ))
        }
        IndexLayout::Flat(tables) => tables,
        IndexLayout::Segmented(_) => {
            return Err(GenoFindError::config(format!(
                "PCR is not supported with tile size {}",
                index.tile_size()
            )))
        }
    };
    let tile_size = index.tile_size();
    let forward = forward.to_ascii_lowercase();
    let reverse = reverse_complement(&reverse.to_ascii_lowercase());

    let mut rev_tiles = Vec::new();
    if reverse.len() >= tile_size {
        for window in reverse.windows(tile_size) {
            let tile = dna_tile(window).ok_or_else(|| {
                GenoFindError::InvalidSequence(format!(
                    "bad character in reverse primer {}",
                    String::from_utf8_lossy(&reverse)
                ))
            })?;
            rev_tiles.push(tile);
        }
    }

    let mut starts = Vec::new();
    if forward.len() >= tile_size {
        for (offset, window) in forward.windows(tile_size).enumerate() {
            if let Some(tile) = dna_tile(window) {
                anchored(tables.list(tile), offset, 0, &mut starts);
            }
        }
    }
    let mut ends = Vec::new();
    let rev_len = reverse.len() as u64;
    for (offset, &tile) in rev_tiles.iter().enumerate() {
        anchored(tables.list(tile), offset, rev_len, &mut ends);
    }
    starts.sort_unstable();
    starts.dedup();
    ends.sort_unstable();
    ends.dedup();

    let mut products: BTreeMap<usize, MergedIntervals> = BTreeMap::new();
    for &start in &starts {
        let lo = start.saturating_add(min_distance.max(1));
        let hi = start.saturating_add(max_distance);
        let from = ends.partition_point(|&e| e < lo);
        let to = ends.partition_point(|&e| e <= hi);
        if from >= to {
            continue;
        }
        let Some(source) = index.sources().position(start) else {
            continue;
        };
        let src_end = index.sources().as_slice()[source].end;
        for &end in ends[from..to].iter().take_while(|&&e| e <= src_end) {
            products.entry(source).or_default().add(start, end);
        }
    }

    let clumps: Vec<Clump> = products
        .iter()
        .flat_map(|(&source, spans)| spans.iter().map(move |(s, e)| Clump::span(source, s, e)))
        .collect();
    log::debug!(
        "PCR: {} forward and {} reverse anchors, {} products",
        starts.len(),
        ends.len(),
        clumps.len()
    );
    Ok(clumps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexParams;
    use crate::testing::random_dna;

    /// 1000 bases with a 220 base product at 100..320
    fn template() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let seq = random_dna(11, 1000);
        let forward = seq[100..120].to_vec();
        let reverse = reverse_complement(&seq[300..320]);
        (seq, forward, reverse)
    }

    fn index(seqs: Vec<(String, Vec<u8>)>) -> GenoFind {
        GenoFind::from_sequences(IndexParams::dna(10), seqs).unwrap()
    }

    #[test]
    fn product_spans_both_primers() {
        let (seq, fwd, rev) = template();
        let idx = index(vec![("chr1".into(), seq)]);
        let clumps = idx.find_primer_pairs(&fwd, &rev, 150, 250).unwrap();
        assert_eq!(clumps.len(), 1);
        assert_eq!((clumps[0].t_start, clumps[0].t_end), (100, 320));
        assert_eq!(clumps[0].source, 0);
        assert!(clumps[0].hits.is_empty());
    }

    #[test]
    fn distance_window_is_enforced() {
        let (seq, fwd, rev) = template();
        let idx = index(vec![("chr1".into(), seq)]);
        assert!(idx.find_primer_pairs(&fwd, &rev, 250, 400).unwrap().is_empty());
        assert!(idx.find_primer_pairs(&fwd, &rev, 10, 200).unwrap().is_empty());
    }

    #[test]
    fn product_must_stay_in_one_source() {
        let (seq, fwd, rev) = template();
        let idx = index(vec![
            ("left".into(), seq[..200].to_vec()),
            ("right".into(), seq[200..].to_vec()),
        ]);
        assert!(idx.find_primer_pairs(&fwd, &rev, 150, 250).unwrap().is_empty());
    }

    #[test]
    fn bad_reverse_primer_is_an_error() {
        let (seq, fwd, _) = template();
        let idx = index(vec![("chr1".into(), seq)]);
        let err = idx
            .find_primer_pairs(&fwd, b"acgtacgtnnacgtacgtac", 150, 250)
            .unwrap_err();
        assert!(matches!(err, GenoFindError::InvalidSequence(_)));
    }

    #[test]
    fn segmented_and_protein_indexes_are_rejected() {
        let seg: GenoFind =
            GenoFind::from_sequences(IndexParams::dna(14), vec![("s".into(), random_dna(3, 100))])
                .unwrap();
        assert!(matches!(
            seg.find_primer_pairs(b"acgtacgtacgtacgt", b"acgtacgtacgtacgt", 10, 50),
            Err(GenoFindError::Config(_))
        ));
        let pep: GenoFind = GenoFind::from_sequences(
            IndexParams::protein(4),
            vec![("p".into(), b"MKVLAWHRDE".to_vec())],
        )
        .unwrap();
        assert!(matches!(
            pep.find_primer_pairs(b"acgtacgt", b"acgtacgt", 10, 50),
            Err(GenoFindError::Config(_))
        ));
    }

    #[test]
    fn overlapping_intervals_merge() {
        let mut m = MergedIntervals::default();
        m.add(10, 20);
        m.add(30, 40);
        m.add(20, 30);
        assert_eq!(m.iter().count(), 3);
        m.add(15, 35);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![(10, 40)]);
        m.add(0, 5);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![(0, 5), (10, 40)]);
    }
}
