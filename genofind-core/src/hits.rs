//! Hit finding
//!
//! Every query position is looked up in the index; the algorithm depends on
//! the layout and on whether one substitution per tile is tolerated. Hits
//! are reported in the global coordinate space of the index.

use crate::index::{FlatTables, GenoFind, IndexLayout, SegmentedTables};
use crate::mask::SoftMask;
use crate::source::Source;
use crate::tile::{Alphabet, RollingDnaTile, TileShape};
use crate::types::{GenomicPos, Offset};
use std::fmt;

/// One query tile matching one indexed tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hit {
    pub q_start: usize,
    pub t_start: GenomicPos,
    /// `t_start + query_len - q_start`; co-linear hits share a diagonal
    pub diagonal: GenomicPos,
}

impl Hit {
    #[inline]
    pub fn new(q_start: usize, t_start: GenomicPos, query_len: usize) -> Self {
        Self {
            q_start,
            t_start,
            diagonal: t_start + (query_len - q_start) as u64,
        }
    }
}

/// Half-open global range `[t_min, t_max)`. Built from one source, it never
/// extends past that source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetRegion {
    pub t_min: GenomicPos,
    pub t_max: GenomicPos,
}

impl TargetRegion {
    /// Region from source-local bounds, clipped to the source
    pub fn within(src: &Source, t_min: GenomicPos, t_max: GenomicPos) -> Self {
        let len = src.len();
        Self {
            t_min: src.start + t_min.min(len),
            t_max: src.start + t_max.min(len),
        }
    }

    #[inline]
    pub fn contains(&self, t: GenomicPos) -> bool {
        self.t_min <= t && t < self.t_max
    }
}

/// Hit-finding algorithm, chosen by layout and mismatch tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitMode {
    FlatExact,
    FlatNearMiss,
    SegmentedExact,
    SegmentedNearMiss,
}

impl HitMode {
    pub fn select(segmented: bool, allow_one_mismatch: bool) -> Self {
        match (segmented, allow_one_mismatch) {
            (false, false) => HitMode::FlatExact,
            (false, true) => HitMode::FlatNearMiss,
            (true, false) => HitMode::SegmentedExact,
            (true, true) => HitMode::SegmentedNearMiss,
        }
    }
}

impl fmt::Display for HitMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            HitMode::FlatExact => "flat exact",
            HitMode::FlatNearMiss => "flat near-miss",
            HitMode::SegmentedExact => "segmented exact",
            HitMode::SegmentedNearMiss => "segmented near-miss",
        };
        f.write_str(name)
    }
}

/// Applies the query mask and target restriction to candidate hits
struct Collector<'a> {
    query_len: usize,
    tile_size: usize,
    mask: Option<&'a SoftMask>,
    region: Option<TargetRegion>,
    hits: Vec<Hit>,
}

impl<'a> Collector<'a> {
    /// False if the query window at `q` overlaps a masked base
    #[inline]
    fn usable(&self, q: usize) -> bool {
        self.mask
            .map_or(true, |m| !m.any_in(q, q + self.tile_size))
    }

    #[inline]
    fn push(&mut self, q: usize, t: GenomicPos) {
        if let Some(region) = &self.region {
            if !region.contains(t) {
                return;
            }
        }
        self.hits.push(Hit::new(q, t, self.query_len));
    }

    fn extend<O: Offset>(&mut self, q: usize, offsets: impl Iterator<Item = O>) {
        for t in offsets {
            self.push(q, t.to_u64());
        }
    }
}

/// Find all tile hits of `query`, skipping windows that touch a masked base
/// and, given a region, hits outside it.
pub fn find_hits<O: Offset>(
    index: &GenoFind<O>,
    query: &[u8],
    mask: Option<&SoftMask>,
    region: Option<TargetRegion>,
) -> Vec<Hit> {
    let shape = index.shape();
    let mut collector = Collector {
        query_len: query.len(),
        tile_size: shape.tile_size,
        mask,
        region,
        hits: Vec::new(),
    };
    if query.len() < shape.tile_size {
        return collector.hits;
    }
    match (index.layout(), index.hit_mode()) {
        (IndexLayout::Flat(tables), HitMode::FlatNearMiss) => {
            flat_near_miss(tables, shape, query, &mut collector)
        }
        (IndexLayout::Flat(tables), _) if shape.alphabet == Alphabet::Dna => {
            flat_exact_dna(tables, shape, query, &mut collector)
        }
        (IndexLayout::Flat(tables), _) => flat_exact(tables, shape, query, &mut collector),
        (IndexLayout::Segmented(tables), HitMode::SegmentedNearMiss) => {
            segmented_near_miss(tables, shape, query, &mut collector)
        }
        (IndexLayout::Segmented(tables), _) => {
            segmented_exact(tables, shape, query, &mut collector)
        }
    }
    collector.hits
}

/// Rolling 2-bit window; an invalid base restarts it.
fn flat_exact_dna<O: Offset>(
    tables: &FlatTables<O>,
    shape: &TileShape,
    query: &[u8],
    collector: &mut Collector,
) {
    let mut window = RollingDnaTile::new(shape.tile_size);
    for (i, &base) in query.iter().enumerate() {
        if let Some(tile) = window.push(base) {
            let list = tables.list(tile);
            let q = i + 1 - shape.tile_size;
            if !list.is_empty() && collector.usable(q) {
                collector.extend(q, list.iter().copied());
            }
        }
    }
}

fn flat_exact<O: Offset>(
    tables: &FlatTables<O>,
    shape: &TileShape,
    query: &[u8],
    collector: &mut Collector,
) {
    for q in 0..=query.len() - shape.tile_size {
        if let Some((tile, _)) = shape.split(&query[q..q + shape.tile_size]) {
            let list = tables.list(tile);
            if !list.is_empty() && collector.usable(q) {
                collector.extend(q, list.iter().copied());
            }
        }
    }
}

fn segmented_exact<O: Offset>(
    tables: &SegmentedTables<O>,
    shape: &TileShape,
    query: &[u8],
    collector: &mut Collector,
) {
    for q in 0..=query.len() - shape.tile_size {
        if let Some((head, tail)) = shape.split(&query[q..q + shape.tile_size]) {
            let list = tables.end_list(head);
            if !list.is_empty() && collector.usable(q) {
                collector.extend(q, list.matching(tail));
            }
        }
    }
}

fn flat_near_miss<O: Offset>(
    tables: &FlatTables<O>,
    shape: &TileShape,
    query: &[u8],
    collector: &mut Collector,
) {
    let mut digits = Vec::with_capacity(shape.tile_size);
    for q in 0..=query.len() - shape.tile_size {
        if !collector.usable(q) {
            continue;
        }
        fill_digits(shape.alphabet, &query[q..q + shape.tile_size], &mut digits);
        near_variants(shape, &digits, |tile, _| {
            collector.extend(q, tables.list(tile).iter().copied());
        });
    }
}

fn segmented_near_miss<O: Offset>(
    tables: &SegmentedTables<O>,
    shape: &TileShape,
    query: &[u8],
    collector: &mut Collector,
) {
    let mut digits = Vec::with_capacity(shape.tile_size);
    for q in 0..=query.len() - shape.tile_size {
        if !collector.usable(q) {
            continue;
        }
        fill_digits(shape.alphabet, &query[q..q + shape.tile_size], &mut digits);
        near_variants(shape, &digits, |head, tail| {
            collector.extend(q, tables.end_list(head).matching(tail));
        });
    }
}

fn fill_digits(alphabet: Alphabet, window: &[u8], digits: &mut Vec<Option<u32>>) {
    digits.clear();
    digits.extend(window.iter().map(|&s| alphabet.symbol_value(s)));
}

/// Call `probe(head, tail)` once for every tile within one substitution of
/// `digits`. The unmodified tile is probed only while varying position 0;
/// a single invalid symbol may be substituted, two make the window unusable.
fn near_variants<F>(shape: &TileShape, digits: &[Option<u32>], mut probe: F)
where
    F: FnMut(u32, u16),
{
    let size = shape.alphabet.size();
    let head_size = shape.head_size();
    let invalid = digits.iter().filter(|d| d.is_none()).count();
    if invalid > 1 {
        return;
    }
    for (var_pos, &original) in digits.iter().enumerate() {
        if invalid == 1 && original.is_some() {
            continue;
        }
        let (mut head, mut tail) = (0u32, 0u32);
        for (i, d) in digits.iter().enumerate() {
            let v = if i == var_pos { 0 } else { d.unwrap_or(0) };
            if i < head_size {
                head = head * size + v;
            } else {
                tail = tail * size + v;
            }
        }
        let part_end = if var_pos < head_size {
            head_size
        } else {
            digits.len()
        };
        let pos_mul = size.pow((part_end - 1 - var_pos) as u32);
        let avoid = if var_pos == 0 { None } else { original };
        for v in (0..size).filter(|&v| Some(v) != avoid) {
            if var_pos < head_size {
                probe(head + v * pos_mul, tail as u16);
            } else {
                probe(head, (tail + v * pos_mul) as u16);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexParams;
    use crate::testing::random_dna;
    use std::collections::HashSet;

    fn genome() -> Vec<u8> {
        random_dna(7, 2000)
    }

    fn build(params: IndexParams, seq: Vec<u8>) -> GenoFind {
        GenoFind::from_sequences(params, vec![("chr".to_string(), seq)]).unwrap()
    }

    fn pairs(hits: &[Hit]) -> Vec<(usize, u64)> {
        let mut p: Vec<_> = hits.iter().map(|h| (h.q_start, h.t_start)).collect();
        p.sort_unstable();
        p
    }

    #[test]
    fn exact_hits_on_aligned_tiles() {
        let g = genome();
        let idx = build(IndexParams::dna(11), g.clone());
        let hits = idx.find_hits(&g[500..560], None, None);
        assert_eq!(pairs(&hits), vec![(6, 506), (17, 517), (28, 528), (39, 539)]);
        assert!(hits.iter().all(|h| h.diagonal == 500 + 60));
    }

    #[test]
    fn n_in_query_breaks_window() {
        let g = genome();
        let idx = build(IndexParams::dna(11), g.clone());
        let mut q = g[500..560].to_vec();
        q[20] = b'n';
        let hits = idx.find_hits(&q, None, None);
        assert_eq!(pairs(&hits), vec![(6, 506), (28, 528), (39, 539)]);
    }

    #[test]
    fn masked_windows_are_skipped() {
        let g = genome();
        let idx = build(IndexParams::dna(11), g.clone());
        let mut mask = SoftMask::new(60);
        mask.set(30, true);
        let hits = idx.find_hits(&g[500..560], Some(&mask), None);
        assert_eq!(pairs(&hits), vec![(6, 506), (17, 517), (39, 539)]);
    }

    #[test]
    fn region_restricts_targets() {
        let g = genome();
        let idx = build(IndexParams::dna(11), g.clone());
        let src = idx.sources().get(0).unwrap();
        let region = TargetRegion::within(src, 510, 530);
        let hits = idx.find_hits(&g[500..560], None, Some(region));
        assert_eq!(pairs(&hits), vec![(17, 517), (28, 528)]);
        let clipped = TargetRegion::within(src, 1990, 5000);
        assert_eq!(clipped.t_max, 2000);
    }

    #[test]
    fn region_stays_inside_its_source() {
        let second = Source::new("chr2", 1000, 1500);
        let region = TargetRegion::within(&second, 400, 900);
        assert_eq!((region.t_min, region.t_max), (1400, 1500));
        assert!(region.contains(1499));
        // First base of the next source
        assert!(!region.contains(1500));
        assert!(!region.contains(999));
        let empty = TargetRegion::within(&second, 700, 900);
        assert_eq!(empty.t_min, empty.t_max);
        assert!(!empty.contains(1500));
    }

    #[test]
    fn near_miss_tolerates_one_substitution() {
        let g = genome();
        let mut q = g[506..517].to_vec();
        q[5] = match q[5] {
            b'a' => b'c',
            _ => b'a',
        };
        let exact = build(IndexParams::dna(11), g.clone());
        assert!(exact.find_hits(&q, None, None).is_empty());

        let mut params = IndexParams::dna(11);
        params.allow_one_mismatch = true;
        let near = build(params, g.clone());
        assert_eq!(near.hit_mode(), HitMode::FlatNearMiss);
        let hits = near.find_hits(&q, None, None);
        assert!(hits.iter().any(|h| h.q_start == 0 && h.t_start == 506));
    }

    #[test]
    fn near_miss_reports_exact_tiles_once() {
        let g = genome();
        let mut params = IndexParams::dna(11);
        params.allow_one_mismatch = true;
        let near = build(params, g.clone());
        let exact = build(IndexParams::dna(11), g.clone());
        let q = &g[500..560];
        let near_hits = near.find_hits(q, None, None);
        let unique: HashSet<_> = near_hits.iter().copied().collect();
        assert_eq!(unique.len(), near_hits.len());
        let exact_set: HashSet<_> = exact.find_hits(q, None, None).into_iter().collect();
        assert!(exact_set.is_subset(&unique));
    }

    #[test]
    fn near_variants_cover_every_substitution_once() {
        let shape = TileShape::new(Alphabet::Dna, 6, Some(2)).unwrap();
        let digits: Vec<_> = b"acgtac"
            .iter()
            .map(|&b| Alphabet::Dna.symbol_value(b))
            .collect();
        let mut seen = HashSet::new();
        near_variants(&shape, &digits, |h, t| {
            assert!(seen.insert((h, t)));
        });
        // the tile itself plus three substitutions at each of six positions
        assert_eq!(seen.len(), 1 + 6 * 3);

        let mut with_n = digits.clone();
        with_n[3] = None;
        let mut count = 0;
        near_variants(&shape, &with_n, |_, _| count += 1);
        assert_eq!(count, 4);
    }

    #[test]
    fn segmented_layout_finds_same_hits() {
        // five aligned copies of one tile, overused at max_pat 3
        let mut g = genome();
        let unit = random_dna(8, 11);
        for copy in 0..5 {
            let at = 1210 + copy * 11;
            g[at..at + 11].copy_from_slice(&unit);
        }
        let mut params = IndexParams::dna(11);
        params.max_pat = 3;
        let flat = build(params.clone(), g.clone());
        params.seg_size = Some(3);
        let seg = build(params, g.clone());
        assert_eq!(seg.hit_mode(), HitMode::SegmentedExact);

        let q = &g[1200..1300];
        let flat_hits = flat.find_hits(q, None, None);
        assert_eq!(pairs(&flat_hits), pairs(&seg.find_hits(q, None, None)));
        assert!(flat_hits.iter().all(|h| h.t_start < 1210 || h.t_start >= 1265));
        assert_eq!(
            flat.find_clumps(q, None).unwrap().clumps,
            seg.find_clumps(q, None).unwrap().clumps
        );
    }

    #[test]
    fn protein_exact_hits() {
        let mut params = IndexParams::protein(4);
        params.step_size = 1;
        let idx: GenoFind = GenoFind::from_sequences(
            params,
            vec![("p".to_string(), b"MKVLAWHRDEQ".to_vec())],
        )
        .unwrap();
        let hits = idx.find_hits(b"GLAWHRG", None, None);
        assert_eq!(pairs(&hits), vec![(1, 3), (2, 4)]);
    }

    #[test]
    fn short_query_has_no_hits() {
        let idx = build(IndexParams::dna(11), genome());
        assert!(idx.find_hits(b"acgt", None, None).is_empty());
    }
}
