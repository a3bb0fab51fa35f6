//! The genoFind index
//!
//! An index maps every tile value (or tile head, for the segmented layout) to
//! the global offsets where it occurs. It is built once, then only read;
//! any number of threads may query one index concurrently.

pub(crate) mod build;
mod translated;

pub use build::{IndexBuilder, IndexFiller};
pub use translated::{FrameClumps, TranslatedIndex, TranslatedSearch};

use crate::clump::{self, Clump};
use crate::error::{GenoFindError, GfResult};
use crate::hits::{self, Hit, HitMode, TargetRegion};
use crate::mask::SoftMask;
use crate::pcr;
use crate::source::{Source, SourceTable};
use crate::store::Table;
use crate::tile::{Alphabet, TileShape};
use crate::types::{GenomicPos, Offset};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Build and query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexParams {
    pub alphabet: Alphabet,
    pub tile_size: usize,
    /// Distance between indexed tiles, 0 for `tile_size`
    pub step_size: usize,
    /// Hits needed to form a clump
    pub min_match: usize,
    /// Largest diagonal difference between neighbouring hits of a clump
    pub max_gap: usize,
    /// Tiles occurring this often are not indexed
    pub max_pat: u32,
    /// Tolerate one substituted symbol per tile when finding hits
    pub allow_one_mismatch: bool,
    /// Pre-freeze period one and two repeat tiles
    pub simple_repeat_mask: bool,
    /// Record the upper-case soft mask of in-memory targets
    pub mask_upper: bool,
    /// Translated builds turn lower-case bases into `N`
    pub mask_repeats: bool,
    /// Force a head/tail split, mostly for testing
    pub seg_size: Option<usize>,
    /// Overused tile file seeding the counts
    pub ooc_file: Option<PathBuf>,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            alphabet: Alphabet::Dna,
            tile_size: 11,
            step_size: 0,
            min_match: 2,
            max_gap: 2,
            max_pat: 1024,
            allow_one_mismatch: false,
            simple_repeat_mask: true,
            mask_upper: false,
            mask_repeats: false,
            seg_size: None,
            ooc_file: None,
        }
    }
}

impl IndexParams {
    pub fn dna(tile_size: usize) -> Self {
        Self {
            tile_size,
            ..Self::default()
        }
    }

    pub fn protein(tile_size: usize) -> Self {
        Self {
            alphabet: Alphabet::Protein,
            tile_size,
            min_match: 3,
            max_gap: 0,
            ..Self::default()
        }
    }

    /// Step with 0 normalised to the tile size
    pub fn step(&self) -> usize {
        if self.step_size == 0 {
            self.tile_size
        } else {
            self.step_size
        }
    }

    pub fn shape(&self) -> GfResult<TileShape> {
        TileShape::new(self.alphabet, self.tile_size, self.seg_size)
    }

    /// Reject parameter combinations that no layout supports.
    pub fn validate(&self) -> GfResult<TileShape> {
        let shape = self.shape()?;
        if self.min_match == 0 {
            return Err(GenoFindError::config("minMatch must be at least 1"));
        }
        if self.max_pat == 0 {
            return Err(GenoFindError::config("maxPat must be at least 1"));
        }
        if shape.is_segmented() && self.ooc_file.is_some() {
            return Err(GenoFindError::config(format!(
                "overused tile files are not supported with segmented tiles (tile size {})",
                self.tile_size
            )));
        }
        Ok(shape)
    }

    /// Cutoff applied while counting tile heads. A head of a segmented tile
    /// is shared by many tiles, so segmented indexes count heads without a
    /// cap and drop overused full tiles after the fill pass instead.
    pub fn head_max_pat(&self, shape: &TileShape) -> u32 {
        if shape.is_segmented() {
            u32::MAX
        } else {
            self.max_pat
        }
    }
}

/// Position lists of a flat index, concatenated in tile order
#[derive(Debug, Clone)]
pub struct FlatTables<O: Offset> {
    starts: Vec<O>,
    positions: Table<O>,
}

impl<O: Offset> FlatTables<O> {
    pub(crate) fn new(list_sizes: &[u32], positions: Table<O>) -> Self {
        Self {
            starts: list_starts(list_sizes),
            positions,
        }
    }

    /// Offsets where `tile` occurs, in increasing order
    #[inline]
    pub fn list(&self, tile: u32) -> &[O] {
        let t = tile as usize;
        &self.positions[self.starts[t].to_usize()..self.starts[t + 1].to_usize()]
    }

    pub fn positions(&self) -> &Table<O> {
        &self.positions
    }
}

/// One stored occurrence of a segmented tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndEntry<O> {
    pub tail: u16,
    pub offset: O,
}

/// Occurrences of one tile head
#[derive(Debug, Clone, Copy)]
pub struct EndList<'a, O> {
    tails: &'a [u16],
    positions: &'a [O],
}

impl<'a, O: Offset> EndList<'a, O> {
    pub fn len(&self) -> usize {
        self.tails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tails.is_empty()
    }

    /// Offsets of entries whose tail equals `tail`
    #[inline]
    pub fn matching(&self, tail: u16) -> impl Iterator<Item = O> + 'a {
        let (tails, positions) = (self.tails, self.positions);
        tails
            .iter()
            .zip(positions.iter())
            .filter(move |&(&t, _)| t == tail)
            .map(|(_, &offset)| offset)
    }
}

/// End lists of a segmented index: parallel tail and offset arrays grouped
/// by head
#[derive(Debug, Clone)]
pub struct SegmentedTables<O: Offset> {
    starts: Vec<O>,
    tails: Table<u16>,
    positions: Table<O>,
}

impl<O: Offset> SegmentedTables<O> {
    pub(crate) fn new(list_sizes: &[u32], tails: Table<u16>, positions: Table<O>) -> Self {
        Self {
            starts: list_starts(list_sizes),
            tails,
            positions,
        }
    }

    #[inline]
    pub fn end_list(&self, head: u32) -> EndList<'_, O> {
        let h = head as usize;
        let range = self.starts[h].to_usize()..self.starts[h + 1].to_usize();
        EndList {
            tails: &self.tails[range.clone()],
            positions: &self.positions[range],
        }
    }

    /// The `occurrence`-th entry stored for `head`
    pub fn entry(&self, head: u32, occurrence: usize) -> Option<EndEntry<O>> {
        let list = self.end_list(head);
        Some(EndEntry {
            tail: *list.tails.get(occurrence)?,
            offset: *list.positions.get(occurrence)?,
        })
    }

    pub fn tails(&self) -> &Table<u16> {
        &self.tails
    }

    pub fn positions(&self) -> &Table<O> {
        &self.positions
    }
}

#[derive(Debug, Clone)]
pub enum IndexLayout<O: Offset> {
    Flat(FlatTables<O>),
    Segmented(SegmentedTables<O>),
}

impl<O: Offset> IndexLayout<O> {
    pub fn entry_count(&self) -> usize {
        match self {
            IndexLayout::Flat(t) => t.positions.len(),
            IndexLayout::Segmented(t) => t.positions.len(),
        }
    }

    pub fn is_mapped(&self) -> bool {
        match self {
            IndexLayout::Flat(t) => t.positions.is_mapped(),
            IndexLayout::Segmented(t) => t.positions.is_mapped(),
        }
    }
}

/// Prefix sums of the per-tile counts, one longer than `list_sizes`
fn list_starts<O: Offset>(list_sizes: &[u32]) -> Vec<O> {
    let mut starts = Vec::with_capacity(list_sizes.len() + 1);
    let mut total = 0u64;
    starts.push(O::from_u64(0));
    for &size in list_sizes {
        total += size as u64;
        starts.push(O::from_u64(total));
    }
    starts
}

/// Clumps found for one query plus the raw hit count
#[derive(Debug, Clone, Default)]
pub struct ClumpSearch {
    pub clumps: Vec<Clump>,
    pub hit_count: usize,
}

/// Tiled index over a collection of sequences
#[derive(Debug, Clone)]
pub struct GenoFind<O: Offset = u32> {
    params: IndexParams,
    shape: TileShape,
    sources: SourceTable,
    total_seq_size: GenomicPos,
    list_sizes: Table<u32>,
    layout: IndexLayout<O>,
}

impl<O: Offset> GenoFind<O> {
    pub(crate) fn from_parts(
        params: IndexParams,
        shape: TileShape,
        sources: SourceTable,
        total_seq_size: GenomicPos,
        list_sizes: Table<u32>,
        layout: IndexLayout<O>,
    ) -> Self {
        Self {
            params,
            shape,
            sources,
            total_seq_size,
            list_sizes,
            layout,
        }
    }

    /// Index in-memory sequences. Names must be unique.
    pub fn from_sequences<I>(params: IndexParams, sequences: I) -> GfResult<Self>
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        build::index_sequences(params, sequences)
    }

    /// Index every record of the given FASTA files.
    pub fn from_files<P: AsRef<std::path::Path>>(params: IndexParams, files: &[P]) -> GfResult<Self> {
        build::index_files(params, files)
    }

    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    pub fn shape(&self) -> &TileShape {
        &self.shape
    }

    pub fn tile_size(&self) -> usize {
        self.shape.tile_size
    }

    pub fn alphabet(&self) -> Alphabet {
        self.shape.alphabet
    }

    pub fn is_segmented(&self) -> bool {
        self.shape.is_segmented()
    }

    pub fn sources(&self) -> &SourceTable {
        &self.sources
    }

    pub fn total_seq_size(&self) -> GenomicPos {
        self.total_seq_size
    }

    /// Stored occurrences per tile; overused tiles read 0
    pub fn list_sizes(&self) -> &[u32] {
        &self.list_sizes
    }

    pub fn layout(&self) -> &IndexLayout<O> {
        &self.layout
    }

    pub fn tile_space_size(&self) -> usize {
        self.list_sizes.len()
    }

    pub fn entry_count(&self) -> usize {
        self.layout.entry_count()
    }

    pub fn is_mapped(&self) -> bool {
        self.layout.is_mapped()
    }

    /// Algorithm used to find hits in this index
    pub fn hit_mode(&self) -> HitMode {
        HitMode::select(self.is_segmented(), self.params.allow_one_mismatch)
    }

    /// Source holding a global offset
    pub fn locate(&self, offset: GenomicPos) -> GfResult<(usize, &Source)> {
        self.sources.locate(offset)
    }

    pub fn find_named_source(&self, name: &str) -> Option<(usize, &Source)> {
        self.sources.find_named(name)
    }

    /// Tile hits of `query` in global coordinates
    pub fn find_hits(
        &self,
        query: &[u8],
        mask: Option<&SoftMask>,
        region: Option<TargetRegion>,
    ) -> Vec<Hit> {
        hits::find_hits(self, query, mask, region)
    }

    /// Ranked clumps for one query, best query coverage first
    pub fn find_clumps(&self, query: &[u8], mask: Option<&SoftMask>) -> GfResult<ClumpSearch> {
        let hits = self.find_hits(query, mask, None);
        let hit_count = hits.len();
        let clumps = clump::clump_hits(self, hits, self.params.min_match)?;
        log::debug!(
            "query of {} symbols: {} hits, {} clumps",
            query.len(),
            hit_count,
            clumps.len()
        );
        Ok(ClumpSearch { clumps, hit_count })
    }

    /// Hits inside `[t_min, t_max)` of one source, with source-local target
    /// coordinates
    pub fn find_hits_in_region(
        &self,
        query: &[u8],
        mask: Option<&SoftMask>,
        source: usize,
        t_min: GenomicPos,
        t_max: GenomicPos,
    ) -> GfResult<Vec<Hit>> {
        let src = self.sources.get(source).ok_or_else(|| {
            GenoFindError::config(format!(
                "source {} out of range, index has {}",
                source,
                self.sources.len()
            ))
        })?;
        let region = TargetRegion::within(src, t_min, t_max);
        let mut hits = self.find_hits(query, mask, Some(region));
        for hit in &mut hits {
            hit.t_start -= src.start;
        }
        Ok(hits)
    }

    /// Candidate PCR products for a primer pair
    pub fn find_primer_pairs(
        &self,
        forward: &[u8],
        reverse: &[u8],
        min_distance: u64,
        max_distance: u64,
    ) -> GfResult<Vec<Clump>> {
        pcr::find_primer_pairs(self, forward, reverse, min_distance, max_distance)
    }

    /// `qStart-qEnd name tStart-tEnd, hits N` with source-local target
    /// coordinates
    pub fn clump_summary(&self, clump: &Clump) -> String {
        match self.sources.get(clump.source) {
            Some(src) => format!(
                "{}-{} {} {}-{}, hits {}",
                clump.q_start,
                clump.q_end,
                src.file.as_deref().unwrap_or(&src.name),
                clump.t_start - src.start,
                clump.t_end - src.start,
                clump.hit_count
            ),
            None => format!(
                "{}-{} ? {}-{}, hits {}",
                clump.q_start, clump.q_end, clump.t_start, clump.t_end, clump.hit_count
            ),
        }
    }
}
