//! Two-pass index construction
//!
//! The count pass sizes every tile list, freezing a tile at the overused
//! cutoff. Storage for all non-overused tiles is then allocated as one
//! backing array, and the fill pass writes every occurrence into its tile's
//! slice. Overused tiles end up with no storage and a count of zero.
//! Segmented indexes count heads uncapped and drop overused (head, tail)
//! tiles from their end lists once filled.

use super::{FlatTables, GenoFind, IndexLayout, IndexParams, SegmentedTables};
use crate::error::{GenoFindError, GfResult};
use crate::io::fasta;
use crate::mask::SoftMask;
use crate::ooc;
use crate::source::{Source, SourceTable};
use crate::tile::{simple_repeat_tiles, Alphabet, TileShape};
use crate::types::{GenomicPos, Offset};
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

/// Call `f(pos, head, tail)` for every fully valid tile window at multiples
/// of `step`.
#[inline]
pub(crate) fn for_each_tile<F>(shape: &TileShape, step: usize, seq: &[u8], mut f: F)
where
    F: FnMut(usize, u32, u16),
{
    let tile_size = shape.tile_size;
    if seq.len() < tile_size {
        return;
    }
    let last = seq.len() - tile_size;
    let mut pos = 0;
    while pos <= last {
        if let Some((head, tail)) = shape.split(&seq[pos..pos + tile_size]) {
            f(pos, head, tail);
        }
        pos += step;
    }
}

/// Count tiles of `seq` into `counts`, freezing each at `max_pat`.
pub(crate) fn count_tiles(
    counts: &mut [u32],
    shape: &TileShape,
    step: usize,
    max_pat: u32,
    seq: &[u8],
) {
    for_each_tile(shape, step, seq, |_, head, _| {
        let count = &mut counts[head as usize];
        if *count < max_pat {
            *count += 1;
        }
    });
}

/// Pre-freeze period one and two repeat tiles.
pub(crate) fn freeze_simple_repeats(counts: &mut [u32], shape: &TileShape, max_pat: u32) {
    for tile in simple_repeat_tiles(shape.tile_size, shape.alphabet) {
        if let Some(count) = counts.get_mut(tile as usize) {
            *count = max_pat;
        }
    }
}

/// Drop every (head, tail) tile stored `max_pat` or more times from the end
/// lists, compacting them in place. `counts` holds the list length of each
/// head and is updated to the kept length. Returns the number of distinct
/// tiles dropped.
pub(crate) fn prune_overused_tiles<O: Offset>(
    counts: &mut [u32],
    tails: &mut Vec<u16>,
    positions: &mut Vec<O>,
    max_pat: u32,
) -> usize {
    let mut tally: HashMap<u16, u32> = HashMap::new();
    let (mut read, mut write, mut dropped) = (0usize, 0usize, 0usize);
    for count in counts.iter_mut() {
        let len = *count as usize;
        let list = read..read + len;
        read += len;
        if len < max_pat as usize {
            // no tile of this head can reach the cutoff
            tails.copy_within(list.clone(), write);
            positions.copy_within(list, write);
            write += len;
            continue;
        }
        tally.clear();
        for &tail in &tails[list.clone()] {
            *tally.entry(tail).or_insert(0) += 1;
        }
        dropped += tally.values().filter(|&&n| n >= max_pat).count();
        let mut kept = 0u32;
        for i in list {
            if tally[&tails[i]] < max_pat {
                tails[write] = tails[i];
                positions[write] = positions[i];
                write += 1;
                kept += 1;
            }
        }
        *count = kept;
    }
    tails.truncate(write);
    positions.truncate(write);
    dropped
}

/// Count pass of a build
pub struct IndexBuilder<O: Offset = u32> {
    params: IndexParams,
    shape: TileShape,
    step: usize,
    max_pat: u32,
    counts: Vec<u32>,
    counted_bases: u64,
    _offset: PhantomData<O>,
}

impl<O: Offset> IndexBuilder<O> {
    pub fn new(params: IndexParams) -> GfResult<Self> {
        let shape = params.validate()?;
        let max_pat = params.head_max_pat(&shape);
        let mut counts = vec![0u32; shape.tile_space_size()];
        if let Some(path) = &params.ooc_file {
            let frozen = ooc::mask_counts(path, &mut counts, shape.tile_size, max_pat)?;
            log::info!("{} overused tiles from {}", frozen, path.display());
            if params.simple_repeat_mask {
                freeze_simple_repeats(&mut counts, &shape, max_pat);
            }
        } else if shape.alphabet == Alphabet::Protein
            && !shape.is_segmented()
            && params.simple_repeat_mask
        {
            freeze_simple_repeats(&mut counts, &shape, max_pat);
        }
        Ok(Self {
            step: params.step(),
            params,
            shape,
            max_pat,
            counts,
            counted_bases: 0,
            _offset: PhantomData,
        })
    }

    pub fn shape(&self) -> &TileShape {
        &self.shape
    }

    /// First pass over one sequence
    pub fn count(&mut self, seq: &[u8]) {
        count_tiles(&mut self.counts, &self.shape, self.step, self.max_pat, seq);
        self.counted_bases += seq.len() as u64;
    }

    /// Allocate the backing arrays. Fails if the counted bases do not fit
    /// the offset width.
    pub fn allocate(mut self) -> GfResult<IndexFiller<O>> {
        let limit = O::WIDTH.max_bases();
        if self.counted_bases > limit {
            return Err(GenoFindError::Capacity {
                total: self.counted_bases,
                limit,
                width: O::WIDTH.bits(),
            });
        }

        let max_pat = self.max_pat;
        let mut starts = Vec::with_capacity(self.counts.len() + 1);
        let mut entries = 0u64;
        let mut overused = 0usize;
        starts.push(O::from_u64(0));
        for count in self.counts.iter_mut() {
            if *count < max_pat {
                entries += *count as u64;
                *count = 0;
            } else {
                overused += 1;
            }
            starts.push(O::from_u64(entries));
        }
        log::info!(
            "Allocating {} index entries, {} overused tiles",
            entries,
            overused
        );

        let entries = entries as usize;
        let tails = if self.shape.is_segmented() {
            vec![0u16; entries]
        } else {
            Vec::new()
        };
        Ok(IndexFiller {
            params: self.params,
            shape: self.shape,
            step: self.step,
            max_pat,
            counts: self.counts,
            starts,
            positions: vec![O::from_u64(0); entries],
            tails,
            sources: Vec::new(),
            offset: 0,
        })
    }
}

/// Fill pass of a build
pub struct IndexFiller<O: Offset = u32> {
    params: IndexParams,
    shape: TileShape,
    step: usize,
    max_pat: u32,
    counts: Vec<u32>,
    starts: Vec<O>,
    positions: Vec<O>,
    tails: Vec<u16>,
    sources: Vec<Source>,
    offset: GenomicPos,
}

impl<O: Offset> IndexFiller<O> {
    /// Add the tiles of the next sequence; sequences must come in the same
    /// order as in the count pass.
    pub fn add(&mut self, name: impl Into<String>, seq: &[u8]) -> GfResult<&mut Source> {
        let start = self.offset;
        let end = start + seq.len() as u64;
        if end > O::WIDTH.max_bases() {
            return Err(GenoFindError::Capacity {
                total: end,
                limit: O::WIDTH.max_bases(),
                width: O::WIDTH.bits(),
            });
        }

        let segmented = self.shape.is_segmented();
        let max_pat = self.max_pat;
        let mut overflow = false;
        let Self {
            counts,
            starts,
            positions,
            tails,
            shape,
            step,
            ..
        } = self;
        for_each_tile(shape, *step, seq, |pos, head, tail| {
            let h = head as usize;
            let filled = counts[h];
            if filled >= max_pat {
                return;
            }
            let slot = starts[h].to_usize() + filled as usize;
            if slot >= starts[h + 1].to_usize() {
                overflow = true;
                return;
            }
            positions[slot] = O::from_u64(start + pos as u64);
            if segmented {
                tails[slot] = tail;
            }
            counts[h] = filled + 1;
        });
        if overflow {
            return Err(GenoFindError::InvalidSequence(
                "sequence content changed between counting and indexing".into(),
            ));
        }

        self.offset = end;
        self.sources.push(Source::new(name, start, end));
        let last = self.sources.len() - 1;
        Ok(&mut self.sources[last])
    }

    /// Zero the overused tiles and freeze the index.
    pub fn finish(mut self) -> GfResult<GenoFind<O>> {
        let max_pat = self.max_pat;
        for count in self.counts.iter_mut() {
            if *count >= max_pat {
                *count = 0;
            }
        }
        let filled: u64 = self.counts.iter().map(|&c| c as u64).sum();
        if filled != self.positions.len() as u64 {
            return Err(GenoFindError::InvalidSequence(format!(
                "indexed {} tiles but counted {}",
                filled,
                self.positions.len()
            )));
        }
        if self.shape.is_segmented() {
            let dropped = prune_overused_tiles(
                &mut self.counts,
                &mut self.tails,
                &mut self.positions,
                self.params.max_pat,
            );
            if dropped > 0 {
                log::info!("{} overused tiles dropped from end lists", dropped);
            }
        }

        let layout = if self.shape.is_segmented() {
            IndexLayout::Segmented(SegmentedTables::new(
                &self.counts,
                self.tails.into(),
                self.positions.into(),
            ))
        } else {
            IndexLayout::Flat(FlatTables::new(&self.counts, self.positions.into()))
        };
        let sources = SourceTable::from_sources(self.sources)?;
        log::info!(
            "Done adding: {} sequences, {} bases",
            sources.len(),
            self.offset
        );
        Ok(GenoFind::from_parts(
            self.params,
            self.shape,
            sources,
            self.offset,
            self.counts.into(),
            layout,
        ))
    }
}

pub(super) fn check_unique(seen: &mut HashSet<String>, name: &str) -> GfResult<()> {
    if !seen.insert(name.to_string()) {
        return Err(GenoFindError::DuplicateSource(name.to_string()));
    }
    Ok(())
}

pub(super) fn index_sequences<O, I>(params: IndexParams, sequences: I) -> GfResult<GenoFind<O>>
where
    O: Offset,
    I: IntoIterator<Item = (String, Vec<u8>)>,
{
    let sequences: Vec<(String, Arc<[u8]>)> = sequences
        .into_iter()
        .map(|(name, seq)| (name, Arc::from(seq)))
        .collect();
    let mut seen = HashSet::new();
    for (name, _) in &sequences {
        check_unique(&mut seen, name)?;
    }

    let mask_upper = params.mask_upper;
    let mut builder = IndexBuilder::<O>::new(params)?;
    for (_, seq) in &sequences {
        builder.count(seq);
    }
    let mut filler = builder.allocate()?;
    for (name, seq) in sequences {
        if seq.is_empty() {
            log::warn!("Sequence {} is empty", name);
        }
        let source = filler.add(name, &seq)?;
        if mask_upper {
            source.mask = Some(SoftMask::from_upper_case(&seq));
        }
        source.sequence = Some(seq);
    }
    filler.finish()
}

pub(super) fn index_files<O, P>(params: IndexParams, files: &[P]) -> GfResult<GenoFind<O>>
where
    O: Offset,
    P: AsRef<Path>,
{
    if params.allow_one_mismatch {
        return Err(GenoFindError::config(
            "allowOneMismatch is not supported when indexing sequence files",
        ));
    }
    for file in files {
        fasta::check_sequence_file(file.as_ref())?;
    }

    let mut builder = IndexBuilder::<O>::new(params)?;
    let mut seen = HashSet::new();
    for file in files {
        let path = file.as_ref();
        log::info!("Counting tiles in {}", path.display());
        fasta::for_each_record(path, |name, seq| {
            check_unique(&mut seen, name)?;
            builder.count(seq);
            Ok(())
        })?;
    }

    let mut filler = builder.allocate()?;
    for file in files {
        let path = file.as_ref();
        let file_name = path.to_string_lossy().into_owned();
        log::info!("Adding tiles in {}", path.display());
        fasta::for_each_record(path, |name, seq| {
            if seq.is_empty() {
                log::warn!("Sequence {} in {} is empty", name, file_name);
            }
            filler.add(name, seq)?.file = Some(file_name.clone());
            Ok(())
        })?;
    }
    filler.finish()
}
