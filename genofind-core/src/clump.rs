//! Clump assembly
//!
//! Hits are grouped into 64 Kb target buckets, sorted by diagonal and cut
//! wherever neighbouring diagonals differ by more than `max_gap`. Runs that
//! reach the last `NEAR_ENOUGH` bases of their bucket are carried into the
//! next one so clumps straddling a bucket boundary stay whole. Each run is
//! then re-split on target distance and on source boundaries, and the
//! survivors are ranked by how much of the query they cover.

use crate::error::GfResult;
use crate::hits::Hit;
use crate::index::GenoFind;
use crate::source::SourceTable;
use crate::tile::Alphabet;
use crate::types::{GenomicPos, Offset};

/// Log2 of the target bucket size
pub const BUCKET_SHIFT: u32 = 16;

/// Largest target distance between neighbouring hits of a DNA clump
pub const NEAR_ENOUGH: u64 = 300;

/// Candidate alignment region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clump {
    pub q_start: usize,
    /// Exclusive; includes the last hit's tile
    pub q_end: usize,
    pub t_start: GenomicPos,
    pub t_end: GenomicPos,
    /// Index of the owning source
    pub source: usize,
    pub hit_count: usize,
    /// Query bases covered by the union of hit tiles
    pub query_coverage: usize,
    pub hits: Vec<Hit>,
}

impl Clump {
    /// Clump spanning `hits`, all of which lie in `source`
    pub fn from_hits(hits: Vec<Hit>, source: usize, tile_size: usize) -> Self {
        let mut clump = Clump {
            q_start: usize::MAX,
            q_end: 0,
            t_start: GenomicPos::MAX,
            t_end: 0,
            source,
            hit_count: hits.len(),
            query_coverage: 0,
            hits,
        };
        for hit in &clump.hits {
            clump.q_start = clump.q_start.min(hit.q_start);
            clump.q_end = clump.q_end.max(hit.q_start + tile_size);
            clump.t_start = clump.t_start.min(hit.t_start);
            clump.t_end = clump.t_end.max(hit.t_start + tile_size as u64);
        }
        if clump.hits.is_empty() {
            clump.q_start = 0;
            clump.t_start = 0;
        }
        clump
    }

    /// Target span without hits
    pub fn span(source: usize, t_start: GenomicPos, t_end: GenomicPos) -> Self {
        Clump {
            q_start: 0,
            q_end: 0,
            t_start,
            t_end,
            source,
            hit_count: 0,
            query_coverage: 0,
            hits: Vec::new(),
        }
    }

    pub fn target_len(&self) -> u64 {
        self.t_end - self.t_start
    }
}

/// Neighbourhood used when re-splitting clumps on target distance
pub fn near_enough(alphabet: Alphabet) -> u64 {
    match alphabet {
        Alphabet::Dna => NEAR_ENOUGH,
        Alphabet::Protein => NEAR_ENOUGH / 3,
    }
}

/// Length of the union of `[q_start, q_start + tile_size)` over `hits`
pub fn query_coverage(hits: &[Hit], tile_size: usize) -> usize {
    let mut starts: Vec<usize> = hits.iter().map(|h| h.q_start).collect();
    starts.sort_unstable();
    let Some(&first) = starts.first() else {
        return 0;
    };
    let (mut block_start, mut block_end) = (first, first + tile_size);
    let mut covered = 0;
    for &q in &starts[1..] {
        if q > block_end {
            covered += block_end - block_start;
            block_start = q;
            block_end = q + tile_size;
        } else if q + tile_size > block_end {
            block_end = q + tile_size;
        }
    }
    covered + block_end - block_start
}

struct Clumper<'a> {
    sources: &'a SourceTable,
    tile_size: usize,
    max_gap: u64,
    near_enough: u64,
    min_match: usize,
}

impl<'a> Clumper<'a> {
    /// Diagonal runs per bucket, carrying boundary runs forward
    fn diagonal_runs(&self, hits: Vec<Hit>, total_size: GenomicPos) -> Vec<Vec<Hit>> {
        let bucket_size = 1u64 << BUCKET_SHIFT;
        let bucket_count = (total_size >> BUCKET_SHIFT) as usize + 1;
        let mut buckets: Vec<Vec<Hit>> = vec![Vec::new(); bucket_count];
        for hit in hits {
            let b = ((hit.t_start >> BUCKET_SHIFT) as usize).min(bucket_count - 1);
            buckets[b].push(hit);
        }

        let mut runs = Vec::new();
        let mut boundary = bucket_size.saturating_sub(self.near_enough);
        for i in 0..bucket_count {
            let mut bucket = std::mem::take(&mut buckets[i]);
            bucket.sort_by_key(|h| h.diagonal);
            let mut start = 0;
            while start < bucket.len() {
                let mut end = start + 1;
                while end < bucket.len()
                    && bucket[end].diagonal - bucket[end - 1].diagonal <= self.max_gap
                {
                    end += 1;
                }
                let run = &bucket[start..end];
                let max_t = run.iter().map(|h| h.t_start).max().unwrap_or(0);
                if max_t > boundary && i + 1 < bucket_count {
                    buckets[i + 1].extend_from_slice(run);
                } else if run.len() >= self.min_match {
                    runs.push(run.to_vec());
                }
                start = end;
            }
            boundary += bucket_size;
        }
        runs
    }

    /// Split a run wherever consecutive target positions are too far apart.
    fn split_near(&self, mut run: Vec<Hit>, out: &mut Vec<Clump>) -> GfResult<()> {
        run.sort_by_key(|h| h.t_start);
        let mut start = 0;
        for i in 1..=run.len() {
            let cut = i == run.len() || run[i].t_start > run[i - 1].t_start + self.near_enough;
            if cut {
                if i - start >= self.min_match {
                    self.split_targets(&run[start..i], out)?;
                }
                start = i;
            }
        }
        Ok(())
    }

    /// Emit one clump per source the hits touch. `hits` is sorted by target.
    fn split_targets(&self, hits: &[Hit], out: &mut Vec<Clump>) -> GfResult<()> {
        let mut start = 0;
        while start < hits.len() {
            let (source, src) = self.sources.locate(hits[start].t_start)?;
            let end = start
                + hits[start..]
                    .iter()
                    .take_while(|h| h.t_start < src.end)
                    .count();
            if end - start >= self.min_match {
                out.push(Clump::from_hits(
                    hits[start..end].to_vec(),
                    source,
                    self.tile_size,
                ));
            }
            start = end;
        }
        Ok(())
    }
}

/// Assemble `hits` of one query into clumps of at least `min_match` hits,
/// best query coverage first.
pub fn clump_hits<O: Offset>(
    index: &GenoFind<O>,
    hits: Vec<Hit>,
    min_match: usize,
) -> GfResult<Vec<Clump>> {
    let clumper = Clumper {
        sources: index.sources(),
        tile_size: index.tile_size(),
        max_gap: index.params().max_gap as u64,
        near_enough: near_enough(index.alphabet()),
        min_match: min_match.max(1),
    };
    let mut clumps = Vec::new();
    for run in clumper.diagonal_runs(hits, index.total_seq_size()) {
        clumper.split_near(run, &mut clumps)?;
    }
    for clump in &mut clumps {
        clump.query_coverage = query_coverage(&clump.hits, clumper.tile_size);
    }
    clumps.sort_by(|a, b| b.query_coverage.cmp(&a.query_coverage));
    Ok(clumps)
}
