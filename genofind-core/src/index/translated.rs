//! Six-frame translated indexes
//!
//! DNA targets are translated in three frames on both strands and each
//! (strand, frame) pair gets its own protein index. Source coordinates of
//! those indexes are in residues.

use super::build::check_unique;
use super::{ClumpSearch, GenoFind, IndexBuilder, IndexFiller, IndexParams};
use crate::clump::Clump;
use crate::error::{GenoFindError, GfResult};
use crate::io::fasta;
use crate::mask::SoftMask;
use crate::tile::Alphabet;
use crate::translate::{mask_repeats_to_n, translate_frame, translate_strand};
use crate::types::{Offset, Strand};
use std::collections::HashSet;
use std::path::Path;

const STRANDS: [Strand; 2] = [Strand::Forward, Strand::Reverse];

/// Clumps of one query frame against one target frame
#[derive(Debug, Clone)]
pub struct FrameClumps {
    pub strand: Strand,
    pub query_frame: usize,
    pub target_frame: usize,
    pub clumps: Vec<Clump>,
}

#[derive(Debug, Clone, Default)]
pub struct TranslatedSearch {
    pub frames: Vec<FrameClumps>,
    pub hit_count: usize,
}

/// Protein indexes for the six reading frames of a DNA collection
#[derive(Debug, Clone)]
pub struct TranslatedIndex<O: Offset = u32> {
    /// Forward frames 0..3 then reverse frames 0..3
    indexes: Vec<GenoFind<O>>,
}

fn check_params(params: &IndexParams) -> GfResult<()> {
    if params.alphabet != Alphabet::Protein {
        return Err(GenoFindError::config(
            "translated indexes need protein tile parameters",
        ));
    }
    if params.allow_one_mismatch {
        return Err(GenoFindError::config(
            "allowOneMismatch is not supported for translated indexes",
        ));
    }
    Ok(())
}

fn prepare(dna: &[u8], mask_repeats: bool) -> Vec<u8> {
    let mut dna = dna.to_vec();
    if mask_repeats {
        mask_repeats_to_n(&mut dna);
    }
    dna
}

struct SixFrameBuild<O: Offset> {
    mask_repeats: bool,
    builders: Vec<IndexBuilder<O>>,
}

impl<O: Offset> SixFrameBuild<O> {
    fn new(params: IndexParams) -> GfResult<Self> {
        check_params(&params)?;
        let builders = (0..6)
            .map(|_| IndexBuilder::new(params.clone()))
            .collect::<GfResult<Vec<_>>>()?;
        Ok(Self {
            mask_repeats: params.mask_repeats,
            builders,
        })
    }

    fn count(&mut self, dna: &[u8]) {
        let dna = prepare(dna, self.mask_repeats);
        for (s, &strand) in STRANDS.iter().enumerate() {
            for (f, protein) in translate_strand(&dna, strand).iter().enumerate() {
                self.builders[s * 3 + f].count(protein);
            }
        }
    }

    fn allocate(self) -> GfResult<SixFrameFill<O>> {
        let fillers = self
            .builders
            .into_iter()
            .map(IndexBuilder::allocate)
            .collect::<GfResult<Vec<_>>>()?;
        Ok(SixFrameFill {
            mask_repeats: self.mask_repeats,
            fillers,
        })
    }
}

struct SixFrameFill<O: Offset> {
    mask_repeats: bool,
    fillers: Vec<IndexFiller<O>>,
}

impl<O: Offset> SixFrameFill<O> {
    fn add(&mut self, name: &str, file: Option<&str>, dna: &[u8]) -> GfResult<()> {
        let dna = prepare(dna, self.mask_repeats);
        for (s, &strand) in STRANDS.iter().enumerate() {
            for (f, protein) in translate_strand(&dna, strand).iter().enumerate() {
                let source = self.fillers[s * 3 + f].add(name, protein)?;
                source.file = file.map(str::to_string);
            }
        }
        Ok(())
    }

    fn finish(self) -> GfResult<TranslatedIndex<O>> {
        let indexes = self
            .fillers
            .into_iter()
            .map(IndexFiller::finish)
            .collect::<GfResult<Vec<_>>>()?;
        Ok(TranslatedIndex { indexes })
    }
}

impl<O: Offset> TranslatedIndex<O> {
    pub(crate) fn from_indexes(indexes: Vec<GenoFind<O>>) -> Self {
        debug_assert_eq!(indexes.len(), 6);
        Self { indexes }
    }

    /// Translate and index in-memory DNA sequences.
    pub fn from_sequences<I>(params: IndexParams, sequences: I) -> GfResult<Self>
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let sequences: Vec<(String, Vec<u8>)> = sequences.into_iter().collect();
        let mut seen = HashSet::new();
        for (name, _) in &sequences {
            check_unique(&mut seen, name)?;
        }
        let mut build = SixFrameBuild::new(params)?;
        for (_, dna) in &sequences {
            build.count(dna);
        }
        let mut fill = build.allocate()?;
        for (name, dna) in &sequences {
            fill.add(name, None, dna)?;
        }
        fill.finish()
    }

    /// Translate and index every record of the given FASTA files.
    pub fn from_files<P: AsRef<Path>>(params: IndexParams, files: &[P]) -> GfResult<Self> {
        for file in files {
            fasta::check_sequence_file(file.as_ref())?;
        }
        let mut build = SixFrameBuild::new(params)?;
        let mut seen = HashSet::new();
        for file in files {
            let path = file.as_ref();
            log::info!("Counting {}", path.display());
            fasta::for_each_record(path, |name, dna| {
                check_unique(&mut seen, name)?;
                build.count(dna);
                Ok(())
            })?;
        }
        let mut fill = build.allocate()?;
        for file in files {
            let path = file.as_ref();
            let file_name = path.to_string_lossy().into_owned();
            log::info!("Indexing {}", path.display());
            fasta::for_each_record(path, |name, dna| fill.add(name, Some(file_name.as_str()), dna))?;
        }
        fill.finish()
    }

    /// Index of one strand and reading frame
    pub fn frame(&self, strand: Strand, frame: usize) -> &GenoFind<O> {
        &self.indexes[strand.index() * 3 + frame]
    }

    /// Forward frames first, then reverse
    pub fn indexes(&self) -> &[GenoFind<O>] {
        &self.indexes
    }

    /// Protein query against the three frames of one strand
    pub fn find_clumps(
        &self,
        strand: Strand,
        query: &[u8],
        mask: Option<&SoftMask>,
    ) -> GfResult<TranslatedSearch> {
        let mut search = TranslatedSearch::default();
        for target_frame in 0..3 {
            let ClumpSearch { clumps, hit_count } =
                self.frame(strand, target_frame).find_clumps(query, mask)?;
            search.hit_count += hit_count;
            search.frames.push(FrameClumps {
                strand,
                query_frame: 0,
                target_frame,
                clumps,
            });
        }
        Ok(search)
    }

    /// DNA query translated in its three forward frames against the three
    /// frames of one target strand
    pub fn find_clumps_translated(
        &self,
        strand: Strand,
        dna_query: &[u8],
    ) -> GfResult<TranslatedSearch> {
        let mut search = TranslatedSearch::default();
        for query_frame in 0..3 {
            let protein = translate_frame(dna_query, query_frame);
            let one = self.find_clumps(strand, &protein, None)?;
            search.hit_count += one.hit_count;
            search
                .frames
                .extend(one.frames.into_iter().map(|fc| FrameClumps {
                    query_frame,
                    ..fc
                }));
        }
        Ok(search)
    }
}
