//! Source table and locator
//!
//! Every indexed sequence owns a half-open `[start, end)` range of the
//! concatenated coordinate space. Sources are kept in increasing `start`
//! order so a global offset maps back to its sequence by binary search.

use crate::error::{GenoFindError, GfResult};
use crate::mask::SoftMask;
use crate::types::GenomicPos;
use std::path::Path;
use std::sync::Arc;

/// One indexed sequence
#[derive(Debug, Clone)]
pub struct Source {
    pub name: String,
    /// File the sequence was read from, if any
    pub file: Option<String>,
    pub start: GenomicPos,
    pub end: GenomicPos,
    /// In-memory sequence, kept for sequences handed to the builder directly
    pub sequence: Option<Arc<[u8]>>,
    /// Upper-case soft mask of `sequence`
    pub mask: Option<SoftMask>,
}

impl Source {
    pub fn new(name: impl Into<String>, start: GenomicPos, end: GenomicPos) -> Self {
        Self {
            name: name.into(),
            file: None,
            start,
            end,
            sequence: None,
            mask: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    #[inline]
    pub fn contains(&self, offset: GenomicPos) -> bool {
        self.start <= offset && offset < self.end
    }

    /// File name without directory and extensions
    pub fn file_stem(&self) -> Option<&str> {
        let file = self.file.as_deref()?;
        let base = Path::new(file).file_name()?.to_str()?;
        base.split('.').next()
    }
}

/// Sources of one index in coordinate order
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    sources: Vec<Source>,
}

impl SourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources must already be ordered and non-overlapping.
    pub fn from_sources(sources: Vec<Source>) -> GfResult<Self> {
        for pair in sources.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(GenoFindError::InvalidSequence(format!(
                    "source {} overlaps {}",
                    pair[1].name, pair[0].name
                )));
            }
        }
        Ok(Self { sources })
    }

    /// Append a source directly after the previous one.
    pub fn push(&mut self, source: Source) {
        debug_assert!(self.sources.last().map_or(true, |s| s.end <= source.start));
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Source> {
        self.sources.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Source> {
        self.sources.iter()
    }

    pub fn as_slice(&self) -> &[Source] {
        &self.sources
    }

    /// End of the last source
    pub fn total_size(&self) -> GenomicPos {
        self.sources.last().map_or(0, |s| s.end)
    }

    /// Find the source holding `offset`. Failure means the index is
    /// internally inconsistent.
    pub fn locate(&self, offset: GenomicPos) -> GfResult<(usize, &Source)> {
        self.position(offset)
            .map(|i| (i, &self.sources[i]))
            .ok_or(GenoFindError::SourceNotFound(offset))
    }

    /// Index of the source holding `offset`
    #[inline]
    pub fn position(&self, offset: GenomicPos) -> Option<usize> {
        // Empty sources share their start with the next one; skipping every
        // source that ends at or before the offset lands on the owner.
        let i = self.sources.partition_point(|s| s.end <= offset);
        self.sources
            .get(i)
            .filter(|s| s.contains(offset))
            .map(|_| i)
    }

    /// Look a source up by sequence name, or by file stem for file-backed
    /// sources.
    pub fn find_named(&self, name: &str) -> Option<(usize, &Source)> {
        self.sources
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == name)
            .or_else(|| {
                self.sources
                    .iter()
                    .enumerate()
                    .find(|(_, s)| s.file_stem() == Some(name))
            })
    }
}

impl<'a> IntoIterator for &'a SourceTable {
    type Item = &'a Source;
    type IntoIter = std::slice::Iter<'a, Source>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}
