//! Build command implementation - index FASTA files into an index file

use anyhow::{Context, Result};
use genofind_core::{io, Alphabet, GenoFind, IndexParams, Offset, TranslatedIndex};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::Config;

/// Command line overrides of the configured build parameters
#[derive(Debug, Default)]
pub struct BuildOptions {
    pub tile_size: Option<usize>,
    pub step_size: Option<usize>,
    pub min_match: Option<usize>,
    pub max_gap: Option<usize>,
    pub max_pat: Option<u32>,
    pub seg_size: Option<usize>,
    pub ooc: Option<PathBuf>,
    pub protein: bool,
    pub translated: bool,
    pub mask_repeats: bool,
    pub one_mismatch: bool,
    pub wide: bool,
}

impl BuildOptions {
    pub fn params(&self, configured: &IndexParams) -> IndexParams {
        let mut params = if (self.protein || self.translated) && configured.alphabet == Alphabet::Dna
        {
            IndexParams {
                max_pat: configured.max_pat,
                simple_repeat_mask: configured.simple_repeat_mask,
                mask_upper: configured.mask_upper,
                ..IndexParams::protein(4)
            }
        } else {
            configured.clone()
        };
        if let Some(v) = self.tile_size {
            params.tile_size = v;
        }
        if let Some(v) = self.step_size {
            params.step_size = v;
        }
        if let Some(v) = self.min_match {
            params.min_match = v;
        }
        if let Some(v) = self.max_gap {
            params.max_gap = v;
        }
        if let Some(v) = self.max_pat {
            params.max_pat = v;
        }
        if self.seg_size.is_some() {
            params.seg_size = self.seg_size;
        }
        if self.ooc.is_some() {
            params.ooc_file = self.ooc.clone();
        }
        params.mask_repeats |= self.mask_repeats;
        params.allow_one_mismatch |= self.one_mismatch;
        params
    }
}

pub fn execute(config: &Config, files: &[PathBuf], out: &Path, options: BuildOptions) -> Result<()> {
    let params = options.params(&config.index);
    log::info!(
        "Building {}{:?} index with tile size {} over {} files",
        if options.translated { "translated " } else { "" },
        params.alphabet,
        params.tile_size,
        files.len()
    );
    let started = Instant::now();

    let built = match (options.translated, options.wide) {
        (true, false) => build_translated::<u32>(params, files, out),
        (true, true) => build_translated::<u64>(params, files, out),
        (false, false) => build_plain::<u32>(params, files, out),
        (false, true) => build_plain::<u64>(params, files, out),
    };
    built?;

    log::info!(
        "Wrote {} in {:.2}s",
        out.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn build_plain<O: Offset>(params: IndexParams, files: &[PathBuf], out: &Path) -> Result<()> {
    let index: GenoFind<O> = if params.allow_one_mismatch {
        // Near-miss indexes are built from sequences held in memory
        let mut sequences = Vec::new();
        for file in files {
            let records = io::read_all(file)
                .with_context(|| format!("Failed to read sequences from {}", file.display()))?;
            sequences.extend(records);
        }
        GenoFind::from_sequences(params, sequences)
    } else {
        GenoFind::from_files(params, files)
    }
    .context("Failed to build index")?;

    log::info!(
        "Indexed {} sequences, {} bases, {} tiles, {} hit finding",
        index.sources().len(),
        index.total_seq_size(),
        index.entry_count(),
        index.hit_mode()
    );
    index
        .save(out)
        .with_context(|| format!("Failed to write index: {}", out.display()))
}

fn build_translated<O: Offset>(params: IndexParams, files: &[PathBuf], out: &Path) -> Result<()> {
    let index: TranslatedIndex<O> =
        TranslatedIndex::from_files(params, files).context("Failed to build translated index")?;
    let tiles: usize = index.indexes().iter().map(|i| i.entry_count()).sum();
    log::info!("Indexed six frames, {} tiles", tiles);
    index
        .save(out)
        .with_context(|| format!("Failed to write index: {}", out.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_overrides_config() {
        let options = BuildOptions {
            tile_size: Some(12),
            max_pat: Some(256),
            one_mismatch: true,
            ..Default::default()
        };
        let params = options.params(&IndexParams::default());
        assert_eq!(params.tile_size, 12);
        assert_eq!(params.max_pat, 256);
        assert_eq!(params.min_match, 2);
        assert!(params.allow_one_mismatch);
    }

    #[test]
    fn test_protein_switches_presets() {
        let options = BuildOptions {
            translated: true,
            ..Default::default()
        };
        let mut configured = IndexParams::default();
        configured.max_pat = 64;
        let params = options.params(&configured);
        assert_eq!(params.alphabet, Alphabet::Protein);
        assert_eq!(params.tile_size, 4);
        assert_eq!(params.min_match, 3);
        assert_eq!(params.max_pat, 64);
    }
}
