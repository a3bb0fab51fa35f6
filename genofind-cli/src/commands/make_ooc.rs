//! Make-ooc command implementation - write overused tiles of FASTA files

use anyhow::{Context, Result};
use genofind_core::{make_ooc, Alphabet, OocKind};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::OocType;

impl From<OocType> for OocKind {
    fn from(kind: OocType) -> Self {
        match kind {
            OocType::Dna => OocKind::Dna,
            OocType::Protein => OocKind::Protein,
            OocType::Translated => OocKind::Translated,
        }
    }
}

fn default_tile_size(config: &Config, alphabet: Alphabet) -> usize {
    if config.index.alphabet == alphabet {
        config.index.tile_size
    } else {
        match alphabet {
            Alphabet::Dna => 11,
            Alphabet::Protein => 4,
        }
    }
}

pub fn execute(
    config: &Config,
    files: &[PathBuf],
    out: &Path,
    tile_size: Option<usize>,
    max_pat: Option<u32>,
    kind: OocType,
) -> Result<()> {
    let kind = OocKind::from(kind);
    let tile_size = tile_size.unwrap_or_else(|| default_tile_size(config, kind.alphabet()));
    let max_pat = max_pat.unwrap_or(config.index.max_pat);
    log::info!(
        "Counting {:?} tiles of size {} in {} files, cutoff {}",
        kind,
        tile_size,
        files.len(),
        max_pat
    );

    make_ooc(out, files, tile_size, max_pat, kind)
        .with_context(|| format!("Failed to make overused tile file {}", out.display()))?;
    Ok(())
}
