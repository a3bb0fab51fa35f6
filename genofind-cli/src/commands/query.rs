//! Query command implementation - ranked clumps for every query record

use anyhow::{Context, Result};
use genofind_core::tile::reverse_complement;
use genofind_core::{
    io, read_file_header, AddressWidth, Alphabet, GenoFind, LoadMode, Offset, SoftMask, Strand,
    TranslatedIndex,
};
use rayon::prelude::*;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

type Records = [(String, Vec<u8>)];

pub fn execute(
    index: &Path,
    queries: &Path,
    mask_lower: bool,
    max_clumps: usize,
    mode: LoadMode,
) -> Result<()> {
    let header = read_file_header(index)
        .with_context(|| format!("Failed to read index header: {}", index.display()))?;
    let records = io::read_all(queries)
        .with_context(|| format!("Failed to read queries from {}", queries.display()))?;
    log::info!("Searching {} queries from {}", records.len(), queries.display());

    let reports = match (header.translated, header.width) {
        (false, AddressWidth::Narrow) => {
            search::<u32>(index, mode, &records, mask_lower, max_clumps)
        }
        (false, AddressWidth::Wide) => search::<u64>(index, mode, &records, mask_lower, max_clumps),
        (true, AddressWidth::Narrow) => search_translated::<u32>(index, mode, &records, max_clumps),
        (true, AddressWidth::Wide) => search_translated::<u64>(index, mode, &records, max_clumps),
    }?;

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    for report in reports {
        out.write_all(report.as_bytes())?;
    }
    out.flush()?;
    Ok(())
}

fn load<O: Offset>(path: &Path, mode: LoadMode) -> Result<GenoFind<O>> {
    GenoFind::load(path, mode).with_context(|| format!("Failed to load index: {}", path.display()))
}

/// DNA queries are searched on both strands, protein queries as given.
fn search<O: Offset>(
    path: &Path,
    mode: LoadMode,
    records: &Records,
    mask_lower: bool,
    max_clumps: usize,
) -> Result<Vec<String>> {
    let index = load::<O>(path, mode)?;
    let strands: &[Strand] = match index.alphabet() {
        Alphabet::Dna => &[Strand::Forward, Strand::Reverse],
        Alphabet::Protein => &[Strand::Forward],
    };

    records
        .par_iter()
        .map(|(name, seq)| -> Result<String> {
            let mut report = String::new();
            for &strand in strands {
                let query = match strand {
                    Strand::Forward => seq.clone(),
                    Strand::Reverse => reverse_complement(seq),
                };
                let mask = mask_lower.then(|| SoftMask::from_lower_case(&query));
                let search = index
                    .find_clumps(&query, mask.as_ref())
                    .with_context(|| format!("Search failed for query {}", name))?;
                writeln!(
                    report,
                    "{}\t{}\t{} hits\t{} clumps",
                    name,
                    strand,
                    search.hit_count,
                    search.clumps.len()
                )?;
                for clump in search.clumps.iter().take(max_clumps) {
                    writeln!(
                        report,
                        "  {}, coverage {}",
                        index.clump_summary(clump),
                        clump.query_coverage
                    )?;
                }
            }
            Ok(report)
        })
        .collect()
}

/// DNA queries translated in three frames against both target strands
fn search_translated<O: Offset>(
    path: &Path,
    mode: LoadMode,
    records: &Records,
    max_clumps: usize,
) -> Result<Vec<String>> {
    let index: TranslatedIndex<O> = TranslatedIndex::load(path, mode)
        .with_context(|| format!("Failed to load index: {}", path.display()))?;

    records
        .par_iter()
        .map(|(name, seq)| -> Result<String> {
            let mut report = String::new();
            for strand in [Strand::Forward, Strand::Reverse] {
                let search = index
                    .find_clumps_translated(strand, seq)
                    .with_context(|| format!("Search failed for query {}", name))?;
                writeln!(report, "{}\t{}\t{} hits", name, strand, search.hit_count)?;
                for frames in &search.frames {
                    let target = index.frame(strand, frames.target_frame);
                    for clump in frames.clumps.iter().take(max_clumps) {
                        writeln!(
                            report,
                            "  frame {}/{}: {}, coverage {}",
                            frames.query_frame,
                            frames.target_frame,
                            target.clump_summary(clump),
                            clump.query_coverage
                        )?;
                    }
                }
            }
            Ok(report)
        })
        .collect()
}
