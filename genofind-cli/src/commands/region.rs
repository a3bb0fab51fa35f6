//! Region command implementation - hits restricted to one target region

use anyhow::{anyhow, bail, Context, Result};
use genofind_core::{io, read_file_header, AddressWidth, GenoFind, LoadMode, Offset};
use regex::Regex;
use std::path::Path;

/// Target region parsed from `name:start-end`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub start: u64,
    pub end: u64,
}

pub fn parse_region(text: &str) -> Result<Region> {
    let re = Regex::new(r"^([^\s:]+):([0-9,]+)-([0-9,]+)$")?;
    let caps = re
        .captures(text.trim())
        .ok_or_else(|| anyhow!("Invalid region '{}', expected name:start-end", text))?;
    let number = |i: usize| -> Result<u64> {
        let digits = caps[i].replace(',', "");
        digits
            .parse()
            .with_context(|| format!("Invalid coordinate '{}' in region {}", &caps[i], text))
    };
    let region = Region {
        name: caps[1].to_string(),
        start: number(2)?,
        end: number(3)?,
    };
    if region.start >= region.end {
        bail!("Region {} is empty", text);
    }
    Ok(region)
}

pub fn execute(index: &Path, queries: &Path, region: &str, mode: LoadMode) -> Result<()> {
    let region = parse_region(region)?;
    let header = read_file_header(index)
        .with_context(|| format!("Failed to read index header: {}", index.display()))?;
    if header.translated {
        bail!("Region search needs a DNA or protein index, {} is translated", index.display());
    }
    let records = io::read_all(queries)
        .with_context(|| format!("Failed to read queries from {}", queries.display()))?;

    match header.width {
        AddressWidth::Narrow => run::<u32>(index, mode, &region, &records),
        AddressWidth::Wide => run::<u64>(index, mode, &region, &records),
    }
}

fn run<O: Offset>(
    path: &Path,
    mode: LoadMode,
    region: &Region,
    records: &[(String, Vec<u8>)],
) -> Result<()> {
    let index: GenoFind<O> = GenoFind::load(path, mode)
        .with_context(|| format!("Failed to load index: {}", path.display()))?;
    let (source, src) = index
        .find_named_source(&region.name)
        .ok_or_else(|| anyhow!("No sequence named {} in {}", region.name, path.display()))?;
    if region.end > src.len() {
        log::warn!(
            "Region end {} is past the end of {} ({} bases), clipped",
            region.end,
            src.name,
            src.len()
        );
    }

    for (name, seq) in records {
        let hits = index
            .find_hits_in_region(seq, None, source, region.start, region.end)
            .with_context(|| format!("Search failed for query {}", name))?;
        println!("{}\t{}:{}-{}\t{} hits", name, src.name, region.start, region.end, hits.len());
        for hit in hits {
            println!("  {}\t{}", hit.q_start, hit.t_start);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        let region = parse_region("chr7:1,000,000-1,200,000").unwrap();
        assert_eq!(
            region,
            Region {
                name: "chr7".to_string(),
                start: 1_000_000,
                end: 1_200_000
            }
        );
        assert_eq!(parse_region(" scaffold_1:0-10 ").unwrap().end, 10);
    }

    #[test]
    fn test_parse_region_rejects_bad_input() {
        assert!(parse_region("chr7").is_err());
        assert!(parse_region("chr7:100-50").is_err());
        assert!(parse_region("chr7:-5-10").is_err());
        assert!(parse_region("chr 7:1-10").is_err());
    }
}
