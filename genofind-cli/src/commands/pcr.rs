//! PCR command implementation - candidate products of a primer pair

use anyhow::{bail, Context, Result};
use genofind_core::{read_file_header, AddressWidth, GenoFind, LoadMode, Offset};
use std::path::Path;

pub fn execute(
    index: &Path,
    forward: &str,
    reverse: &str,
    min_distance: u64,
    max_distance: u64,
    mode: LoadMode,
) -> Result<()> {
    if min_distance > max_distance {
        bail!(
            "Minimum product size {} exceeds maximum {}",
            min_distance,
            max_distance
        );
    }
    let header = read_file_header(index)
        .with_context(|| format!("Failed to read index header: {}", index.display()))?;
    if header.translated {
        bail!("PCR needs a DNA index, {} is translated", index.display());
    }
    let primers = (forward.as_bytes(), reverse.as_bytes());
    match header.width {
        AddressWidth::Narrow => run::<u32>(index, mode, primers, min_distance, max_distance),
        AddressWidth::Wide => run::<u64>(index, mode, primers, min_distance, max_distance),
    }
}

fn run<O: Offset>(
    path: &Path,
    mode: LoadMode,
    (forward, reverse): (&[u8], &[u8]),
    min_distance: u64,
    max_distance: u64,
) -> Result<()> {
    let index: GenoFind<O> = GenoFind::load(path, mode)
        .with_context(|| format!("Failed to load index: {}", path.display()))?;
    let products = index
        .find_primer_pairs(forward, reverse, min_distance, max_distance)
        .context("Primer search failed")?;
    if products.is_empty() {
        log::info!("No products between {} and {} bases", min_distance, max_distance);
    }
    for product in &products {
        let src = index
            .sources()
            .get(product.source)
            .context("Product outside the source table")?;
        println!(
            "{}:{}-{}\t{} bp",
            src.name,
            product.t_start - src.start,
            product.t_end - src.start,
            product.target_len()
        );
    }
    Ok(())
}
