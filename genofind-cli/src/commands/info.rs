//! Info command implementation - header and statistics of an index file

use anyhow::{Context, Result};
use genofind_core::{
    read_file_header, AddressWidth, GenoFind, LoadMode, Offset, Strand, TranslatedIndex,
};
use std::path::Path;

pub fn execute(index: &Path, max_sources: usize) -> Result<()> {
    let header = read_file_header(index)
        .with_context(|| format!("Failed to read index header: {}", index.display()))?;
    println!("File: {}", index.display());
    println!("Format version: {}", header.version);
    println!("Offsets: {}-bit", header.width.bits());
    println!("Translated: {}", header.translated);
    println!("Indexes: {}", header.index_count);

    match header.width {
        AddressWidth::Narrow => describe_file::<u32>(index, header.translated, max_sources),
        AddressWidth::Wide => describe_file::<u64>(index, header.translated, max_sources),
    }
}

fn describe_file<O: Offset>(path: &Path, translated: bool, max_sources: usize) -> Result<()> {
    let load_error = || format!("Failed to load index: {}", path.display());
    if translated {
        let index: TranslatedIndex<O> =
            TranslatedIndex::load(path, LoadMode::Mapped).with_context(load_error)?;
        for strand in [Strand::Forward, Strand::Reverse] {
            for frame in 0..3 {
                let label = format!("strand {} frame {}", strand, frame);
                describe(&label, index.frame(strand, frame), max_sources);
            }
        }
    } else {
        let index: GenoFind<O> = GenoFind::load(path, LoadMode::Mapped).with_context(load_error)?;
        describe("index", &index, max_sources);
    }
    Ok(())
}

fn describe<O: Offset>(label: &str, index: &GenoFind<O>, max_sources: usize) {
    let params = index.params();
    let shape = index.shape();
    let used_tiles = index.list_sizes().iter().filter(|&&n| n > 0).count();

    println!();
    println!("[{}]", label);
    println!("  Alphabet: {:?}", index.alphabet());
    println!("  Tile size: {}, step {}", shape.tile_size, params.step());
    if index.is_segmented() {
        println!(
            "  Layout: segmented, head {} + tail {}",
            shape.head_size(),
            shape.seg_size
        );
    } else {
        println!("  Layout: flat");
    }
    println!("  Hit finding: {}", index.hit_mode());
    println!(
        "  Min match {}, max gap {}, max pattern {}",
        params.min_match, params.max_gap, params.max_pat
    );
    println!(
        "  Tiles: {} stored, {} of {} tile values used",
        index.entry_count(),
        used_tiles,
        index.tile_space_size()
    );
    println!(
        "  Sequences: {}, {} symbols",
        index.sources().len(),
        index.total_seq_size()
    );
    for src in index.sources().iter().take(max_sources) {
        match &src.file {
            Some(file) => println!("    {}\t{}\t{}", src.name, src.len(), file),
            None => println!("    {}\t{}", src.name, src.len()),
        }
    }
    if index.sources().len() > max_sources {
        println!("    ... {} more", index.sources().len() - max_sources);
    }
}
