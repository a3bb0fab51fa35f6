use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "genofind")]
#[command(about = "genoFind - tiled k-mer index for fast approximate sequence search")]
#[command(version)]
#[command(long_about = "
genoFind indexes a collection of DNA or protein sequences by fixed-length tiles
and locates short queries in it by clumping co-linear tile hits.

Examples:
  genofind make-ooc --out 11.ooc hg38.fa.gz
  genofind build --out hg38.gfidx --ooc 11.ooc hg38.fa.gz
  genofind query hg38.gfidx reads.fa
  genofind region hg38.gfidx probe.fa --region chr7:1000000-1200000
  genofind pcr hg38.gfidx ctggtcttcgacctgcagga ttcgaggtcaccaacttgcg
  genofind info hg38.gfidx
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only warnings and errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index FASTA files and save the index
    Build {
        /// Sequence files (FASTA, optionally gzipped)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output index file
        #[arg(short, long)]
        out: PathBuf,

        /// Tile size
        #[arg(long)]
        tile_size: Option<usize>,

        /// Distance between indexed tiles
        #[arg(long)]
        step_size: Option<usize>,

        /// Hits needed for a clump
        #[arg(long)]
        min_match: Option<usize>,

        /// Largest diagonal gap inside a clump
        #[arg(long)]
        max_gap: Option<usize>,

        /// Tiles occurring this often are not indexed
        #[arg(long)]
        max_pat: Option<u32>,

        /// Force a head/tail split of the given tail length
        #[arg(long)]
        seg_size: Option<usize>,

        /// Overused tile file
        #[arg(long)]
        ooc: Option<PathBuf>,

        /// Sequences are proteins
        #[arg(long, conflicts_with = "translated")]
        protein: bool,

        /// Translate DNA in six frames and index the peptides
        #[arg(long)]
        translated: bool,

        /// Turn lower-case bases into N before translation
        #[arg(long, requires = "translated")]
        mask_repeats: bool,

        /// Tolerate one mismatch per tile (sequences are loaded into memory)
        #[arg(long)]
        one_mismatch: bool,

        /// 64-bit offsets for collections over 4 Gb
        #[arg(long)]
        wide: bool,
    },

    /// Write the overused tiles of FASTA files to an .ooc file
    MakeOoc {
        /// Sequence files (FASTA, optionally gzipped)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output .ooc file
        #[arg(short, long)]
        out: PathBuf,

        /// Tile size
        #[arg(long)]
        tile_size: Option<usize>,

        /// Tiles counted this often are written
        #[arg(long)]
        max_pat: Option<u32>,

        /// Kind of sequence counted
        #[arg(long, value_enum, default_value = "dna")]
        kind: OocType,
    },

    /// Find ranked clumps for every record of a query file
    Query {
        /// Index file
        index: PathBuf,

        /// Query sequences (FASTA)
        queries: PathBuf,

        /// Skip query tiles touching lower-case bases
        #[arg(long)]
        mask_lower: bool,

        /// Clumps printed per query and strand
        #[arg(long)]
        max_clumps: Option<usize>,

        /// Copy the index into memory instead of mapping it
        #[arg(long)]
        no_mmap: bool,
    },

    /// Find hits of each query inside one target region
    Region {
        /// Index file
        index: PathBuf,

        /// Query sequences (FASTA)
        queries: PathBuf,

        /// Target region as name:start-end (zero-based, end exclusive)
        #[arg(long)]
        region: String,

        /// Copy the index into memory instead of mapping it
        #[arg(long)]
        no_mmap: bool,
    },

    /// Find candidate PCR products of a primer pair
    Pcr {
        /// Index file
        index: PathBuf,

        /// Forward primer
        forward: String,

        /// Reverse primer, as ordered
        reverse: String,

        /// Shortest product
        #[arg(long)]
        min_distance: Option<u64>,

        /// Longest product
        #[arg(long)]
        max_distance: Option<u64>,

        /// Copy the index into memory instead of mapping it
        #[arg(long)]
        no_mmap: bool,
    },

    /// Show the header and statistics of an index file
    Info {
        /// Index file
        index: PathBuf,

        /// Sources listed per index
        #[arg(long, default_value = "10")]
        sources: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OocType {
    Dna,
    Protein,
    Translated,
}

fn setup_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet)?;

    let config = Config::load(cli.config.as_deref())?;

    let threads = cli.threads.unwrap_or(config.general.threads);
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set thread count")?;
    }

    match cli.command {
        Commands::Build {
            files,
            out,
            tile_size,
            step_size,
            min_match,
            max_gap,
            max_pat,
            seg_size,
            ooc,
            protein,
            translated,
            mask_repeats,
            one_mismatch,
            wide,
        } => {
            let options = commands::build::BuildOptions {
                tile_size,
                step_size,
                min_match,
                max_gap,
                max_pat,
                seg_size,
                ooc,
                protein,
                translated,
                mask_repeats,
                one_mismatch,
                wide,
            };
            commands::build::execute(&config, &files, &out, options)?;
        }
        Commands::MakeOoc {
            files,
            out,
            tile_size,
            max_pat,
            kind,
        } => {
            commands::make_ooc::execute(&config, &files, &out, tile_size, max_pat, kind)?;
        }
        Commands::Query {
            index,
            queries,
            mask_lower,
            max_clumps,
            no_mmap,
        } => {
            let mask_lower = mask_lower || config.query.mask_lower;
            let max_clumps = max_clumps.unwrap_or(config.query.max_clumps);
            let mode = commands::load_mode(no_mmap || config.general.no_mmap);
            commands::query::execute(&index, &queries, mask_lower, max_clumps, mode)?;
        }
        Commands::Region {
            index,
            queries,
            region,
            no_mmap,
        } => {
            let mode = commands::load_mode(no_mmap || config.general.no_mmap);
            commands::region::execute(&index, &queries, &region, mode)?;
        }
        Commands::Pcr {
            index,
            forward,
            reverse,
            min_distance,
            max_distance,
            no_mmap,
        } => {
            let min = min_distance.unwrap_or(config.pcr.min_distance);
            let max = max_distance.unwrap_or(config.pcr.max_distance);
            let mode = commands::load_mode(no_mmap || config.general.no_mmap);
            commands::pcr::execute(&index, &forward, &reverse, min, max, mode)?;
        }
        Commands::Info { index, sources } => {
            commands::info::execute(&index, sources)?;
        }
    }

    Ok(())
}
