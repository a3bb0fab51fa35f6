//! genoFind Core Library
//!
//! Tiled k-mer index over a collection of DNA or protein sequences, hit
//! finding, clumping of hits into candidate alignment regions, in-silico PCR
//! and the binary index store.

pub mod error;
pub mod types;
pub mod tile;
pub mod mask;
pub mod source;
pub mod translate;
pub mod index;
pub mod hits;
pub mod clump;
pub mod pcr;
pub mod ooc;
pub mod store;
pub mod io;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types and functions
pub use clump::{clump_hits, Clump};
pub use error::{GenoFindError, GfResult};
pub use hits::{find_hits, Hit, HitMode, TargetRegion};
pub use index::{
    ClumpSearch, FrameClumps, GenoFind, IndexLayout, IndexParams, TranslatedIndex,
    TranslatedSearch,
};
pub use mask::SoftMask;
pub use ooc::{make_ooc, OocKind};
pub use source::{Source, SourceTable};
pub use store::{read_file_header, FileHeader, LoadMode, StoreError};
pub use tile::{Alphabet, TileShape};
pub use types::{AddressWidth, GenomicPos, Offset, Strand};

/// Version information for the genoFind core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
