//! Command implementations for the genofind CLI

pub mod build;
pub mod info;
pub mod make_ooc;
pub mod pcr;
pub mod query;
pub mod region;

use genofind_core::LoadMode;

pub fn load_mode(no_mmap: bool) -> LoadMode {
    if no_mmap {
        LoadMode::Streamed
    } else {
        LoadMode::Mapped
    }
}
