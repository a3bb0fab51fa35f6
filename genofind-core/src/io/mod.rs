//! Sequence file input

pub mod fasta;

pub use fasta::{check_sequence_file, for_each_record, read_all};
