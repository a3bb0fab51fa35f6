//! Error types for index construction and querying
//!
//! Every failure here is fatal for the operation that raised it. Non-blocking
//! diagnostics are reported through `log::warn!` instead.

use crate::store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or querying a genoFind index
#[derive(Debug, Error)]
pub enum GenoFindError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Can only index up to {limit} bases with {width}-bit offsets, input has {total}; \
         rebuild with wide (64-bit) offsets"
    )]
    Capacity { total: u64, limit: u64, width: u32 },

    #[error("Duplicate sequence name: {0}")]
    DuplicateSource(String),

    #[error("Sequence file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Unrecognized sequence file type: {}", .0.display())]
    UnrecognizedFileType(PathBuf),

    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),

    #[error("Overused tile file error in {}: {message}", path.display())]
    Ooc { path: PathBuf, message: String },

    #[error("Couldn't find source for offset {0}")]
    SourceNotFound(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GenoFindError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn ooc<S: Into<String>>(path: impl Into<PathBuf>, message: S) -> Self {
        Self::Ooc {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True for errors that signal an internally inconsistent index rather
    /// than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::SourceNotFound(_))
    }
}

pub type GfResult<T> = Result<T, GenoFindError>;
