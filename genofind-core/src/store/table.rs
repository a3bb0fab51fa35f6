//! Typed views over index tables
//!
//! A table is either an owned vector (freshly built or streamed from disk)
//! or a borrowed range of a shared memory map. Both deref to `&[T]`.

use super::{StoreError, StoreResult};
use crate::types::Word;
use memmap2::Mmap;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Table<T: Word> {
    Owned(Vec<T>),
    Mapped {
        map: Arc<Mmap>,
        offset: usize,
        len: usize,
        _marker: PhantomData<T>,
    },
}

impl<T: Word> Table<T> {
    /// View `len` words at byte `offset` of `map`. Bounds and alignment are
    /// checked here so later derefs cannot fail.
    pub fn mapped(map: Arc<Mmap>, offset: usize, len: usize) -> StoreResult<Self> {
        let size = std::mem::size_of::<T>();
        let end = len
            .checked_mul(size)
            .and_then(|n| offset.checked_add(n))
            .filter(|&end| end <= map.len())
            .ok_or_else(|| {
                StoreError::Corruption(format!(
                    "table of {} words at {} runs past end of file",
                    len, offset
                ))
            })?;
        bytemuck::try_cast_slice::<u8, T>(&map[offset..end])
            .map_err(|_| StoreError::Misaligned(offset as u64))?;
        Ok(Table::Mapped {
            map,
            offset,
            len,
            _marker: PhantomData,
        })
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Table::Mapped { .. })
    }

    pub fn byte_len(&self) -> usize {
        self.len() * std::mem::size_of::<T>()
    }
}

impl<T: Word> Default for Table<T> {
    fn default() -> Self {
        Table::Owned(Vec::new())
    }
}

impl<T: Word> From<Vec<T>> for Table<T> {
    fn from(v: Vec<T>) -> Self {
        Table::Owned(v)
    }
}

impl<T: Word> Deref for Table<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        match self {
            Table::Owned(v) => v,
            Table::Mapped {
                map, offset, len, ..
            } => {
                let end = offset + len * std::mem::size_of::<T>();
                bytemuck::cast_slice(&map[*offset..end])
            }
        }
    }
}

/// Write words little-endian.
pub fn write_words<W: Write, T: Word>(writer: &mut W, words: &[T]) -> io::Result<()> {
    if cfg!(target_endian = "little") {
        writer.write_all(bytemuck::cast_slice(words))
    } else {
        for &w in words {
            writer.write_all(bytemuck::bytes_of(&w.to_le()))?;
        }
        Ok(())
    }
}

/// Convert freshly read little-endian words in place.
pub fn words_from_le<T: Word>(words: &mut [T]) {
    if cfg!(target_endian = "big") {
        for w in words.iter_mut() {
            *w = w.from_le();
        }
    }
}
