//! Backends for reading index files
//!
//! The loader only needs positioned reads of small header blocks and of whole
//! tables. `MappedStorage` answers table reads with zero-copy views into one
//! shared memory map; `StreamStorage` seeks and reads into owned buffers.

use super::table::{words_from_le, Table};
use super::{StoreError, StoreResult};
use crate::types::Word;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// How an index file is brought into memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Zero-copy views into a shared read-only mapping
    #[default]
    Mapped,
    /// Tables copied into owned buffers
    Streamed,
}

pub trait IndexStorage {
    /// File length in bytes
    fn len(&self) -> u64;

    /// Copy `len` bytes starting at `offset`
    fn read_bytes(&mut self, offset: u64, len: usize) -> StoreResult<Vec<u8>>;

    /// Table of `len` little-endian words starting at `offset`
    fn read_table<T: Word>(&mut self, offset: u64, len: usize) -> StoreResult<Table<T>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_range(offset: u64, len: u64, file_len: u64) -> StoreResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= file_len => Ok(()),
        _ => Err(StoreError::Corruption(format!(
            "{} bytes at {} run past end of file ({} bytes)",
            len, offset, file_len
        ))),
    }
}

pub struct MappedStorage {
    map: Arc<Mmap>,
}

impl MappedStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        if cfg!(target_endian = "big") {
            return Err(StoreError::UnsupportedHost(
                "memory-mapped indexes need a little-endian host, load streamed instead".into(),
            ));
        }
        let file = File::open(path.as_ref())?;
        // The file is written once through an atomic rename and never
        // modified in place afterwards.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self { map: Arc::new(map) })
    }
}

impl IndexStorage for MappedStorage {
    fn len(&self) -> u64 {
        self.map.len() as u64
    }

    fn read_bytes(&mut self, offset: u64, len: usize) -> StoreResult<Vec<u8>> {
        check_range(offset, len as u64, self.len())?;
        let start = offset as usize;
        Ok(self.map[start..start + len].to_vec())
    }

    fn read_table<T: Word>(&mut self, offset: u64, len: usize) -> StoreResult<Table<T>> {
        let bytes = (len as u64).saturating_mul(std::mem::size_of::<T>() as u64);
        check_range(offset, bytes, self.len())?;
        Table::mapped(self.map.clone(), offset as usize, len)
    }
}

pub struct StreamStorage {
    reader: BufReader<File>,
    len: u64,
}

impl StreamStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::with_capacity(1 << 20, file),
            len,
        })
    }
}

impl IndexStorage for StreamStorage {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_bytes(&mut self, offset: u64, len: usize) -> StoreResult<Vec<u8>> {
        check_range(offset, len as u64, self.len)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_table<T: Word>(&mut self, offset: u64, len: usize) -> StoreResult<Table<T>> {
        let bytes = (len as u64).saturating_mul(std::mem::size_of::<T>() as u64);
        check_range(offset, bytes, self.len)?;
        self.reader.seek(SeekFrom::Start(offset))?;
        let mut words = vec![<T as bytemuck::Zeroable>::zeroed(); len];
        self.reader
            .read_exact(bytemuck::cast_slice_mut(&mut words))?;
        words_from_le(&mut words);
        Ok(Table::Owned(words))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_file() -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"HEADER!!").unwrap();
        for v in [5u32, 6, 7, 8] {
            f.write_all(&v.to_le_bytes()).unwrap();
        }
        f.flush().unwrap();
        f
    }

    fn read_back<S: IndexStorage>(storage: &mut S) {
        assert_eq!(storage.len(), 24);
        assert_eq!(storage.read_bytes(0, 6).unwrap(), b"HEADER".to_vec());
        let t: Table<u32> = storage.read_table(8, 4).unwrap();
        assert_eq!(&t[..], &[5, 6, 7, 8]);
        assert!(storage.read_table::<u32>(16, 4).is_err());
        assert!(storage.read_bytes(20, 8).is_err());
    }

    #[test]
    fn streamed_reads() {
        let f = sample_file();
        let mut storage = StreamStorage::open(f.path()).unwrap();
        read_back(&mut storage);
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn mapped_reads() {
        let f = sample_file();
        let mut storage = MappedStorage::open(f.path()).unwrap();
        read_back(&mut storage);
        let t: Table<u32> = storage.read_table(8, 1).unwrap();
        assert!(t.is_mapped());
    }
}
