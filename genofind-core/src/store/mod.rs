//! Binary index files
//!
//! Layout (all integers little-endian):
//! - File header, 32 bytes: magic `GENOFIND`, version, address width,
//!   translated flag, index count, reserved
//! - One 112 byte sub-header per index
//! - Per index, each section 8-byte aligned: source table, tile counts
//!   (`u32`), positions (offset width), tails (`u16`, segmented only)
//!
//! Every section offset is planned before writing so the headers are emitted
//! once. Files are written to a temporary name and renamed into place.

mod storage;
mod table;

pub use storage::{IndexStorage, LoadMode, MappedStorage, StreamStorage};
pub use table::{write_words, Table};

use crate::error::{GenoFindError, GfResult};
use crate::index::{
    FlatTables, GenoFind, IndexLayout, IndexParams, SegmentedTables, TranslatedIndex,
};
use crate::source::{Source, SourceTable};
use crate::tile::{Alphabet, TileShape};
use crate::types::{AddressWidth, Offset};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

const MAGIC: &[u8; 8] = b"GENOFIND";
const VERSION: u32 = 1;
const FILE_HEADER_SIZE: u64 = 32;
const INDEX_HEADER_SIZE: u64 = 112;
const TRANSLATED_INDEXES: usize = 6;

const FLAG_ONE_MISMATCH: u32 = 1;
const FLAG_SIMPLE_REPEATS: u32 = 1 << 1;
const FLAG_MASK_UPPER: u32 = 1 << 2;
const FLAG_MASK_REPEATS: u32 = 1 << 3;

/// Errors reading or writing index files
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid magic bytes: not a genoFind index")]
    InvalidMagic,

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    #[error("Index was built with {found}-bit offsets, expected {expected}-bit")]
    AddressWidthMismatch { expected: u32, found: u32 },

    #[error("Translated flag mismatch: file has translated={found}")]
    TranslatedMismatch { found: bool },

    #[error("Data corruption: {0}")]
    Corruption(String),

    #[error("Table at byte {0} is not aligned for its word size")]
    Misaligned(u64),

    #[error("Unsupported host: {0}")]
    UnsupportedHost(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Fixed header at the start of every index file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u32,
    pub width: AddressWidth,
    pub translated: bool,
    pub index_count: u32,
}

impl FileHeader {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.width.bits())?;
        writer.write_u32::<LittleEndian>(self.translated as u32)?;
        writer.write_u32::<LittleEndian>(self.index_count)?;
        writer.write_u64::<LittleEndian>(0)?;
        Ok(())
    }

    fn read<R: Read>(reader: &mut R) -> StoreResult<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(StoreError::InvalidMagic);
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != VERSION {
            return Err(StoreError::UnsupportedVersion(version));
        }
        let bits = reader.read_u32::<LittleEndian>()?;
        let width = AddressWidth::from_bits(bits)
            .ok_or_else(|| StoreError::Corruption(format!("address width {}", bits)))?;
        let translated = reader.read_u32::<LittleEndian>()? != 0;
        let index_count = reader.read_u32::<LittleEndian>()?;
        let expected = if translated { TRANSLATED_INDEXES } else { 1 };
        if index_count as usize != expected {
            return Err(StoreError::Corruption(format!(
                "{} indexes in a {} file",
                index_count,
                if translated { "translated" } else { "plain" }
            )));
        }
        Ok(Self {
            version,
            width,
            translated,
            index_count,
        })
    }
}

/// Scalar parameters and section offsets of one index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct IndexHeader {
    tile_size: u32,
    step_size: u32,
    seg_size: u32,
    alphabet: u32,
    max_pat: u32,
    min_match: u32,
    max_gap: u32,
    flags: u32,
    tile_space: u64,
    total_seq_size: u64,
    source_count: u64,
    sources_offset: u64,
    sources_len: u64,
    sizes_offset: u64,
    list_offset: u64,
    entry_count: u64,
    tails_offset: u64,
}

impl IndexHeader {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for v in [
            self.tile_size,
            self.step_size,
            self.seg_size,
            self.alphabet,
            self.max_pat,
            self.min_match,
            self.max_gap,
            self.flags,
        ] {
            writer.write_u32::<LittleEndian>(v)?;
        }
        for v in [
            self.tile_space,
            self.total_seq_size,
            self.source_count,
            self.sources_offset,
            self.sources_len,
            self.sizes_offset,
            self.list_offset,
            self.entry_count,
            self.tails_offset,
            0,
        ] {
            writer.write_u64::<LittleEndian>(v)?;
        }
        Ok(())
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut h = IndexHeader {
            tile_size: reader.read_u32::<LittleEndian>()?,
            step_size: reader.read_u32::<LittleEndian>()?,
            seg_size: reader.read_u32::<LittleEndian>()?,
            alphabet: reader.read_u32::<LittleEndian>()?,
            max_pat: reader.read_u32::<LittleEndian>()?,
            min_match: reader.read_u32::<LittleEndian>()?,
            max_gap: reader.read_u32::<LittleEndian>()?,
            flags: reader.read_u32::<LittleEndian>()?,
            ..Default::default()
        };
        h.tile_space = reader.read_u64::<LittleEndian>()?;
        h.total_seq_size = reader.read_u64::<LittleEndian>()?;
        h.source_count = reader.read_u64::<LittleEndian>()?;
        h.sources_offset = reader.read_u64::<LittleEndian>()?;
        h.sources_len = reader.read_u64::<LittleEndian>()?;
        h.sizes_offset = reader.read_u64::<LittleEndian>()?;
        h.list_offset = reader.read_u64::<LittleEndian>()?;
        h.entry_count = reader.read_u64::<LittleEndian>()?;
        h.tails_offset = reader.read_u64::<LittleEndian>()?;
        let _reserved = reader.read_u64::<LittleEndian>()?;
        Ok(h)
    }

    fn params(&self) -> StoreResult<(IndexParams, TileShape)> {
        let alphabet = Alphabet::from_code(self.alphabet)
            .ok_or_else(|| StoreError::Corruption(format!("alphabet code {}", self.alphabet)))?;
        let tile_size = self.tile_size as usize;
        let seg_size = self.seg_size as usize;
        let shape = TileShape::new(alphabet, tile_size, Some(seg_size))
            .map_err(|e| StoreError::Corruption(format!("tile geometry: {}", e)))?;
        let default_seg = tile_size.saturating_sub(alphabet.max_head_size());
        let params = IndexParams {
            alphabet,
            tile_size,
            step_size: self.step_size as usize,
            min_match: self.min_match as usize,
            max_gap: self.max_gap as usize,
            max_pat: self.max_pat,
            allow_one_mismatch: self.flags & FLAG_ONE_MISMATCH != 0,
            simple_repeat_mask: self.flags & FLAG_SIMPLE_REPEATS != 0,
            mask_upper: self.flags & FLAG_MASK_UPPER != 0,
            mask_repeats: self.flags & FLAG_MASK_REPEATS != 0,
            seg_size: (seg_size != default_seg).then_some(seg_size),
            ooc_file: None,
        };
        Ok((params, shape))
    }
}

fn align8(offset: u64) -> u64 {
    (offset + 7) & !7
}

fn encode_sources(sources: &SourceTable) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    for source in sources {
        buf.write_u32::<LittleEndian>(source.name.len() as u32)?;
        buf.write_all(source.name.as_bytes())?;
        let file = source.file.as_deref().unwrap_or("");
        buf.write_u32::<LittleEndian>(file.len() as u32)?;
        buf.write_all(file.as_bytes())?;
        buf.write_u64::<LittleEndian>(source.start)?;
        buf.write_u64::<LittleEndian>(source.end)?;
    }
    Ok(buf)
}

fn read_string<R: Read>(reader: &mut R) -> StoreResult<String> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| StoreError::Corruption("source name is not UTF-8".into()))
}

fn decode_sources(bytes: &[u8], count: u64) -> GfResult<SourceTable> {
    let mut reader = Cursor::new(bytes);
    let mut sources = Vec::new();
    for _ in 0..count {
        let name = read_string(&mut reader)?;
        let file = read_string(&mut reader)?;
        let start = reader.read_u64::<LittleEndian>()?;
        let end = reader.read_u64::<LittleEndian>()?;
        if end < start {
            return Err(StoreError::Corruption(format!("source {} ends before it starts", name)).into());
        }
        let mut source = Source::new(name, start, end);
        if !file.is_empty() {
            source.file = Some(file);
        }
        sources.push(source);
    }
    SourceTable::from_sources(sources)
}

/// Sections of one index with their planned file offsets
struct IndexPlan<'a, O: Offset> {
    index: &'a GenoFind<O>,
    header: IndexHeader,
    sources: Vec<u8>,
}

fn plan<'a, O: Offset>(indexes: &[&'a GenoFind<O>]) -> io::Result<Vec<IndexPlan<'a, O>>> {
    let mut cursor = FILE_HEADER_SIZE + INDEX_HEADER_SIZE * indexes.len() as u64;
    let mut plans = Vec::with_capacity(indexes.len());
    for &index in indexes {
        let params = index.params();
        let shape = index.shape();
        let sources = encode_sources(index.sources())?;
        let entries = index.entry_count() as u64;

        let mut flags = 0;
        if params.allow_one_mismatch {
            flags |= FLAG_ONE_MISMATCH;
        }
        if params.simple_repeat_mask {
            flags |= FLAG_SIMPLE_REPEATS;
        }
        if params.mask_upper {
            flags |= FLAG_MASK_UPPER;
        }
        if params.mask_repeats {
            flags |= FLAG_MASK_REPEATS;
        }

        let sources_offset = align8(cursor);
        cursor = sources_offset + sources.len() as u64;
        let sizes_offset = align8(cursor);
        cursor = sizes_offset + 4 * index.tile_space_size() as u64;
        let list_offset = align8(cursor);
        cursor = list_offset + O::WIDTH.bits() as u64 / 8 * entries;
        let tails_offset = if shape.is_segmented() {
            let offset = align8(cursor);
            cursor = offset + 2 * entries;
            offset
        } else {
            0
        };

        let header = IndexHeader {
            tile_size: shape.tile_size as u32,
            step_size: params.step_size as u32,
            seg_size: shape.seg_size as u32,
            alphabet: shape.alphabet.code(),
            max_pat: params.max_pat,
            min_match: params.min_match as u32,
            max_gap: params.max_gap as u32,
            flags,
            tile_space: index.tile_space_size() as u64,
            total_seq_size: index.total_seq_size(),
            source_count: index.sources().len() as u64,
            sources_offset,
            sources_len: sources.len() as u64,
            sizes_offset,
            list_offset,
            entry_count: entries,
            tails_offset,
        };
        plans.push(IndexPlan {
            index,
            header,
            sources,
        });
    }
    Ok(plans)
}

/// Byte sink that knows its position, for alignment padding
struct SectionWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> SectionWriter<W> {
    fn pad_to(&mut self, offset: u64) -> io::Result<()> {
        debug_assert!(offset >= self.written);
        while self.written < offset {
            self.write_all(&[0])?;
        }
        Ok(())
    }
}

impl<W: Write> Write for SectionWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn write_indexes<O: Offset>(
    path: &Path,
    indexes: &[&GenoFind<O>],
    translated: bool,
) -> GfResult<()> {
    let plans = plan(indexes)?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = SectionWriter {
            inner: BufWriter::new(tmp.as_file_mut()),
            written: 0,
        };
        FileHeader {
            version: VERSION,
            width: O::WIDTH,
            translated,
            index_count: indexes.len() as u32,
        }
        .write(&mut writer)?;
        for p in &plans {
            p.header.write(&mut writer)?;
        }
        for p in &plans {
            writer.pad_to(p.header.sources_offset)?;
            writer.write_all(&p.sources)?;
            writer.pad_to(p.header.sizes_offset)?;
            write_words(&mut writer, p.index.list_sizes())?;
            writer.pad_to(p.header.list_offset)?;
            match p.index.layout() {
                IndexLayout::Flat(t) => write_words(&mut writer, t.positions())?,
                IndexLayout::Segmented(t) => {
                    write_words(&mut writer, t.positions())?;
                    writer.pad_to(p.header.tails_offset)?;
                    write_words(&mut writer, t.tails())?;
                }
            }
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| GenoFindError::Io(e.error))?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

fn read_index<O: Offset, S: IndexStorage>(
    storage: &mut S,
    header: &IndexHeader,
) -> GfResult<GenoFind<O>> {
    let (params, shape) = header.params()?;
    if header.tile_space != shape.tile_space_size() as u64 {
        return Err(StoreError::Corruption(format!(
            "tile space {} does not match tile size {}",
            header.tile_space, header.tile_size
        ))
        .into());
    }
    let source_bytes = storage.read_bytes(header.sources_offset, header.sources_len as usize)?;
    let sources = decode_sources(&source_bytes, header.source_count)?;
    if sources.total_size() > header.total_seq_size {
        return Err(StoreError::Corruption("sources run past the indexed size".into()).into());
    }

    let list_sizes: Table<u32> =
        storage.read_table(header.sizes_offset, header.tile_space as usize)?;
    let counted: u64 = list_sizes.iter().map(|&c| c as u64).sum();
    if counted != header.entry_count {
        return Err(StoreError::Corruption(format!(
            "tile counts sum to {} but {} entries are stored",
            counted, header.entry_count
        ))
        .into());
    }

    let entries = header.entry_count as usize;
    let positions: Table<O> = storage.read_table(header.list_offset, entries)?;
    let layout = if shape.is_segmented() {
        let tails: Table<u16> = storage.read_table(header.tails_offset, entries)?;
        IndexLayout::Segmented(SegmentedTables::new(&list_sizes, tails, positions))
    } else {
        IndexLayout::Flat(FlatTables::new(&list_sizes, positions))
    };
    Ok(GenoFind::from_parts(
        params,
        shape,
        sources,
        header.total_seq_size,
        list_sizes,
        layout,
    ))
}

fn read_indexes<O: Offset, S: IndexStorage>(
    storage: &mut S,
    translated: bool,
) -> GfResult<Vec<GenoFind<O>>> {
    if storage.is_empty() {
        return Err(StoreError::Corruption("index file is empty".into()).into());
    }
    let bytes = storage.read_bytes(0, FILE_HEADER_SIZE as usize)?;
    let file_header = FileHeader::read(&mut Cursor::new(bytes))?;
    if file_header.width != O::WIDTH {
        return Err(StoreError::AddressWidthMismatch {
            expected: O::WIDTH.bits(),
            found: file_header.width.bits(),
        }
        .into());
    }
    if file_header.translated != translated {
        return Err(StoreError::TranslatedMismatch {
            found: file_header.translated,
        }
        .into());
    }

    let count = file_header.index_count as usize;
    let bytes = storage.read_bytes(FILE_HEADER_SIZE, INDEX_HEADER_SIZE as usize * count)?;
    let mut reader = Cursor::new(bytes);
    let headers = (0..count)
        .map(|_| IndexHeader::read(&mut reader))
        .collect::<io::Result<Vec<_>>>()?;
    headers
        .iter()
        .map(|header| read_index(storage, header))
        .collect()
}

fn open_and_read<O: Offset>(path: &Path, mode: LoadMode, translated: bool) -> GfResult<Vec<GenoFind<O>>> {
    if !path.exists() {
        return Err(GenoFindError::MissingFile(path.to_path_buf()));
    }
    let indexes = match mode {
        LoadMode::Mapped => read_indexes(&mut MappedStorage::open(path)?, translated)?,
        LoadMode::Streamed => read_indexes(&mut StreamStorage::open(path)?, translated)?,
    };
    log::info!(
        "Loaded {} ({:?}, {} entries)",
        path.display(),
        mode,
        indexes.iter().map(|i| i.entry_count()).sum::<usize>()
    );
    Ok(indexes)
}

/// Header of an index file, e.g. to pick the offset width before loading
pub fn read_file_header<P: AsRef<Path>>(path: P) -> GfResult<FileHeader> {
    let mut storage = StreamStorage::open(path)?;
    let bytes = storage.read_bytes(0, FILE_HEADER_SIZE as usize)?;
    Ok(FileHeader::read(&mut Cursor::new(bytes))?)
}

impl<O: Offset> GenoFind<O> {
    /// Write the index to `path`, replacing any existing file atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> GfResult<()> {
        write_indexes(path.as_ref(), &[self], false)
    }

    pub fn load<P: AsRef<Path>>(path: P, mode: LoadMode) -> GfResult<Self> {
        let mut indexes = open_and_read(path.as_ref(), mode, false)?;
        indexes
            .pop()
            .ok_or_else(|| StoreError::Corruption("no index in file".into()).into())
    }
}

impl<O: Offset> TranslatedIndex<O> {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> GfResult<()> {
        let indexes: Vec<&GenoFind<O>> = self.indexes().iter().collect();
        write_indexes(path.as_ref(), &indexes, true)
    }

    pub fn load<P: AsRef<Path>>(path: P, mode: LoadMode) -> GfResult<Self> {
        let indexes = open_and_read(path.as_ref(), mode, true)?;
        Ok(TranslatedIndex::from_indexes(indexes))
    }
}
