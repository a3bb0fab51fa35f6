//! FASTA sequence files
//!
//! Records are streamed with needletail; `.gz` files go through a gzip
//! decoder first. Sequence names are the first word of the header line.

use crate::error::{GenoFindError, GfResult};
use flate2::read::GzDecoder;
use needletail::parser::SequenceRecord;
use needletail::{parse_fastx_file, parse_fastx_reader, FastxReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const SEQUENCE_EXTENSIONS: &[&str] = &["fa", "fasta", "fna", "faa", "fas", "ffn", "mfa", "seq"];

/// Fail early on files that are missing or not recognisably FASTA.
pub fn check_sequence_file(path: &Path) -> GfResult<()> {
    if !path.is_file() {
        return Err(GenoFindError::MissingFile(path.to_path_buf()));
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let known = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| SEQUENCE_EXTENSIONS.contains(&e));
    if known {
        Ok(())
    } else {
        Err(GenoFindError::UnrecognizedFileType(path.to_path_buf()))
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().map_or(false, |e| e.eq_ignore_ascii_case("gz"))
}

fn open_reader(path: &Path) -> GfResult<Box<dyn FastxReader>> {
    let parse_error = |e: needletail::errors::ParseError| {
        GenoFindError::InvalidSequence(format!("{}: {}", path.display(), e))
    };
    if is_gzipped(path) {
        let file = File::open(path)?;
        parse_fastx_reader(BufReader::new(GzDecoder::new(file))).map_err(parse_error)
    } else {
        parse_fastx_file(path).map_err(parse_error)
    }
}

fn record_name(record: &SequenceRecord) -> String {
    let id = String::from_utf8_lossy(record.id());
    id.split_whitespace().next().unwrap_or("").to_string()
}

/// Call `f(name, sequence)` for every record of `path`, in file order.
pub fn for_each_record<F>(path: &Path, mut f: F) -> GfResult<()>
where
    F: FnMut(&str, &[u8]) -> GfResult<()>,
{
    if std::fs::metadata(path)?.len() == 0 {
        log::warn!("{} is empty", path.display());
        return Ok(());
    }
    let mut reader = open_reader(path)?;
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| {
            GenoFindError::InvalidSequence(format!("{}: {}", path.display(), e))
        })?;
        let name = record_name(&record);
        let seq = record.seq();
        f(&name, &seq)?;
    }
    Ok(())
}

/// Read every record of `path` into memory.
pub fn read_all(path: &Path) -> GfResult<Vec<(String, Vec<u8>)>> {
    let mut records = Vec::new();
    for_each_record(path, |name, seq| {
        records.push((name.to_string(), seq.to_vec()));
        Ok(())
    })?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const RECORDS: &str = ">chr1 first chromosome\nACGTACGT\nacgtNN\n>chr2\nGGGCCC\n";

    #[test]
    fn records_stream_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.fa");
        std::fs::write(&path, RECORDS).unwrap();
        check_sequence_file(&path).unwrap();
        let records = read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "chr1");
        assert_eq!(records[0].1, b"ACGTACGTacgtNN".to_vec());
        assert_eq!(records[1], ("chr2".to_string(), b"GGGCCC".to_vec()));
    }

    #[test]
    fn gzipped_files_are_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.fa.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(RECORDS.as_bytes()).unwrap();
        enc.finish().unwrap();
        check_sequence_file(&path).unwrap();
        let names: Vec<_> = read_all(&path).unwrap().into_iter().map(|r| r.0).collect();
        assert_eq!(names, vec!["chr1", "chr2"]);
    }

    #[test]
    fn unknown_and_missing_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.bam");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(
            check_sequence_file(&path),
            Err(GenoFindError::UnrecognizedFileType(_))
        ));
        assert!(matches!(
            check_sequence_file(&dir.path().join("absent.fa")),
            Err(GenoFindError::MissingFile(_))
        ));
    }

    #[test]
    fn callback_errors_stop_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.fasta");
        std::fs::write(&path, RECORDS).unwrap();
        let mut seen = 0;
        let result = for_each_record(&path, |name, _| {
            seen += 1;
            Err(GenoFindError::DuplicateSource(name.to_string()))
        });
        assert!(result.is_err());
        assert_eq!(seen, 1);
    }
}
