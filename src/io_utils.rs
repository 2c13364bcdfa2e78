//! I/O utilities for CSV reading, encoding, and delimiter handling.
//!
//! All file access in censo-indigena flows through this module. It provides:
//!
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Reader construction**: `open_csv_reader` and `open_csv_reader_from_path`.
//! - **stdin**: the `-` path convention routes through the standard input stream.
//! - **Error mapping**: I/O and CSV failures become typed [`PipelineError`]s so
//!   callers can tell a missing file from a malformed one.

use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

use encoding_rs::{Encoding, UTF_8};

use crate::error::PipelineError;

pub const DEFAULT_DELIMITER: u8 = b';';
pub const DEFAULT_ENCODING: &str = "utf-8";

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding, PipelineError> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| PipelineError::UnknownEncoding(value.to_string()))
    } else {
        Ok(UTF_8)
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> Result<csv::Reader<Box<dyn Read>>, PipelineError> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(io::stdin().lock())
    } else {
        let file = File::open(path).map_err(|err| open_failure(path, err))?;
        Box::new(BufReader::new(file))
    };
    Ok(open_csv_reader(reader, delimiter))
}

fn open_failure(path: &Path, err: io::Error) -> PipelineError {
    if err.kind() == io::ErrorKind::NotFound {
        PipelineError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        PipelineError::IoFailure {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

pub fn csv_failure(path: &Path, err: csv::Error) -> PipelineError {
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => PipelineError::IoFailure {
            path: path.to_path_buf(),
            source,
        },
        _ => PipelineError::MalformedInput {
            path: path.to_path_buf(),
            reason,
        },
    }
}

pub fn decode_bytes(
    path: &Path,
    bytes: &[u8],
    encoding: &'static Encoding,
) -> Result<String, PipelineError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(PipelineError::MalformedInput {
            path: path.to_path_buf(),
            reason: format!("Failed to decode text with encoding {}", encoding.name()),
        })
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(
    path: &Path,
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> Result<Vec<String>, PipelineError> {
    record
        .iter()
        .map(|field| decode_bytes(path, field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    path: &Path,
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>, PipelineError>
where
    R: Read,
{
    let headers = reader
        .byte_headers()
        .map_err(|err| csv_failure(path, err))?
        .clone();
    decode_record(path, &headers, encoding)
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn resolve_encoding_defaults_to_utf8_and_rejects_unknown_labels() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(resolve_encoding(Some(" latin1 ")).unwrap(), WINDOWS_1252);
        assert!(matches!(
            resolve_encoding(Some("klingon")),
            Err(PipelineError::UnknownEncoding(label)) if label == "klingon"
        ));
    }

    #[test]
    fn decode_bytes_flags_invalid_utf8() {
        let path = Path::new("input.csv");
        assert_eq!(
            decode_bytes(path, "Não".as_bytes(), UTF_8).unwrap(),
            "Não"
        );
        let err = decode_bytes(path, &[0x4e, 0xe3, 0x6f], UTF_8).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput { .. }));
    }

    #[test]
    fn decode_bytes_supports_latin1() {
        let path = Path::new("input.csv");
        let decoded = decode_bytes(path, &[0x4e, 0xe3, 0x6f], WINDOWS_1252).unwrap();
        assert_eq!(decoded, "Não");
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let result = open_csv_reader_from_path(Path::new("definitely/not/here.csv"), b';');
        assert!(matches!(result, Err(PipelineError::NotFound { .. })));
    }

    #[test]
    fn printable_delimiter_escapes_tab() {
        assert_eq!(printable_delimiter(b'\t'), "\\t");
        assert_eq!(printable_delimiter(b';'), ";");
    }
}
