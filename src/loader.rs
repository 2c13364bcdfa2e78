use std::path::{Path, PathBuf};

use log::info;

use crate::{error::PipelineError, io_utils};

/// Delimited text exactly as read: one string column per header field.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

pub fn load(
    path: &Path,
    delimiter: u8,
    encoding_label: Option<&str>,
) -> Result<RawTable, PipelineError> {
    let encoding = io_utils::resolve_encoding(encoding_label)?;
    info!(
        "Loading '{}' with delimiter '{}' and encoding {}",
        path.display(),
        io_utils::printable_delimiter(delimiter),
        encoding.name()
    );
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(path, &mut reader, encoding)?;
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(PipelineError::MalformedInput {
            path: path.to_path_buf(),
            reason: "missing header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|err| io_utils::csv_failure(path, err))?;
        rows.push(io_utils::decode_record(path, &record, encoding)?);
    }

    info!(
        "Loaded {} row(s) across {} column(s) from {:?}",
        rows.len(),
        headers.len(),
        path
    );
    Ok(RawTable {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}
