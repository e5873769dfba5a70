use crate::data_models::{RawRecord, RawValue};
use crate::errors::ParseError;
use csv::ReaderBuilder;
use log::{debug, warn};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Raw rows of one delimited file, headers kept verbatim.
#[derive(Debug)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub records: Vec<RawRecord>,
    /// Records the CSV reader could not decode; skipped.
    pub malformed_rows: usize,
}

pub fn read_csv(file_path: &Path, delimiter: u8) -> Result<LoadedFile, ParseError> {
    let file = File::open(file_path).map_err(|e| ParseError::IoError {
        path: file_path.to_path_buf(),
        source: e,
    })?;
    read_csv_from(file, file_path, delimiter)
}

/// Reads header + records from any reader. `file_path` is only used for
/// error reporting.
pub fn read_csv_from<R: Read>(
    source: R,
    file_path: &Path,
    delimiter: u8,
) -> Result<LoadedFile, ParseError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| ParseError::HeaderReadError {
            path: file_path.to_path_buf(),
            source: e,
        })?
        .clone();
    if headers.is_empty() {
        return Err(ParseError::EmptyInput {
            path: file_path.to_path_buf(),
        });
    }

    let mut records = Vec::new();
    let mut malformed_rows = 0;
    for (row_index, result) in reader.records().enumerate() {
        // header is file row 1
        let file_row_num = row_index + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(
                    "Failed to read record at file row {} in {}: {}",
                    file_row_num,
                    file_path.display(),
                    e
                );
                malformed_rows += 1;
                continue;
            }
        };

        let mut record = RawRecord::new();
        for (name, cell) in headers.iter().zip(row.iter()) {
            let value = if cell.trim().is_empty() {
                RawValue::Empty
            } else {
                RawValue::Text(cell.to_string())
            };
            record.push(name, value);
        }
        if row.len() != headers.len() {
            debug!(
                "Row {} in {} has {} fields, header has {}",
                file_row_num,
                file_path.display(),
                row.len(),
                headers.len()
            );
        }
        records.push(record);
    }

    debug!(
        "Read {} records ({} malformed) from {}",
        records.len(),
        malformed_rows,
        file_path.display()
    );

    Ok(LoadedFile {
        path: file_path.to_path_buf(),
        records,
        malformed_rows,
    })
}
