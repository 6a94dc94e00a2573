//! Spreadsheet URL extractor.
//!
//! Reads the permalink column from each input file on the rayon pool and
//! concatenates the results in input order. Downstream numbering relies on
//! that order being stable across runs.

use crate::error::{Error, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, error, info};

/// Extract the `column` values of every file, in file order then row order.
/// A file that cannot be read contributes nothing.
pub fn extract_urls<P: AsRef<Path> + Sync>(paths: &[P], column: &str) -> Vec<String> {
    let per_file: Vec<Vec<String>> = paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            match read_urls(path, column) {
                Ok(urls) => {
                    debug!("{} urls read from {}", urls.len(), path.display());
                    urls
                }
                Err(err) => {
                    error!("Error reading {}: {}", path.display(), err);
                    Vec::new()
                }
            }
        })
        .collect();

    let urls: Vec<String> = per_file.into_iter().flatten().collect();
    info!("{} urls extracted from {} files", urls.len(), paths.len());
    urls
}

/// Read one spreadsheet's `column`. `.csv` files go through the csv reader,
/// everything else through calamine (first worksheet, first row as header).
pub fn read_urls(path: &Path, column: &str) -> Result<Vec<String>> {
    if is_csv(path) {
        read_csv_column(path, column)
    } else {
        read_workbook_column(path, column)
    }
}

pub(crate) fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn read_csv_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let index = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| missing_column(path, column))?;

    let mut urls = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index).map(str::trim).filter(|v| !v.is_empty()) {
            urls.push(value.to_string());
        }
    }
    Ok(urls)
}

/// Name and cells of the first worksheet.
pub(crate) fn first_sheet(path: &Path) -> Result<(String, Range<Data>)> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| Error::Other(format!("{} has no worksheets", path.display())))?;
    let range = workbook.worksheet_range(&sheet)?;
    Ok((sheet, range))
}

/// Index of the header cell equal to `column` after trimming.
pub(crate) fn header_index(header: &[Data], path: &Path, column: &str) -> Result<usize> {
    header
        .iter()
        .position(|cell| cell.to_string().trim() == column)
        .ok_or_else(|| missing_column(path, column))
}

fn read_workbook_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let (_, range) = first_sheet(path)?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| missing_column(path, column))?;
    let index = header_index(header, path, column)?;

    Ok(rows
        .filter_map(|row| row.get(index))
        .filter(|cell| !matches!(cell, Data::Empty))
        .map(|cell| cell.to_string().trim().to_string())
        .filter(|value| !value.is_empty())
        .collect())
}

pub(crate) fn missing_column(path: &Path, column: &str) -> Error {
    Error::MissingColumn {
        column: column.to_string(),
        path: path.to_path_buf(),
    }
}
