use crate::error::Result;
use crate::extract::{first_sheet, header_index, is_csv, missing_column};
use crate::permalink::{self, Shortcode};
use crate::scanner::ScanRecord;
use calamine::Data;
use rust_xlsxwriter::{Workbook, Worksheet};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Marker for a requested post with no metadata on disk.
pub const NOT_FOUND: i64 = -1;

/// Header of the column written back into spreadsheets.
pub const COMMENT_COUNT_HEADER: &str = "Comment Count";

/// Total comment count per requested URL, summed across every folder holding
/// that post; [`NOT_FOUND`] when none does. Metadata without a comment count
/// contributes zero.
pub fn count_comments<I>(requested: &[String], records: I) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = ScanRecord>,
{
    let mut totals: HashMap<Shortcode, i64> = HashMap::new();
    for record in records {
        *totals.entry(record.shortcode).or_insert(0) += record.comment_count.unwrap_or(0) as i64;
    }

    let counts: BTreeMap<String, i64> = requested
        .iter()
        .map(|url| {
            let count = match permalink::parse(url) {
                Ok(code) => totals.get(&code).copied().unwrap_or(NOT_FOUND),
                Err(err) => {
                    warn!("{}", err);
                    NOT_FOUND
                }
            };
            (url.trim().to_string(), count)
        })
        .collect();

    info!(
        "{} of {} requested posts have comment counts",
        counts.values().filter(|c| **c != NOT_FOUND).count(),
        counts.len()
    );
    counts
}

/// Write `permalink,comment_count` rows in requested order.
pub fn write_comment_counts(
    path: &Path,
    requested: &[String],
    counts: &BTreeMap<String, i64>,
) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["permalink", "comment_count"])?;
    let mut rows = 0;
    for url in requested {
        let url = url.trim();
        let count = lookup(counts, url);
        writer.write_record([url, count.to_string().as_str()])?;
        rows += 1;
    }
    writer.flush()?;
    Ok(rows)
}

fn lookup(counts: &BTreeMap<String, i64>, url: &str) -> i64 {
    counts.get(url.trim()).copied().unwrap_or(NOT_FOUND)
}

/// Rewrite a spreadsheet in place with a `Comment Count` column filled from
/// `counts` by each row's `column` value. An existing `Comment Count` column
/// is overwritten. Only the first worksheet of a workbook survives.
pub fn annotate_spreadsheet(
    path: &Path,
    column: &str,
    counts: &BTreeMap<String, i64>,
) -> Result<usize> {
    let rows = if is_csv(path) {
        annotate_csv(path, column, counts)?
    } else {
        annotate_workbook(path, column, counts)?
    };
    info!("{} rows annotated in {}", rows, path.display());
    Ok(rows)
}

fn annotate_csv(path: &Path, column: &str, counts: &BTreeMap<String, i64>) -> Result<usize> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let url_col = header
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| missing_column(path, column))?;
    let count_col = match header.iter().position(|h| h.trim() == COMMENT_COUNT_HEADER) {
        Some(i) => i,
        None => {
            header.push(COMMENT_COUNT_HEADER.to_string());
            header.len() - 1
        }
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let mut row: Vec<String> = record?.iter().map(str::to_string).collect();
        row.resize(header.len(), String::new());
        row[count_col] = lookup(counts, &row[url_col]).to_string();
        rows.push(row);
    }
    drop(reader);

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&header)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}

fn annotate_workbook(path: &Path, column: &str, counts: &BTreeMap<String, i64>) -> Result<usize> {
    let (name, range) = first_sheet(path)?;
    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| missing_column(path, column))?;
    let url_col = header_index(header, path, column)?;
    let count_col = header
        .iter()
        .position(|cell| cell.to_string().trim() == COMMENT_COUNT_HEADER)
        .unwrap_or(header.len());

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(&name)?;
    write_row(sheet, 0, header, count_col)?;
    sheet.write_string(0, count_col as u16, COMMENT_COUNT_HEADER)?;

    let mut annotated = 0;
    for (i, row) in rows.enumerate() {
        let r = i as u32 + 1;
        write_row(sheet, r, row, count_col)?;
        let url = row.get(url_col).map(|c| c.to_string()).unwrap_or_default();
        sheet.write_number(r, count_col as u16, lookup(counts, &url) as f64)?;
        annotated += 1;
    }

    workbook.save(path)?;
    Ok(annotated)
}

/// Copy one row of cells, leaving `skip` free. Dates are written as text.
fn write_row(sheet: &mut Worksheet, row: u32, cells: &[Data], skip: usize) -> Result<()> {
    for (col, cell) in cells.iter().enumerate().filter(|(col, _)| *col != skip) {
        let col = col as u16;
        match cell {
            Data::Empty => {}
            Data::Int(i) => {
                sheet.write_number(row, col, *i as f64)?;
            }
            Data::Float(f) => {
                sheet.write_number(row, col, *f)?;
            }
            Data::Bool(b) => {
                sheet.write_boolean(row, col, *b)?;
            }
            Data::String(s) => {
                sheet.write_string(row, col, s)?;
            }
            other => {
                sheet.write_string(row, col, other.to_string())?;
            }
        }
    }
    Ok(())
}
