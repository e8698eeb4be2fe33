//! Billing export discovery and loading.
//!
//! Turns CSV and spreadsheet bytes into raw [`Table`]s and locates candidate
//! input files on disk.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use calamine::{Data, Range, Reader};
use finops_core::error::{FinopsError, Result};
use finops_core::models::{Cell, Table};
use tracing::{debug, warn};

// ── Content types ─────────────────────────────────────────────────────────────

pub const CSV_MIME: &str = "text/csv";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME: &str = "application/vnd.ms-excel";
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// Extensions picked up when scanning a directory.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "csv", "xlsx", "xls", "pdf", "docx", "pptx", "html", "htm", "md", "txt",
];

/// Guess the declared content type of a file from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => CSV_MIME,
        "xlsx" | "xlsm" => XLSX_MIME,
        "xls" => XLS_MIME,
        _ => OCTET_STREAM_MIME,
    }
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Find all supported files recursively under `dir`, sorted by path.
pub fn find_billing_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Input path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| {
                        let ext = ext.to_string_lossy().to_lowercase();
                        SUPPORTED_EXTENSIONS.contains(&ext.as_str())
                    })
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

// ── CSV ───────────────────────────────────────────────────────────────────────

/// Parse CSV content into a raw table.
///
/// The first record is the header. Rows may have differing lengths; fully
/// blank rows are skipped. Returns an empty table (zero rows) rather than an
/// error when there is no data.
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| FinopsError::CsvParse(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| FinopsError::CsvParse(e.to_string()))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(infer_cell).collect());
    }

    debug!("read CSV: {} columns, {} rows", headers.len(), rows.len());
    Ok(Table::from_rows(headers, rows))
}

/// Infer a typed cell from a CSV field.
///
/// Blank → `Empty`, integer → `Integer`, finite float → `Number`, anything
/// else is kept verbatim as `Text`.
pub fn infer_cell(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cell::Empty;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Cell::Integer(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() {
            return Cell::Number(f);
        }
    }
    Cell::Text(raw.to_string())
}

// ── Spreadsheets ──────────────────────────────────────────────────────────────

/// Read the first sheet that holds a header row and at least one data row.
///
/// Sheets are visited in workbook order; later sheets are never read once a
/// data sheet is found. `Ok(None)` means every sheet was empty.
pub fn read_spreadsheet(bytes: &[u8]) -> Result<Option<Table>> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| FinopsError::Spreadsheet(e.to_string()))?;

    let names = workbook.sheet_names();
    let sheets = names.into_iter().map(|name| {
        workbook
            .worksheet_range(&name)
            .map(|range| (name, range))
            .map_err(|e| FinopsError::Spreadsheet(e.to_string()))
    });

    Ok(first_data_sheet(sheets)?.map(|(name, table)| {
        debug!(
            "using sheet '{}': {} columns, {} rows",
            name,
            table.columns().len(),
            table.row_count()
        );
        table
    }))
}

fn first_data_sheet<I>(sheets: I) -> Result<Option<(String, Table)>>
where
    I: IntoIterator<Item = Result<(String, Range<Data>)>>,
{
    for sheet in sheets {
        let (name, range) = sheet?;
        match range_to_table(&range) {
            Some(table) => return Ok(Some((name, table))),
            None => debug!("sheet '{}' has no data rows; skipping", name),
        }
    }
    Ok(None)
}

/// First row is the header; blank header cells are named `unnamed: <index>`.
fn range_to_table(range: &Range<Data>) -> Option<Table> {
    let mut rows = range.rows();
    let header = rows.next()?;
    let headers: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, data)| {
            let name = data_to_cell(data).to_string();
            if name.trim().is_empty() {
                format!("unnamed: {}", i)
            } else {
                name
            }
        })
        .collect();

    let data_rows: Vec<Vec<Cell>> = rows
        .filter(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .map(|row| row.iter().map(data_to_cell).collect())
        .collect();

    if headers.is_empty() || data_rows.is_empty() {
        return None;
    }
    Some(Table::from_rows(headers, data_rows))
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::text(s.clone()),
        Data::Int(i) => Cell::Integer(*i),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn range(values: &[&[Data]]) -> Range<Data> {
        let height = values.len() as u32;
        let width = values.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in values.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), value.clone());
            }
        }
        range
    }

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    // ── content_type_for ──────────────────────────────────────────────────────

    #[test]
    fn test_content_type_for_extensions() {
        assert_eq!(content_type_for(Path::new("bill.CSV")), CSV_MIME);
        assert_eq!(content_type_for(Path::new("bill.xlsx")), XLSX_MIME);
        assert_eq!(content_type_for(Path::new("old.xls")), XLS_MIME);
        assert_eq!(content_type_for(Path::new("invoice.pdf")), OCTET_STREAM_MIME);
        assert_eq!(content_type_for(Path::new("README")), OCTET_STREAM_MIME);
    }

    // ── find_billing_files ────────────────────────────────────────────────────

    #[test]
    fn test_find_billing_files_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("2024").join("02");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("b.csv"), "cost\n1\n").unwrap();
        std::fs::write(dir.path().join("a.pdf"), "%PDF").unwrap();
        std::fs::write(nested.join("c.xlsx"), "").unwrap();
        std::fs::write(dir.path().join("ignore.bin"), "").unwrap();

        let files = find_billing_files(dir.path());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(files.windows(2).all(|w| w[0] <= w[1]));
        assert!(!names.iter().any(|n| n.ends_with(".bin")));
    }

    #[test]
    fn test_find_billing_files_missing_dir() {
        assert!(find_billing_files(Path::new("/definitely/not/here")).is_empty());
    }

    // ── CSV ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_read_csv_infers_cells() {
        let data = "Service,Cost,UsageDate\nAWS EC2,$120.50,2024-01-01\naws ec2,80,\n";
        let table = read_csv(data.as_bytes()).unwrap();

        assert_eq!(table.column_names(), vec!["Service", "Cost", "UsageDate"]);
        assert_eq!(table.row_count(), 2);
        let cost = &table.column("Cost").unwrap().cells;
        assert_eq!(cost[0], Cell::Text("$120.50".to_string()));
        assert_eq!(cost[1], Cell::Integer(80));
        assert_eq!(table.column("UsageDate").unwrap().cells[1], Cell::Empty);
    }

    #[test]
    fn test_read_csv_skips_blank_rows_and_tolerates_ragged() {
        let data = "a,b,c\n1,2\n,,\n3,4,5,6\n";
        let table = read_csv(data.as_bytes()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("c").unwrap().cells, vec![Cell::Empty, Cell::Integer(5)]);
    }

    #[test]
    fn test_read_csv_header_only_is_empty_table() {
        let table = read_csv("cost,service\n".as_bytes()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 2);
    }

    #[test]
    fn test_read_csv_no_content() {
        let table = read_csv("".as_bytes()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_read_csv_invalid_utf8_is_error() {
        let bytes: &[u8] = b"cost\n\xff\xfe\n";
        assert!(matches!(read_csv(bytes), Err(FinopsError::CsvParse(_))));
    }

    #[test]
    fn test_infer_cell() {
        assert_eq!(infer_cell("  "), Cell::Empty);
        assert_eq!(infer_cell("42"), Cell::Integer(42));
        assert_eq!(infer_cell("4.5"), Cell::Number(4.5));
        assert_eq!(infer_cell("NaN"), Cell::Text("NaN".to_string()));
        assert_eq!(infer_cell(" us-east-1 "), Cell::Text(" us-east-1 ".to_string()));
    }

    // ── Spreadsheets ──────────────────────────────────────────────────────────

    #[test]
    fn test_read_spreadsheet_rejects_garbage() {
        let result = read_spreadsheet(b"definitely not a workbook");
        assert!(matches!(result, Err(FinopsError::Spreadsheet(_))));
    }

    #[test]
    fn test_range_to_table_converts_cells() {
        let r = range(&[
            &[s("Service"), s("Cost"), Data::Empty],
            &[s("EC2"), Data::Float(12.5), Data::Int(3)],
            &[Data::Empty, Data::Empty, Data::Empty],
            &[s("S3"), Data::Bool(true), Data::Empty],
        ]);
        let table = range_to_table(&r).unwrap();

        assert_eq!(table.column_names(), vec!["Service", "Cost", "unnamed: 2"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("Cost").unwrap().cells, vec![Cell::Number(12.5), Cell::Bool(true)]);
    }

    #[test]
    fn test_range_header_only_is_not_data() {
        let r = range(&[&[s("Service"), s("Cost")]]);
        assert!(range_to_table(&r).is_none());
    }

    #[test]
    fn test_first_data_sheet_skips_empty_and_ignores_later_sheets() {
        let sheets = vec![
            Ok(("Cover".to_string(), range(&[&[s("Title")]]))),
            Ok((
                "Costs".to_string(),
                range(&[&[s("cost")], &[Data::Float(1.0)]]),
            )),
            Ok((
                "Other".to_string(),
                range(&[&[s("amount")], &[Data::Float(9.0)]]),
            )),
        ];
        let (name, table) = first_data_sheet(sheets).unwrap().unwrap();
        assert_eq!(name, "Costs");
        assert_eq!(table.column_names(), vec!["cost"]);
    }

    #[test]
    fn test_first_data_sheet_none_when_all_empty() {
        let sheets = vec![Ok(("Only".to_string(), range(&[&[s("cost")]])))];
        assert!(first_data_sheet(sheets).unwrap().is_none());
    }

    #[test]
    fn test_first_data_sheet_propagates_read_error() {
        let sheets = vec![Err(FinopsError::Spreadsheet("corrupt".to_string()))];
        assert!(first_data_sheet(sheets).is_err());
    }
}
