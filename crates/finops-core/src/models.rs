use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;
use std::fmt;

// ── Cell ──────────────────────────────────────────────────────────────────────

/// One value of a billing table, as produced by a CSV or spreadsheet reader.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// Blank field.
    Empty,
    /// Free text, kept exactly as read.
    Text(String),
    /// Whole number.
    Integer(i64),
    /// Floating-point number.
    Number(f64),
    /// Boolean cell (spreadsheets only).
    Bool(bool),
    /// Date or datetime, normalized to UTC.
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Build a text cell, mapping the empty string to [`Cell::Empty`].
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Numeric view of the cell, if it holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::DateTime(dt) => {
                if dt.hour() == 0 && dt.minute() == 0 && dt.second() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

/// Column-oriented table with vendor-defined column names.
///
/// All columns hold exactly [`Table::row_count`] cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<Column>,
    #[serde(skip)]
    rows: usize,
}

impl Table {
    /// Build a table from a header row and data rows.
    ///
    /// Short rows are padded with [`Cell::Empty`]; cells beyond the header
    /// width are discarded.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let rows_len = rows.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows_len)))
            .collect();

        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.cells.push(cells.next().unwrap_or(Cell::Empty));
            }
        }

        Self {
            columns,
            rows: rows_len,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// First column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Cells of the first column with the given name, editable in place.
    ///
    /// Only a slice is handed out so the column length cannot change.
    pub fn cells_mut(&mut self, name: &str) -> Option<&mut [Cell]> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| c.cells.as_mut_slice())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Position of the first column with the given name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Rename the column at `index`. Out-of-range indices are ignored.
    pub fn rename_column(&mut self, index: usize, name: impl Into<String>) {
        if let Some(column) = self.columns.get_mut(index) {
            column.name = name.into();
        }
    }

    /// Keep only the columns for which `keep(index, column)` is `true`.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(usize, &Column) -> bool) {
        let mut index = 0;
        self.columns.retain(|column| {
            let kept = keep(index, column);
            index += 1;
            kept
        });
    }

    /// Append a column, or replace the existing column with the same name.
    ///
    /// Returns `false` (leaving the table untouched) when the cell count does
    /// not match the table's row count.
    pub fn set_column(&mut self, column: Column) -> bool {
        if !self.columns.is_empty() && column.cells.len() != self.rows {
            return false;
        }
        if self.columns.is_empty() {
            self.rows = column.cells.len();
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        true
    }

    /// Render the whole table as plain text: a header line followed by one
    /// line per row, every column right-aligned to its widest value.
    pub fn to_text(&self) -> String {
        if self.columns.is_empty() {
            return "(empty table)".to_string();
        }

        let rendered: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| c.cells.iter().map(|cell| cell.to_string()).collect())
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .zip(&rendered)
            .map(|(column, values)| {
                values
                    .iter()
                    .map(|v| v.chars().count())
                    .chain(std::iter::once(column.name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut lines = Vec::with_capacity(self.rows + 1);
        lines.push(render_line(
            self.columns.iter().map(|c| c.name.as_str()),
            &widths,
        ));
        for row in 0..self.rows {
            lines.push(render_line(
                rendered.iter().map(|values| values[row].as_str()),
                &widths,
            ));
        }
        lines.join("\n")
    }
}

fn render_line<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    values
        .zip(widths)
        .map(|(value, width)| format!("{:>width$}", value, width = *width))
        .collect::<Vec<_>>()
        .join("  ")
}

// ── YearMonth ─────────────────────────────────────────────────────────────────

/// Calendar month bucket, ordered chronologically and displayed as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self::new(dt.year(), dt.month())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// ── Chunk ─────────────────────────────────────────────────────────────────────

/// What analytical finding a [`Chunk`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// Whole-table text dump used when the table cannot be analysed.
    RawDump,
    TotalSpend,
    Service,
    MonthlyTrend,
    SpendAlert,
    Regions,
    ResourceHeader,
    Resource,
    WasteHeader,
    Waste,
    LowestCostHeader,
    LowestCost,
}

/// One self-contained text block summarising a single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub kind: ChunkKind,
    pub text: String,
}

impl Chunk {
    pub fn new(kind: ChunkKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Join chunk texts with a blank line into a single document.
pub fn join_chunks(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// A value that is always usable, optionally flagged as produced through a
/// fallback path.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    /// The value plus the reasons it had to be degraded.
    Degraded(T, Vec<String>),
}

impl<T> Outcome<T> {
    /// `Ok` when `reasons` is empty, `Degraded` otherwise.
    pub fn with_reasons(value: T, reasons: Vec<String>) -> Self {
        if reasons.is_empty() {
            Outcome::Ok(value)
        } else {
            Outcome::Degraded(value, reasons)
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(..))
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Ok(value) | Outcome::Degraded(value, _) => value,
        }
    }

    pub fn reasons(&self) -> &[String] {
        match self {
            Outcome::Ok(_) => &[],
            Outcome::Degraded(_, reasons) => reasons,
        }
    }

    pub fn into_inner(self) -> T {
        self.into_parts().0
    }

    pub fn into_parts(self) -> (T, Vec<String>) {
        match self {
            Outcome::Ok(value) => (value, Vec::new()),
            Outcome::Degraded(value, reasons) => (value, reasons),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
