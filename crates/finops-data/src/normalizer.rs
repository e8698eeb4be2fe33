//! Column normalization for vendor billing exports.
//!
//! Maps AWS / Azure / GCP column names onto the canonical billing schema and
//! cleans the values of the mapped columns. Nothing here fails: malformed
//! values degrade to safe defaults and the reasons are reported through
//! [`Outcome::Degraded`].

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use finops_core::dates::parse_datetime;
use finops_core::models::{Cell, Column, Outcome, Table, YearMonth};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

// ── Canonical schema ──────────────────────────────────────────────────────────

/// A column of the canonical billing schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Cost,
    Service,
    Date,
    Region,
    ResourceId,
}

impl CanonicalField {
    /// Column name used in a [`BillingTable`].
    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Cost => "cost",
            CanonicalField::Service => "service",
            CanonicalField::Date => "date",
            CanonicalField::Region => "region",
            CanonicalField::ResourceId => "resource_id",
        }
    }
}

/// Vendor column names recognised for each canonical field, highest priority
/// first. Evaluated top to bottom; within a field the first synonym present in
/// the table is the one that gets mapped.
pub const COLUMN_SYNONYMS: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::Cost,
        &["unblendedcost", "pretaxcost", "totalcost", "cost", "amount"],
    ),
    (
        CanonicalField::Service,
        &["productname", "servicename", "service", "metercategory", "product"],
    ),
    (
        CanonicalField::Date,
        &[
            "usagestartdate",
            "billingperiodstartdate",
            "usage_date",
            "date",
            "usage_start_time",
        ],
    ),
    (
        CanonicalField::Region,
        &["availabilityzone", "region", "location", "usage_region"],
    ),
    (
        CanonicalField::ResourceId,
        &["resourceid", "instanceid", "resource_name", "resource"],
    ),
];

/// Name of the derived calendar-month column.
pub const MONTH_COLUMN: &str = "month";

// ── BillingTable ──────────────────────────────────────────────────────────────

/// A billing table whose mapped columns follow the canonical schema.
///
/// Only [`normalize`] builds one, so `cost` (when present) always holds finite
/// numbers, `date` holds parsed datetimes or blanks, and the text columns are
/// trimmed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BillingTable {
    table: Table,
}

impl BillingTable {
    pub fn has(&self, field: CanonicalField) -> bool {
        self.table.has_column(field.name())
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    pub fn as_table(&self) -> &Table {
        &self.table
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    /// Per-row cost, or `None` if the table has no cost column.
    pub fn costs(&self) -> Option<Vec<f64>> {
        let column = self.table.column(CanonicalField::Cost.name())?;
        Some(
            column
                .cells
                .iter()
                .map(|c| c.as_f64().unwrap_or(0.0))
                .collect(),
        )
    }

    /// Per-row text of a text field, or `None` if the column is absent.
    pub fn texts(&self, field: CanonicalField) -> Option<Vec<String>> {
        let column = self.table.column(field.name())?;
        Some(column.cells.iter().map(|c| c.to_string()).collect())
    }

    /// Per-row parsed date, or `None` if the table has no date column.
    pub fn dates(&self) -> Option<Vec<Option<NaiveDateTime>>> {
        let column = self.table.column(CanonicalField::Date.name())?;
        Some(column.cells.iter().map(Cell::as_datetime).collect())
    }

    /// Per-row calendar month derived from `date`.
    pub fn months(&self) -> Option<Vec<Option<YearMonth>>> {
        self.dates().map(|dates| {
            dates
                .iter()
                .map(|d| d.as_ref().map(YearMonth::from_datetime))
                .collect()
        })
    }

    /// Add (or replace) the `month` column derived from `date`.
    ///
    /// Returns `false` when there is no date column.
    pub fn add_month_column(&mut self) -> bool {
        let Some(months) = self.months() else {
            return false;
        };
        let cells = months
            .into_iter()
            .map(|m| m.map(|m| Cell::Text(m.to_string())).unwrap_or(Cell::Empty))
            .collect();
        self.table.set_column(Column::new(MONTH_COLUMN, cells))
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Normalize a raw table into a [`BillingTable`].
///
/// 1. Lower-case and trim every column name.
/// 2. Rename the highest-priority synonym of each canonical field.
/// 3. Coerce `cost` to numbers (`$` and `,` stripped, failures become 0.0).
/// 4. Trim `service`, `region`, `resource_id`; title-case `service`.
/// 5. Parse `date`; unparseable values become blank.
///
/// The row count never changes. Applying it to an already-normalized table
/// yields the same table.
pub fn normalize(raw: Table) -> Outcome<BillingTable> {
    let mut table = raw;
    let mut reasons = Vec::new();

    for index in 0..table.columns().len() {
        let name = table.columns()[index].name.trim().to_lowercase();
        table.rename_column(index, name);
    }

    apply_column_map(&mut table, &mut reasons);

    if let Some(cells) = table.cells_mut(CanonicalField::Cost.name()) {
        let unparsed = clean_cost_column(cells);
        if unparsed > 0 {
            reasons.push(format!(
                "{} cost value(s) could not be parsed and were set to 0.0",
                unparsed
            ));
        }
    }

    for field in [
        CanonicalField::Service,
        CanonicalField::Region,
        CanonicalField::ResourceId,
    ] {
        if let Some(cells) = table.cells_mut(field.name()) {
            clean_text_column(cells, field == CanonicalField::Service);
        }
    }

    if let Some(cells) = table.cells_mut(CanonicalField::Date.name()) {
        let unparsed = parse_date_column(cells);
        if unparsed > 0 {
            reasons.push(format!(
                "{} date value(s) could not be parsed and were left blank",
                unparsed
            ));
        }
    }

    debug!(
        "normalized table: {} rows, columns {:?}",
        table.row_count(),
        table.column_names()
    );

    Outcome::with_reasons(BillingTable { table }, reasons)
}

/// [`normalize`], logging any degradation and returning the table.
pub fn normalize_columns(raw: Table) -> BillingTable {
    let (table, reasons) = normalize(raw).into_parts();
    for reason in &reasons {
        warn!("normalization: {}", reason);
    }
    table
}

/// Coerce one cost cell to a number.
///
/// Returns `None` when the cell held something that is not a number, even
/// after stripping `$` and `,`. Blank cells count as `0.0`.
pub fn clean_cost(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Empty => return Some(0.0),
        Cell::Integer(i) => *i as f64,
        Cell::Number(n) => *n,
        Cell::Bool(b) => f64::from(u8::from(*b)),
        Cell::Text(s) => {
            let stripped = currency_noise().replace_all(s, "");
            let trimmed = stripped.trim();
            if trimmed.is_empty() {
                return Some(0.0);
            }
            trimmed.parse::<f64>().ok()?
        }
        Cell::DateTime(_) => return None,
    };
    value.is_finite().then_some(value)
}

/// Naive per-word capitalisation: a letter is upper-cased when the previous
/// character is not a letter and lower-cased otherwise.
///
/// ```
/// use finops_data::normalizer::title_case;
///
/// assert_eq!(title_case("AMAZON EC2"), "Amazon Ec2");
/// assert_eq!(title_case("ec2x"), "Ec2X");
/// ```
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_letter = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn currency_noise() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[$,]").expect("regex is valid"))
}

/// Rename the first matching synonym of every canonical field.
///
/// Any other column already carrying the canonical name is dropped so that
/// lookups by name always reach the mapped column.
fn apply_column_map(table: &mut Table, reasons: &mut Vec<String>) {
    for (field, synonyms) in COLUMN_SYNONYMS {
        let canonical = field.name();
        let Some(index) = synonyms.iter().find_map(|s| table.position(s)) else {
            continue;
        };

        let source = table.columns()[index].name.clone();
        if source != canonical {
            debug!("mapping column '{}' -> '{}'", source, canonical);
        }

        let shadowed: Vec<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(i, c)| *i != index && c.name == canonical)
            .map(|(i, _)| i)
            .collect();

        table.rename_column(index, canonical);

        if !shadowed.is_empty() {
            reasons.push(format!(
                "dropped {} column(s) named '{}' shadowed by mapped column '{}'",
                shadowed.len(),
                canonical,
                source
            ));
            table.retain_columns(|i, _| !shadowed.contains(&i));
        }
    }
}

/// Returns the number of cells that could not be parsed.
fn clean_cost_column(cells: &mut [Cell]) -> usize {
    let mut unparsed = 0;
    for cell in cells.iter_mut() {
        let value = clean_cost(cell).unwrap_or_else(|| {
            unparsed += 1;
            0.0
        });
        *cell = Cell::Number(value);
    }
    unparsed
}

fn clean_text_column(cells: &mut [Cell], title: bool) {
    for cell in cells.iter_mut() {
        let rendered = cell.to_string();
        let trimmed = rendered.trim();
        *cell = if title {
            Cell::text(title_case(trimmed))
        } else {
            Cell::text(trimmed)
        };
    }
}

/// Returns the number of non-blank cells that could not be parsed.
fn parse_date_column(cells: &mut [Cell]) -> usize {
    let mut unparsed = 0;
    for cell in cells.iter_mut() {
        let parsed = match cell {
            Cell::DateTime(dt) => Some(*dt),
            Cell::Empty => None,
            Cell::Text(s) => parse_datetime(s),
            Cell::Integer(i) => parse_datetime(&i.to_string()),
            Cell::Number(_) | Cell::Bool(_) => None,
        };
        if parsed.is_none() && !cell.is_empty() {
            unparsed += 1;
        }
        *cell = parsed.map(Cell::DateTime).unwrap_or(Cell::Empty);
    }
    unparsed
}

// ── Tests ─────────────────────────────────────────────────────────────────────
