use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use log::debug;

use crate::error::{LedgerError, Result};
use crate::geo;
use crate::schema::{Column, SalesRecord};

/// Field delimiter of the source ledger format.
pub const DELIMITER: u8 = b';';

/// Why a row was excluded during ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    WrongFieldCount { expected: usize, found: usize },
    InvalidDate { value: String },
    InvalidNumber { column: Column, value: String },
    NegativeValue { column: Column, value: f64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::WrongFieldCount { expected, found } => {
                write!(f, "expected {expected} fields, found {found}")
            }
            SkipReason::InvalidDate { value } => write!(f, "unparseable date '{value}'"),
            SkipReason::InvalidNumber { column, value } => {
                write!(f, "non-numeric {} '{value}'", column.source_name())
            }
            SkipReason::NegativeValue { column, value } => {
                write!(f, "negative {} {value}", column.source_name())
            }
        }
    }
}

/// A row-level ingestion failure. The row is skipped, never clamped or
/// coerced; the warning is kept for user-visible reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestWarning {
    /// 1-based line number in the source text.
    pub line: u64,
    pub reason: SkipReason,
}

impl fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Result of one ingestion pass over a source.
#[derive(Debug, Clone)]
pub struct ParsedLedger {
    pub records: Vec<SalesRecord>,
    /// Recognized columns in their original header order, kept for export.
    pub columns: Vec<Column>,
    pub warnings: Vec<IngestWarning>,
}

struct HeaderMap {
    columns: Vec<Column>,
    index: HashMap<Column, usize>,
    field_count: usize,
}

fn resolve_header(header: &StringRecord) -> Result<HeaderMap> {
    if header.len() == 0 || (header.len() == 1 && header[0].trim().is_empty()) {
        return Err(LedgerError::EmptyInput);
    }

    let mut columns = Vec::new();
    let mut index = HashMap::new();
    for (i, name) in header.iter().enumerate() {
        if let Some(col) = Column::from_source_name(name) {
            // First occurrence wins when a header name repeats.
            if !index.contains_key(&col) {
                index.insert(col, i);
                columns.push(col);
            }
        }
    }

    let missing: Vec<String> = Column::REQUIRED
        .iter()
        .filter(|c| !index.contains_key(c))
        .map(|c| c.source_name().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LedgerError::MissingColumns(missing));
    }

    Ok(HeaderMap {
        columns,
        index,
        field_count: header.len(),
    })
}

/// Normalizes a numeric field tolerant of locale variants and currency
/// markers, e.g. `1.234,56`, `1234.56`, `$1,234.56`, `1 234,56`, `Bs. 120`.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let mut s = raw.trim().to_string();
    for token in ["US$", "Bs.", "Bs", "$", "€"] {
        s = s.replace(token, "");
    }
    s.retain(|c| c != ' ');
    if s.is_empty() {
        return None;
    }

    // When both separators appear, the one occurring last is the decimal
    // point; the other marks thousands.
    match (s.rfind(','), s.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => {
            s = s.replace('.', "").replace(',', ".");
        }
        (Some(_), Some(_)) => {
            s = s.replace(',', "");
        }
        (Some(_), None) if s.matches(',').count() == 1 => {
            s = s.replace(',', ".");
        }
        (Some(_), None) => {
            // Multiple commas without a dot can only be thousands separators.
            s = s.replace(',', "");
        }
        (None, _) => {}
    }

    s.parse().ok()
}

/// Parses a ledger date. The source writes day-first dates; ISO dates are
/// accepted as well.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    for format in ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    None
}

fn parse_row(header: &HeaderMap, row: &StringRecord) -> std::result::Result<SalesRecord, SkipReason> {
    if row.len() != header.field_count {
        return Err(SkipReason::WrongFieldCount {
            expected: header.field_count,
            found: row.len(),
        });
    }

    let field = |col: Column| row[header.index[&col]].trim();
    let optional = |col: Column| {
        header
            .index
            .get(&col)
            .map(|&i| row[i].trim())
            .filter(|s| !s.is_empty())
    };

    let date_raw = field(Column::Date);
    let date = parse_date(date_raw).ok_or_else(|| SkipReason::InvalidDate {
        value: date_raw.to_string(),
    })?;

    let units_raw = field(Column::Units);
    let units = parse_number(units_raw)
        .filter(|u| u.fract() == 0.0)
        .ok_or_else(|| SkipReason::InvalidNumber {
            column: Column::Units,
            value: units_raw.to_string(),
        })?;
    if units < 0.0 {
        return Err(SkipReason::NegativeValue {
            column: Column::Units,
            value: units,
        });
    }

    let revenue_raw = field(Column::Revenue);
    let revenue = parse_number(revenue_raw).ok_or_else(|| SkipReason::InvalidNumber {
        column: Column::Revenue,
        value: revenue_raw.to_string(),
    })?;
    if revenue < 0.0 {
        return Err(SkipReason::NegativeValue {
            column: Column::Revenue,
            value: revenue,
        });
    }

    // Optional fields are best-effort: an unparseable cost becomes "no cost"
    // rather than invalidating the row.
    let cost = optional(Column::Cost).and_then(parse_number);

    let geo_raw = row[header.index[&Column::Geo]].to_string();

    Ok(SalesRecord {
        date,
        product: field(Column::Product).to_string(),
        client: field(Column::Client).to_string(),
        units: units as u32,
        revenue,
        cost,
        category: optional(Column::Category).map(str::to_string),
        city: optional(Column::City).map(str::to_string),
        zone: optional(Column::Zone).map(str::to_string),
        geo: geo::extract(&geo_raw),
        geo_raw,
    })
}

/// Parses a `;`-delimited sales ledger into typed records.
///
/// Ingestion is best-effort: malformed rows are skipped and reported as
/// warnings. The only fatal condition is a header row that cannot establish
/// the required column set.
pub fn parse_ledger<R: Read>(reader: R) -> Result<ParsedLedger> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .from_reader(reader);

    let header = resolve_header(csv_reader.headers()?)?;
    debug!(
        "resolved {} ledger columns ({} fields in header)",
        header.columns.len(),
        header.field_count
    );

    let mut records = Vec::new();
    let mut warnings = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or(i as u64 + 2);
        match parse_row(&header, &row) {
            Ok(record) => records.push(record),
            Err(reason) => {
                debug!("skipping line {line}: {reason}");
                warnings.push(IngestWarning { line, reason });
            }
        }
    }

    Ok(ParsedLedger {
        records,
        columns: header.columns,
        warnings,
    })
}
