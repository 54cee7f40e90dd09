//! Row-oriented sensor dataset parsed from CSV
//!
//! Header order and cell text are preserved so the dataset can be exported
//! again with a label column appended.

use crate::error::{Result, RiskError};
use crate::features::FieldSource;
use chrono::{NaiveDate, NaiveDateTime};

/// Default name of the timestamp column
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "Waktu";

/// Datetime formats tried in order; month-first wins for ambiguous dates
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Parsed CSV: headers plus string records
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

/// Borrowed view of one record with header lookup
#[derive(Debug, Clone, Copy)]
pub struct DatasetRow<'a> {
    headers: &'a [String],
    cells: &'a [String],
}

impl<'a> DatasetRow<'a> {
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.cells.get(idx).map(String::as_str)
    }

    pub fn cells(&self) -> &'a [String] {
        self.cells
    }
}

impl FieldSource for DatasetRow<'_> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name)
    }
}

impl Dataset {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        Dataset { headers, records }
    }

    /// Parse CSV text; ragged records are kept and short rows read as missing
    pub fn from_csv(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| RiskError::Dataset(format!("failed to read header row: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(RiskError::Dataset("dataset has no header row".to_string()));
        }

        let mut records = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| {
                RiskError::Dataset(format!("failed to read record {}: {}", i + 1, e))
            })?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            records.push(record.iter().map(str::to_string).collect());
        }

        Ok(Dataset { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn row(&self, index: usize) -> Option<DatasetRow<'_>> {
        self.records.get(index).map(|cells| DatasetRow {
            headers: &self.headers,
            cells,
        })
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = DatasetRow<'_>> + '_ {
        self.records.iter().map(move |cells| DatasetRow {
            headers: &self.headers,
            cells,
        })
    }

    /// The last row is treated as the most recent reading
    pub fn most_recent(&self) -> Option<DatasetRow<'_>> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }

    /// All cells of one column, missing cells as `None`
    pub fn column(&self, name: &str) -> Option<Vec<Option<&str>>> {
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(
            self.records
                .iter()
                .map(|r| r.get(idx).map(String::as_str))
                .collect(),
        )
    }
}

/// Parse a spreadsheet timestamp; date-only values read as midnight
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
