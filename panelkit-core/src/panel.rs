//! The panel data model: a date-indexed table keyed by (field, ticker).
//!
//! A `Panel` is the in-memory form of both a price snapshot and a return
//! table. Rows are trading dates (ascending, unique); columns are keyed by a
//! two-level key: a field label ("Adj Close", "Adj Close Returns", ...) and a
//! ticker symbol. Missing cells are `f64::NAN`.

use chrono::NaiveDate;
use thiserror::Error;

/// Sentinel for a missing cell.
pub const MISSING: f64 = f64::NAN;

/// Returns true if a cell value is missing.
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Errors for panel construction, persistence, and cleaning.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("unknown indicator code '{0}' (expected one of O, H, L, C, A, V)")]
    UnknownIndicator(char),

    #[error("indicator '{0}' has no columns in this panel")]
    MissingIndicator(String),

    #[error("no panel set — call set_panel or load first")]
    NoPanel,

    #[error("snapshot format error: {0}")]
    Format(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("cleaning threshold {0} is outside (0, 1)")]
    InvalidThreshold(f64),

    #[error(
        "{missing_cells} missing value(s) remain after cleaning \
         (first at {field}|{ticker} on {date})"
    )]
    ResidualMissingData {
        missing_cells: usize,
        field: String,
        ticker: String,
        date: NaiveDate,
    },
}

/// One column of a panel: a (field, ticker) key plus one value per date.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelColumn {
    pub field: String,
    pub ticker: String,
    pub values: Vec<f64>,
}

impl PanelColumn {
    pub fn new(field: impl Into<String>, ticker: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            field: field.into(),
            ticker: ticker.into(),
            values,
        }
    }

    /// Count of missing cells in this column.
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| is_missing(**v)).count()
    }

    /// Index of the first non-missing cell, if any.
    pub fn first_valid_index(&self) -> Option<usize> {
        self.values.iter().position(|v| !is_missing(*v))
    }
}

/// A date-indexed table keyed by (field, ticker).
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    dates: Vec<NaiveDate>,
    columns: Vec<PanelColumn>,
}

impl Panel {
    /// Build a panel, validating the shape invariants: dates strictly
    /// ascending, every column as long as the date index, column keys unique.
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<PanelColumn>) -> Result<Self, PanelError> {
        for window in dates.windows(2) {
            if window[0] >= window[1] {
                return Err(PanelError::Format(format!(
                    "date index not strictly ascending at {} -> {}",
                    window[0], window[1]
                )));
            }
        }
        for col in &columns {
            if col.values.len() != dates.len() {
                return Err(PanelError::Format(format!(
                    "column '{}|{}' has {} values for {} dates",
                    col.field,
                    col.ticker,
                    col.values.len(),
                    dates.len()
                )));
            }
        }
        for (i, a) in columns.iter().enumerate() {
            for b in &columns[i + 1..] {
                if a.field == b.field && a.ticker == b.ticker {
                    return Err(PanelError::Format(format!(
                        "duplicate column key '{}|{}'",
                        a.field, a.ticker
                    )));
                }
            }
        }
        Ok(Self { dates, columns })
    }

    /// A panel with no dates and no columns.
    pub fn empty() -> Self {
        Self {
            dates: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[PanelColumn] {
        &self.columns
    }

    pub fn n_dates(&self) -> usize {
        self.dates.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() || self.columns.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Unique tickers in first-seen column order.
    pub fn tickers(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for col in &self.columns {
            if !seen.contains(&col.ticker.as_str()) {
                seen.push(col.ticker.as_str());
            }
        }
        seen
    }

    /// Unique field labels in first-seen column order.
    pub fn fields(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for col in &self.columns {
            if !seen.contains(&col.field.as_str()) {
                seen.push(col.field.as_str());
            }
        }
        seen
    }

    /// Look up a single column by its two-level key.
    pub fn column(&self, field: &str, ticker: &str) -> Option<&PanelColumn> {
        self.columns
            .iter()
            .find(|c| c.field == field && c.ticker == ticker)
    }

    /// All columns for one field, in panel order.
    pub fn field_columns(&self, field: &str) -> Vec<&PanelColumn> {
        self.columns.iter().filter(|c| c.field == field).collect()
    }

    /// Project onto a subset of fields, in the requested order.
    ///
    /// Every requested field must have at least one column in the panel.
    pub fn select_fields(&self, fields: &[&str]) -> Result<Panel, PanelError> {
        let mut columns = Vec::new();
        for field in fields {
            let matched = self.field_columns(field);
            if matched.is_empty() {
                return Err(PanelError::MissingIndicator((*field).to_string()));
            }
            columns.extend(matched.into_iter().cloned());
        }
        Panel::new(self.dates.clone(), columns)
    }

    /// Total count of missing cells across the panel.
    pub fn missing_cells(&self) -> usize {
        self.columns.iter().map(|c| c.missing_count()).sum()
    }

    /// Deterministic BLAKE3 hash over the date index and all cell values.
    ///
    /// Columns are hashed in sorted key order so the hash is independent of
    /// column ordering.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for date in &self.dates {
            hasher.update(date.to_string().as_bytes());
        }
        let mut order: Vec<usize> = (0..self.columns.len()).collect();
        order.sort_by(|a, b| {
            let (a, b) = (&self.columns[*a], &self.columns[*b]);
            (&a.field, &a.ticker).cmp(&(&b.field, &b.ticker))
        });
        for idx in order {
            let col = &self.columns[idx];
            hasher.update(col.field.as_bytes());
            hasher.update(col.ticker.as_bytes());
            for v in &col.values {
                hasher.update(&v.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}
