//! Price snapshot store — holds the raw price panel and persists it.
//!
//! Snapshots are wide Parquet files: a `date` column (Date dtype) plus one
//! f64 column per (field, ticker) pair, named `field|ticker`. The `|`
//! separator is the serialized form of the two-level column key and is
//! required on load. Writes are atomic (write to .tmp, rename into place)
//! and leave a JSON metadata sidecar next to the snapshot.

use crate::indicator::Indicator;
use crate::panel::{Panel, PanelColumn, PanelError, MISSING};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Separator between the field and ticker levels in a serialized column name.
const LEVEL_SEPARATOR: char = '|';

/// Metadata sidecar written next to each snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub tickers: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub row_count: usize,
    pub column_count: usize,
    pub data_hash: String,
    pub written_at: chrono::NaiveDateTime,
}

/// Owns the raw price panel, its universe, and its time bounds.
#[derive(Debug, Default)]
pub struct PriceStore {
    panel: Option<Panel>,
    tickers: Vec<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a downloaded panel and its time bounds.
    ///
    /// `start` must not be after `end`.
    pub fn set_panel(
        &mut self,
        tickers: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
        panel: Panel,
    ) -> Result<(), PanelError> {
        if start > end {
            return Err(PanelError::InvalidRange { start, end });
        }
        self.tickers = tickers;
        self.start = Some(start);
        self.end = Some(end);
        self.panel = Some(panel);
        Ok(())
    }

    pub fn panel(&self) -> Option<&Panel> {
        self.panel.as_ref()
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    /// Default snapshot path: `{dir}/tickers_{YYYY-MM-DD}.parquet`.
    pub fn default_snapshot_path(dir: &Path, date: NaiveDate) -> PathBuf {
        dir.join(format!("tickers_{date}.parquet"))
    }

    /// Project the held panel onto the selected indicators and write it as a
    /// Parquet snapshot. `indicator_codes` is a code string such as
    /// `"AOHLCV"`; an empty string selects all six indicators.
    ///
    /// Returns the path written.
    pub fn save(&self, path: &Path, indicator_codes: &str) -> Result<PathBuf, PanelError> {
        let panel = self.panel.as_ref().ok_or(PanelError::NoPanel)?;

        let indicators = Indicator::parse_selection(indicator_codes)?;
        let labels: Vec<&str> = indicators.iter().map(|i| i.label()).collect();
        let projected = panel.select_fields(&labels)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| PanelError::Io(format!("create snapshot dir: {e}")))?;
            }
        }

        let df = panel_to_dataframe(&projected)?;
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;

        // Atomic rename
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            PanelError::Io(format!("atomic rename failed: {e}"))
        })?;

        let meta = SnapshotMeta {
            tickers: projected.tickers().iter().map(|t| t.to_string()).collect(),
            start_date: projected.first_date(),
            end_date: projected.last_date(),
            row_count: projected.n_dates(),
            column_count: projected.n_columns(),
            data_hash: projected.content_hash(),
            written_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| PanelError::Io(format!("meta serialization: {e}")))?;
        fs::write(path.with_extension("meta.json"), meta_json)
            .map_err(|e| PanelError::Io(format!("meta write: {e}")))?;

        Ok(path.to_path_buf())
    }

    /// Read a snapshot back into the store; access it through [`panel`].
    ///
    /// When `recompute_bounds` is true, the ticker list and start/end dates
    /// are recomputed from the loaded content (second level of the column
    /// keys, first/last row of the date index).
    ///
    /// [`panel`]: PriceStore::panel
    pub fn load(&mut self, path: &Path, recompute_bounds: bool) -> Result<(), PanelError> {
        let panel = read_snapshot(path)?;

        if recompute_bounds {
            self.tickers = panel.tickers().iter().map(|t| t.to_string()).collect();
            self.start = panel.first_date();
            self.end = panel.last_date();
        }
        self.panel = Some(panel);
        Ok(())
    }

    /// Read the metadata sidecar for a snapshot, if present and parseable.
    pub fn read_meta(path: &Path) -> Option<SnapshotMeta> {
        let content = fs::read_to_string(path.with_extension("meta.json")).ok()?;
        serde_json::from_str(&content).ok()
    }
}

// ── Parquet I/O ─────────────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

fn panel_to_dataframe(panel: &Panel) -> Result<DataFrame, PanelError> {
    let days: Vec<i32> = panel
        .dates()
        .iter()
        .map(|d| (*d - epoch()).num_days() as i32)
        .collect();

    let mut columns = Vec::with_capacity(panel.n_columns() + 1);
    columns.push(
        Column::new("date".into(), days)
            .cast(&DataType::Date)
            .map_err(|e| PanelError::Format(format!("date cast: {e}")))?,
    );
    for col in panel.columns() {
        let name = format!("{}{LEVEL_SEPARATOR}{}", col.field, col.ticker);
        columns.push(Column::new(name.into(), col.values.clone()));
    }

    DataFrame::new(columns).map_err(|e| PanelError::Format(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), PanelError> {
    let file =
        fs::File::create(path).map_err(|e| PanelError::Io(format!("create snapshot: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df.clone())
        .map_err(|e| PanelError::Io(format!("write parquet: {e}")))?;
    Ok(())
}

fn read_snapshot(path: &Path) -> Result<Panel, PanelError> {
    let file = fs::File::open(path).map_err(|e| PanelError::Io(format!("open snapshot: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| PanelError::Format(format!("read parquet: {e}")))?;

    if df.height() == 0 {
        return Err(PanelError::Format("empty snapshot".into()));
    }

    let date_col = df
        .column("date")
        .map_err(|_| PanelError::Format("missing 'date' column".into()))?;
    let date_ca = date_col
        .date()
        .map_err(|_| PanelError::Format("'date' column is not a Date column".into()))?;

    let n = df.height();
    let mut dates = Vec::with_capacity(n);
    for i in 0..n {
        let days = date_ca
            .get(i)
            .ok_or_else(|| PanelError::Format(format!("null date at row {i}")))?;
        dates.push(epoch() + chrono::Duration::days(days as i64));
    }

    let mut columns = Vec::new();
    for col in df.get_columns() {
        let name = col.name().as_str();
        if name == "date" {
            continue;
        }
        let (field, ticker) = name.split_once(LEVEL_SEPARATOR).ok_or_else(|| {
            PanelError::Format(format!(
                "column '{name}' is not two-level (expected 'field{LEVEL_SEPARATOR}ticker')"
            ))
        })?;
        let ca = col
            .f64()
            .map_err(|_| PanelError::Format(format!("column '{name}' is not f64")))?;
        let values: Vec<f64> = (0..n).map(|i| ca.get(i).unwrap_or(MISSING)).collect();
        columns.push(PanelColumn::new(field, ticker, values));
    }

    Panel::new(dates, columns)
}
