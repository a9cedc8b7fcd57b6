//! Return-panel cleaning: missingness filter, forward-fill, leading-row
//! drop, late-start filter.
//!
//! The cleaner turns a return panel (structurally missing first row, holes
//! where tickers had no data) into a fully-populated rectangular panel with
//! one common start date. Every ticker drop is recorded in the report so the
//! shrinkage from the requested universe stays auditable.

use crate::panel::{is_missing, Panel, PanelColumn, PanelError};
use chrono::NaiveDate;

/// Tunable cleaning parameters.
#[derive(Debug, Clone)]
pub struct CleanConfig {
    /// A ticker is dropped when its missing-cell count reaches this fraction
    /// of the date index. Must be in (0, 1).
    pub na_threshold_ticker: f64,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            na_threshold_ticker: 0.25,
        }
    }
}

/// A ticker dropped for exceeding the missingness threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingnessDrop {
    pub ticker: String,
    pub missing_count: usize,
    /// The count that triggered the drop: `na_threshold_ticker * n_dates`.
    pub threshold_count: f64,
}

/// A ticker dropped for starting later than the cleaned panel's first date.
#[derive(Debug, Clone, PartialEq)]
pub struct LateStartDrop {
    pub ticker: String,
    /// First date with all of the ticker's columns present, if any.
    pub first_valid: Option<NaiveDate>,
    pub reference_date: NaiveDate,
}

/// Audit trail of a cleaning run.
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    pub na_threshold_ticker: f64,
    pub dropped_missingness: Vec<MissingnessDrop>,
    pub dropped_late_start: Vec<LateStartDrop>,
    pub leading_rows_dropped: usize,
}

impl CleanReport {
    /// Total tickers removed across both filters.
    pub fn dropped_ticker_count(&self) -> usize {
        self.dropped_missingness.len() + self.dropped_late_start.len()
    }
}

/// A cleaned panel plus the report describing what was removed.
#[derive(Debug, Clone)]
pub struct CleanedPanel {
    pub panel: Panel,
    pub report: CleanReport,
}

/// Clean a return panel into an analysis-ready panel with no missing cells.
///
/// Steps, each acting on the current working panel:
/// 1. drop tickers whose missing count reaches
///    `na_threshold_ticker * n_dates` (boundary inclusive);
/// 2. forward-fill remaining gaps per column (leading runs stay missing);
/// 3. drop the leading rows that are entirely missing;
/// 4. drop tickers whose first fully-valid date is later than the panel's
///    first remaining date (or that never become valid).
///
/// Any cell still missing afterwards is a defect and surfaces as
/// `PanelError::ResidualMissingData`.
pub fn clean_returns(panel: Panel, config: &CleanConfig) -> Result<CleanedPanel, PanelError> {
    let threshold = config.na_threshold_ticker;
    if !(threshold > 0.0 && threshold < 1.0) {
        return Err(PanelError::InvalidThreshold(threshold));
    }

    let mut report = CleanReport {
        na_threshold_ticker: threshold,
        ..CleanReport::default()
    };

    if panel.is_empty() {
        return Ok(CleanedPanel { panel, report });
    }

    let n_dates = panel.n_dates();
    let threshold_count = threshold * n_dates as f64;

    // Step 1: ticker-level missingness filter. A ticker's missing count is
    // the max over its columns, so a drop removes the whole ticker.
    let mut keep_columns: Vec<PanelColumn> = Vec::new();
    for ticker in panel.tickers() {
        let ticker_columns: Vec<&PanelColumn> = panel
            .columns()
            .iter()
            .filter(|c| c.ticker == ticker)
            .collect();
        let missing_count = ticker_columns
            .iter()
            .map(|c| c.missing_count())
            .max()
            .unwrap_or(0);
        if missing_count as f64 >= threshold_count {
            report.dropped_missingness.push(MissingnessDrop {
                ticker: ticker.to_string(),
                missing_count,
                threshold_count,
            });
        } else {
            keep_columns.extend(ticker_columns.into_iter().cloned());
        }
    }

    if keep_columns.is_empty() {
        return Ok(CleanedPanel {
            panel: Panel::empty(),
            report,
        });
    }

    // Step 2: forward-fill per column; a leading run has no prior value and
    // stays missing.
    for col in &mut keep_columns {
        let mut last_valid = None;
        for v in &mut col.values {
            if is_missing(*v) {
                if let Some(fill) = last_valid {
                    *v = fill;
                }
            } else {
                last_valid = Some(*v);
            }
        }
    }

    // Step 3: drop the leading rows that are entirely missing. After
    // forward-fill an all-missing row can only be part of the leading run.
    let first_kept_row = (0..n_dates)
        .find(|row| keep_columns.iter().any(|c| !is_missing(c.values[*row])))
        .unwrap_or(n_dates);
    report.leading_rows_dropped = first_kept_row;

    let dates: Vec<NaiveDate> = panel.dates()[first_kept_row..].to_vec();
    for col in &mut keep_columns {
        col.values.drain(..first_kept_row);
    }

    if dates.is_empty() {
        return Ok(CleanedPanel {
            panel: Panel::empty(),
            report,
        });
    }

    // Step 4: late-start ticker filter against the reference date.
    let reference_date = dates[0];
    let mut late_tickers: Vec<String> = Vec::new();
    {
        let mut tickers: Vec<&str> = Vec::new();
        for col in &keep_columns {
            if !tickers.contains(&col.ticker.as_str()) {
                tickers.push(col.ticker.as_str());
            }
        }
        for ticker in tickers {
            let first_valid_row = keep_columns
                .iter()
                .filter(|c| c.ticker == ticker)
                .map(|c| c.first_valid_index())
                .collect::<Option<Vec<usize>>>()
                .and_then(|rows| rows.into_iter().max());
            match first_valid_row {
                Some(0) => {}
                Some(row) => {
                    report.dropped_late_start.push(LateStartDrop {
                        ticker: ticker.to_string(),
                        first_valid: Some(dates[row]),
                        reference_date,
                    });
                    late_tickers.push(ticker.to_string());
                }
                None => {
                    report.dropped_late_start.push(LateStartDrop {
                        ticker: ticker.to_string(),
                        first_valid: None,
                        reference_date,
                    });
                    late_tickers.push(ticker.to_string());
                }
            }
        }
    }
    keep_columns.retain(|c| !late_tickers.contains(&c.ticker));

    let cleaned = Panel::new(dates, keep_columns)?;

    // Postcondition: zero missing cells. Surface a defect, never swallow it.
    if let Some((col, row)) = first_missing_cell(&cleaned) {
        return Err(PanelError::ResidualMissingData {
            missing_cells: cleaned.missing_cells(),
            field: col.field.clone(),
            ticker: col.ticker.clone(),
            date: cleaned.dates()[row],
        });
    }

    Ok(CleanedPanel {
        panel: cleaned,
        report,
    })
}

fn first_missing_cell(panel: &Panel) -> Option<(&PanelColumn, usize)> {
    for col in panel.columns() {
        if let Some(row) = col.values.iter().position(|v| is_missing(*v)) {
            return Some((col, row));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::MISSING;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn panel(columns: Vec<PanelColumn>) -> Panel {
        let n = columns.first().map(|c| c.values.len()).unwrap_or(0);
        let dates: Vec<NaiveDate> = (0..n as u32).map(|i| d(i + 1)).collect();
        Panel::new(dates, columns).unwrap()
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        let p = panel(vec![PanelColumn::new("R", "A", vec![1.0, 2.0])]);
        for bad in [0.0, 1.0, -0.5, 2.0] {
            let cfg = CleanConfig {
                na_threshold_ticker: bad,
            };
            let result = clean_returns(p.clone(), &cfg);
            assert!(matches!(result, Err(PanelError::InvalidThreshold(_))));
        }
    }

    #[test]
    fn missingness_boundary_is_inclusive() {
        // 4 dates, threshold 0.5 -> drop at 2 missing, keep at 1
        let p = panel(vec![
            PanelColumn::new("R", "DROP", vec![MISSING, MISSING, 1.0, 1.0]),
            PanelColumn::new("R", "KEEP", vec![1.0, MISSING, 1.0, 1.0]),
        ]);
        let cfg = CleanConfig {
            na_threshold_ticker: 0.5,
        };
        let cleaned = clean_returns(p, &cfg).unwrap();

        assert_eq!(cleaned.report.dropped_missingness.len(), 1);
        let drop = &cleaned.report.dropped_missingness[0];
        assert_eq!(drop.ticker, "DROP");
        assert_eq!(drop.missing_count, 2);
        assert_eq!(drop.threshold_count, 2.0);
        assert_eq!(cleaned.panel.tickers(), vec!["KEEP"]);
    }

    #[test]
    fn forward_fill_does_not_reach_leading_run() {
        // B's leading run survives ffill, so B is dropped as a late starter
        let p = panel(vec![
            PanelColumn::new("R", "A", vec![1.0, MISSING, 3.0, 4.0]),
            PanelColumn::new("R", "B", vec![MISSING, MISSING, 3.0, 4.0]),
        ]);
        let cfg = CleanConfig {
            na_threshold_ticker: 0.9,
        };
        let cleaned = clean_returns(p, &cfg).unwrap();

        assert_eq!(cleaned.panel.tickers(), vec!["A"]);
        assert_eq!(cleaned.report.dropped_late_start.len(), 1);
        // A's interior gap was forward-filled with the prior value
        let a = cleaned.panel.column("R", "A").unwrap();
        assert_eq!(a.values, vec![1.0, 1.0, 3.0, 4.0]);
    }

    #[test]
    fn leading_all_missing_rows_are_dropped() {
        let p = panel(vec![
            PanelColumn::new("R", "A", vec![MISSING, 2.0, 3.0]),
            PanelColumn::new("R", "B", vec![MISSING, 5.0, 6.0]),
        ]);
        let cfg = CleanConfig {
            na_threshold_ticker: 0.5,
        };
        let cleaned = clean_returns(p, &cfg).unwrap();

        assert_eq!(cleaned.report.leading_rows_dropped, 1);
        assert_eq!(cleaned.panel.first_date(), Some(d(2)));
        assert_eq!(cleaned.panel.missing_cells(), 0);
    }

    #[test]
    fn late_start_ticker_is_dropped_and_reported() {
        let p = panel(vec![
            PanelColumn::new("R", "A", vec![MISSING, 1.0, 1.0, 1.0, 1.0]),
            PanelColumn::new("R", "B", vec![MISSING, MISSING, MISSING, 1.0, 1.0]),
        ]);
        let cfg = CleanConfig {
            na_threshold_ticker: 0.9,
        };
        let cleaned = clean_returns(p, &cfg).unwrap();

        assert_eq!(cleaned.panel.tickers(), vec!["A"]);
        let drop = &cleaned.report.dropped_late_start[0];
        assert_eq!(drop.ticker, "B");
        assert_eq!(drop.reference_date, d(2));
        assert_eq!(drop.first_valid, Some(d(4)));
        assert_eq!(cleaned.panel.missing_cells(), 0);
    }

    #[test]
    fn cleaning_a_clean_panel_is_identity() {
        let p = panel(vec![
            PanelColumn::new("R", "A", vec![1.0, 2.0, 3.0]),
            PanelColumn::new("R", "B", vec![4.0, 5.0, 6.0]),
        ]);
        let cleaned = clean_returns(p.clone(), &CleanConfig::default()).unwrap();

        assert_eq!(cleaned.panel, p);
        assert_eq!(cleaned.report.dropped_ticker_count(), 0);
        assert_eq!(cleaned.report.leading_rows_dropped, 0);
    }

    #[test]
    fn all_tickers_dropped_yields_empty_panel() {
        let p = panel(vec![PanelColumn::new(
            "R",
            "A",
            vec![MISSING, MISSING, MISSING, 1.0],
        )]);
        let cleaned = clean_returns(p, &CleanConfig::default()).unwrap();

        assert!(cleaned.panel.is_empty());
        assert_eq!(cleaned.report.dropped_missingness.len(), 1);
    }

    #[test]
    fn empty_panel_passes_through() {
        let cleaned = clean_returns(Panel::empty(), &CleanConfig::default()).unwrap();
        assert!(cleaned.panel.is_empty());
        assert_eq!(cleaned.report.dropped_ticker_count(), 0);
    }

    #[test]
    fn multi_column_ticker_is_dropped_as_a_unit() {
        // Only DROP's "S" column crosses the threshold, but both of its
        // columns must go.
        let p = panel(vec![
            PanelColumn::new("R", "DROP", vec![1.0, 1.0, 1.0, 1.0]),
            PanelColumn::new("S", "DROP", vec![MISSING, MISSING, MISSING, 1.0]),
            PanelColumn::new("R", "KEEP", vec![1.0, 1.0, 1.0, 1.0]),
            PanelColumn::new("S", "KEEP", vec![1.0, 1.0, 1.0, 1.0]),
        ]);
        let cfg = CleanConfig {
            na_threshold_ticker: 0.5,
        };
        let cleaned = clean_returns(p, &cfg).unwrap();

        assert_eq!(cleaned.panel.tickers(), vec!["KEEP"]);
        assert_eq!(cleaned.report.dropped_missingness[0].ticker, "DROP");
    }

    // Worked example: 10 dates, 3 tickers. C is missing on 9 of 10 dates
    // (threshold 0.25 -> 2.5 cells) and is dropped for missingness. B's
    // first return arrives one date after the cohort's, which keeps it
    // under the missingness threshold but makes it a late starter. A
    // survives from the cohort's first return date with zero missing cells.
    #[test]
    fn worked_example_ten_dates_three_tickers() {
        let mut a = vec![1.0; 10];
        a[0] = MISSING;
        let mut b = vec![1.0; 10];
        for v in b.iter_mut().take(2) {
            *v = MISSING;
        }
        let mut c = vec![1.0; 10];
        for v in c.iter_mut().take(9) {
            *v = MISSING;
        }
        let p = panel(vec![
            PanelColumn::new("Adj Close Returns", "A", a),
            PanelColumn::new("Adj Close Returns", "B", b),
            PanelColumn::new("Adj Close Returns", "C", c),
        ]);

        let cleaned = clean_returns(p, &CleanConfig::default()).unwrap();

        assert_eq!(
            cleaned.report.dropped_missingness[0].ticker, "C",
            "C crosses the 2.5-cell threshold with 9 missing"
        );
        let late = &cleaned.report.dropped_late_start[0];
        assert_eq!(late.ticker, "B");
        assert_eq!(late.reference_date, d(2));
        assert_eq!(late.first_valid, Some(d(3)));
        assert_eq!(cleaned.panel.tickers(), vec!["A"]);
        // The cohort's first return row is date 2 (row 0 was structural)
        assert_eq!(cleaned.panel.first_date(), Some(d(2)));
        assert_eq!(cleaned.panel.missing_cells(), 0);
    }
}
