//! End-to-end tests for the snapshot and return-cleaning pipeline.

use chrono::NaiveDate;
use panelkit_core::clean::{clean_returns, CleanConfig};
use panelkit_core::panel::{is_missing, Panel, PanelColumn, PanelError, MISSING};
use panelkit_core::provider::{panel_from_bars, PriceBar};
use panelkit_core::returns::simple_returns;
use panelkit_core::store::PriceStore;
use panelkit_core::synthetic::synthetic_price_panel;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_dir() -> PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir =
        std::env::temp_dir().join(format!("panelkit_pipeline_{}_{id}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[test]
fn synthetic_panel_through_full_pipeline() {
    let dir = temp_dir();
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let panel = synthetic_price_panel(&["SPY", "QQQ", "IWM"], start, end);

    // Snapshot round trip
    let mut store = PriceStore::new();
    store
        .set_panel(
            vec!["SPY".into(), "QQQ".into(), "IWM".into()],
            start,
            end,
            panel.clone(),
        )
        .unwrap();
    let path = PriceStore::default_snapshot_path(&dir, end);
    store.save(&path, "").unwrap();

    let mut reloaded = PriceStore::new();
    reloaded.load(&path, true).unwrap();
    let loaded = reloaded.panel().unwrap();
    assert_eq!(loaded.content_hash(), panel.content_hash());
    assert_eq!(reloaded.tickers().len(), 3);
    assert_eq!(reloaded.start(), loaded.first_date());
    assert_eq!(reloaded.end(), loaded.last_date());

    // Returns: first row missing everywhere, everything else present
    let returns = simple_returns(loaded, "").unwrap();
    assert_eq!(returns.n_columns(), 18);
    for col in returns.columns() {
        assert!(is_missing(col.values[0]));
        assert_eq!(col.missing_count(), 1);
    }

    // Cleaning drops only the structural first row
    let cleaned = clean_returns(returns, &CleanConfig::default()).unwrap();
    assert_eq!(cleaned.report.dropped_ticker_count(), 0);
    assert_eq!(cleaned.report.leading_rows_dropped, 1);
    assert_eq!(cleaned.panel.missing_cells(), 0);
    assert_eq!(cleaned.panel.tickers().len(), 3);
    assert_eq!(cleaned.panel.first_date(), Some(loaded.dates()[1]));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn snapshot_subset_roundtrip_preserves_selection_order() {
    let dir = temp_dir();
    let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
    let panel = synthetic_price_panel(&["SPY"], start, end);

    let mut store = PriceStore::new();
    store
        .set_panel(vec!["SPY".into()], start, end, panel.clone())
        .unwrap();
    let path = dir.join("subset.parquet");
    store.save(&path, "CAV").unwrap();

    let mut reloaded = PriceStore::new();
    reloaded.load(&path, true).unwrap();
    let loaded = reloaded.panel().unwrap();

    assert_eq!(loaded.fields(), vec!["Close", "Adj Close", "Volume"]);
    assert_eq!(
        loaded.column("Close", "SPY").unwrap().values,
        panel.column("Close", "SPY").unwrap().values
    );

    let _ = std::fs::remove_dir_all(&dir);
}

fn bar(date: NaiveDate, close: f64) -> PriceBar {
    PriceBar {
        date,
        open: close - 0.5,
        high: close + 1.0,
        low: close - 1.0,
        close,
        adj_close: close,
        volume: 1_000.0,
    }
}

// A universe where one ticker has barely any data and another starts
// trading late: the cleaner must drop both, report them, and leave a
// rectangular panel for the survivor.
#[test]
fn sparse_and_late_tickers_are_dropped_with_reasons() {
    let dates: Vec<NaiveDate> = (0..10).map(|i| d(i + 1)).collect();

    let full: Vec<PriceBar> = dates.iter().map(|d| bar(*d, 100.0)).collect();
    let late: Vec<PriceBar> = dates[1..].iter().map(|d| bar(*d, 50.0)).collect();
    let sparse: Vec<PriceBar> = dates[9..].iter().map(|d| bar(*d, 10.0)).collect();

    let panel = panel_from_bars(&[
        ("FULL".to_string(), full),
        ("LATE".to_string(), late),
        ("SPARSE".to_string(), sparse),
    ]);

    let returns = simple_returns(&panel, "A").unwrap();
    let cleaned = clean_returns(returns, &CleanConfig::default()).unwrap();

    assert_eq!(cleaned.panel.tickers(), vec!["FULL"]);
    assert_eq!(cleaned.report.dropped_missingness.len(), 1);
    assert_eq!(cleaned.report.dropped_missingness[0].ticker, "SPARSE");
    assert_eq!(cleaned.report.dropped_late_start.len(), 1);
    let late_drop = &cleaned.report.dropped_late_start[0];
    assert_eq!(late_drop.ticker, "LATE");
    assert_eq!(late_drop.reference_date, d(2));
    assert_eq!(late_drop.first_valid, Some(d(3)));
    assert_eq!(cleaned.panel.first_date(), Some(d(2)));
    assert_eq!(cleaned.panel.missing_cells(), 0);
}

#[test]
fn store_rejects_inverted_bounds_before_holding_a_panel() {
    let mut store = PriceStore::new();
    let result = store.set_panel(
        vec!["SPY".into()],
        d(9),
        d(2),
        Panel::new(vec![d(2)], vec![PanelColumn::new("Close", "SPY", vec![1.0])]).unwrap(),
    );
    assert!(matches!(result, Err(PanelError::InvalidRange { .. })));
    assert!(store.panel().is_none());
}

#[test]
fn returns_then_clean_preserves_exact_values() {
    let panel = Panel::new(
        vec![d(2), d(3), d(4)],
        vec![PanelColumn::new(
            "Adj Close",
            "AAPL",
            vec![100.0, 110.0, 104.5],
        )],
    )
    .unwrap();

    let returns = simple_returns(&panel, "A").unwrap();
    let cleaned = clean_returns(returns, &CleanConfig::default()).unwrap();

    let col = cleaned.panel.column("Adj Close Returns", "AAPL").unwrap();
    assert_eq!(cleaned.panel.dates(), &[d(3), d(4)]);
    assert!((col.values[0] - 0.10).abs() < 1e-12);
    assert!((col.values[1] - (104.5 - 110.0) / 110.0).abs() < 1e-12);
}

#[test]
fn interior_gap_is_forward_filled_with_prior_return() {
    let panel = Panel::new(
        vec![d(2), d(3), d(4), d(5)],
        vec![
            PanelColumn::new("Adj Close", "AAPL", vec![100.0, 110.0, MISSING, 120.0]),
            PanelColumn::new("Adj Close", "MSFT", vec![10.0, 11.0, 12.0, 13.0]),
        ],
    )
    .unwrap();

    let returns = simple_returns(&panel, "A").unwrap();
    // AAPL returns: [NaN, 0.10, NaN, NaN]; the gap breaks both adjacent
    // returns, so keep the missingness filter permissive here
    let cfg = CleanConfig {
        na_threshold_ticker: 0.9,
    };
    let cleaned = clean_returns(returns, &cfg).unwrap();

    let aapl = cleaned.panel.column("Adj Close Returns", "AAPL").unwrap();
    assert_eq!(cleaned.panel.missing_cells(), 0);
    // Rows d3..d5; the filled cells carry the last observed return
    assert!((aapl.values[0] - 0.10).abs() < 1e-12);
    assert!((aapl.values[1] - 0.10).abs() < 1e-12);
    assert!((aapl.values[2] - 0.10).abs() < 1e-12);
}
