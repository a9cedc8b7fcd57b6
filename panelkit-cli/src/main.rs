//! PanelKit CLI — snapshot download and return-cleaning commands.
//!
//! Commands:
//! - `tickers` — fetch the S&P 500 constituent list
//! - `download` — fetch a price panel and save it as a Parquet snapshot
//! - `process` — load a snapshot, compute returns, clean, export CSV
//! - `run` — full pipeline from a TOML config file

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use panelkit_core::clean::{clean_returns, CleanConfig, CleanReport, CleanedPanel};
use panelkit_core::config::PipelineConfig;
use panelkit_core::export::write_panel_csv;
use panelkit_core::panel::{Panel, PanelError};
use panelkit_core::provider::{download_panel, StdoutProgress};
use panelkit_core::returns::simple_returns;
use panelkit_core::store::PriceStore;
use panelkit_core::synthetic::synthetic_price_panel;
use panelkit_core::universe::{fetch_sp500_tickers, load_ticker_file, parse_ticker_list};
use panelkit_core::yahoo::YahooProvider;
use panelkit_core::CircuitBreaker;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "panelkit",
    about = "PanelKit CLI — equity snapshot and return-cleaning pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the S&P 500 constituent list and save it verbatim.
    Tickers {
        /// Destination file for the ticker list.
        #[arg(long, default_value = "data/sp500_tickers.txt")]
        out: PathBuf,
    },
    /// Download a price panel and save it as a Parquet snapshot.
    Download {
        /// Ticker symbols (e.g., AAPL MSFT, or a single comma-separated list).
        symbols: Vec<String>,

        /// Newline-delimited ticker file (used when no symbols are given).
        #[arg(long)]
        tickers_file: Option<PathBuf>,

        /// Start date (YYYY-MM-DD, inclusive). Defaults to 2017-01-01.
        #[arg(long, default_value = "2017-01-01")]
        start: String,

        /// End date (YYYY-MM-DD, exclusive). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Snapshot directory. The file is named tickers_<today>.parquet.
        #[arg(long, default_value = "data")]
        snapshot_dir: PathBuf,

        /// Indicators to save, as a code string (A/O/H/L/C/V). Empty = all.
        #[arg(long, default_value = "")]
        indicators: String,

        /// Generate deterministic synthetic data instead of downloading.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Load a snapshot, compute returns, clean, and export the clean panel.
    Process {
        /// Snapshot file written by `download`.
        #[arg(long)]
        snapshot: PathBuf,

        /// Indicators to compute returns for (code string; empty = all).
        #[arg(long, default_value = "")]
        indicators: String,

        /// Missingness threshold in (0, 1) for dropping tickers.
        #[arg(long, default_value_t = 0.25)]
        na_threshold: f64,

        /// Write the clean panel to this CSV file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Run the full pipeline from a TOML config file.
    Run {
        /// Path to a pipeline config file.
        #[arg(long)]
        config: PathBuf,

        /// Generate deterministic synthetic data instead of downloading.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Tickers { out } => run_tickers(&out),
        Commands::Download {
            symbols,
            tickers_file,
            start,
            end,
            snapshot_dir,
            indicators,
            synthetic,
        } => run_download(
            symbols,
            tickers_file,
            &start,
            end.as_deref(),
            &snapshot_dir,
            &indicators,
            synthetic,
        ),
        Commands::Process {
            snapshot,
            indicators,
            na_threshold,
            out,
        } => run_process(&snapshot, &indicators, na_threshold, out.as_deref()),
        Commands::Run { config, synthetic } => run_pipeline(&config, synthetic),
    }
}

fn run_tickers(out: &Path) -> Result<()> {
    let tickers = fetch_sp500_tickers(out)?;
    println!("Saved {} tickers to {}", tickers.len(), out.display());
    Ok(())
}

fn resolve_universe(symbols: Vec<String>, tickers_file: Option<&Path>) -> Result<Vec<String>> {
    let mut tickers = parse_ticker_list(&symbols.join(" "));
    if let Some(path) = tickers_file {
        for t in load_ticker_file(path)? {
            if !tickers.contains(&t) {
                tickers.push(t);
            }
        }
    }
    if tickers.is_empty() {
        bail!("no tickers given (pass symbols or --tickers-file)");
    }
    Ok(tickers)
}

fn fetch_panel(
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
    synthetic: bool,
) -> Result<Panel> {
    let refs: Vec<&str> = tickers.iter().map(|t| t.as_str()).collect();

    if synthetic {
        eprintln!("WARNING: generating synthetic data, not market prices");
        return Ok(synthetic_price_panel(&refs, start, end));
    }

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker);
    let outcome = download_panel(&provider, &refs, start, end, &StdoutProgress);

    if !outcome.summary.all_succeeded() {
        for (ticker, err) in &outcome.summary.errors {
            eprintln!("Error for {ticker}: {err}");
        }
        if outcome.summary.succeeded == 0 {
            bail!("all {} downloads failed", outcome.summary.total);
        }
    }
    Ok(outcome.panel)
}

fn run_download(
    symbols: Vec<String>,
    tickers_file: Option<PathBuf>,
    start: &str,
    end: Option<&str>,
    snapshot_dir: &Path,
    indicators: &str,
    synthetic: bool,
) -> Result<()> {
    let tickers = resolve_universe(symbols, tickers_file.as_deref())?;
    let today = chrono::Local::now().date_naive();

    let start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d")?;
    let end_date = end
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?
        .unwrap_or(today);

    let panel = fetch_panel(&tickers, start_date, end_date, synthetic)?;
    let fetched: Vec<String> = panel.tickers().iter().map(|t| t.to_string()).collect();

    let mut store = PriceStore::new();
    store.set_panel(fetched, start_date, end_date, panel)?;

    let path = PriceStore::default_snapshot_path(snapshot_dir, today);
    let written = store.save(&path, indicators)?;
    println!("Saved snapshot at {}", written.display());
    Ok(())
}

fn run_process(
    snapshot: &Path,
    indicators: &str,
    na_threshold: f64,
    out: Option<&Path>,
) -> Result<()> {
    let mut store = PriceStore::new();
    store.load(snapshot, true)?;
    let panel = store.panel().ok_or(PanelError::NoPanel)?;
    println!(
        "Loaded snapshot: {} tickers, {} dates ({} to {})",
        store.tickers().len(),
        panel.n_dates(),
        store.start().map(|d| d.to_string()).unwrap_or_default(),
        store.end().map(|d| d.to_string()).unwrap_or_default(),
    );

    let returns = simple_returns(panel, indicators)?;
    let cleaned = clean_returns(
        returns,
        &CleanConfig {
            na_threshold_ticker: na_threshold,
        },
    )?;
    print_clean_report(&cleaned);

    if let Some(out) = out {
        write_panel_csv(out, &cleaned.panel)?;
        println!("Clean panel written to {}", out.display());
    }
    Ok(())
}

fn run_pipeline(config_path: &Path, synthetic: bool) -> Result<()> {
    let config = PipelineConfig::from_file(config_path)?;

    let mut tickers = config.universe.tickers.clone();
    if let Some(path) = &config.universe.tickers_file {
        for t in load_ticker_file(path)? {
            if !tickers.contains(&t) {
                tickers.push(t);
            }
        }
    }
    if tickers.is_empty() {
        bail!("config names no tickers");
    }

    let panel = fetch_panel(
        &tickers,
        config.range.start_date,
        config.range.end_date,
        synthetic,
    )?;
    let fetched: Vec<String> = panel.tickers().iter().map(|t| t.to_string()).collect();

    let mut store = PriceStore::new();
    store.set_panel(fetched, config.range.start_date, config.range.end_date, panel)?;

    let today = chrono::Local::now().date_naive();
    let snapshot_path = PriceStore::default_snapshot_path(&config.snapshot.dir, today);
    store.save(&snapshot_path, &config.snapshot.indicators)?;
    println!("Saved snapshot at {}", snapshot_path.display());

    // Re-read the snapshot so the processing stage sees exactly what was
    // persisted.
    let mut reloaded = PriceStore::new();
    reloaded.load(&snapshot_path, true)?;
    let panel = reloaded.panel().ok_or(PanelError::NoPanel)?;

    let returns = simple_returns(panel, &config.snapshot.indicators)?;
    let cleaned = clean_returns(
        returns,
        &CleanConfig {
            na_threshold_ticker: config.clean.na_threshold_ticker,
        },
    )?;
    print_clean_report(&cleaned);

    let csv_path = config.snapshot.dir.join(format!("clean_{today}.csv"));
    write_panel_csv(&csv_path, &cleaned.panel)?;
    println!("Clean panel written to {}", csv_path.display());
    Ok(())
}

fn print_clean_report(cleaned: &CleanedPanel) {
    let report: &CleanReport = &cleaned.report;

    if !report.dropped_missingness.is_empty() {
        let names: Vec<&str> = report
            .dropped_missingness
            .iter()
            .map(|d| d.ticker.as_str())
            .collect();
        println!(
            "Dropping tickers: {names:?}. More than {:.2}% missing!",
            report.na_threshold_ticker * 100.0
        );
    }

    if !report.dropped_late_start.is_empty() {
        let names: Vec<&str> = report
            .dropped_late_start
            .iter()
            .map(|d| d.ticker.as_str())
            .collect();
        let reference = report
            .dropped_late_start
            .first()
            .map(|d| d.reference_date.to_string())
            .unwrap_or_default();
        println!("Dropping tickers: {names:?}. Started trading after {reference}!");
    }

    if report.leading_rows_dropped > 0 {
        println!(
            "Dropped {} leading date(s) without a prior observation.",
            report.leading_rows_dropped
        );
    }

    println!(
        "Preprocessing done. {} tickers remain, {} missing cells.",
        cleaned.panel.tickers().len(),
        cleaned.panel.missing_cells()
    );
}
