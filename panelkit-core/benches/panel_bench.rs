//! Criterion benchmarks for the pipeline hot paths.
//!
//! Benchmarks:
//! 1. Return computation over a full universe panel
//! 2. Cleaning (missingness filter, forward-fill, leading drop, late-start)

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use panelkit_core::clean::{clean_returns, CleanConfig};
use panelkit_core::panel::Panel;
use panelkit_core::returns::simple_returns;
use panelkit_core::synthetic::synthetic_price_panel;

fn universe_panel(n_tickers: usize) -> Panel {
    let tickers: Vec<String> = (0..n_tickers).map(|i| format!("T{i:03}")).collect();
    let refs: Vec<&str> = tickers.iter().map(|t| t.as_str()).collect();
    synthetic_price_panel(
        &refs,
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
    )
}

fn bench_returns(c: &mut Criterion) {
    let panel = universe_panel(50);
    c.bench_function("simple_returns_50_tickers_2y", |b| {
        b.iter(|| simple_returns(black_box(&panel), "").unwrap())
    });
}

fn bench_clean(c: &mut Criterion) {
    let panel = universe_panel(50);
    let returns = simple_returns(&panel, "").unwrap();
    let cfg = CleanConfig::default();
    c.bench_function("clean_returns_50_tickers_2y", |b| {
        b.iter(|| clean_returns(black_box(returns.clone()), &cfg).unwrap())
    });
}

criterion_group!(benches, bench_returns, bench_clean);
criterion_main!(benches);
