//! Synthetic price panels for tests and offline development.
//!
//! Each ticker is a random walk seeded from its own name, so panels are
//! deterministic across runs and differ between tickers.

use crate::panel::Panel;
use crate::provider::{panel_from_bars, PriceBar};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Build a synthetic price panel over `[start, end)` weekdays.
pub fn synthetic_price_panel(tickers: &[&str], start: NaiveDate, end: NaiveDate) -> Panel {
    let series: Vec<(String, Vec<PriceBar>)> = tickers
        .iter()
        .map(|t| (t.to_string(), synthetic_bars(t, start, end)))
        .collect();
    panel_from_bars(&series)
}

/// Deterministic random-walk bars for one ticker.
pub fn synthetic_bars(ticker: &str, start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
    let seed: [u8; 32] = *blake3::hash(ticker.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current < end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000.0..5_000_000.0_f64).round();

        bars.push(PriceBar {
            date: current,
            open,
            high,
            low,
            close,
            adj_close: close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}
