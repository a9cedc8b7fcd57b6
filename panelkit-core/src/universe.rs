//! Ticker universe — the S&P 500 constituent list.
//!
//! The list source is a fixed URL returning newline-delimited ticker
//! symbols. The response body is written verbatim to a destination path so
//! the on-disk file always matches what the source served.

use crate::panel::PanelError;
use crate::provider::FetchError;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Source of the S&P 500 constituent symbol list.
pub const SP500_TICKERS_URL: &str =
    "https://raw.githubusercontent.com/datasets/s-and-p-500-companies/master/data/constituents_symbols.txt";

/// Download the S&P 500 ticker list, write it verbatim to `dest`, and return
/// the parsed tickers.
pub fn fetch_sp500_tickers(dest: &Path) -> Result<Vec<String>, FetchError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| FetchError::Other(format!("build HTTP client: {e}")))?;

    let resp = client
        .get(SP500_TICKERS_URL)
        .send()
        .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Other(format!(
            "HTTP {status} fetching ticker list"
        )));
    }

    let body = resp
        .text()
        .map_err(|e| FetchError::ResponseFormatChanged(e.to_string()))?;

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| FetchError::Io(format!("create ticker list dir: {e}")))?;
        }
    }
    fs::write(dest, &body).map_err(|e| FetchError::Io(format!("write ticker list: {e}")))?;

    Ok(parse_ticker_list(&body))
}

/// Load a newline-delimited ticker file.
pub fn load_ticker_file(path: &Path) -> Result<Vec<String>, PanelError> {
    let content =
        fs::read_to_string(path).map_err(|e| PanelError::Io(format!("read ticker file: {e}")))?;
    Ok(parse_ticker_list(&content))
}

/// Split a whitespace- or comma-separated ticker list into unique symbols,
/// preserving first-seen order.
pub fn parse_ticker_list(input: &str) -> Vec<String> {
    let mut tickers: Vec<String> = Vec::new();
    for token in input.split(|c: char| c.is_whitespace() || c == ',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if !tickers.iter().any(|t| t == token) {
            tickers.push(token.to_string());
        }
    }
    tickers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir =
            std::env::temp_dir().join(format!("panelkit_universe_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parses_newline_delimited_list() {
        let tickers = parse_ticker_list("AAPL\nMSFT\nBRK.B\n");
        assert_eq!(tickers, vec!["AAPL", "MSFT", "BRK.B"]);
    }

    #[test]
    fn parses_space_and_comma_separated_lists() {
        assert_eq!(parse_ticker_list("AAPL MSFT GOOG"), vec!["AAPL", "MSFT", "GOOG"]);
        assert_eq!(parse_ticker_list("AAPL,MSFT, GOOG"), vec!["AAPL", "MSFT", "GOOG"]);
    }

    #[test]
    fn deduplicates_preserving_order() {
        let tickers = parse_ticker_list("MSFT AAPL MSFT");
        assert_eq!(tickers, vec!["MSFT", "AAPL"]);
    }

    #[test]
    fn empty_input_yields_no_tickers() {
        assert!(parse_ticker_list("  \n \n").is_empty());
    }

    #[test]
    fn loads_ticker_file() {
        let dir = temp_dir();
        let path = dir.join("sp500_tickers.txt");
        fs::write(&path, "AAPL\nMSFT\n\nGOOG\n").unwrap();

        let tickers = load_ticker_file(&path).unwrap();
        assert_eq!(tickers, vec!["AAPL", "MSFT", "GOOG"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_ticker_file_is_io_error() {
        let dir = temp_dir();
        let result = load_ticker_file(&dir.join("nope.txt"));
        assert!(matches!(result, Err(PanelError::Io(_))));
        let _ = fs::remove_dir_all(&dir);
    }
}
