//! PanelKit Core — snapshot and return-cleaning pipeline for equity panels.
//!
//! The pipeline turns a raw multi-indicator, multi-ticker price panel into a
//! persisted snapshot and a cleaned, gap-free return panel:
//! - Panel data model: date-indexed table keyed by (field, ticker)
//! - PriceStore: snapshot persistence (Parquet + metadata sidecar)
//! - Return calculator: per-column simple returns
//! - Panel cleaner: missingness filter, forward-fill, leading-row drop,
//!   late-start filter — with an auditable drop report
//! - Market-data provider (Yahoo Finance) and S&P 500 universe fetch
//!
//! Each stage is a pure transformation of the previous stage's output plus
//! explicit parameters; the pipeline is single-threaded and synchronous.

pub mod circuit_breaker;
pub mod clean;
pub mod config;
pub mod export;
pub mod indicator;
pub mod panel;
pub mod provider;
pub mod returns;
pub mod store;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use clean::{clean_returns, CleanConfig, CleanReport, CleanedPanel};
pub use config::PipelineConfig;
pub use indicator::Indicator;
pub use panel::{is_missing, Panel, PanelColumn, PanelError, MISSING};
pub use provider::{
    download_panel, DownloadOutcome, FetchError, MarketDataProvider, StdoutProgress,
};
pub use returns::simple_returns;
pub use store::PriceStore;
pub use yahoo::YahooProvider;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline types can cross thread boundaries.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<panel::Panel>();
        require_sync::<panel::Panel>();
        require_send::<panel::PanelError>();
        require_sync::<panel::PanelError>();
        require_send::<store::PriceStore>();
        require_sync::<store::PriceStore>();
        require_send::<clean::CleanReport>();
        require_sync::<clean::CleanReport>();
        require_send::<provider::FetchError>();
        require_sync::<provider::FetchError>();
        require_send::<circuit_breaker::CircuitBreaker>();
        require_sync::<circuit_breaker::CircuitBreaker>();
    }
}
