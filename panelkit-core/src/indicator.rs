//! Price indicators and their short codes.
//!
//! A snapshot column is keyed by (indicator, ticker). Indicators are selected
//! with single-letter codes: A = Adj Close, O = Open, H = High, L = Low,
//! C = Close, V = Volume.

use crate::panel::PanelError;
use serde::{Deserialize, Serialize};

/// One of the six per-ticker price/volume series in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indicator {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl Indicator {
    /// All six indicators in the canonical selection order (A, O, H, L, C, V).
    pub const ALL: [Indicator; 6] = [
        Indicator::AdjClose,
        Indicator::Open,
        Indicator::High,
        Indicator::Low,
        Indicator::Close,
        Indicator::Volume,
    ];

    /// Single-letter selection code.
    pub fn code(&self) -> char {
        match self {
            Indicator::Open => 'O',
            Indicator::High => 'H',
            Indicator::Low => 'L',
            Indicator::Close => 'C',
            Indicator::AdjClose => 'A',
            Indicator::Volume => 'V',
        }
    }

    /// Column label used in snapshots and return panels.
    pub fn label(&self) -> &'static str {
        match self {
            Indicator::Open => "Open",
            Indicator::High => "High",
            Indicator::Low => "Low",
            Indicator::Close => "Close",
            Indicator::AdjClose => "Adj Close",
            Indicator::Volume => "Volume",
        }
    }

    /// Parse a single selection code (case-insensitive).
    pub fn from_code(code: char) -> Result<Self, PanelError> {
        match code.to_ascii_uppercase() {
            'O' => Ok(Indicator::Open),
            'H' => Ok(Indicator::High),
            'L' => Ok(Indicator::Low),
            'C' => Ok(Indicator::Close),
            'A' => Ok(Indicator::AdjClose),
            'V' => Ok(Indicator::Volume),
            other => Err(PanelError::UnknownIndicator(other)),
        }
    }

    /// Parse a code string such as `"AOHLCV"` into an indicator selection.
    ///
    /// An empty string selects all six indicators in the canonical order.
    pub fn parse_selection(codes: &str) -> Result<Vec<Indicator>, PanelError> {
        if codes.is_empty() {
            return Ok(Self::ALL.to_vec());
        }
        codes.chars().map(Self::from_code).collect()
    }
}
