//! Serializable pipeline configuration (TOML).

use crate::panel::PanelError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a full snapshot-and-clean pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    pub universe: UniverseConfig,
    pub range: RangeConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub clean: CleanSection,
}

/// Where the ticker universe comes from: inline tickers, a tickers file, or
/// both (concatenated, duplicates removed downstream).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UniverseConfig {
    #[serde(default)]
    pub tickers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tickers_file: Option<PathBuf>,
}

/// Download range, `[start_date, end_date)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RangeConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotConfig {
    /// Directory for snapshot files.
    #[serde(default = "default_snapshot_dir")]
    pub dir: PathBuf,
    /// Indicator selection code string; empty selects all six.
    #[serde(default)]
    pub indicators: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            dir: default_snapshot_dir(),
            indicators: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanSection {
    #[serde(default = "default_na_threshold")]
    pub na_threshold_ticker: f64,
}

impl Default for CleanSection {
    fn default() -> Self {
        Self {
            na_threshold_ticker: default_na_threshold(),
        }
    }
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_na_threshold() -> f64 {
    0.25
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, PanelError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PanelError::Io(format!("read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, PanelError> {
        let config: Self =
            toml::from_str(content).map_err(|e| PanelError::Format(format!("parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), PanelError> {
        if self.range.start_date > self.range.end_date {
            return Err(PanelError::InvalidRange {
                start: self.range.start_date,
                end: self.range.end_date,
            });
        }
        Ok(())
    }
}
