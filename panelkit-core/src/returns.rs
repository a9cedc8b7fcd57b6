//! Simple-return computation over a price panel.

use crate::indicator::Indicator;
use crate::panel::{is_missing, Panel, PanelColumn, PanelError, MISSING};

/// Compute per-ticker simple returns for the selected indicators.
///
/// `indicator_codes` is a code string such as `"AC"`; an empty string selects
/// all six indicators. Output columns are named `<label> Returns` and keep
/// the input date index, so the first row is always missing (no prior
/// observation). A missing price at `t` or `t-1`, or a zero price at `t-1`,
/// yields a missing return — never an error and never an infinity.
///
/// This is a pure function of its inputs.
pub fn simple_returns(panel: &Panel, indicator_codes: &str) -> Result<Panel, PanelError> {
    let indicators = Indicator::parse_selection(indicator_codes)?;

    let mut columns = Vec::new();
    for indicator in &indicators {
        let label = indicator.label();
        let price_columns = panel.field_columns(label);
        if price_columns.is_empty() {
            return Err(PanelError::MissingIndicator(label.to_string()));
        }
        for col in price_columns {
            columns.push(PanelColumn::new(
                format!("{label} Returns"),
                col.ticker.clone(),
                column_returns(&col.values),
            ));
        }
    }

    Panel::new(panel.dates().to_vec(), columns)
}

/// `(p[t] - p[t-1]) / p[t-1]` per cell, with missing propagation.
fn column_returns(prices: &[f64]) -> Vec<f64> {
    let mut out = vec![MISSING; prices.len()];
    for t in 1..prices.len() {
        let prev = prices[t - 1];
        let cur = prices[t];
        if is_missing(prev) || is_missing(cur) || prev == 0.0 {
            continue;
        }
        out[t] = (cur - prev) / prev;
    }
    out
}
