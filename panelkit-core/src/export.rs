//! CSV export of a panel for external analysis tools.

use crate::panel::{is_missing, Panel, PanelError};
use std::path::Path;

/// Write a panel as CSV: a `date` column plus one `field|ticker` column per
/// panel column. Missing cells serialize as empty fields.
pub fn write_panel_csv(path: &Path, panel: &Panel) -> Result<(), PanelError> {
    let mut wtr =
        csv::Writer::from_path(path).map_err(|e| PanelError::Io(format!("create CSV: {e}")))?;

    let mut header = vec!["date".to_string()];
    header.extend(
        panel
            .columns()
            .iter()
            .map(|c| format!("{}|{}", c.field, c.ticker)),
    );
    wtr.write_record(&header)
        .map_err(|e| PanelError::Io(format!("write CSV header: {e}")))?;

    for (row, date) in panel.dates().iter().enumerate() {
        let mut record = vec![date.to_string()];
        for col in panel.columns() {
            let v = col.values[row];
            record.push(if is_missing(v) {
                String::new()
            } else {
                format!("{v}")
            });
        }
        wtr.write_record(&record)
            .map_err(|e| PanelError::Io(format!("write CSV row: {e}")))?;
    }

    wtr.flush()
        .map_err(|e| PanelError::Io(format!("flush CSV: {e}")))?;
    Ok(())
}
