use crate::errors::{AppError, AppResult};
use crate::export::ExportFormat;
use crate::export::fs_utils::ensure_writable;
use crate::export::json_csv::{export_csv, export_json};
use crate::export::model::PunchExport;
use crate::models::punch::Punch;
use crate::ui::messages::warning;
use std::path::Path;

pub struct ExportLogic;

impl ExportLogic {
    /// Write punches (as returned by the history query) to `file`.
    /// Returns the number of rows written.
    pub fn export_punches(
        punches: &[Punch],
        format: ExportFormat,
        file: &str,
        force: bool,
    ) -> AppResult<usize> {
        let path = Path::new(file);
        if !path.is_absolute() {
            return Err(AppError::Export(format!(
                "Output file path must be absolute: {file}"
            )));
        }

        if punches.is_empty() {
            warning("No punches found for the selected period. Nothing to export.");
            return Ok(0);
        }

        ensure_writable(path, force)?;

        // oldest first reads naturally in a spreadsheet
        let mut rows: Vec<PunchExport> = punches.iter().map(PunchExport::from).collect();
        rows.sort_by(|a, b| a.clock_in_utc.cmp(&b.clock_in_utc));

        match format {
            ExportFormat::Csv => export_csv(&rows, path)?,
            ExportFormat::Json => export_json(&rows, path)?,
        }
        Ok(rows.len())
    }
}
