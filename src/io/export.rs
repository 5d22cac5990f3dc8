//! Read/write calculation JSON files.
//!
//! An export is the "portable" record of one calculation:
//! - the request as understood by the engine (rent, start date, series, lock)
//! - the result, breakdown and diagnostics
//!
//! `readjust show` re-renders a saved export without touching the network.

use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Readjustment, ReadjustmentRequest};
use crate::error::{AppError, EXIT_INPUT};

/// On-disk schema of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFile {
    pub tool: String,
    pub request: ReadjustmentRequest,
    pub readjustment: Readjustment,
}

impl ExportFile {
    pub fn new(request: &ReadjustmentRequest, readjustment: &Readjustment) -> Self {
        Self {
            tool: "readjust".to_string(),
            request: request.clone(),
            readjustment: readjustment.clone(),
        }
    }
}

/// Write an export JSON file.
pub fn write_export_json(path: &Path, export: &ExportFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, export)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write export JSON: {e}")))?;
    Ok(())
}

/// Read an export JSON file.
pub fn read_export_json(path: &Path) -> Result<ExportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open export JSON '{}': {e}", path.display())))?;
    let export: ExportFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid export JSON: {e}")))?;
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::{Periodicity, RawObservation, SeriesDescriptor, ValueKind};

    #[test]
    fn export_survives_disk() {
        let request = ReadjustmentRequest {
            principal: 1000.0,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            periodicity: Periodicity::Monthly,
            series: SeriesDescriptor::custom(433, ValueKind::Percentage),
            lock_deflation: false,
        };
        let rows = vec![RawObservation::text("01/01/2024", "0.50")];
        let readjustment = crate::engine::readjust(&request, &rows).unwrap();
        let export = ExportFile::new(&request, &readjustment);

        let path = std::env::temp_dir().join(format!("readjust-export-{}.json", std::process::id()));
        write_export_json(&path, &export).unwrap();
        let back = read_export_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(back.tool, "readjust");
        assert_eq!(back.readjustment.result.effective_date, readjustment.result.effective_date);
        assert_eq!(back.readjustment.breakdown.len(), 1);
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = read_export_json(Path::new("/definitely/not/here.json")).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }
}
