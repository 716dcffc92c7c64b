use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::ExportError;
use crate::models::export_report::ExportReport;

/// Path of the JSON sidecar for an exported file: `{export_path}.export.json`.
pub fn report_path(export_path: &Path) -> PathBuf {
    let mut name = export_path.as_os_str().to_owned();
    name.push(".export.json");
    PathBuf::from(name)
}

/// Write an export report as a JSON sidecar next to the exported file.
pub fn write_report(report: &ExportReport, export_path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| ExportError::Io(format!("failed to serialize export report: {}", e)))?;
    fs::write(report_path(export_path), json)
        .map_err(|e| ExportError::Io(format!("failed to write export report: {}", e)))?;
    Ok(())
}

/// Read an export report from its JSON sidecar.
pub fn read_report(export_path: &Path) -> Result<ExportReport, ExportError> {
    let json = fs::read_to_string(report_path(export_path))
        .map_err(|e| ExportError::Io(format!("failed to read export report: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| ExportError::Io(format!("failed to parse export report: {}", e)))
}
