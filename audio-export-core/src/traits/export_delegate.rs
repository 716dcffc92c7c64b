use crate::models::error::ExportError;
use crate::models::export_report::ExportReport;
use crate::models::state::ExportState;

/// Event delegate for export session notifications.
///
/// Called synchronously from the thread running the export.
pub trait ExportDelegate {
    fn on_state_changed(&self, state: &ExportState);

    /// Called after each rendered chunk with the running frame total.
    fn on_progress(&self, frames: u64);

    fn on_error(&self, error: &ExportError);

    fn on_export_finished(&self, report: &ExportReport);
}
