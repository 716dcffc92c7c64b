use super::error::ExportError;
use super::export_report::ExportReport;

/// Export session state machine.
///
/// ```text
/// idle → rendering → finishing → finished / failed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ExportState {
    Idle,
    Rendering { frames: u64 },
    Finishing { frames: u64 },
    Finished(ExportReport),
    Failed(ExportError),
}

impl ExportState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_rendering(&self) -> bool {
        matches!(self, Self::Rendering { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Failed(_))
    }

    /// Frames rendered so far, if the state tracks them.
    pub fn frames(&self) -> Option<u64> {
        match self {
            Self::Rendering { frames } | Self::Finishing { frames } => Some(*frames),
            Self::Finished(report) => Some(report.frames),
            _ => None,
        }
    }
}
