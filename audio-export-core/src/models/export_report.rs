use serde::{Deserialize, Serialize};

use super::sample_format::SampleFormat;

/// Summary of a finished export.
///
/// Serializable for the JSON sidecar written next to the exported file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub id: String,
    pub encoder_name: String,
    pub frames: u64,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
    /// SHA-256 hex digest of the sample stream handed to the encoder.
    pub content_digest: String,
    pub cue_count: usize,
    pub created_at: String,
}

impl ExportReport {
    pub fn new(
        encoder_name: &str,
        frames: u64,
        sample_rate: u32,
        channels: u16,
        sample_format: SampleFormat,
        content_digest: String,
        cue_count: usize,
    ) -> Self {
        let duration_secs = if sample_rate == 0 {
            0.0
        } else {
            frames as f64 / sample_rate as f64
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            encoder_name: encoder_name.to_string(),
            frames,
            duration_secs,
            sample_rate,
            channels,
            sample_format,
            content_digest,
            cue_count,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
