use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::format::PcmFormat;

/// Result returned when a recording has been written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRecording {
    pub file_path: PathBuf,
    pub data_bytes: u64,
    pub duration_secs: f64,
    pub checksum: String,
    pub metadata: RecordingMetadata,
}

/// Metadata stored alongside a saved recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub file_path: String,
    pub created_at: String,
    pub format: PcmFormat,
    pub data_bytes: u64,
    pub duration_secs: f64,
    pub checksum: String,
    /// The capture had lapped the ring, so the data was reassembled from the
    /// write position onwards.
    pub wrapped: bool,
}

impl RecordingMetadata {
    pub fn new(
        file_path: &str,
        format: PcmFormat,
        data_bytes: u64,
        checksum: &str,
        wrapped: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            format,
            data_bytes,
            duration_secs: format.duration_secs(data_bytes),
            checksum: checksum.to_string(),
            wrapped,
        }
    }
}
