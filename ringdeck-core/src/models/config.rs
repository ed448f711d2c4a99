use std::path::PathBuf;

use super::format::PcmFormat;

/// Configuration for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfiguration {
    /// Layout of the captured stream (default: 44100 Hz, mono, 16-bit).
    pub format: PcmFormat,

    /// Length of the shared ring buffer in seconds (default: 5).
    pub buffer_secs: f64,

    /// Control loop period in milliseconds (default: 10).
    pub tick_interval_ms: u64,

    /// How far playback must trail a live recording, in milliseconds (default: 0).
    pub guard_ms: u64,

    /// Initial loop flag, read by each cursor when it starts.
    pub loop_enabled: bool,

    /// Specific capture device ID, or None for the backend default.
    pub capture_device_id: Option<String>,

    /// Where `save` writes the recording.
    pub output_path: PathBuf,

    /// Also write a `.metadata.json` sidecar next to every saved recording.
    pub write_metadata_sidecar: bool,
}

impl TransportConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        self.format.validate()?;
        if !(self.buffer_secs > 0.0) {
            return Err("buffer length must be positive".into());
        }
        if self.tick_interval_ms == 0 {
            return Err("tick interval must be positive".into());
        }
        if self.capacity_bytes() == 0 {
            return Err("buffer is shorter than a single frame".into());
        }
        if self.guard_bytes() >= self.capacity_bytes() {
            return Err(format!(
                "guard of {} ms does not fit in a {} s buffer",
                self.guard_ms, self.buffer_secs
            ));
        }
        Ok(())
    }

    /// Ring buffer size in bytes, whole frames only.
    pub fn capacity_bytes(&self) -> usize {
        self.format.bytes_for_secs(self.buffer_secs)
    }

    /// Playback guard margin in bytes, whole frames only.
    pub fn guard_bytes(&self) -> usize {
        self.format.bytes_for_secs(self.guard_ms as f64 / 1000.0)
    }
}

impl Default for TransportConfiguration {
    fn default() -> Self {
        Self {
            format: PcmFormat::default(),
            buffer_secs: 5.0,
            tick_interval_ms: 10,
            guard_ms: 0,
            loop_enabled: false,
            capture_device_id: None,
            output_path: PathBuf::from("record.wav"),
            write_metadata_sidecar: false,
        }
    }
}
