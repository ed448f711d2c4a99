use serde::{Deserialize, Serialize};

/// Sample layout of the captured stream.
///
/// Fixed for the lifetime of a transport; the WAV writer derives its
/// `fmt ` chunk from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmFormat {
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_rate_hz: u32,
}

impl PcmFormat {
    pub fn new(channels: u16, bits_per_sample: u16, sample_rate_hz: u32) -> Self {
        Self {
            channels,
            bits_per_sample,
            sample_rate_hz,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate_hz == 0 {
            return Err("sample rate must be positive".into());
        }
        if ![8, 16, 24, 32].contains(&self.bits_per_sample) {
            return Err(format!("unsupported bit depth: {}", self.bits_per_sample));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        Ok(())
    }

    /// Bytes per frame (one sample for every channel).
    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate_hz * self.block_align() as u32
    }

    /// Number of bytes covering `secs` of audio, rounded down to whole frames.
    pub fn bytes_for_secs(&self, secs: f64) -> usize {
        let frames = (self.sample_rate_hz as f64 * secs.max(0.0)) as usize;
        frames * self.block_align() as usize
    }

    pub fn duration_secs(&self, bytes: u64) -> f64 {
        let rate = self.byte_rate();
        if rate == 0 {
            return 0.0;
        }
        bytes as f64 / rate as f64
    }

    /// Round `bytes` down to a frame boundary.
    pub fn align_down(&self, bytes: usize) -> usize {
        let align = self.block_align().max(1) as usize;
        bytes - bytes % align
    }
}

impl Default for PcmFormat {
    /// 44.1 kHz mono 16-bit.
    fn default() -> Self {
        Self::new(1, 16, 44100)
    }
}
