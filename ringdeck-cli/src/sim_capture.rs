//! Simulated capture provider.
//!
//! Produces a sine tone at the transport's format. Every poll yields one tick
//! worth of audio, scaled by `speed`, so a capture that runs faster or slower
//! than playback can be reproduced without hardware.

use std::f64::consts::PI;
use std::time::Duration;

use ringdeck_core::{AudioDevice, CaptureDevice, PcmFormat, TransportError};

use crate::device_enumerator::DeviceEnumerator;

/// Backend API version reported by the simulated devices.
pub const SIM_API_VERSION: u32 = 0x0001_0200;

pub struct SimulatedCapture {
    enumerator: DeviceEnumerator,
    tick: Duration,
    speed: f64,
    tone_hz: f64,
    format: PcmFormat,
    device: Option<AudioDevice>,
    frame_index: u64,
    carry: f64,
}

impl SimulatedCapture {
    pub fn new(tick: Duration, speed: f64, tone_hz: f64) -> Self {
        Self {
            enumerator: DeviceEnumerator::new(),
            tick,
            speed,
            tone_hz,
            format: PcmFormat::default(),
            device: None,
            frame_index: 0,
            carry: 0.0,
        }
    }

    /// Device currently capturing, if any.
    pub fn active_device(&self) -> Option<&AudioDevice> {
        self.device.as_ref()
    }

    /// Whole frames due this poll; the fractional remainder carries over.
    fn frames_due(&mut self) -> usize {
        let exact = self.format.sample_rate_hz as f64 * self.tick.as_secs_f64() * self.speed + self.carry;
        let whole = exact.floor();
        self.carry = exact - whole;
        whole as usize
    }

    fn sample_at(&self, frame: u64) -> f64 {
        let t = frame as f64 / self.format.sample_rate_hz as f64;
        0.5 * (2.0 * PI * self.tone_hz * t).sin()
    }
}

impl CaptureDevice for SimulatedCapture {
    fn api_version(&self) -> u32 {
        SIM_API_VERSION
    }

    fn enumerate(&self) -> Result<Vec<AudioDevice>, TransportError> {
        Ok(self.enumerator.list_capture_devices())
    }

    fn start(
        &mut self,
        device_id: Option<&str>,
        format: &PcmFormat,
        looping: bool,
    ) -> Result<(), TransportError> {
        let device = self.enumerator.resolve_capture_device(device_id)?;
        log::info!(
            "capturing from {} ({} Hz, {} ch, {} bit, loop: {})",
            device.name,
            format.sample_rate_hz,
            format.channels,
            format.bits_per_sample,
            looping
        );
        self.format = *format;
        self.device = Some(device);
        self.frame_index = 0;
        self.carry = 0.0;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        if let Some(device) = self.device.take() {
            log::debug!("{} stopped after {} frames", device.name, self.frame_index);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.device.is_some()
    }

    fn poll(&mut self, out: &mut Vec<u8>) -> Result<usize, TransportError> {
        if self.device.is_none() {
            return Ok(0);
        }

        let frames = self.frames_due();
        let before = out.len();
        out.reserve(frames * self.format.block_align() as usize);
        for _ in 0..frames {
            let value = self.sample_at(self.frame_index);
            for _ in 0..self.format.channels {
                encode_sample(value, self.format.bits_per_sample, out);
            }
            self.frame_index += 1;
        }
        Ok(out.len() - before)
    }
}

/// Append one sample in `[-1.0, 1.0]` as little-endian PCM.
///
/// 8-bit PCM is unsigned with a 128 midpoint; wider formats are signed.
fn encode_sample(value: f64, bits: u16, out: &mut Vec<u8>) {
    let value = value.clamp(-1.0, 1.0);
    match bits {
        8 => out.push((value * i8::MAX as f64 + 128.0) as u8),
        16 => out.extend_from_slice(&((value * i16::MAX as f64) as i16).to_le_bytes()),
        24 => out.extend_from_slice(&((value * 8_388_607.0) as i32).to_le_bytes()[..3]),
        _ => out.extend_from_slice(&((value * i32::MAX as f64) as i32).to_le_bytes()),
    }
}
