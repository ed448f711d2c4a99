//! Simulated playback provider.
//!
//! Consumes one tick worth of audio per request, scaled by `speed`, and
//! counts underruns: ticks where the transport could not refill everything
//! the device consumed (playback stalled behind the capture).

use std::time::Duration;

use ringdeck_core::{AudioDevice, PcmFormat, PlaybackDevice, TransportError};

use crate::device_enumerator::DeviceEnumerator;
use crate::sim_capture::SIM_API_VERSION;

pub struct SimulatedPlayback {
    enumerator: DeviceEnumerator,
    tick: Duration,
    speed: f64,
    format: PcmFormat,
    playing: bool,
    carry: f64,
    outstanding: usize,
    bytes_played: u64,
    underruns: u64,
}

impl SimulatedPlayback {
    pub fn new(tick: Duration, speed: f64) -> Self {
        Self {
            enumerator: DeviceEnumerator::new(),
            tick,
            speed,
            format: PcmFormat::default(),
            playing: false,
            carry: 0.0,
            outstanding: 0,
            bytes_played: 0,
            underruns: 0,
        }
    }

    pub fn bytes_played(&self) -> u64 {
        self.bytes_played
    }

    pub fn underruns(&self) -> u64 {
        self.underruns
    }
}

impl PlaybackDevice for SimulatedPlayback {
    fn api_version(&self) -> u32 {
        SIM_API_VERSION
    }

    fn enumerate(&self) -> Result<Vec<AudioDevice>, TransportError> {
        Ok(self.enumerator.list_playback_devices())
    }

    fn play(&mut self, format: &PcmFormat) -> Result<(), TransportError> {
        self.format = *format;
        self.playing = true;
        self.carry = 0.0;
        self.outstanding = 0;
        self.bytes_played = 0;
        self.underruns = 0;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TransportError> {
        if self.playing {
            log::debug!(
                "playback stopped after {} bytes, {} underruns",
                self.bytes_played,
                self.underruns
            );
        }
        self.playing = false;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn requested_bytes(&mut self) -> Result<usize, TransportError> {
        if !self.playing {
            return Ok(0);
        }
        if self.outstanding > 0 {
            self.underruns += 1;
        }

        let exact = self.format.sample_rate_hz as f64 * self.tick.as_secs_f64() * self.speed + self.carry;
        let frames = exact.floor();
        self.carry = exact - frames;
        self.outstanding = frames as usize * self.format.block_align() as usize;
        Ok(self.outstanding)
    }

    fn submit(&mut self, first: &[u8], second: &[u8]) -> Result<(), TransportError> {
        if !self.playing {
            return Err(TransportError::Device("submit to a stopped output".into()));
        }
        let len = first.len() + second.len();
        self.outstanding = self.outstanding.saturating_sub(len);
        self.bytes_played += len as u64;
        Ok(())
    }
}
