//! Device listing for the simulated backend.
//!
//! Mirrors what a hardware enumerator reports: a stable ID, a friendly name,
//! and which endpoint is the default for each direction.

use ringdeck_core::{AudioDevice, DeviceKind, TransportError};

/// Enumerator over the simulated input and output endpoints.
#[derive(Debug, Clone)]
pub struct DeviceEnumerator {
    devices: Vec<AudioDevice>,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        let device = |id: &str, name: &str, kind, is_default| AudioDevice {
            id: id.into(),
            name: name.into(),
            kind,
            is_default,
        };
        Self {
            devices: vec![
                device("sim-mic", "Simulated Microphone", DeviceKind::Capture, true),
                device("sim-line-in", "Simulated Line In", DeviceKind::Capture, false),
                device("sim-speakers", "Simulated Speakers", DeviceKind::Playback, true),
            ],
        }
    }

    /// List capture (input) devices.
    pub fn list_capture_devices(&self) -> Vec<AudioDevice> {
        self.list(DeviceKind::Capture)
    }

    /// List playback (output) devices.
    pub fn list_playback_devices(&self) -> Vec<AudioDevice> {
        self.list(DeviceKind::Playback)
    }

    /// Resolve a requested capture device, falling back to the default.
    pub fn resolve_capture_device(&self, id: Option<&str>) -> Result<AudioDevice, TransportError> {
        let found = match id {
            Some(id) => self
                .devices
                .iter()
                .find(|d| d.kind == DeviceKind::Capture && d.id == id),
            None => self
                .devices
                .iter()
                .find(|d| d.kind == DeviceKind::Capture && d.is_default),
        };
        found
            .cloned()
            .ok_or_else(|| TransportError::Device(format!("no capture device '{}'", id.unwrap_or("default"))))
    }

    fn list(&self, kind: DeviceKind) -> Vec<AudioDevice> {
        self.devices.iter().filter(|d| d.kind == kind).cloned().collect()
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
