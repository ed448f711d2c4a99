use crate::models::device::AudioDevice;
use crate::models::error::TransportError;
use crate::models::format::PcmFormat;

/// Interface for an audio input that the transport polls once per tick.
///
/// Implementations own whatever driver thread or callback produces samples
/// and buffer them until the next `poll`. No method may block.
pub trait CaptureDevice: Send {
    /// Version of the backend library, checked against
    /// [`REQUIRED_API_VERSION`](crate::REQUIRED_API_VERSION) at startup.
    fn api_version(&self) -> u32;

    /// List the input devices this backend can record from.
    fn enumerate(&self) -> Result<Vec<AudioDevice>, TransportError>;

    /// Start capturing from `device_id` (backend default if `None`).
    fn start(
        &mut self,
        device_id: Option<&str>,
        format: &PcmFormat,
        looping: bool,
    ) -> Result<(), TransportError>;

    /// Stop capturing. Must succeed when already stopped.
    fn stop(&mut self) -> Result<(), TransportError>;

    fn is_capturing(&self) -> bool;

    /// Append every byte captured since the last poll to `out` and return
    /// how many were appended.
    fn poll(&mut self, out: &mut Vec<u8>) -> Result<usize, TransportError>;
}
