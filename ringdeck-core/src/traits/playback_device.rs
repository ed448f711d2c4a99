use crate::models::device::AudioDevice;
use crate::models::error::TransportError;
use crate::models::format::PcmFormat;

/// Interface for an audio output that pulls PCM from the transport.
///
/// Each tick the transport asks how many bytes the device wants, then
/// submits at most that many. Submitting fewer (including none, while
/// playback is stalled behind the capture) is normal. When playback reaches
/// the end of a take, `stop` is called on the tick after the final submit.
pub trait PlaybackDevice: Send {
    fn api_version(&self) -> u32;

    /// List the output devices this backend can play to.
    fn enumerate(&self) -> Result<Vec<AudioDevice>, TransportError>;

    /// Open the output for `format`. Restarts if already playing.
    fn play(&mut self, format: &PcmFormat) -> Result<(), TransportError>;

    /// Stop output immediately, discarding anything still queued. Must
    /// succeed when already stopped.
    fn stop(&mut self) -> Result<(), TransportError>;

    fn is_playing(&self) -> bool;

    /// Bytes the device has consumed since the last call and wants refilled.
    fn requested_bytes(&mut self) -> Result<usize, TransportError>;

    /// Queue PCM for output. `second` continues `first` and is empty unless
    /// the data wrapped around the ring.
    fn submit(&mut self, first: &[u8], second: &[u8]) -> Result<(), TransportError>;
}
