//! # ringdeck-core
//!
//! Record and play back simultaneously against one shared ring buffer, and
//! export the recording as a PCM WAV file.
//!
//! The capture device appends into a fixed-size ring while a playback cursor
//! reads from it. [`PlaybackCursor`] never reads bytes that have not been
//! written, never falls behind the capture by more than a lap, and stalls
//! rather than overtaking a live recording. Backends implement
//! [`CaptureDevice`] and [`PlaybackDevice`] and are polled by a
//! [`TransportController`] once per tick.
//!
//! ## Architecture
//!
//! ```text
//! ringdeck-core (this crate)
//! ├── traits/       ← CaptureDevice, PlaybackDevice, TransportDelegate
//! ├── models/       ← TransportError, TransportState, PcmFormat, TransportConfiguration, etc.
//! ├── processing/   ← RingBuffer, WAV header generation and parsing
//! ├── cursor/       ← CaptureCursor, PlaybackCursor
//! ├── session/      ← TransportController (state machine + control loop step)
//! └── storage/      ← PcmContainerWriter, metadata sidecar
//! ```

pub mod cursor;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use cursor::{CaptureCursor, PlaybackCursor, ReadPlan, ReadSpan};
pub use models::config::TransportConfiguration;
pub use models::device::{AudioDevice, DeviceKind};
pub use models::error::TransportError;
pub use models::format::PcmFormat;
pub use models::recording_result::{RecordingMetadata, SavedRecording};
pub use models::state::{CaptureSession, TransportState, TransportStatus};
pub use processing::ring_buffer::RingBuffer;
pub use session::transport::{TransportController, TransportHandle, REQUIRED_API_VERSION};
pub use storage::wav_writer::PcmContainerWriter;
pub use traits::capture_device::CaptureDevice;
pub use traits::playback_device::PlaybackDevice;
pub use traits::transport_delegate::TransportDelegate;
