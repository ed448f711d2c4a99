use crate::models::error::TransportError;
use crate::models::recording_result::SavedRecording;
use crate::models::state::TransportState;

/// Event sink for transport notifications.
///
/// Called on the control loop thread. Implementations should return quickly.
pub trait TransportDelegate: Send + Sync {
    /// Called when the transport state changes, including automatic changes
    /// (buffer full, end of stream).
    fn on_state_changed(&self, state: TransportState);

    /// Called when an operation or tick fails.
    fn on_error(&self, error: &TransportError);

    /// Called after a recording has been written to disk.
    fn on_recording_saved(&self, recording: &SavedRecording);
}
