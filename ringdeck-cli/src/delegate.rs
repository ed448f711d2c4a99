use ringdeck_core::{SavedRecording, TransportDelegate, TransportError, TransportState};

/// Prints transport events for the operator.
pub struct ConsoleDelegate;

impl TransportDelegate for ConsoleDelegate {
    fn on_state_changed(&self, state: TransportState) {
        log::debug!("state changed: {}", state);
    }

    fn on_error(&self, error: &TransportError) {
        if error.is_misuse() {
            println!("\n{}", error);
        } else {
            println!("\nError! {}", error);
        }
    }

    fn on_recording_saved(&self, recording: &SavedRecording) {
        println!(
            "\nWrote {} ({:.2} s, {} bytes, sha256 {})",
            recording.file_path.display(),
            recording.duration_secs,
            recording.data_bytes,
            recording.checksum
        );
    }
}
