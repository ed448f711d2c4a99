use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cursor::{CaptureCursor, PlaybackCursor};
use crate::models::config::TransportConfiguration;
use crate::models::device::AudioDevice;
use crate::models::error::TransportError;
use crate::models::format::PcmFormat;
use crate::models::recording_result::SavedRecording;
use crate::models::state::{CaptureSession, TransportState, TransportStatus};
use crate::processing::ring_buffer::RingBuffer;
use crate::storage::metadata;
use crate::storage::wav_writer::PcmContainerWriter;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::playback_device::PlaybackDevice;
use crate::traits::transport_delegate::TransportDelegate;

/// Oldest backend API version the transport will drive.
pub const REQUIRED_API_VERSION: u32 = 0x0001_0000;

/// Record/playback orchestrator over one shared ring buffer.
///
/// Generic over the capture and playback backends. Driven by a single
/// cooperative control loop calling [`tick`](Self::tick) at
/// `tick_interval_ms`; nothing here blocks.
///
/// ```text
/// [CaptureDevice] ─poll→ RingBuffer @ CaptureCursor ─┐
///                                                     ├→ PlaybackCursor ─spans→ [PlaybackDevice]
///                         save → PcmContainerWriter ←─┘
/// ```
pub struct TransportController<C: CaptureDevice, P: PlaybackDevice> {
    capture_device: C,
    playback_device: P,
    config: TransportConfiguration,
    delegate: Option<Arc<dyn TransportDelegate>>,

    // Shared with the WAV writer and, through the handle, other threads
    ring: Arc<Mutex<RingBuffer>>,
    capture: Arc<CaptureCursor>,
    playback: Arc<PlaybackCursor>,

    looping: bool,
    guard_bytes: usize,
    state: TransportState,
    session: Option<CaptureSession>,
    tick_count: u64,
    submitted_this_tick: bool,

    // Reused between polls
    scratch: Vec<u8>,
}

impl<C: CaptureDevice, P: PlaybackDevice> TransportController<C, P> {
    /// Validate the configuration and both backends, and allocate the ring.
    ///
    /// Errors here are startup errors: `ConfigurationFailed` or
    /// `VersionMismatch`.
    pub fn new(
        capture_device: C,
        playback_device: P,
        config: TransportConfiguration,
    ) -> Result<Self, TransportError> {
        config.validate().map_err(TransportError::ConfigurationFailed)?;
        check_api_version(capture_device.api_version())?;
        check_api_version(playback_device.api_version())?;

        let capacity = config.capacity_bytes();
        log::info!(
            "transport ready: {} byte ring ({} s of {} Hz, {} ch, {} bit), guard {} bytes",
            capacity,
            config.buffer_secs,
            config.format.sample_rate_hz,
            config.format.channels,
            config.format.bits_per_sample,
            config.guard_bytes()
        );

        Ok(Self {
            capture_device,
            playback_device,
            delegate: None,
            ring: Arc::new(Mutex::new(RingBuffer::new(capacity))),
            capture: Arc::new(CaptureCursor::new(capacity)),
            playback: Arc::new(PlaybackCursor::new(capacity)),
            looping: config.loop_enabled,
            guard_bytes: config.guard_bytes(),
            state: TransportState::Idle,
            session: None,
            tick_count: 0,
            submitted_this_tick: false,
            scratch: Vec::new(),
            config,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn TransportDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn status(&self) -> TransportStatus {
        TransportStatus {
            state: self.state,
            record_position: self.capture.write_position(),
            play_position: self.playback.position(),
            captured_bytes: self.capture.elapsed_length(),
            looping: self.looping,
            session: self.session.clone(),
        }
    }

    pub fn config(&self) -> &TransportConfiguration {
        &self.config
    }

    pub fn format(&self) -> &PcmFormat {
        &self.config.format
    }

    /// A cloneable handle for stopping the transport from another thread.
    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            capture: Arc::clone(&self.capture),
            playback: Arc::clone(&self.playback),
        }
    }

    pub fn capture_device(&self) -> &C {
        &self.capture_device
    }

    pub fn capture_device_mut(&mut self) -> &mut C {
        &mut self.capture_device
    }

    pub fn playback_device(&self) -> &P {
        &self.playback_device
    }

    pub fn playback_device_mut(&mut self) -> &mut P {
        &mut self.playback_device
    }

    /// List capture devices followed by playback devices.
    pub fn available_devices(&self) -> Result<Vec<AudioDevice>, TransportError> {
        let mut devices = self.capture_device.enumerate()?;
        devices.extend(self.playback_device.enumerate()?);
        Ok(devices)
    }

    /// Start a new take at the beginning of the ring.
    ///
    /// Transitions: Idle → Recording, Playing → RecordingAndPlaying.
    /// `AlreadyActive` while recording.
    pub fn record(&mut self) -> Result<(), TransportError> {
        let result = self.try_record();
        self.refresh_state();
        self.report(result)
    }

    /// Stop capturing, keeping what was recorded.
    ///
    /// Transitions: Recording → Idle, RecordingAndPlaying → Playing.
    pub fn stop_recording(&mut self) -> Result<(), TransportError> {
        self.capture.stop();
        self.session = None;
        let result = self.capture_device.stop();
        self.refresh_state();
        self.report(result)
    }

    /// Play the recording, alongside the capture if it is still running.
    ///
    /// Transitions: Idle → Playing, Recording → RecordingAndPlaying. Playing
    /// again restarts from the beginning. `NotEnoughData` when nothing has
    /// been recorded and nothing is recording; the state is left unchanged.
    pub fn play(&mut self) -> Result<(), TransportError> {
        let result = self.try_play();
        self.refresh_state();
        self.report(result)
    }

    pub fn stop_playback(&mut self) -> Result<(), TransportError> {
        self.playback.stop();
        let result = self.playback_device.stop();
        self.refresh_state();
        self.report(result)
    }

    /// Stop both cursors and both devices, from any state.
    ///
    /// Both devices are always asked to stop; the first failure is returned.
    pub fn stop(&mut self) -> Result<(), TransportError> {
        self.capture.stop();
        self.playback.stop();
        self.session = None;

        let capture_result = self.capture_device.stop();
        let playback_result = self.playback_device.stop();
        self.refresh_state();
        self.report(capture_result.and(playback_result))
    }

    /// Flip the loop flag. Takes effect at the next record or play.
    pub fn toggle_loop(&mut self) -> bool {
        self.set_looping(!self.looping);
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        log::debug!("loop {}", if looping { "on" } else { "off" });
        self.looping = looping;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// One pass of the control loop.
    ///
    /// Moves newly captured bytes into the ring, feeds the playback device,
    /// and stops any device whose cursor has gone inactive (buffer full, end
    /// of stream, or a [`TransportHandle::stop`] from another thread). After
    /// end of stream the output is stopped on the following tick.
    pub fn tick(&mut self) -> Result<TransportState, TransportError> {
        self.tick_count += 1;
        self.submitted_this_tick = false;

        let pumped = self.pump_capture().and_then(|()| self.pump_playback());
        let synced = self.sync_devices();
        self.refresh_state();

        let state = self.state;
        self.report(pumped.and(synced).map(|()| state))
    }

    /// Save the recording to the configured output path.
    pub fn save(&mut self) -> Result<SavedRecording, TransportError> {
        let path = self.config.output_path.clone();
        self.save_to(path)
    }

    /// Save the recording as a WAV file at `path`.
    ///
    /// If a looping capture has lapped the ring, the file starts at the
    /// oldest intact byte (the write position) so it plays in recorded order.
    pub fn save_to(&mut self, path: impl Into<PathBuf>) -> Result<SavedRecording, TransportError> {
        let result = self.try_save(path.into());
        if let (Ok(saved), Some(delegate)) = (&result, &self.delegate) {
            delegate.on_recording_saved(saved);
        }
        self.report(result)
    }

    // --- Internal helpers ---

    fn try_record(&mut self) -> Result<(), TransportError> {
        if self.capture.is_active() {
            return Err(TransportError::AlreadyActive);
        }

        self.capture_device.start(
            self.config.capture_device_id.as_deref(),
            &self.config.format,
            self.looping,
        )?;
        self.ring.lock().clear();

        if let Err(e) = self.capture.start(self.looping) {
            let _ = self.capture_device.stop();
            return Err(e);
        }
        if self.playback.is_active() {
            self.playback.rebase();
        }

        self.session = Some(CaptureSession {
            device_id: self.config.capture_device_id.clone(),
            started_at_tick: self.tick_count,
        });
        Ok(())
    }

    fn try_play(&mut self) -> Result<(), TransportError> {
        self.playback.start(self.looping, &self.capture)?;
        if let Err(e) = self.playback_device.play(&self.config.format) {
            self.playback.stop();
            return Err(e);
        }
        Ok(())
    }

    fn try_save(&self, path: PathBuf) -> Result<SavedRecording, TransportError> {
        let capacity = self.capture.capacity() as u64;
        let length = self.capture.elapsed_length().min(capacity) as usize;
        if length == 0 {
            return Err(TransportError::NotEnoughData);
        }
        let wrapped = self.capture.has_wrapped();
        let start = if wrapped {
            self.capture.write_position()
        } else {
            0
        };

        let saved = {
            let ring = self.ring.lock();
            PcmContainerWriter::new(path).write_region(
                &ring,
                &self.config.format,
                start,
                length,
                wrapped,
            )?
        };

        if self.config.write_metadata_sidecar {
            metadata::write_metadata(&saved.metadata, &saved.file_path)?;
        }
        Ok(saved)
    }

    /// Copy whatever the capture device produced into the ring.
    fn pump_capture(&mut self) -> Result<(), TransportError> {
        if !self.capture.is_active() {
            return Ok(());
        }

        self.scratch.clear();
        self.capture_device.poll(&mut self.scratch)?;

        let mut stored = 0;
        {
            let mut ring = self.ring.lock();
            for chunk in self.scratch.chunks(self.capture.capacity()) {
                let accepted = self.capture.writable(chunk.len());
                if accepted == 0 {
                    break;
                }
                // Bytes first, then publish the new write total.
                ring.write(self.capture.write_position(), &chunk[..accepted]);
                stored += self.capture.on_samples_captured(accepted);
            }
        }
        if stored < self.scratch.len() {
            log::debug!("dropped {} captured bytes past the end of the buffer", self.scratch.len() - stored);
        }

        if self.capture.is_active() && !self.capture_device.is_capturing() {
            log::warn!("capture device stopped on its own");
            self.capture.stop();
            self.session = None;
        }
        Ok(())
    }

    /// Hand the playback device as much as the cursor allows.
    ///
    /// The cursor only moves past spans the device accepted, so a failed
    /// submit is retried on the next tick instead of skipping audio.
    fn pump_playback(&mut self) -> Result<(), TransportError> {
        if !self.playback.is_active() {
            return Ok(());
        }

        let requested = self.config.format.align_down(self.playback_device.requested_bytes()?);
        let plan = self
            .playback
            .plan_spans(requested, &self.capture, self.guard_bytes);

        let mut delivered = 0;
        let mut result = Ok(());
        {
            let ring = self.ring.lock();
            for span in &plan.spans {
                let (first, second) = ring.read(span.offset, span.len);
                if let Err(e) = self.playback_device.submit(first, second) {
                    result = Err(e);
                    break;
                }
                delivered += 1;
            }
        }
        self.playback.commit(&plan, delivered);
        self.submitted_this_tick = delivered > 0;

        if plan.spans.is_empty() && requested > 0 && self.playback.is_active() {
            log::trace!("playback stalled behind capture");
        }
        result
    }

    /// Stop devices whose cursor has gone inactive.
    ///
    /// An output that was just handed the final span keeps running for one
    /// more tick so it can play that tail out.
    fn sync_devices(&mut self) -> Result<(), TransportError> {
        let mut result = Ok(());

        if !self.capture.is_active() && self.capture_device.is_capturing() {
            self.session = None;
            result = result.and(self.capture_device.stop());
        }
        if !self.playback.is_active() && self.playback_device.is_playing() && !self.submitted_this_tick {
            result = result.and(self.playback_device.stop());
        }
        result
    }

    fn refresh_state(&mut self) {
        let state = TransportState::from_activity(self.capture.is_active(), self.playback.is_active());
        if state == self.state {
            return;
        }

        log::info!("transport: {} -> {}", self.state, state);
        self.state = state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(state);
        }
    }

    /// Log and forward a failed operation to the delegate.
    fn report<T>(&self, result: Result<T, TransportError>) -> Result<T, TransportError> {
        if let Err(ref e) = result {
            if e.is_misuse() {
                log::warn!("{}", e);
            } else {
                log::error!("{}", e);
            }
            if let Some(ref delegate) = self.delegate {
                delegate.on_error(e);
            }
        }
        result
    }
}

fn check_api_version(found: u32) -> Result<(), TransportError> {
    if found < REQUIRED_API_VERSION {
        return Err(TransportError::VersionMismatch {
            found,
            required: REQUIRED_API_VERSION,
        });
    }
    Ok(())
}

/// Thread-safe view of a transport's cursors.
///
/// `stop` only marks the cursors inactive; the controller's next tick
/// observes that and stops the devices.
#[derive(Clone)]
pub struct TransportHandle {
    capture: Arc<CaptureCursor>,
    playback: Arc<PlaybackCursor>,
}

impl TransportHandle {
    pub fn stop(&self) {
        self.capture.stop();
        self.playback.stop();
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_active()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_active()
    }

    pub fn state(&self) -> TransportState {
        TransportState::from_activity(self.is_recording(), self.is_playing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::DeviceKind;
    use crate::processing::wav_format::parse_wav;

    #[derive(Default)]
    struct MockCapture {
        version: u32,
        capturing: bool,
        pending: Vec<u8>,
        fail_start: bool,
        fail_poll: bool,
        starts: usize,
    }

    impl MockCapture {
        fn new() -> Self {
            Self {
                version: REQUIRED_API_VERSION,
                ..Default::default()
            }
        }

        fn feed(&mut self, bytes: &[u8]) {
            self.pending.extend_from_slice(bytes);
        }
    }

    impl CaptureDevice for MockCapture {
        fn api_version(&self) -> u32 {
            self.version
        }

        fn enumerate(&self) -> Result<Vec<AudioDevice>, TransportError> {
            Ok(vec![AudioDevice {
                id: "mock-in".into(),
                name: "Mock Input".into(),
                kind: DeviceKind::Capture,
                is_default: true,
            }])
        }

        fn start(&mut self, _: Option<&str>, _: &PcmFormat, _: bool) -> Result<(), TransportError> {
            if self.fail_start {
                return Err(TransportError::Device("input unplugged".into()));
            }
            self.capturing = true;
            self.starts += 1;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), TransportError> {
            self.capturing = false;
            Ok(())
        }

        fn is_capturing(&self) -> bool {
            self.capturing
        }

        fn poll(&mut self, out: &mut Vec<u8>) -> Result<usize, TransportError> {
            if self.fail_poll {
                return Err(TransportError::Device("input overrun".into()));
            }
            let n = self.pending.len();
            out.append(&mut self.pending);
            Ok(n)
        }
    }

    #[derive(Default)]
    struct MockPlayback {
        version: u32,
        playing: bool,
        request_per_tick: usize,
        received: Vec<u8>,
        submits: usize,
        fail_submit: bool,
    }

    impl MockPlayback {
        fn new(request_per_tick: usize) -> Self {
            Self {
                version: REQUIRED_API_VERSION,
                request_per_tick,
                ..Default::default()
            }
        }
    }

    impl PlaybackDevice for MockPlayback {
        fn api_version(&self) -> u32 {
            self.version
        }

        fn enumerate(&self) -> Result<Vec<AudioDevice>, TransportError> {
            Ok(vec![AudioDevice {
                id: "mock-out".into(),
                name: "Mock Output".into(),
                kind: DeviceKind::Playback,
                is_default: true,
            }])
        }

        fn play(&mut self, _: &PcmFormat) -> Result<(), TransportError> {
            self.playing = true;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), TransportError> {
            self.playing = false;
            Ok(())
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn requested_bytes(&mut self) -> Result<usize, TransportError> {
            Ok(if self.playing { self.request_per_tick } else { 0 })
        }

        fn submit(&mut self, first: &[u8], second: &[u8]) -> Result<(), TransportError> {
            if self.fail_submit {
                return Err(TransportError::Device("output buffer lost".into()));
            }
            self.received.extend_from_slice(first);
            self.received.extend_from_slice(second);
            self.submits += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingDelegate {
        states: Mutex<Vec<TransportState>>,
        errors: Mutex<Vec<TransportError>>,
        saved: Mutex<Vec<PathBuf>>,
    }

    impl TransportDelegate for RecordingDelegate {
        fn on_state_changed(&self, state: TransportState) {
            self.states.lock().push(state);
        }

        fn on_error(&self, error: &TransportError) {
            self.errors.lock().push(error.clone());
        }

        fn on_recording_saved(&self, recording: &SavedRecording) {
            self.saved.lock().push(recording.file_path.clone());
        }
    }

    type Controller = TransportController<MockCapture, MockPlayback>;

    /// 8-bit mono at 1 kHz with a 100-byte ring: one byte per millisecond.
    fn small_config() -> TransportConfiguration {
        TransportConfiguration {
            format: PcmFormat::new(1, 8, 1000),
            buffer_secs: 0.1,
            ..Default::default()
        }
    }

    fn controller(request_per_tick: usize) -> Controller {
        TransportController::new(MockCapture::new(), MockPlayback::new(request_per_tick), small_config())
            .unwrap()
    }

    fn ramp(start: u8, len: usize) -> Vec<u8> {
        (0..len).map(|i| start.wrapping_add(i as u8)).collect()
    }

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ringdeck_transport_test_{}", name))
    }

    #[test]
    fn old_backend_is_version_mismatch() {
        let mut capture = MockCapture::new();
        capture.version = 0x0000_ff00;

        let result = TransportController::new(capture, MockPlayback::new(0), small_config());
        assert!(matches!(
            result,
            Err(TransportError::VersionMismatch {
                found: 0x0000_ff00,
                required: REQUIRED_API_VERSION
            })
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = TransportConfiguration {
            tick_interval_ms: 0,
            ..small_config()
        };
        let result = TransportController::new(MockCapture::new(), MockPlayback::new(0), config);
        assert!(matches!(result, Err(TransportError::ConfigurationFailed(_))));
    }

    #[test]
    fn play_with_nothing_recorded_stays_idle() {
        let mut transport = controller(10);

        assert_eq!(transport.play(), Err(TransportError::NotEnoughData));
        assert_eq!(transport.state(), TransportState::Idle);
        assert!(!transport.playback_device().is_playing());
    }

    #[test]
    fn record_twice_is_reported_not_fatal() {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut transport = controller(10);
        transport.set_delegate(delegate.clone());

        transport.record().unwrap();
        assert_eq!(transport.record(), Err(TransportError::AlreadyActive));
        assert_eq!(transport.state(), TransportState::Recording);
        assert_eq!(transport.capture_device().starts, 1);
        assert_eq!(*delegate.errors.lock(), vec![TransportError::AlreadyActive]);
    }

    #[test]
    fn recorded_bytes_land_in_ring_order() {
        let mut transport = controller(10);
        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 30));
        transport.tick().unwrap();

        let status = transport.status();
        assert_eq!(status.record_position, 30);
        assert_eq!(status.captured_bytes, 30);
        assert_eq!(transport.ring.lock().copy_out(0, 30), ramp(0, 30));
    }

    #[test]
    fn play_while_recording_never_overtakes_capture() {
        let mut transport = controller(16);
        transport.record().unwrap();
        transport.play().unwrap();
        assert_eq!(transport.state(), TransportState::RecordingAndPlaying);

        let mut captured = 0;
        for (i, chunk) in [5usize, 0, 20, 3, 12, 0, 9].iter().enumerate() {
            transport.capture_device_mut().feed(&ramp(captured as u8, *chunk));
            captured += chunk;
            transport.tick().unwrap();

            let played = transport.playback_device().received.len();
            assert!(played <= captured, "tick {}: played {} of {}", i, played, captured);
        }

        assert_eq!(transport.playback_device().received, ramp(0, captured));
        assert_eq!(transport.state(), TransportState::RecordingAndPlaying);
    }

    #[test]
    fn playback_stalls_when_caught_up() {
        let mut transport = controller(16);
        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 16));
        transport.play().unwrap();
        transport.tick().unwrap();
        assert_eq!(transport.playback_device().received.len(), 16);

        let submits = transport.playback_device().submits;
        transport.tick().unwrap();

        assert_eq!(transport.playback_device().submits, submits);
        assert_eq!(transport.status().play_position, 16);
        assert_eq!(transport.state(), TransportState::RecordingAndPlaying);
    }

    #[test]
    fn guard_keeps_playback_behind_live_capture() {
        let config = TransportConfiguration {
            guard_ms: 10,
            ..small_config()
        };
        let mut transport =
            TransportController::new(MockCapture::new(), MockPlayback::new(50), config).unwrap();

        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 40));
        transport.play().unwrap();
        transport.tick().unwrap();

        assert_eq!(transport.playback_device().received.len(), 30);
    }

    #[test]
    fn capture_stops_itself_when_buffer_is_full() {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut transport = controller(10);
        transport.set_delegate(delegate.clone());

        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 130));
        transport.tick().unwrap();

        assert_eq!(transport.state(), TransportState::Idle);
        assert!(!transport.capture_device().is_capturing());
        assert_eq!(transport.status().captured_bytes, 100);
        assert_eq!(
            *delegate.states.lock(),
            vec![TransportState::Recording, TransportState::Idle]
        );
    }

    #[test]
    fn playback_ends_after_recording_stopped() {
        let mut transport = controller(25);
        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 40));
        transport.tick().unwrap();
        transport.stop_recording().unwrap();
        assert_eq!(transport.state(), TransportState::Idle);

        transport.play().unwrap();
        assert_eq!(transport.state(), TransportState::Playing);
        transport.tick().unwrap();
        assert_eq!(transport.state(), TransportState::Playing);
        transport.tick().unwrap();

        // The output gets one more tick to play the final span out.
        assert_eq!(transport.state(), TransportState::Idle);
        assert!(transport.playback_device().is_playing());
        assert_eq!(transport.playback_device().received, ramp(0, 40));

        transport.tick().unwrap();
        assert!(!transport.playback_device().is_playing());
        assert_eq!(transport.playback_device().received, ramp(0, 40));
    }

    #[test]
    fn looping_playback_restarts_from_the_top() {
        let mut transport = controller(30);
        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 20));
        transport.tick().unwrap();
        transport.stop_recording().unwrap();

        assert!(transport.toggle_loop());
        transport.play().unwrap();
        transport.tick().unwrap();

        let mut expected = ramp(0, 20);
        expected.extend(ramp(0, 10));
        assert_eq!(transport.playback_device().received, expected);
        assert_eq!(transport.state(), TransportState::Playing);
    }

    #[test]
    fn stop_from_any_state_is_idle_and_idempotent() {
        let mut transport = controller(10);
        transport.stop().unwrap();
        assert_eq!(transport.state(), TransportState::Idle);

        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 20));
        transport.tick().unwrap();
        transport.play().unwrap();
        transport.stop().unwrap();
        transport.stop().unwrap();

        assert_eq!(transport.state(), TransportState::Idle);
        assert!(!transport.capture_device().is_capturing());
        assert!(!transport.playback_device().is_playing());
        assert_eq!(transport.status().captured_bytes, 20);
    }

    #[test]
    fn recording_under_playback_rebases_it() {
        let mut transport = controller(10);
        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 50));
        transport.tick().unwrap();
        transport.stop_recording().unwrap();
        transport.set_looping(true);
        transport.play().unwrap();
        transport.tick().unwrap();

        transport.record().unwrap();
        assert_eq!(transport.state(), TransportState::RecordingAndPlaying);
        assert_eq!(transport.status().play_position, 0);

        transport.capture_device_mut().feed(&ramp(100, 4));
        transport.tick().unwrap();
        let received = &transport.playback_device().received;
        assert_eq!(&received[received.len() - 4..], &ramp(100, 4)[..]);
    }

    #[test]
    fn handle_stop_is_observed_on_next_tick() {
        let mut transport = controller(10);
        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 20));
        transport.tick().unwrap();
        transport.play().unwrap();

        let handle = transport.handle();
        std::thread::spawn(move || handle.stop()).join().unwrap();

        transport.capture_device_mut().feed(&ramp(0, 20));
        transport.tick().unwrap();

        assert_eq!(transport.state(), TransportState::Idle);
        assert!(!transport.capture_device().is_capturing());
        assert!(!transport.playback_device().is_playing());
        assert_eq!(transport.status().captured_bytes, 20);
        assert!(transport.playback_device().received.is_empty());
    }

    #[test]
    fn device_failure_is_fatal_to_the_operation_only() {
        let mut capture = MockCapture::new();
        capture.fail_start = true;
        let mut transport =
            TransportController::new(capture, MockPlayback::new(10), small_config()).unwrap();

        assert!(matches!(transport.record(), Err(TransportError::Device(_))));
        assert_eq!(transport.state(), TransportState::Idle);

        transport.capture_device_mut().fail_start = false;
        transport.record().unwrap();
        assert_eq!(transport.state(), TransportState::Recording);
    }

    #[test]
    fn save_without_recording_is_not_enough_data() {
        let mut transport = controller(10);
        assert_eq!(
            transport.save_to(temp_file_path("empty.wav")),
            Err(TransportError::NotEnoughData)
        );
    }

    #[test]
    fn save_writes_the_recorded_take() {
        let delegate = Arc::new(RecordingDelegate::default());
        let path = temp_file_path("take.wav");
        let mut transport = controller(10);
        transport.set_delegate(delegate.clone());

        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 60));
        transport.tick().unwrap();

        let saved = transport.save_to(&path).unwrap();
        assert_eq!(saved.data_bytes, 60);

        let file_data = std::fs::read(&path).unwrap();
        let parsed = parse_wav(&file_data).unwrap();
        assert_eq!(parsed.format, PcmFormat::new(1, 8, 1000));
        assert_eq!(parsed.data, &ramp(0, 60)[..]);
        assert_eq!(*delegate.saved.lock(), vec![path.clone()]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn save_after_wrap_is_in_recorded_order() {
        let path = temp_file_path("wrapped_take.wav");
        let mut transport = controller(10);
        transport.set_looping(true);

        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 130));
        transport.tick().unwrap();
        assert_eq!(transport.state(), TransportState::Recording);
        transport.stop().unwrap();

        let saved = transport.save_to(&path).unwrap();
        assert!(saved.metadata.wrapped);

        let file_data = std::fs::read(&path).unwrap();
        let parsed = parse_wav(&file_data).unwrap();
        assert_eq!(parsed.data, &ramp(30, 100)[..]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn save_with_sidecar() {
        let path = temp_file_path("sidecar.wav");
        let config = TransportConfiguration {
            output_path: path.clone(),
            write_metadata_sidecar: true,
            ..small_config()
        };
        let mut transport =
            TransportController::new(MockCapture::new(), MockPlayback::new(10), config).unwrap();

        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 10));
        transport.tick().unwrap();
        let saved = transport.save().unwrap();

        let sidecar = metadata::read_metadata(&path).unwrap();
        assert_eq!(sidecar.checksum, saved.checksum);

        std::fs::remove_file(&path).ok();
        std::fs::remove_file(path.with_extension("metadata.json")).ok();
    }

    #[test]
    fn lists_devices_from_both_backends() {
        let transport = controller(10);
        let devices = transport.available_devices().unwrap();
        let ids: Vec<_> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["mock-in", "mock-out"]);
    }

    #[test]
    fn failed_submit_is_retried_without_losing_audio() {
        let delegate = Arc::new(RecordingDelegate::default());
        let mut transport = controller(10);
        transport.set_delegate(delegate.clone());

        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 30));
        transport.tick().unwrap();
        transport.stop_recording().unwrap();
        transport.play().unwrap();

        transport.playback_device_mut().fail_submit = true;
        assert!(matches!(transport.tick(), Err(TransportError::Device(_))));
        assert_eq!(transport.status().play_position, 0);
        assert_eq!(transport.state(), TransportState::Playing);
        assert_eq!(delegate.errors.lock().len(), 1);

        transport.playback_device_mut().fail_submit = false;
        for _ in 0..4 {
            transport.tick().unwrap();
        }
        assert_eq!(transport.playback_device().received, ramp(0, 30));
        assert_eq!(transport.state(), TransportState::Idle);
    }

    #[test]
    fn failed_final_submit_keeps_playback_alive() {
        let mut transport = controller(50);
        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 30));
        transport.tick().unwrap();
        transport.stop_recording().unwrap();
        transport.play().unwrap();

        transport.playback_device_mut().fail_submit = true;
        assert!(transport.tick().is_err());
        assert_eq!(transport.state(), TransportState::Playing);
        assert!(transport.playback_device().is_playing());

        transport.playback_device_mut().fail_submit = false;
        transport.tick().unwrap();
        assert_eq!(transport.playback_device().received, ramp(0, 30));
        assert_eq!(transport.state(), TransportState::Idle);
    }

    #[test]
    fn failed_poll_is_fatal_to_the_tick_only() {
        let mut transport = controller(10);
        transport.record().unwrap();

        transport.capture_device_mut().fail_poll = true;
        assert!(matches!(transport.tick(), Err(TransportError::Device(_))));
        assert_eq!(transport.state(), TransportState::Recording);

        transport.capture_device_mut().fail_poll = false;
        transport.capture_device_mut().feed(&ramp(0, 12));
        transport.tick().unwrap();
        assert_eq!(transport.status().captured_bytes, 12);
    }

    #[test]
    fn save_after_exactly_two_laps_is_marked_wrapped() {
        let path = temp_file_path("two_laps.wav");
        let mut transport = controller(10);
        transport.set_looping(true);

        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 200));
        transport.tick().unwrap();
        transport.stop().unwrap();
        assert_eq!(transport.status().record_position, 0);

        let saved = transport.save_to(&path).unwrap();
        assert!(saved.metadata.wrapped);

        let file_data = std::fs::read(&path).unwrap();
        let parsed = parse_wav(&file_data).unwrap();
        assert_eq!(parsed.data, &ramp(100, 100)[..]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn capture_device_dropping_out_ends_the_take() {
        let mut transport = controller(10);
        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 25));
        transport.capture_device_mut().capturing = false;

        transport.tick().unwrap();

        assert_eq!(transport.state(), TransportState::Idle);
        assert!(transport.status().session.is_none());
        assert_eq!(transport.status().captured_bytes, 25);
    }

    #[test]
    fn handle_stop_during_ticks_from_another_thread() {
        let mut transport = controller(4);
        transport.record().unwrap();
        transport.capture_device_mut().feed(&ramp(0, 8));
        transport.tick().unwrap();
        transport.play().unwrap();

        let handle = transport.handle();
        let barrier = Arc::new(std::sync::Barrier::new(2));
        let stopper = {
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                handle.stop();
            })
        };

        barrier.wait();
        for i in 0..1000u32 {
            transport.capture_device_mut().feed(&[i as u8]);
            transport.tick().unwrap();
            if transport.state().is_idle() {
                break;
            }
        }
        stopper.join().unwrap();
        // Whatever tick the stop landed in, the next one stops the devices.
        transport.tick().unwrap();
        transport.tick().unwrap();

        assert_eq!(transport.state(), TransportState::Idle);
        assert!(!transport.capture_device().is_capturing());
        assert!(!transport.playback_device().is_playing());

        let played = transport.playback_device().received.len() as u64;
        assert!(played <= transport.status().captured_bytes);
    }
}
