use std::fmt;

/// Transport state, derived from which cursors are active.
///
/// State transitions:
/// ```text
/// Idle ──record──→ Recording ──play──→ RecordingAndPlaying
///  │                  ↑ record-stop                 │
///  └──play──→ Playing ┴──────── stop (any) ──→ Idle ┘
/// ```
/// Cursors also drop out on their own (buffer full, end of stream), which
/// moves `RecordingAndPlaying` to `Playing`/`Recording` and those to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportState {
    Idle,
    Recording,
    Playing,
    RecordingAndPlaying,
}

impl TransportState {
    pub fn from_activity(recording: bool, playing: bool) -> Self {
        match (recording, playing) {
            (false, false) => Self::Idle,
            (true, false) => Self::Recording,
            (false, true) => Self::Playing,
            (true, true) => Self::RecordingAndPlaying,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording | Self::RecordingAndPlaying)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing | Self::RecordingAndPlaying)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Recording => "Recording",
            Self::Playing => "Playing",
            Self::RecordingAndPlaying => "Recording / playing",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ephemeral description of the running capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub device_id: Option<String>,
    pub started_at_tick: u64,
}

/// Snapshot of the transport for status display.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportStatus {
    pub state: TransportState,
    pub record_position: usize,
    pub play_position: usize,
    pub captured_bytes: u64,
    pub looping: bool,
    pub session: Option<CaptureSession>,
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State: {:<19}. Record pos = {:>8} : Play pos = {:>8} : Loop {:<3}",
            self.state.label(),
            self.record_position,
            self.play_position,
            if self.looping { "On" } else { "Off" }
        )
    }
}
