use thiserror::Error;

/// Errors produced by the transport, its cursors, and the WAV writer.
///
/// `AlreadyActive` and `NotEnoughData` are operator misuse and are reported
/// without tearing anything down. `Device` and `Io` are fatal to the operation
/// that raised them only. `VersionMismatch` is only raised at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("device error: {0}")]
    Device(String),

    #[error("already active")]
    AlreadyActive,

    #[error("not enough data: nothing has been recorded")]
    NotEnoughData,

    #[error("i/o error: {0}")]
    Io(String),

    #[error("audio backend version {found:#010x} is older than required {required:#010x}")]
    VersionMismatch { found: u32, required: u32 },

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

impl TransportError {
    /// Whether the error is operator misuse that the control loop just reports.
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::AlreadyActive | Self::NotEnoughData)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
