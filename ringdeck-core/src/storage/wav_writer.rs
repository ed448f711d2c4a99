use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::TransportError;
use crate::models::format::PcmFormat;
use crate::models::recording_result::{RecordingMetadata, SavedRecording};
use crate::processing::ring_buffer::RingBuffer;
use crate::processing::wav_format;

/// One-shot WAV writer for a region of the ring buffer.
///
/// ## File Format
/// ```text
/// [44-byte WAV header]
/// [raw PCM copied verbatim from the ring]
/// [one zero pad byte if the PCM length is odd]
/// ```
///
/// The file is assembled as `<destination>.part` and renamed into place only
/// after a successful flush and sync. On any failure the partial file is
/// removed, so the destination never holds a truncated file that still
/// parses as valid.
pub struct PcmContainerWriter {
    file_path: PathBuf,
}

impl PcmContainerWriter {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Write `length_bytes` from the start of the ring.
    pub fn write(
        &self,
        ring: &RingBuffer,
        format: &PcmFormat,
        length_bytes: usize,
    ) -> Result<SavedRecording, TransportError> {
        self.write_region(ring, format, 0, length_bytes, false)
    }

    /// Write `length_bytes` starting at ring offset `start_offset`, continuing
    /// at offset 0 if the region wraps. `wrapped` marks a capture that
    /// overwrote older data and is recorded in the metadata.
    pub fn write_region(
        &self,
        ring: &RingBuffer,
        format: &PcmFormat,
        start_offset: usize,
        length_bytes: usize,
        wrapped: bool,
    ) -> Result<SavedRecording, TransportError> {
        let length = length_bytes.min(ring.capacity());
        let data_size = u32::try_from(length)
            .ok()
            .filter(|&size| size < u32::MAX - wav_format::WAV_HEADER_SIZE as u32)
            .ok_or_else(|| TransportError::Io(format!("{} bytes do not fit in a WAV file", length)))?;

        if let Some(parent) = self.file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| TransportError::Io(format!("failed to create directory: {}", e)))?;
        }

        let header = wav_format::generate_wav_header(format, data_size);
        let (first, second) = ring.read(start_offset, length);

        let part_path = self.part_path();
        let written = write_container(&part_path, &header, first, second)
            .and_then(|()| fs::rename(&part_path, &self.file_path));
        if let Err(e) = written {
            let _ = fs::remove_file(&part_path);
            return Err(TransportError::Io(format!(
                "failed to write {}: {}",
                self.file_path.display(),
                e
            )));
        }

        let checksum = sha256_file(&self.file_path)?;
        let metadata = RecordingMetadata::new(
            &self.file_path.to_string_lossy(),
            *format,
            length as u64,
            &checksum,
            wrapped,
        );

        log::info!(
            "wrote {} bytes of PCM to {} (wrapped: {})",
            length,
            self.file_path.display(),
            wrapped
        );

        Ok(SavedRecording {
            file_path: self.file_path.clone(),
            data_bytes: length as u64,
            duration_secs: metadata.duration_secs,
            checksum,
            metadata,
        })
    }

    /// Path of the output file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn part_path(&self) -> PathBuf {
        let mut name = OsString::from(self.file_path.as_os_str());
        name.push(".part");
        PathBuf::from(name)
    }
}

/// Write header and data, then flush and sync. The file handle is closed on
/// return, whatever the outcome.
fn write_container(path: &Path, header: &[u8], first: &[u8], second: &[u8]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(header)?;
    out.write_all(first)?;
    out.write_all(second)?;
    if (first.len() + second.len()) % 2 == 1 {
        out.write_all(&[0])?;
    }
    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, TransportError> {
    let data = fs::read(path)
        .map_err(|e| TransportError::Io(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
