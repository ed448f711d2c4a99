//! RIFF/WAVE header emission and parsing.
//!
//! Every field is written with an explicit width and little-endian byte
//! order; nothing depends on in-memory struct layout.

use crate::models::error::TransportError;
use crate::models::format::PcmFormat;

/// Size of the canonical PCM WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// PCM format tag in the `fmt ` chunk.
const FORMAT_TAG_PCM: u16 = 1;

/// Size of the `fmt ` chunk body for plain PCM.
const FMT_CHUNK_SIZE: u32 = 16;

/// Generate a 44-byte WAV header for `data_size` bytes of PCM.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size + pad (everything after this field)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16
/// [20-21]  1 (PCM)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * block_align
/// [32-33]  block_align = channels * bits / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
///
/// An odd `data_size` is followed by one pad byte in the file, which the
/// RIFF size counts and the data size does not.
pub fn generate_wav_header(format: &PcmFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let riff_size = (WAV_HEADER_SIZE as u32 - 8)
        .saturating_add(data_size)
        .saturating_add(data_size & 1);

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    header[20..22].copy_from_slice(&FORMAT_TAG_PCM.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate_hz.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// A WAV file split into its format and sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWav<'a> {
    pub format: PcmFormat,
    pub byte_rate: u32,
    pub block_align: u16,
    pub data: &'a [u8],
}

/// Parse a PCM WAV file.
///
/// Unknown chunks between `fmt ` and `data` are skipped. Fails if the RIFF
/// tags are wrong, the format is not PCM, or the data chunk is truncated.
pub fn parse_wav(bytes: &[u8]) -> Result<ParsedWav<'_>, TransportError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(invalid("missing RIFF/WAVE tags"));
    }

    let mut pos = 12;
    let mut fmt: Option<(PcmFormat, u32, u16)> = None;

    while pos + 8 <= bytes.len() {
        let tag = &bytes[pos..pos + 4];
        let size = read_u32(bytes, pos + 4) as usize;
        let body = pos + 8;

        match tag {
            b"fmt " => {
                if size < FMT_CHUNK_SIZE as usize || body + size > bytes.len() {
                    return Err(invalid("short fmt chunk"));
                }
                if read_u16(bytes, body) != FORMAT_TAG_PCM {
                    return Err(invalid("not PCM"));
                }
                let format = PcmFormat {
                    channels: read_u16(bytes, body + 2),
                    sample_rate_hz: read_u32(bytes, body + 4),
                    bits_per_sample: read_u16(bytes, body + 14),
                };
                fmt = Some((format, read_u32(bytes, body + 8), read_u16(bytes, body + 12)));
            }
            b"data" => {
                let (format, byte_rate, block_align) =
                    fmt.ok_or_else(|| invalid("data chunk before fmt chunk"))?;
                if body + size > bytes.len() {
                    return Err(invalid("truncated data chunk"));
                }
                return Ok(ParsedWav {
                    format,
                    byte_rate,
                    block_align,
                    data: &bytes[body..body + size],
                });
            }
            _ => {}
        }

        // Chunks are padded to an even size.
        pos = body + size + (size & 1);
    }

    Err(invalid("no data chunk"))
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn invalid(reason: &str) -> TransportError {
    TransportError::Io(format!("invalid WAV file: {}", reason))
}
