//! Archive data types and on-disk framing

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{RawToDepthError, Result};
use crate::types::RecordConfiguration;

/// Magic bytes at start of an archive
pub const ARCHIVE_MAGIC: [u8; 4] = *b"DCAP";

/// Current archive format version
pub const ARCHIVE_VERSION: u16 = 1;

/// Size of the fixed preamble (magic, version, flags)
pub const PREAMBLE_SIZE: usize = 8;

/// Size of a record frame header (kind byte + u32 length)
pub const FRAME_HEADER_SIZE: usize = 5;

/// Largest record payload accepted when reading
pub const MAX_RECORD_SIZE: u32 = 256 * 1024 * 1024;

/// Tag describing how IR frames are stored
pub const TAG_IR_MODE: &str = "K4A_IR_MODE";
/// Tag holding the depth mode name
pub const TAG_DEPTH_MODE: &str = "K4A_DEPTH_MODE";
/// Tag holding the color resolution name
pub const TAG_COLOR_MODE: &str = "K4A_COLOR_MODE";
/// Tag stating whether IMU data is present
pub const TAG_IMU_MODE: &str = "K4A_IMU_MODE";

/// IR frames stored uncompressed, before depth computation
pub const IR_MODE_RAW: &str = "RAW";
/// IR frames computed with the active illuminator
pub const IR_MODE_ACTIVE: &str = "ACTIVE";
/// IR frames computed in passive mode
pub const IR_MODE_PASSIVE: &str = "PASSIVE";

/// Attachment holding the depth engine calibration block
pub const DEPTH_CALIBRATION_ATTACHMENT: &str = "depth_cal.ccb";
/// Attachment holding the device calibration
pub const CALIBRATION_ATTACHMENT: &str = "calibration.json";

/// Kind byte of a record frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    Header = 1,
    Imu = 2,
    Capture = 3,
    Footer = 4,
}

impl TryFrom<u8> for RecordKind {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            1 => Ok(RecordKind::Header),
            2 => Ok(RecordKind::Imu),
            3 => Ok(RecordKind::Capture),
            4 => Ok(RecordKind::Footer),
            other => Err(other),
        }
    }
}

/// Time-ordered stream declared in an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    Color,
    Depth,
    Ir,
    Imu,
}

impl TrackKind {
    /// Track name as shown to users
    pub fn name(&self) -> &'static str {
        match self {
            TrackKind::Color => "COLOR",
            TrackKind::Depth => "DEPTH",
            TrackKind::Ir => "IR",
            TrackKind::Imu => "IMU",
        }
    }
}

/// Named binary attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub data: Vec<u8>,
}

/// First record of every archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveHeader {
    /// When the archive was created
    pub created_at: DateTime<Utc>,
    /// Recording configuration, including which tracks are present
    pub config: RecordConfiguration,
    /// IR track holds raw sensor frames
    pub record_raw_depth: bool,
    pub tags: BTreeMap<String, String>,
    pub attachments: Vec<Attachment>,
    pub tracks: Vec<TrackKind>,
}

impl ArchiveHeader {
    /// Check whether a track was declared
    pub fn has_track(&self, kind: TrackKind) -> bool {
        self.tracks.contains(&kind)
    }

    /// Look up an attachment by name
    pub fn attachment(&self, name: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.name == name)
    }
}

/// Last record of a finalized archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveFooter {
    pub imu_sample_count: u64,
    pub capture_count: u64,
    pub finalized_at: DateTime<Utc>,
}

/// Summary returned when an archive is finalized
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub path: PathBuf,
    pub imu_sample_count: u64,
    pub capture_count: u64,
    pub file_size_bytes: u64,
}

impl SessionSummary {
    /// File size in megabytes
    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / 1_048_576.0
    }
}

/// Write lifecycle of a [`SessionRecorder`](super::SessionRecorder)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    /// Tracks, tags and attachments may still be declared
    #[default]
    Declaring,
    /// Header written; IMU samples and captures accepted
    HeaderWritten,
    /// At least one capture written; IMU samples no longer accepted
    WritingCaptures,
}

impl RecorderState {
    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            RecorderState::Declaring => "Declaring",
            RecorderState::HeaderWritten => "HeaderWritten",
            RecorderState::WritingCaptures => "WritingCaptures",
        }
    }
}

pub(crate) fn write_preamble<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(&ARCHIVE_MAGIC)?;
    writer.write_all(&ARCHIVE_VERSION.to_le_bytes())?;
    writer.write_all(&0u16.to_le_bytes())?;
    Ok(())
}

/// Validate the preamble, returning a reason on mismatch
pub(crate) fn read_preamble<R: Read>(reader: &mut R) -> std::io::Result<std::result::Result<u16, String>> {
    let mut preamble = [0u8; PREAMBLE_SIZE];
    match reader.read_exact(&mut preamble) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Ok(Err("file is shorter than the archive preamble".to_string()));
        }
        Err(e) => return Err(e),
    }

    if preamble[..4] != ARCHIVE_MAGIC {
        return Ok(Err("invalid archive magic bytes".to_string()));
    }
    let version = u16::from_le_bytes([preamble[4], preamble[5]]);
    if version != ARCHIVE_VERSION {
        return Ok(Err(format!("unsupported archive version {}", version)));
    }
    Ok(Ok(version))
}

/// Serialize and write one framed record, returning the bytes written
pub(crate) fn write_record<W: Write, T: Serialize>(
    writer: &mut W,
    kind: RecordKind,
    value: &T,
) -> Result<u64> {
    let payload = bincode::serialize(value)?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_RECORD_SIZE)
        .ok_or_else(|| {
            RawToDepthError::Serialization(format!(
                "{:?} record of {} bytes exceeds the record size limit",
                kind,
                payload.len()
            ))
        })?;

    writer.write_all(&[kind as u8])?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    Ok((FRAME_HEADER_SIZE + payload.len()) as u64)
}

/// Read a frame header; `None` at a clean end of file
pub(crate) fn read_frame_header<R: Read>(reader: &mut R) -> std::io::Result<Option<(u8, u32)>> {
    let mut kind = [0u8; 1];
    if reader.read(&mut kind)? == 0 {
        return Ok(None);
    }
    let mut len = [0u8; 4];
    reader.read_exact(&mut len)?;
    Ok(Some((kind[0], u32::from_le_bytes(len))))
}

/// Read and deserialize a payload of known length
pub(crate) fn read_payload<R: Read, T: DeserializeOwned>(reader: &mut R, len: u32) -> Result<T> {
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(bincode::deserialize(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_record_kind_conversion() {
        assert_eq!(RecordKind::try_from(3), Ok(RecordKind::Capture));
        assert_eq!(RecordKind::try_from(9), Err(9));
    }

    #[test]
    fn test_preamble_rejects_wrong_magic() {
        let mut cursor = Cursor::new(b"NOPE\x01\x00\x00\x00".to_vec());
        let result = read_preamble(&mut cursor).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_preamble_accepts_own_output() {
        let mut buffer = Vec::new();
        write_preamble(&mut buffer).unwrap();
        assert_eq!(buffer.len(), PREAMBLE_SIZE);

        let result = read_preamble(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(result, Ok(ARCHIVE_VERSION));
    }

    #[test]
    fn test_frame_header_clean_eof() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_frame_header(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn test_record_framing() {
        let mut buffer = Vec::new();
        let written = write_record(&mut buffer, RecordKind::Imu, &42u64).unwrap();
        assert_eq!(written as usize, buffer.len());

        let mut cursor = Cursor::new(buffer);
        let (kind, len) = read_frame_header(&mut cursor).unwrap().unwrap();
        assert_eq!(kind, RecordKind::Imu as u8);
        let value: u64 = read_payload(&mut cursor, len).unwrap();
        assert_eq!(value, 42);
    }
}
