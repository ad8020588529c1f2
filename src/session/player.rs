//! Session player for reading capture archives

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{RawToDepthError, Result};
use crate::types::{Capture, ImuSample, RecordConfiguration};

use super::types::{
    read_frame_header, read_payload, read_preamble, ArchiveFooter, ArchiveHeader, RecordKind,
    CALIBRATION_ATTACHMENT, FRAME_HEADER_SIZE, MAX_RECORD_SIZE, PREAMBLE_SIZE,
};

/// Location of a record payload inside the archive
#[derive(Debug, Clone, Copy)]
struct RecordIndex {
    offset: u64,
    len: u32,
}

/// Session player for reading capture archives
///
/// Opening an archive validates its framing and indexes every record, so a
/// truncated or never-finalized archive is rejected up front. IMU samples and
/// captures are then read through two independent forward-only cursors.
///
/// # Example
///
/// ```ignore
/// use rawtodepth_rs::session::SessionPlayer;
///
/// let mut player = SessionPlayer::open("raw.mkv")?;
/// while let Some(sample) = player.next_imu_sample()? {
///     println!("IMU at {} us", sample.acc_timestamp_usec);
/// }
/// while let Some(capture) = player.next_capture()? {
///     // ...
/// }
/// ```
#[derive(Debug)]
pub struct SessionPlayer {
    reader: BufReader<File>,
    path: PathBuf,
    header: ArchiveHeader,
    imu_records: Vec<RecordIndex>,
    capture_records: Vec<RecordIndex>,
    next_imu: usize,
    next_capture: usize,
}

impl SessionPlayer {
    /// Open an archive for playback
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RawToDepthError::ArchiveNotFound(path.clone()),
            _ => RawToDepthError::Io(e),
        })?;
        let mut reader = BufReader::new(file);

        let corrupt = |reason: String| RawToDepthError::CorruptArchive {
            path: path.clone(),
            reason,
        };

        read_preamble(&mut reader)?.map_err(corrupt)?;

        let mut header: Option<ArchiveHeader> = None;
        let mut footer: Option<ArchiveFooter> = None;
        let mut imu_records = Vec::new();
        let mut capture_records = Vec::new();
        let mut offset = PREAMBLE_SIZE as u64;

        loop {
            let frame = read_frame_header(&mut reader)
                .map_err(|e| corrupt(format!("truncated record header at byte {}: {}", offset, e)))?;
            let Some((kind_byte, len)) = frame else {
                break;
            };

            if len > MAX_RECORD_SIZE {
                return Err(corrupt(format!(
                    "record at byte {} is too large: {} bytes",
                    offset, len
                )));
            }
            let kind = RecordKind::try_from(kind_byte)
                .map_err(|k| corrupt(format!("unknown record kind {} at byte {}", k, offset)))?;
            if footer.is_some() {
                return Err(corrupt(format!("{:?} record after the footer", kind)));
            }
            if header.is_none() && kind != RecordKind::Header {
                return Err(corrupt(format!("archive starts with a {:?} record", kind)));
            }

            let payload_offset = offset + FRAME_HEADER_SIZE as u64;
            match kind {
                RecordKind::Header => {
                    if header.is_some() {
                        return Err(corrupt("duplicate header record".to_string()));
                    }
                    header = Some(
                        read_payload(&mut reader, len)
                            .map_err(|e| corrupt(format!("unreadable header: {}", e)))?,
                    );
                }
                RecordKind::Footer => {
                    footer = Some(
                        read_payload(&mut reader, len)
                            .map_err(|e| corrupt(format!("unreadable footer: {}", e)))?,
                    );
                }
                RecordKind::Imu | RecordKind::Capture => {
                    let index = RecordIndex {
                        offset: payload_offset,
                        len,
                    };
                    if kind == RecordKind::Imu {
                        imu_records.push(index);
                    } else {
                        capture_records.push(index);
                    }
                    reader.seek_relative(len as i64)?;
                }
            }
            offset = payload_offset + len as u64;
        }

        let header = header.ok_or_else(|| corrupt("archive has no header".to_string()))?;
        let footer =
            footer.ok_or_else(|| corrupt("archive was not finalized".to_string()))?;

        if footer.imu_sample_count != imu_records.len() as u64
            || footer.capture_count != capture_records.len() as u64
        {
            return Err(corrupt(format!(
                "footer declares {} IMU samples and {} captures, found {} and {}",
                footer.imu_sample_count,
                footer.capture_count,
                imu_records.len(),
                capture_records.len()
            )));
        }
        // Indexing only skipped payloads; a truncated last record shows up here.
        let file_len = reader.get_ref().metadata()?.len();
        if offset != file_len {
            return Err(corrupt(format!(
                "archive is {} bytes but records end at byte {}",
                file_len, offset
            )));
        }

        tracing::debug!(
            "Opened archive {:?}: {} ({} IMU samples, {} captures, finalized {})",
            path,
            header.config.depth_mode,
            imu_records.len(),
            capture_records.len(),
            footer.finalized_at
        );

        Ok(Self {
            reader,
            path,
            header,
            imu_records,
            capture_records,
            next_imu: 0,
            next_capture: 0,
        })
    }

    /// Path of the archive
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the archive header
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Recording configuration
    pub fn configuration(&self) -> &RecordConfiguration {
        &self.header.config
    }

    /// Look up an attachment by name
    pub fn get_attachment(&self, name: &str) -> Option<&[u8]> {
        self.header.attachment(name).map(|a| a.data.as_slice())
    }

    /// Look up a tag by name
    pub fn get_tag(&self, name: &str) -> Option<&str> {
        self.header.tags.get(name).map(String::as_str)
    }

    /// Device calibration stored with the recording
    pub fn raw_calibration(&self) -> Result<&[u8]> {
        self.get_attachment(CALIBRATION_ATTACHMENT)
            .ok_or_else(|| RawToDepthError::CorruptArchive {
                path: self.path.clone(),
                reason: format!("no {:?} attachment", CALIBRATION_ATTACHMENT),
            })
    }

    /// Total number of IMU samples
    pub fn imu_sample_count(&self) -> usize {
        self.imu_records.len()
    }

    /// Total number of captures
    pub fn capture_count(&self) -> usize {
        self.capture_records.len()
    }

    /// Read the next IMU sample, or `None` at the end of the IMU stream
    pub fn next_imu_sample(&mut self) -> Result<Option<ImuSample>> {
        let Some(index) = self.imu_records.get(self.next_imu).copied() else {
            return Ok(None);
        };
        let sample = self.read_record(index)?;
        self.next_imu += 1;
        Ok(Some(sample))
    }

    /// Read the next capture, or `None` at the end of the capture stream
    pub fn next_capture(&mut self) -> Result<Option<Capture>> {
        let Some(index) = self.capture_records.get(self.next_capture).copied() else {
            return Ok(None);
        };
        let capture = self.read_record(index)?;
        self.next_capture += 1;
        Ok(Some(capture))
    }

    fn read_record<T: serde::de::DeserializeOwned>(&mut self, index: RecordIndex) -> Result<T> {
        self.reader.seek(SeekFrom::Start(index.offset))?;
        read_payload(&mut self.reader, index.len).map_err(|e| RawToDepthError::CorruptArchive {
            path: self.path.clone(),
            reason: format!("unreadable record at byte {}: {}", index.offset, e),
        })
    }
}
