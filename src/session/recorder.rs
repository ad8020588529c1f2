//! Session recorder for writing capture archives

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use crate::error::{RawToDepthError, Result};
use crate::types::{Capture, DepthMode, DeviceConfiguration, ImuSample, RecordConfiguration};

use super::types::{
    write_preamble, write_record, ArchiveFooter, ArchiveHeader, Attachment, RecordKind,
    RecorderState, SessionSummary, TrackKind, IR_MODE_ACTIVE, IR_MODE_PASSIVE, IR_MODE_RAW,
    TAG_COLOR_MODE, TAG_DEPTH_MODE, TAG_IMU_MODE, TAG_IR_MODE,
};

/// Session recorder for writing capture archives
///
/// The write protocol is fixed: declare tags, attachments and the IMU track,
/// call [`write_header`](Self::write_header) once, write every IMU sample,
/// write the captures, then [`flush`](Self::flush). Calls out of that order
/// fail with [`RawToDepthError::ArchiveMisuse`]. An archive that is dropped
/// without being flushed has no footer and will not open.
///
/// # Example
///
/// ```ignore
/// use rawtodepth_rs::session::SessionRecorder;
///
/// let mut recorder = SessionRecorder::create("out.mkv", config)?;
/// recorder.add_attachment("calibration.json", &calibration)?;
/// recorder.add_imu_track()?;
/// recorder.write_header()?;
/// recorder.write_imu_sample(&sample)?;
/// recorder.write_capture(&capture)?;
/// let summary = recorder.flush()?;
/// ```
#[derive(Debug)]
pub struct SessionRecorder {
    writer: BufWriter<File>,
    path: PathBuf,
    config: DeviceConfiguration,
    state: RecorderState,
    tags: BTreeMap<String, String>,
    attachments: Vec<Attachment>,
    imu_track: bool,
    imu_sample_count: u64,
    capture_count: u64,
}

impl SessionRecorder {
    /// Create a new archive at `path`
    ///
    /// The file is created immediately. Tags describing the configuration are
    /// added automatically.
    pub fn create(path: impl AsRef<Path>, config: DeviceConfiguration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| RawToDepthError::ArchiveCreate {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        write_preamble(&mut writer)?;

        let mut tags = BTreeMap::new();
        tags.insert(
            TAG_DEPTH_MODE.to_string(),
            config.depth_mode.tag_value().to_string(),
        );
        tags.insert(
            TAG_COLOR_MODE.to_string(),
            config.color_resolution.tag_value().to_string(),
        );
        if config.depth_mode.is_enabled() {
            let ir_mode = if config.record_raw_depth {
                IR_MODE_RAW
            } else if config.depth_mode == DepthMode::PassiveIr {
                IR_MODE_PASSIVE
            } else {
                IR_MODE_ACTIVE
            };
            tags.insert(TAG_IR_MODE.to_string(), ir_mode.to_string());
        }

        tracing::debug!("Created archive {:?} ({})", path, config.depth_mode);

        Ok(Self {
            writer,
            path,
            config,
            state: RecorderState::Declaring,
            tags,
            attachments: Vec::new(),
            imu_track: false,
            imu_sample_count: 0,
            capture_count: 0,
        })
    }

    /// Path of the archive being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get current state
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Number of IMU samples written so far
    pub fn imu_sample_count(&self) -> u64 {
        self.imu_sample_count
    }

    /// Number of captures written so far
    pub fn capture_count(&self) -> u64 {
        self.capture_count
    }

    /// Add or replace a tag
    pub fn add_tag(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.require_declaring("add a tag")?;
        self.tags.insert(name.into(), value.into());
        Ok(())
    }

    /// Attach a named binary blob
    pub fn add_attachment(&mut self, name: impl Into<String>, data: &[u8]) -> Result<()> {
        self.require_declaring("add an attachment")?;
        let name = name.into();
        if self.attachments.iter().any(|a| a.name == name) {
            return Err(RawToDepthError::ArchiveMisuse(format!(
                "attachment {:?} added twice",
                name
            )));
        }
        self.attachments.push(Attachment {
            name,
            data: data.to_vec(),
        });
        Ok(())
    }

    /// Declare the IMU track
    pub fn add_imu_track(&mut self) -> Result<()> {
        self.require_declaring("add the IMU track")?;
        self.imu_track = true;
        Ok(())
    }

    /// Tracks implied by the configuration and declarations
    pub fn tracks(&self) -> Vec<TrackKind> {
        let mut tracks = Vec::new();
        if self.config.has_color_track() {
            tracks.push(TrackKind::Color);
        }
        if self.config.has_depth_track() {
            tracks.push(TrackKind::Depth);
        }
        if self.config.has_ir_track() {
            tracks.push(TrackKind::Ir);
        }
        if self.imu_track {
            tracks.push(TrackKind::Imu);
        }
        tracks
    }

    /// Write the archive header; must be called exactly once before any sample
    pub fn write_header(&mut self) -> Result<()> {
        self.require_declaring("write the header")?;

        let mut tags = std::mem::take(&mut self.tags);
        tags.insert(
            TAG_IMU_MODE.to_string(),
            if self.imu_track { "ON" } else { "OFF" }.to_string(),
        );

        let tracks = self.tracks();
        let header = ArchiveHeader {
            created_at: chrono::Utc::now(),
            config: RecordConfiguration {
                color_format: self.config.color_format,
                color_resolution: self.config.color_resolution,
                depth_mode: self.config.depth_mode,
                camera_fps: self.config.camera_fps,
                color_track_enabled: tracks.contains(&TrackKind::Color),
                depth_track_enabled: tracks.contains(&TrackKind::Depth),
                ir_track_enabled: tracks.contains(&TrackKind::Ir),
                imu_track_enabled: tracks.contains(&TrackKind::Imu),
                depth_delay_off_color_usec: self.config.depth_delay_off_color_usec,
                wired_sync_mode: self.config.wired_sync_mode,
                subordinate_delay_off_master_usec: self.config.subordinate_delay_off_master_usec,
                start_timestamp_offset_usec: 0,
            },
            record_raw_depth: self.config.record_raw_depth,
            tags,
            attachments: std::mem::take(&mut self.attachments),
            tracks,
        };

        write_record(&mut self.writer, RecordKind::Header, &header)?;
        self.state = RecorderState::HeaderWritten;

        tracing::debug!(
            "Wrote header for {:?}: tracks {:?}, {} attachment(s)",
            self.path,
            header.tracks.iter().map(|t| t.name()).collect::<Vec<_>>(),
            header.attachments.len()
        );
        Ok(())
    }

    /// Write one IMU sample; all samples must precede the first capture
    pub fn write_imu_sample(&mut self, sample: &ImuSample) -> Result<()> {
        match self.state {
            RecorderState::HeaderWritten => {}
            RecorderState::Declaring => {
                return Err(RawToDepthError::ArchiveMisuse(
                    "IMU sample written before the header".to_string(),
                ))
            }
            RecorderState::WritingCaptures => {
                return Err(RawToDepthError::ArchiveMisuse(
                    "IMU sample written after the first capture".to_string(),
                ))
            }
        }
        if !self.imu_track {
            return Err(RawToDepthError::ArchiveMisuse(
                "IMU sample written without an IMU track".to_string(),
            ));
        }

        write_record(&mut self.writer, RecordKind::Imu, sample)?;
        self.imu_sample_count += 1;
        Ok(())
    }

    /// Write one capture
    pub fn write_capture(&mut self, capture: &Capture) -> Result<()> {
        if self.state == RecorderState::Declaring {
            return Err(RawToDepthError::ArchiveMisuse(
                "capture written before the header".to_string(),
            ));
        }
        if capture.is_empty() {
            return Err(RawToDepthError::ArchiveMisuse(
                "capture holds no images".to_string(),
            ));
        }

        let undeclared = [
            (capture.color.is_some(), self.config.has_color_track(), TrackKind::Color),
            (capture.depth.is_some(), self.config.has_depth_track(), TrackKind::Depth),
            (capture.ir.is_some(), self.config.has_ir_track(), TrackKind::Ir),
        ]
        .into_iter()
        .find(|(present, declared, _)| *present && !*declared);
        if let Some((_, _, track)) = undeclared {
            return Err(RawToDepthError::ArchiveMisuse(format!(
                "capture has a {} image but the archive has no {} track",
                track.name(),
                track.name()
            )));
        }

        write_record(&mut self.writer, RecordKind::Capture, capture)?;
        self.state = RecorderState::WritingCaptures;
        self.capture_count += 1;
        Ok(())
    }

    /// Finalize the archive
    ///
    /// Writes the footer, flushes to disk and consumes the recorder, so nothing
    /// can be written afterwards.
    pub fn flush(mut self) -> Result<SessionSummary> {
        if self.state == RecorderState::Declaring {
            return Err(RawToDepthError::ArchiveMisuse(
                "archive flushed before the header was written".to_string(),
            ));
        }

        let footer = ArchiveFooter {
            imu_sample_count: self.imu_sample_count,
            capture_count: self.capture_count,
            finalized_at: chrono::Utc::now(),
        };
        write_record(&mut self.writer, RecordKind::Footer, &footer)?;
        self.writer.flush()?;
        let file_size_bytes = self.writer.stream_position()?;
        self.writer.get_ref().sync_all()?;

        tracing::debug!(
            "Finalized {:?}: {} IMU samples, {} captures, {} bytes",
            self.path,
            self.imu_sample_count,
            self.capture_count,
            file_size_bytes
        );

        Ok(SessionSummary {
            path: self.path,
            imu_sample_count: self.imu_sample_count,
            capture_count: self.capture_count,
            file_size_bytes,
        })
    }

    fn require_declaring(&self, action: &str) -> Result<()> {
        if self.state == RecorderState::Declaring {
            Ok(())
        } else {
            Err(RawToDepthError::ArchiveMisuse(format!(
                "cannot {} after the header was written (state {})",
                action,
                self.state.display_name()
            )))
        }
    }
}
