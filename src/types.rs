//! Core data types for rawtodepth-rs
//!
//! This module contains the device-level data structures shared by the
//! archive, engine and pipeline layers.
//!
//! # Main Types
//!
//! - [`DepthMode`] - Depth sensor operating mode recorded in the archive
//! - [`RecordConfiguration`] - Configuration read back from a recorded archive
//! - [`DeviceConfiguration`] - Configuration used to create a new archive
//! - [`ImuSample`] - A single accelerometer/gyroscope sample
//! - [`Image`] / [`Capture`] - Image planes and the per-frame capture grouping them
//!
//! # Time Domains
//!
//! The depth sensor timestamps exposures with a 90 kHz tick counter. Images
//! stored in an archive carry microsecond device timestamps; use
//! [`ticks_to_usec`] to convert between the two.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Frequency of the device exposure tick counter
pub const DEVICE_TICKS_PER_SECOND: u64 = 90_000;

/// Bytes per pixel of DEPTH16 and IR16 planes
pub const BYTES_PER_16BIT_PIXEL: usize = std::mem::size_of::<u16>();

/// Convert a 90 kHz tick count to microseconds
///
/// Computed in 128-bit and saturated at `u64::MAX` for tick counts whose
/// microsecond value does not fit.
pub fn ticks_to_usec(ticks: u64) -> u64 {
    let usec = ticks as u128 * 1_000_000 / DEVICE_TICKS_PER_SECOND as u128;
    u64::try_from(usec).unwrap_or(u64::MAX)
}

/// Convert a 90 kHz tick count to a device timestamp
pub fn ticks_to_duration(ticks: u64) -> Duration {
    Duration::from_micros(ticks_to_usec(ticks))
}

/// Depth sensor operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DepthMode {
    /// Depth sensor off
    #[default]
    Off,
    /// Narrow field of view, 2x2 binned
    Nfov2x2Binned,
    /// Narrow field of view, unbinned
    NfovUnbinned,
    /// Wide field of view, 2x2 binned
    Wfov2x2Binned,
    /// Wide field of view, unbinned
    WfovUnbinned,
    /// Passive IR only, no depth
    PassiveIr,
}

impl DepthMode {
    /// All modes that produce sensor data
    pub const ENABLED: [DepthMode; 5] = [
        DepthMode::Nfov2x2Binned,
        DepthMode::NfovUnbinned,
        DepthMode::Wfov2x2Binned,
        DepthMode::WfovUnbinned,
        DepthMode::PassiveIr,
    ];

    /// Nominal (width, height) of the processed depth/IR planes
    pub fn output_resolution(&self) -> Option<(u16, u16)> {
        match self {
            DepthMode::Off => None,
            DepthMode::Nfov2x2Binned => Some((320, 288)),
            DepthMode::NfovUnbinned => Some((640, 576)),
            DepthMode::Wfov2x2Binned => Some((512, 512)),
            DepthMode::WfovUnbinned => Some((1024, 1024)),
            DepthMode::PassiveIr => Some((1024, 1024)),
        }
    }

    /// Whether the sensor is on at all
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DepthMode::Off)
    }

    /// Whether processed frames carry a depth plane
    pub fn produces_depth(&self) -> bool {
        self.is_enabled() && !matches!(self, DepthMode::PassiveIr)
    }

    /// Name used in archive tags
    pub fn tag_value(&self) -> &'static str {
        match self {
            DepthMode::Off => "OFF",
            DepthMode::Nfov2x2Binned => "NFOV_2X2BINNED",
            DepthMode::NfovUnbinned => "NFOV_UNBINNED",
            DepthMode::Wfov2x2Binned => "WFOV_2X2BINNED",
            DepthMode::WfovUnbinned => "WFOV_UNBINNED",
            DepthMode::PassiveIr => "PASSIVE_IR",
        }
    }
}

impl std::fmt::Display for DepthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag_value())
    }
}

/// Color camera resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColorResolution {
    /// Color camera off
    #[default]
    Off,
    R720p,
    R1080p,
    R1440p,
    R1536p,
    R2160p,
    R3072p,
}

impl ColorResolution {
    /// Name used in archive tags
    pub fn tag_value(&self) -> &'static str {
        match self {
            ColorResolution::Off => "OFF",
            ColorResolution::R720p => "720P",
            ColorResolution::R1080p => "1080P",
            ColorResolution::R1440p => "1440P",
            ColorResolution::R1536p => "1536P",
            ColorResolution::R2160p => "2160P",
            ColorResolution::R3072p => "3072P",
        }
    }
}

/// Pixel format of an image plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ImageFormat {
    ColorMjpg,
    ColorNv12,
    ColorYuy2,
    #[default]
    ColorBgra32,
    /// 16-bit depth in millimetres
    Depth16,
    /// 16-bit infrared intensity
    Ir16,
    Custom8,
    Custom16,
    /// Opaque sensor payload, e.g. raw compressed IR
    Custom,
}

impl ImageFormat {
    /// Name used in archive tags
    pub fn tag_value(&self) -> &'static str {
        match self {
            ImageFormat::ColorMjpg => "MJPG",
            ImageFormat::ColorNv12 => "NV12",
            ImageFormat::ColorYuy2 => "YUY2",
            ImageFormat::ColorBgra32 => "BGRA32",
            ImageFormat::Depth16 => "DEPTH16",
            ImageFormat::Ir16 => "IR16",
            ImageFormat::Custom8 => "CUSTOM8",
            ImageFormat::Custom16 => "CUSTOM16",
            ImageFormat::Custom => "CUSTOM",
        }
    }
}

/// Camera frame rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FramesPerSecond {
    Fps5,
    Fps15,
    #[default]
    Fps30,
}

/// Multi-device wired sync role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WiredSyncMode {
    #[default]
    Standalone,
    Master,
    Subordinate,
}

/// Configuration of a recorded archive, as read back by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RecordConfiguration {
    pub color_format: ImageFormat,
    pub color_resolution: ColorResolution,
    pub depth_mode: DepthMode,
    pub camera_fps: FramesPerSecond,
    pub color_track_enabled: bool,
    pub depth_track_enabled: bool,
    pub ir_track_enabled: bool,
    pub imu_track_enabled: bool,
    /// Delay between color and depth exposures
    pub depth_delay_off_color_usec: i32,
    pub wired_sync_mode: WiredSyncMode,
    /// Delay of this subordinate behind the master
    pub subordinate_delay_off_master_usec: u32,
    /// Device timestamp of the first frame in the recording
    pub start_timestamp_offset_usec: u32,
}

/// Configuration used to create an archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeviceConfiguration {
    pub color_format: ImageFormat,
    pub color_resolution: ColorResolution,
    pub depth_mode: DepthMode,
    pub camera_fps: FramesPerSecond,
    /// Only deliver captures with both color and depth
    pub synchronized_images_only: bool,
    pub depth_delay_off_color_usec: i32,
    pub wired_sync_mode: WiredSyncMode,
    pub subordinate_delay_off_master_usec: u32,
    /// Live capture only
    pub disable_streaming_indicator: bool,
    /// Store raw IR frames instead of computed depth
    pub record_raw_depth: bool,
}

impl DeviceConfiguration {
    /// Derive the configuration of a reprocessed archive from its raw input
    ///
    /// Live-capture flags and raw-depth recording are forced off; the depth mode
    /// is carried over unchanged.
    pub fn for_reprocessing(input: &RecordConfiguration) -> Self {
        Self {
            color_format: input.color_format,
            color_resolution: input.color_resolution,
            depth_mode: input.depth_mode,
            camera_fps: input.camera_fps,
            synchronized_images_only: false,
            depth_delay_off_color_usec: input.depth_delay_off_color_usec,
            wired_sync_mode: input.wired_sync_mode,
            subordinate_delay_off_master_usec: input.subordinate_delay_off_master_usec,
            disable_streaming_indicator: false,
            record_raw_depth: false,
        }
    }

    /// Whether an archive with this configuration has a color track
    pub fn has_color_track(&self) -> bool {
        !matches!(self.color_resolution, ColorResolution::Off)
    }

    /// Whether an archive with this configuration has a depth track
    pub fn has_depth_track(&self) -> bool {
        self.depth_mode.produces_depth() && !self.record_raw_depth
    }

    /// Whether an archive with this configuration has an IR track
    pub fn has_ir_track(&self) -> bool {
        self.depth_mode.is_enabled()
    }
}

/// A single IMU sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ImuSample {
    /// Sensor temperature in Celsius
    pub temperature: f32,
    /// Accelerometer [x, y, z] in m/s^2
    pub acc_sample: [f32; 3],
    pub acc_timestamp_usec: u64,
    /// Gyroscope [x, y, z] in rad/s
    pub gyro_sample: [f32; 3],
    pub gyro_timestamp_usec: u64,
}

/// One image plane with its geometry and device timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// Bytes per row (0 for compressed formats)
    pub stride_bytes: u32,
    /// Device timestamp of the exposure
    pub timestamp: Duration,
    pub data: Vec<u8>,
}

impl Image {
    /// Create an image owning a copy of `data`
    pub fn from_buffer(
        format: ImageFormat,
        width: u32,
        height: u32,
        stride_bytes: u32,
        data: &[u8],
    ) -> Self {
        Self {
            format,
            width,
            height,
            stride_bytes,
            timestamp: Duration::ZERO,
            data: data.to_vec(),
        }
    }

    /// Set the device timestamp
    pub fn with_timestamp(mut self, timestamp: Duration) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Size of the image payload in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Images captured at the same moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Capture {
    pub color: Option<Image>,
    pub depth: Option<Image>,
    pub ir: Option<Image>,
}

impl Capture {
    /// Create an empty capture
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_color_image(&mut self, image: Option<Image>) {
        self.color = image;
    }

    pub fn set_depth_image(&mut self, image: Image) {
        self.depth = Some(image);
    }

    pub fn set_ir_image(&mut self, image: Image) {
        self.ir = Some(image);
    }

    pub fn color_image(&self) -> Option<&Image> {
        self.color.as_ref()
    }

    pub fn depth_image(&self) -> Option<&Image> {
        self.depth.as_ref()
    }

    pub fn ir_image(&self) -> Option<&Image> {
        self.ir.as_ref()
    }

    /// Whether the capture holds no image at all
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.depth.is_none() && self.ir.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_to_usec_exact() {
        assert_eq!(ticks_to_usec(0), 0);
        assert_eq!(ticks_to_usec(90_000), 1_000_000);
        assert_eq!(ticks_to_usec(9), 100);
        assert_eq!(ticks_to_duration(180_000), Duration::from_secs(2));
    }

    #[test]
    fn test_ticks_to_usec_large_values_do_not_overflow() {
        let ticks = u64::MAX / 1000;
        let expected = (ticks as u128 * 1_000_000 / 90_000) as u64;
        assert_eq!(ticks_to_usec(ticks), expected);
    }

    #[test]
    fn test_ticks_to_usec_saturates() {
        // Largest tick count whose microsecond value still fits
        let last_exact = (u64::MAX as u128 * 90_000 / 1_000_000) as u64;
        assert_eq!(ticks_to_usec(last_exact), (last_exact as u128 * 1_000_000 / 90_000) as u64);
        assert_eq!(ticks_to_usec(last_exact + 1), u64::MAX);
        assert_eq!(ticks_to_usec(u64::MAX / 2), u64::MAX);
        assert_eq!(ticks_to_usec(u64::MAX), u64::MAX);
    }

    #[test]
    fn test_depth_mode_properties() {
        assert!(!DepthMode::Off.is_enabled());
        assert!(DepthMode::PassiveIr.is_enabled());
        assert!(!DepthMode::PassiveIr.produces_depth());
        assert!(DepthMode::NfovUnbinned.produces_depth());
        assert_eq!(DepthMode::Off.output_resolution(), None);
        assert_eq!(DepthMode::NfovUnbinned.output_resolution(), Some((640, 576)));
        assert_eq!(DepthMode::Wfov2x2Binned.to_string(), "WFOV_2X2BINNED");
    }

    #[test]
    fn test_reprocessing_config_forces_flags_off() {
        let input = RecordConfiguration {
            color_format: ImageFormat::ColorMjpg,
            color_resolution: ColorResolution::R1080p,
            depth_mode: DepthMode::WfovUnbinned,
            camera_fps: FramesPerSecond::Fps15,
            depth_delay_off_color_usec: -120,
            wired_sync_mode: WiredSyncMode::Subordinate,
            subordinate_delay_off_master_usec: 160,
            ..Default::default()
        };

        let derived = DeviceConfiguration::for_reprocessing(&input);
        assert_eq!(derived.depth_mode, DepthMode::WfovUnbinned);
        assert_eq!(derived.color_resolution, ColorResolution::R1080p);
        assert_eq!(derived.depth_delay_off_color_usec, -120);
        assert_eq!(derived.subordinate_delay_off_master_usec, 160);
        assert!(!derived.synchronized_images_only);
        assert!(!derived.disable_streaming_indicator);
        assert!(!derived.record_raw_depth);
        assert!(derived.has_depth_track());
        assert!(derived.has_color_track());
    }
}
