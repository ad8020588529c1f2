//! Test data builders for creating input archives

use std::path::{Path, PathBuf};
use std::time::Duration;

use rawtodepth_rs::session::{
    SessionRecorder, CALIBRATION_ATTACHMENT, DEPTH_CALIBRATION_ATTACHMENT, TAG_IR_MODE,
};
use rawtodepth_rs::types::ColorResolution;
use rawtodepth_rs::{Capture, DepthMode, DeviceConfiguration, Image, ImageFormat, ImuSample};

/// Size of every synthetic raw IR frame
pub const RAW_FRAME_SIZE: usize = 64;

/// Device calibration written by default
pub const DEVICE_CALIBRATION: &[u8] = br#"{"CalibrationInformation":{"Cameras":[]}}"#;

/// Deterministic raw IR frame for capture `index`
pub fn raw_frame(index: usize) -> Vec<u8> {
    (0..RAW_FRAME_SIZE)
        .map(|i| ((i * 3 + index * 17) % 251) as u8)
        .collect()
}

/// Deterministic color image for capture `index`
pub fn color_image(index: usize) -> Image {
    Image::from_buffer(
        ImageFormat::ColorMjpg,
        1280,
        720,
        0,
        &[0xFF, 0xD8, index as u8, 0xFF, 0xD9],
    )
    .with_timestamp(Duration::from_micros(index as u64 * 33_333))
}

/// Deterministic IMU sample `index`
pub fn imu_sample(index: usize) -> ImuSample {
    ImuSample {
        temperature: 30.0 + index as f32 * 0.01,
        acc_sample: [0.1 * index as f32, 9.81, -0.2],
        acc_timestamp_usec: 1_000 + index as u64 * 625,
        gyro_sample: [0.01, -0.02 * index as f32, 0.03],
        gyro_timestamp_usec: 1_010 + index as u64 * 625,
    }
}

/// Builder for raw-mode input archives
pub struct RawArchiveBuilder {
    depth_mode: DepthMode,
    color: bool,
    record_raw_depth: bool,
    imu_samples: usize,
    captures: usize,
    depth_calibration: Option<Vec<u8>>,
    device_calibration: Option<Vec<u8>>,
    ir_mode_tag: Option<String>,
    missing_ir_at: Option<usize>,
}

impl RawArchiveBuilder {
    pub fn new(depth_mode: DepthMode) -> Self {
        Self {
            depth_mode,
            color: false,
            record_raw_depth: true,
            imu_samples: 0,
            captures: 0,
            depth_calibration: Some(vec![0xCC; 32]),
            device_calibration: Some(DEVICE_CALIBRATION.to_vec()),
            ir_mode_tag: None,
            missing_ir_at: None,
        }
    }

    pub fn captures(mut self, count: usize) -> Self {
        self.captures = count;
        self
    }

    pub fn imu_samples(mut self, count: usize) -> Self {
        self.imu_samples = count;
        self
    }

    pub fn with_color(mut self) -> Self {
        self.color = true;
        self
    }

    pub fn without_depth_calibration(mut self) -> Self {
        self.depth_calibration = None;
        self
    }

    pub fn without_device_calibration(mut self) -> Self {
        self.device_calibration = None;
        self
    }

    /// Record processed instead of raw IR, so the IR mode tag is not RAW
    pub fn processed(mut self) -> Self {
        self.record_raw_depth = false;
        self
    }

    /// Overwrite the IR mode tag
    pub fn ir_mode_tag(mut self, value: &str) -> Self {
        self.ir_mode_tag = Some(value.to_string());
        self
    }

    /// Leave the IR image out of capture `index`; requires color
    pub fn missing_ir_at(mut self, index: usize) -> Self {
        self.missing_ir_at = Some(index);
        self
    }

    pub fn build(self, path: &Path) -> PathBuf {
        let config = DeviceConfiguration {
            depth_mode: self.depth_mode,
            color_resolution: if self.color {
                ColorResolution::R720p
            } else {
                ColorResolution::Off
            },
            color_format: ImageFormat::ColorMjpg,
            record_raw_depth: self.record_raw_depth,
            ..Default::default()
        };

        let mut recorder = SessionRecorder::create(path, config).unwrap();
        if let Some(value) = &self.ir_mode_tag {
            recorder.add_tag(TAG_IR_MODE, value.as_str()).unwrap();
        }
        if let Some(blob) = &self.depth_calibration {
            recorder
                .add_attachment(DEPTH_CALIBRATION_ATTACHMENT, blob)
                .unwrap();
        }
        if let Some(blob) = &self.device_calibration {
            recorder.add_attachment(CALIBRATION_ATTACHMENT, blob).unwrap();
        }
        if self.imu_samples > 0 {
            recorder.add_imu_track().unwrap();
        }
        recorder.write_header().unwrap();

        for i in 0..self.imu_samples {
            recorder.write_imu_sample(&imu_sample(i)).unwrap();
        }

        for i in 0..self.captures {
            let mut capture = Capture::new();
            if self.color {
                capture.set_color_image(Some(color_image(i)));
            }
            if self.missing_ir_at != Some(i) {
                capture.set_ir_image(
                    Image::from_buffer(ImageFormat::Custom, 0, 0, 0, &raw_frame(i))
                        .with_timestamp(Duration::from_micros(i as u64 * 33_333)),
                );
            }
            recorder.write_capture(&capture).unwrap();
        }

        recorder.flush().unwrap();
        path.to_path_buf()
    }
}
