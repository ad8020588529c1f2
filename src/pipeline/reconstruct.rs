//! Frame reconstruction from engine output
//!
//! The engine writes its planes back to back into one buffer. This module
//! describes where each plane lives with a [`PlaneLayout`], checks the layout
//! against the buffer, and copies the planes into timestamped images.
//!
//! ```text
//! depth modes:  [ DEPTH16 width*height*2 ][ IR16 width*height*2 ]
//! passive IR:   [ IR16 width*height*2 ]
//! ```

use crate::engine::{EngineOutput, OutputFrameInfo};
use crate::error::{RawToDepthError, Result};
use crate::types::{
    ticks_to_duration, Capture, DepthMode, Image, ImageFormat, BYTES_PER_16BIT_PIXEL,
};

/// Location and geometry of one 16-bit plane inside the engine output buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    pub offset: usize,
    pub width: u32,
    pub height: u32,
    pub stride_bytes: u32,
}

impl PlaneLayout {
    /// A tightly packed plane starting at `offset`
    pub fn packed(offset: usize, width: u32, height: u32) -> Self {
        Self {
            offset,
            width,
            height,
            stride_bytes: width * BYTES_PER_16BIT_PIXEL as u32,
        }
    }

    /// Plane size in bytes
    pub fn len(&self) -> usize {
        self.stride_bytes as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First byte past the plane
    pub fn end(&self) -> usize {
        self.offset + self.len()
    }

    /// Borrow the plane's bytes, failing if it extends past `buffer`
    pub fn slice<'a>(&self, buffer: &'a [u8]) -> Result<&'a [u8]> {
        buffer.get(self.offset..self.end()).ok_or_else(|| {
            RawToDepthError::EngineContract(format!(
                "plane at offset {} of {} bytes exceeds the {} byte output buffer",
                self.offset,
                self.len(),
                buffer.len()
            ))
        })
    }

    /// Copy the plane out of `buffer` as an image
    pub fn to_image(&self, buffer: &[u8], format: ImageFormat) -> Result<Image> {
        let bytes = self.slice(buffer)?;
        Ok(Image::from_buffer(
            format,
            self.width,
            self.height,
            self.stride_bytes,
            bytes,
        ))
    }
}

/// Planes the engine produced for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub depth: Option<PlaneLayout>,
    pub ir: PlaneLayout,
}

impl FrameLayout {
    /// Layout of the engine output for `depth_mode` at the reported geometry
    pub fn for_output(depth_mode: DepthMode, info: &OutputFrameInfo) -> Self {
        let width = info.output_width as u32;
        let height = info.output_height as u32;

        if depth_mode.produces_depth() {
            let depth = PlaneLayout::packed(0, width, height);
            let ir_offset = depth.stride_bytes as usize * height as usize;
            Self {
                depth: Some(depth),
                ir: PlaneLayout::packed(ir_offset, width, height),
            }
        } else {
            Self {
                depth: None,
                ir: PlaneLayout::packed(0, width, height),
            }
        }
    }

    /// Bytes the layout covers
    pub fn total_len(&self) -> usize {
        self.ir.end().max(self.depth.map_or(0, |d| d.end()))
    }
}

/// Builds output captures from engine results
#[derive(Debug, Clone, Copy)]
pub struct FrameReconstructor {
    depth_mode: DepthMode,
    expected_geometry: (u16, u16),
}

impl FrameReconstructor {
    /// Create a reconstructor for the session's depth mode
    pub fn new(depth_mode: DepthMode) -> Result<Self> {
        let expected_geometry = depth_mode
            .output_resolution()
            .ok_or(RawToDepthError::UnsupportedDepthMode(depth_mode))?;
        Ok(Self {
            depth_mode,
            expected_geometry,
        })
    }

    pub fn depth_mode(&self) -> DepthMode {
        self.depth_mode
    }

    /// Reject output whose geometry does not belong to the session's mode
    pub fn check_geometry(&self, info: &OutputFrameInfo) -> Result<()> {
        let actual = (info.output_width, info.output_height);
        if actual != self.expected_geometry {
            return Err(RawToDepthError::EngineContract(format!(
                "engine produced {}x{} for {}, expected {}x{}",
                actual.0,
                actual.1,
                self.depth_mode,
                self.expected_geometry.0,
                self.expected_geometry.1
            )));
        }
        Ok(())
    }

    /// Build the combined capture for one frame
    ///
    /// Every plane gets the frame's center of exposure as its timestamp. The
    /// color image, if any, is moved in unmodified.
    pub fn reconstruct(&self, output: EngineOutput<'_>, color: Option<Image>) -> Result<Capture> {
        self.check_geometry(&output.info)?;

        let layout = FrameLayout::for_output(self.depth_mode, &output.info);
        let timestamp = ticks_to_duration(output.info.center_of_exposure_in_ticks);

        let mut capture = Capture::new();
        if let Some(depth) = layout.depth {
            capture.set_depth_image(
                depth
                    .to_image(output.buffer, ImageFormat::Depth16)?
                    .with_timestamp(timestamp),
            );
        }
        capture.set_ir_image(
            layout
                .ir
                .to_image(output.buffer, ImageFormat::Ir16)?
                .with_timestamp(timestamp),
        );
        capture.set_color_image(color);

        Ok(capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn info(width: u16, height: u16, ticks: u64) -> OutputFrameInfo {
        OutputFrameInfo {
            output_width: width,
            output_height: height,
            center_of_exposure_in_ticks: ticks,
        }
    }

    #[test]
    fn test_depth_mode_layout() {
        let layout = FrameLayout::for_output(DepthMode::NfovUnbinned, &info(640, 576, 0));
        let depth = layout.depth.unwrap();
        assert_eq!(depth.offset, 0);
        assert_eq!(depth.stride_bytes, 1280);
        assert_eq!(layout.ir.offset, 1280 * 576);
        assert_eq!(layout.total_len(), 640 * 576 * 4);
    }

    #[test]
    fn test_passive_ir_layout() {
        let layout = FrameLayout::for_output(DepthMode::PassiveIr, &info(1024, 1024, 0));
        assert!(layout.depth.is_none());
        assert_eq!(layout.ir.offset, 0);
        assert_eq!(layout.total_len(), 1024 * 1024 * 2);
    }

    #[test]
    fn test_reconstruct_depth_and_ir() {
        let reconstructor = FrameReconstructor::new(DepthMode::Nfov2x2Binned).unwrap();
        let plane = 320 * 288 * 2;
        let mut buffer = vec![1u8; plane * 2];
        buffer[plane..].fill(2);

        let capture = reconstructor
            .reconstruct(
                EngineOutput {
                    info: info(320, 288, 90_000),
                    buffer: &buffer,
                },
                None,
            )
            .unwrap();

        let depth = capture.depth_image().unwrap();
        let ir = capture.ir_image().unwrap();
        assert_eq!(depth.format, ImageFormat::Depth16);
        assert_eq!(ir.format, ImageFormat::Ir16);
        assert!(depth.data.iter().all(|&b| b == 1));
        assert!(ir.data.iter().all(|&b| b == 2));
        assert_eq!(depth.timestamp, Duration::from_secs(1));
        assert_eq!(ir.timestamp, depth.timestamp);
        assert!(capture.color_image().is_none());
    }

    #[test]
    fn test_reconstruct_passes_color_through() {
        let reconstructor = FrameReconstructor::new(DepthMode::PassiveIr).unwrap();
        let buffer = vec![0u8; 1024 * 1024 * 2];
        let color = Image::from_buffer(ImageFormat::ColorMjpg, 1280, 720, 0, &[0xFF, 0xD8])
            .with_timestamp(Duration::from_micros(77));

        let capture = reconstructor
            .reconstruct(
                EngineOutput {
                    info: info(1024, 1024, 0),
                    buffer: &buffer,
                },
                Some(color.clone()),
            )
            .unwrap();

        assert_eq!(capture.color_image(), Some(&color));
        assert!(capture.depth_image().is_none());
        assert_eq!(capture.ir_image().unwrap().size(), 1024 * 1024 * 2);
    }

    #[test]
    fn test_geometry_mismatch_is_contract_error() {
        let reconstructor = FrameReconstructor::new(DepthMode::WfovUnbinned).unwrap();
        let buffer = vec![0u8; 16];
        let err = reconstructor
            .reconstruct(
                EngineOutput {
                    info: info(2, 2, 0),
                    buffer: &buffer,
                },
                None,
            )
            .unwrap_err();
        assert!(matches!(err, RawToDepthError::EngineContract(_)));
    }

    #[test]
    fn test_off_mode_has_no_reconstructor() {
        assert!(matches!(
            FrameReconstructor::new(DepthMode::Off),
            Err(RawToDepthError::UnsupportedDepthMode(DepthMode::Off))
        ));
    }

    proptest! {
        #[test]
        fn prop_layout_fits_exactly(width in 1u16..256, height in 1u16..256, passive in any::<bool>()) {
            let mode = if passive { DepthMode::PassiveIr } else { DepthMode::NfovUnbinned };
            let layout = FrameLayout::for_output(mode, &info(width, height, 0));
            let planes = if passive { 1 } else { 2 };
            let total = width as usize * height as usize * BYTES_PER_16BIT_PIXEL * planes;

            prop_assert_eq!(layout.total_len(), total);
            let buffer = vec![0u8; total];
            prop_assert!(layout.ir.slice(&buffer).is_ok());
            if let Some(depth) = layout.depth {
                prop_assert!(depth.slice(&buffer).is_ok());
                prop_assert_eq!(depth.end(), layout.ir.offset);
            }
        }

        #[test]
        fn prop_short_buffer_is_error_not_panic(width in 1u16..128, height in 1u16..128, short_by in 1usize..64) {
            let layout = FrameLayout::for_output(DepthMode::NfovUnbinned, &info(width, height, 0));
            let len = layout.total_len().saturating_sub(short_by);
            let buffer = vec![0u8; len];
            prop_assert!(layout.ir.slice(&buffer).is_err());
        }

        #[test]
        fn prop_timestamp_is_exact(ticks in 0u64..u64::MAX / 1_000_000) {
            let expected = ticks as u128 * 1_000_000 / 90_000;
            prop_assert_eq!(
                ticks_to_duration(ticks).as_micros(),
                expected
            );
        }

        #[test]
        fn prop_timestamp_saturates_past_range(ticks in (u64::MAX / 1_000_000) * 90_000 + 90_000..=u64::MAX) {
            prop_assert_eq!(ticks_to_duration(ticks), Duration::from_micros(u64::MAX));
        }
    }
}
