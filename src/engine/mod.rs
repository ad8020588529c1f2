//! Depth engine adapter
//!
//! The depth engine turns one raw IR sensor frame into computed depth and IR
//! planes. It is consumed through the [`DepthEngine`] capability trait so the
//! pipeline never depends on a concrete engine:
//!
//! - [`DepthEngineFactory`] - creates an engine from a calibration blob and mode parameters
//! - [`DepthEngineContext`] - owns one engine instance and its reusable output buffer
//! - [`SimulatedDepthEngine`] - deterministic software engine used by the CLI and tests
//!
//! # Mode Mapping
//!
//! | Depth mode       | Engine mode        | Input format      |
//! |------------------|--------------------|-------------------|
//! | NFOV_2X2BINNED   | LT_SW_BINNING      | 12-bit compressed |
//! | WFOV_2X2BINNED   | QUARTER_MEGA_PIXEL | 12-bit compressed |
//! | NFOV_UNBINNED    | LT_NATIVE          | 12-bit compressed |
//! | WFOV_UNBINNED    | MEGA_PIXEL         | 8-bit compressed  |
//! | PASSIVE_IR       | PCM                | 12-bit compressed |

pub mod context;
pub mod engine_trait;
pub mod simulated;

pub use context::{DepthEngineContext, EngineOutput};
pub use engine_trait::{DepthEngine, DepthEngineFactory};
pub use simulated::{SimulatedDepthEngine, SimulatedEngineFactory, DEFAULT_FRAME_PERIOD_TICKS};

use crate::error::{RawToDepthError, Result};
use crate::types::DepthMode;

/// Operating mode of the depth engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthEngineMode {
    LtSwBinning,
    QuarterMegaPixel,
    LtNative,
    MegaPixel,
    /// Passive IR only
    Pcm,
}

/// Encoding of the raw frames fed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthEngineInputFormat {
    Compressed12Bit,
    Compressed8Bit,
}

/// What the engine writes into the output buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    /// Radial depth converted to Z depth, followed by IR where the mode has it
    ZDepth,
}

/// Status code returned by the engine on failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineResultCode(pub i32);

impl EngineResultCode {
    /// A required input was empty
    pub const NULL_INPUT: EngineResultCode = EngineResultCode(1);
    /// The output buffer cannot hold the result
    pub const OUTPUT_TOO_SMALL: EngineResultCode = EngineResultCode(2);
    /// The calibration blob was rejected
    pub const INVALID_CALIBRATION: EngineResultCode = EngineResultCode(3);
    /// The engine failed while computing a frame
    pub const PROCESSING_FAILED: EngineResultCode = EngineResultCode(4);
}

impl std::fmt::Display for EngineResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geometry and exposure reference of one processed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputFrameInfo {
    pub output_width: u16,
    pub output_height: u16,
    /// Center of exposure in the 90 kHz device tick domain
    pub center_of_exposure_in_ticks: u64,
}

/// Parameters an engine is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    pub mode: DepthEngineMode,
    pub input_format: DepthEngineInputFormat,
}

impl EngineParams {
    /// Engine parameters for a recorded depth mode
    pub fn for_depth_mode(mode: DepthMode) -> Result<Self> {
        Ok(Self {
            mode: de_mode_from_depth_mode(mode)?,
            input_format: input_format_from_depth_mode(mode)?,
        })
    }
}

/// Map a depth mode to the engine mode that processes it
pub fn de_mode_from_depth_mode(mode: DepthMode) -> Result<DepthEngineMode> {
    match mode {
        DepthMode::Nfov2x2Binned => Ok(DepthEngineMode::LtSwBinning),
        DepthMode::Wfov2x2Binned => Ok(DepthEngineMode::QuarterMegaPixel),
        DepthMode::NfovUnbinned => Ok(DepthEngineMode::LtNative),
        DepthMode::WfovUnbinned => Ok(DepthEngineMode::MegaPixel),
        DepthMode::PassiveIr => Ok(DepthEngineMode::Pcm),
        DepthMode::Off => Err(RawToDepthError::UnsupportedDepthMode(mode)),
    }
}

/// Map a depth mode to the raw input encoding; only MEGA_PIXEL uses 8-bit
pub fn input_format_from_depth_mode(mode: DepthMode) -> Result<DepthEngineInputFormat> {
    Ok(match de_mode_from_depth_mode(mode)? {
        DepthEngineMode::MegaPixel => DepthEngineInputFormat::Compressed8Bit,
        _ => DepthEngineInputFormat::Compressed12Bit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_table() {
        let expected = [
            (
                DepthMode::Nfov2x2Binned,
                DepthEngineMode::LtSwBinning,
                DepthEngineInputFormat::Compressed12Bit,
            ),
            (
                DepthMode::Wfov2x2Binned,
                DepthEngineMode::QuarterMegaPixel,
                DepthEngineInputFormat::Compressed12Bit,
            ),
            (
                DepthMode::NfovUnbinned,
                DepthEngineMode::LtNative,
                DepthEngineInputFormat::Compressed12Bit,
            ),
            (
                DepthMode::WfovUnbinned,
                DepthEngineMode::MegaPixel,
                DepthEngineInputFormat::Compressed8Bit,
            ),
            (
                DepthMode::PassiveIr,
                DepthEngineMode::Pcm,
                DepthEngineInputFormat::Compressed12Bit,
            ),
        ];

        for (depth_mode, engine_mode, format) in expected {
            assert_eq!(de_mode_from_depth_mode(depth_mode).unwrap(), engine_mode);
            assert_eq!(input_format_from_depth_mode(depth_mode).unwrap(), format);
        }
    }

    #[test]
    fn test_unmapped_mode_is_fatal() {
        let err = de_mode_from_depth_mode(DepthMode::Off).unwrap_err();
        assert!(matches!(
            err,
            RawToDepthError::UnsupportedDepthMode(DepthMode::Off)
        ));
        assert!(input_format_from_depth_mode(DepthMode::Off).is_err());
        assert!(EngineParams::for_depth_mode(DepthMode::Off).is_err());
    }
}
