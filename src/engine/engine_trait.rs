//! Depth engine capability traits
//!
//! This module provides the contract every depth engine implementation
//! fulfils, enabling both a native engine and the simulated engine for
//! testing. Destroying an engine is `Drop`.

use super::{EngineParams, EngineResultCode, OutputFrameInfo, OutputType};

/// Unified interface for depth engines
///
/// Calls are strictly sequential: an engine never sees a new frame while a
/// previous `process_frame` is still running.
///
/// # Example
///
/// ```ignore
/// fn run_one(engine: &mut dyn DepthEngine, raw: &[u8]) -> Result<OutputFrameInfo, EngineResultCode> {
///     let mut output = vec![0u8; engine.output_frame_size()];
///     engine.process_frame(raw, OutputType::ZDepth, &mut output)
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait DepthEngine: Send {
    /// Size in bytes of the buffer `process_frame` writes into
    fn output_frame_size(&self) -> usize;

    /// Compute one frame
    ///
    /// # Arguments
    /// * `input` - Raw IR frame as recorded
    /// * `output_type` - What to write into `output`
    /// * `output` - Destination of at least `output_frame_size()` bytes
    fn process_frame(
        &mut self,
        input: &[u8],
        output_type: OutputType,
        output: &mut [u8],
    ) -> Result<OutputFrameInfo, EngineResultCode>;
}

/// Creates depth engine instances
#[cfg_attr(test, mockall::automock)]
pub trait DepthEngineFactory {
    /// Create and initialize an engine
    ///
    /// # Arguments
    /// * `calibration` - Opaque depth calibration blob from the recording
    /// * `params` - Engine mode and raw input format
    fn create(
        &self,
        calibration: &[u8],
        params: EngineParams,
    ) -> Result<Box<dyn DepthEngine>, EngineResultCode>;
}
