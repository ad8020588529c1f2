//! Exclusive owner of one depth engine instance

use crate::error::{RawToDepthError, Result};
use crate::types::DepthMode;

use super::engine_trait::{DepthEngine, DepthEngineFactory};
use super::{EngineParams, OutputFrameInfo, OutputType};

/// Result of processing one frame
///
/// Borrows the context's output buffer, so it must be consumed before the next
/// frame is submitted.
#[derive(Debug, Clone, Copy)]
pub struct EngineOutput<'a> {
    pub info: OutputFrameInfo,
    pub buffer: &'a [u8],
}

/// One engine instance plus its reusable output buffer
///
/// Created once per run and never reinitialized. The engine is destroyed when
/// the context is dropped.
pub struct DepthEngineContext {
    engine: Box<dyn DepthEngine>,
    depth_mode: DepthMode,
    params: EngineParams,
    output: Vec<u8>,
    frames_submitted: u64,
}

impl std::fmt::Debug for DepthEngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepthEngineContext")
            .field("depth_mode", &self.depth_mode)
            .field("params", &self.params)
            .field("output_buffer_size", &self.output.len())
            .field("frames_submitted", &self.frames_submitted)
            .finish()
    }
}

impl DepthEngineContext {
    /// Create the engine for a recorded depth mode
    ///
    /// The output size is queried once and one buffer of that size is reused for
    /// every frame.
    pub fn create(
        factory: &dyn DepthEngineFactory,
        calibration: &[u8],
        depth_mode: DepthMode,
    ) -> Result<Self> {
        let params = EngineParams::for_depth_mode(depth_mode)?;
        let engine = factory
            .create(calibration, params)
            .map_err(RawToDepthError::EngineInit)?;

        let output_size = engine.output_frame_size();
        if output_size == 0 {
            return Err(RawToDepthError::EngineContract(
                "engine reports a zero output frame size".to_string(),
            ));
        }

        tracing::info!(
            "Depth engine ready: {:?} / {:?}, output frame {} bytes",
            params.mode,
            params.input_format,
            output_size
        );

        Ok(Self {
            engine,
            depth_mode,
            params,
            output: vec![0u8; output_size],
            frames_submitted: 0,
        })
    }

    /// Depth mode the engine was created for
    pub fn depth_mode(&self) -> DepthMode {
        self.depth_mode
    }

    /// Size of the reusable output buffer
    pub fn output_buffer_size(&self) -> usize {
        self.output.len()
    }

    /// Number of frames handed to the engine so far
    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Compute one raw frame into Z depth (plus IR where the mode has it)
    pub fn process(&mut self, raw: &[u8]) -> Result<EngineOutput<'_>> {
        let frame = self.frames_submitted;
        self.frames_submitted += 1;

        let info = self
            .engine
            .process_frame(raw, OutputType::ZDepth, &mut self.output)
            .map_err(|code| RawToDepthError::EngineProcess { frame, code })?;

        Ok(EngineOutput {
            info,
            buffer: &self.output,
        })
    }
}
