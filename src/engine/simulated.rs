//! Simulated depth engine
//!
//! A deterministic software engine implementing the [`DepthEngine`] contract.
//! It does not reconstruct real depth; it produces planes of the nominal
//! geometry for the engine mode, filled from the raw input bytes, so that the
//! rest of the pipeline can be exercised without the native engine.
//!
//! # Output
//!
//! - Depth modes: a DEPTH16 plane followed by an IR16 plane
//! - PCM (passive IR): a single IR16 plane
//! - Center of exposure advances by a fixed frame period per processed frame
//!
//! # Failure Injection
//!
//! The factory can be told to fail creation, or to fail one specific frame,
//! which is how the pipeline's abort paths are tested.
//!
//! # Example
//!
//! ```ignore
//! use rawtodepth_rs::engine::{DepthEngineContext, SimulatedEngineFactory};
//!
//! let factory = SimulatedEngineFactory::new().with_frame_period_ticks(6_000);
//! let mut context = DepthEngineContext::create(&factory, &calibration, DepthMode::NfovUnbinned)?;
//! let output = context.process(&raw_frame)?;
//! ```

use crate::types::BYTES_PER_16BIT_PIXEL;

use super::engine_trait::{DepthEngine, DepthEngineFactory};
use super::{DepthEngineMode, EngineParams, EngineResultCode, OutputFrameInfo, OutputType};

/// Frame period of a 30 fps recording in 90 kHz ticks
pub const DEFAULT_FRAME_PERIOD_TICKS: u64 = 3_000;

/// Base depth in millimetres added to every simulated sample
const DEPTH_BASE_MM: u16 = 500;

/// Nominal output geometry of each engine mode
fn nominal_geometry(mode: DepthEngineMode) -> (u16, u16) {
    match mode {
        DepthEngineMode::LtSwBinning => (320, 288),
        DepthEngineMode::QuarterMegaPixel => (512, 512),
        DepthEngineMode::LtNative => (640, 576),
        DepthEngineMode::MegaPixel => (1024, 1024),
        DepthEngineMode::Pcm => (1024, 1024),
    }
}

/// Creates [`SimulatedDepthEngine`] instances
#[derive(Debug, Clone)]
pub struct SimulatedEngineFactory {
    frame_period_ticks: u64,
    first_exposure_ticks: u64,
    init_failure: Option<EngineResultCode>,
    frame_failure: Option<(u64, EngineResultCode)>,
    geometry: Option<(u16, u16)>,
}

impl Default for SimulatedEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedEngineFactory {
    /// Create a factory for a 30 fps stream starting at tick 0
    pub fn new() -> Self {
        Self {
            frame_period_ticks: DEFAULT_FRAME_PERIOD_TICKS,
            first_exposure_ticks: 0,
            init_failure: None,
            frame_failure: None,
            geometry: None,
        }
    }

    /// Set the tick distance between consecutive exposures
    pub fn with_frame_period_ticks(mut self, ticks: u64) -> Self {
        self.frame_period_ticks = ticks;
        self
    }

    /// Set the center of exposure of the first frame
    pub fn with_first_exposure_ticks(mut self, ticks: u64) -> Self {
        self.first_exposure_ticks = ticks;
        self
    }

    /// Make engine creation fail with `code`
    pub fn with_init_failure(mut self, code: EngineResultCode) -> Self {
        self.init_failure = Some(code);
        self
    }

    /// Make processing of frame `frame` (0-based) fail with `code`
    pub fn with_frame_failure(mut self, frame: u64, code: EngineResultCode) -> Self {
        self.frame_failure = Some((frame, code));
        self
    }

    /// Report this geometry instead of the mode's nominal one
    pub fn with_output_geometry(mut self, width: u16, height: u16) -> Self {
        self.geometry = Some((width, height));
        self
    }
}

impl DepthEngineFactory for SimulatedEngineFactory {
    fn create(
        &self,
        calibration: &[u8],
        params: EngineParams,
    ) -> Result<Box<dyn DepthEngine>, EngineResultCode> {
        if let Some(code) = self.init_failure {
            return Err(code);
        }
        if calibration.is_empty() {
            return Err(EngineResultCode::INVALID_CALIBRATION);
        }

        let (width, height) = self.geometry.unwrap_or_else(|| nominal_geometry(params.mode));
        tracing::debug!(
            "Simulated depth engine {:?}: {}x{}, {} byte calibration",
            params.mode,
            width,
            height,
            calibration.len()
        );

        Ok(Box::new(SimulatedDepthEngine {
            mode: params.mode,
            width,
            height,
            frame_period_ticks: self.frame_period_ticks,
            next_exposure_ticks: self.first_exposure_ticks,
            frames_processed: 0,
            frame_failure: self.frame_failure,
        }))
    }
}

/// Deterministic software depth engine
#[derive(Debug)]
pub struct SimulatedDepthEngine {
    mode: DepthEngineMode,
    width: u16,
    height: u16,
    frame_period_ticks: u64,
    next_exposure_ticks: u64,
    frames_processed: u64,
    frame_failure: Option<(u64, EngineResultCode)>,
}

impl SimulatedDepthEngine {
    /// Number of 16-bit planes written per frame
    pub fn plane_count(&self) -> usize {
        match self.mode {
            DepthEngineMode::Pcm => 1,
            _ => 2,
        }
    }

    fn plane_size(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_16BIT_PIXEL
    }
}

impl DepthEngine for SimulatedDepthEngine {
    fn output_frame_size(&self) -> usize {
        self.plane_size() * self.plane_count()
    }

    fn process_frame(
        &mut self,
        input: &[u8],
        output_type: OutputType,
        output: &mut [u8],
    ) -> Result<OutputFrameInfo, EngineResultCode> {
        debug_assert_eq!(output_type, OutputType::ZDepth);

        let frame = self.frames_processed;
        self.frames_processed += 1;

        if input.is_empty() {
            return Err(EngineResultCode::NULL_INPUT);
        }
        if output.len() < self.output_frame_size() {
            return Err(EngineResultCode::OUTPUT_TOO_SMALL);
        }
        if let Some((fail_frame, code)) = self.frame_failure {
            if fail_frame == frame {
                return Err(code);
            }
        }

        let plane_size = self.plane_size();
        let (first, rest) = output.split_at_mut(plane_size);
        if self.mode == DepthEngineMode::Pcm {
            fill_ir_plane(first, input);
        } else {
            fill_depth_plane(first, input);
            fill_ir_plane(&mut rest[..plane_size], input);
        }

        let info = OutputFrameInfo {
            output_width: self.width,
            output_height: self.height,
            center_of_exposure_in_ticks: self.next_exposure_ticks,
        };
        self.next_exposure_ticks += self.frame_period_ticks;
        Ok(info)
    }
}

fn fill_depth_plane(plane: &mut [u8], input: &[u8]) {
    for (i, pixel) in plane.chunks_exact_mut(BYTES_PER_16BIT_PIXEL).enumerate() {
        let sample = input[i % input.len()] as u16;
        pixel.copy_from_slice(&(DEPTH_BASE_MM + sample * 8).to_le_bytes());
    }
}

fn fill_ir_plane(plane: &mut [u8], input: &[u8]) {
    for (i, pixel) in plane.chunks_exact_mut(BYTES_PER_16BIT_PIXEL).enumerate() {
        let sample = input[(i * 7) % input.len()] as u16;
        pixel.copy_from_slice(&(sample * 16).to_le_bytes());
    }
}
