//! Reprocessing orchestrator
//!
//! Drives one run from a raw input archive to a finalized output archive:
//!
//! ```text
//! Uninitialized -> Validated -> EngineReady -> DrainingImu -> DrainingCaptures -> Finalized
//!        \______________\______________\_____________\________________\-> Aborted
//! ```
//!
//! The engine is created before the output archive, so a failed precondition
//! or engine initialization leaves no output file behind. Any later failure
//! aborts the run and leaves an unfinalized output that will not open.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::{DepthEngineContext, DepthEngineFactory};
use crate::error::{RawToDepthError, Result};
use crate::session::{
    SessionPlayer, SessionRecorder, CALIBRATION_ATTACHMENT, DEPTH_CALIBRATION_ATTACHMENT,
    IR_MODE_RAW, TAG_IR_MODE,
};
use crate::types::{DepthMode, DeviceConfiguration};

use super::metrics::{MetricsSummary, PipelineMetrics};
use super::observer::FrameObserver;
use super::reconstruct::FrameReconstructor;

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Uninitialized,
    Validated,
    EngineReady,
    DrainingImu,
    DrainingCaptures,
    Finalized,
    Aborted,
}

impl PipelineState {
    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            PipelineState::Uninitialized => "Uninitialized",
            PipelineState::Validated => "Validated",
            PipelineState::EngineReady => "Engine Ready",
            PipelineState::DrainingImu => "Draining IMU",
            PipelineState::DrainingCaptures => "Draining Captures",
            PipelineState::Finalized => "Finalized",
            PipelineState::Aborted => "Aborted",
        }
    }

    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Finalized | PipelineState::Aborted)
    }
}

/// Attachment names used by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReprocessOptions {
    /// Input attachment holding the depth engine calibration
    pub depth_calibration_attachment: String,
    /// Device calibration copied from input to output
    pub calibration_attachment: String,
}

impl Default for ReprocessOptions {
    fn default() -> Self {
        Self {
            depth_calibration_attachment: DEPTH_CALIBRATION_ATTACHMENT.to_string(),
            calibration_attachment: CALIBRATION_ATTACHMENT.to_string(),
        }
    }
}

/// Calibration blobs of an input archive that passed validation
#[derive(Debug, Clone, Copy)]
pub struct ValidatedInput<'a> {
    pub depth_calibration: &'a [u8],
    pub device_calibration: &'a [u8],
}

/// Check that an archive can be reprocessed
///
/// The depth calibration must be attached and the IR mode tag must say the IR
/// frames are raw. The device calibration must be present as well since it is
/// copied to the output.
pub fn validate_input<'a>(
    player: &'a SessionPlayer,
    options: &ReprocessOptions,
) -> Result<ValidatedInput<'a>> {
    let depth_calibration = player
        .get_attachment(&options.depth_calibration_attachment)
        .ok_or_else(|| {
            RawToDepthError::MissingCalibration(options.depth_calibration_attachment.clone())
        })?;

    match player.get_tag(TAG_IR_MODE) {
        None => return Err(RawToDepthError::MissingTag(TAG_IR_MODE.to_string())),
        Some(value) if value != IR_MODE_RAW => {
            return Err(RawToDepthError::TagMismatch {
                tag: TAG_IR_MODE.to_string(),
                found: value.to_string(),
                expected: IR_MODE_RAW.to_string(),
            })
        }
        Some(_) => {}
    }

    let device_calibration = player
        .get_attachment(&options.calibration_attachment)
        .ok_or_else(|| RawToDepthError::CorruptArchive {
            path: player.path().to_path_buf(),
            reason: format!("no {:?} attachment", options.calibration_attachment),
        })?;

    Ok(ValidatedInput {
        depth_calibration,
        device_calibration,
    })
}

/// Outcome of a finalized run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub depth_mode: DepthMode,
    pub captures_written: u64,
    pub imu_samples_written: u64,
    pub output_size_mb: f64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: f64,
    pub metrics: MetricsSummary,
}

impl RunReport {
    /// Pretty JSON rendering of the report
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RawToDepthError::Serialization(e.to_string()))
    }
}

/// Converts a raw capture archive into a depth archive
///
/// # Example
///
/// ```ignore
/// use rawtodepth_rs::engine::SimulatedEngineFactory;
/// use rawtodepth_rs::pipeline::Reprocessor;
///
/// let mut reprocessor = Reprocessor::new(Box::new(SimulatedEngineFactory::new()));
/// let report = reprocessor.run("raw.mkv", "out_depth.mkv")?;
/// println!("{}", report.metrics);
/// ```
pub struct Reprocessor {
    factory: Box<dyn DepthEngineFactory>,
    options: ReprocessOptions,
    observers: Vec<Box<dyn FrameObserver>>,
    state: PipelineState,
    metrics: PipelineMetrics,
}

impl std::fmt::Debug for Reprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprocessor")
            .field("options", &self.options)
            .field("observers", &self.observers.len())
            .field("state", &self.state)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl Reprocessor {
    /// Create a reprocessor with default attachment names
    pub fn new(factory: Box<dyn DepthEngineFactory>) -> Self {
        Self::with_options(factory, ReprocessOptions::default())
    }

    pub fn with_options(factory: Box<dyn DepthEngineFactory>, options: ReprocessOptions) -> Self {
        Self {
            factory,
            options,
            observers: Vec::new(),
            state: PipelineState::Uninitialized,
            metrics: PipelineMetrics::new(),
        }
    }

    /// Register an observer for written captures
    pub fn add_observer(&mut self, observer: Box<dyn FrameObserver>) {
        self.observers.push(observer);
    }

    /// State of the current or last run
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Metrics of the current or last run
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Reprocess `input` into `output`
    ///
    /// Every failure is fatal; the state ends as `Aborted` and the error is
    /// returned as is.
    pub fn run(&mut self, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<RunReport> {
        self.state = PipelineState::Uninitialized;
        self.metrics.reset();

        match self.execute(input.as_ref(), output.as_ref()) {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!(
                    "Reprocessing aborted in state {}: {}",
                    self.state.display_name(),
                    e
                );
                self.state = PipelineState::Aborted;
                Err(e)
            }
        }
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(
            "Pipeline {} -> {}",
            self.state.display_name(),
            next.display_name()
        );
        self.state = next;
    }

    fn execute(&mut self, input: &Path, output: &Path) -> Result<RunReport> {
        let started_at = Utc::now();
        let started = Instant::now();

        let mut player = SessionPlayer::open(input)?;
        let input_config = player.configuration().clone();
        tracing::info!(
            "Input {:?}: {}, {} captures, {} IMU samples",
            input,
            input_config.depth_mode,
            player.capture_count(),
            player.imu_sample_count()
        );

        let validated = validate_input(&player, &self.options)?;
        self.transition(PipelineState::Validated);

        let mut engine = DepthEngineContext::create(
            &*self.factory,
            validated.depth_calibration,
            input_config.depth_mode,
        )?;
        let reconstructor = FrameReconstructor::new(input_config.depth_mode)?;
        self.transition(PipelineState::EngineReady);

        let mut recorder =
            SessionRecorder::create(output, DeviceConfiguration::for_reprocessing(&input_config))?;
        recorder.add_attachment(
            self.options.calibration_attachment.as_str(),
            validated.device_calibration,
        )?;
        if input_config.imu_track_enabled {
            recorder.add_imu_track()?;
        }
        recorder.write_header()?;

        self.transition(PipelineState::DrainingImu);
        if input_config.imu_track_enabled {
            while let Some(sample) = player.next_imu_sample()? {
                recorder.write_imu_sample(&sample)?;
                self.metrics.record_imu_sample();
            }
        }

        self.transition(PipelineState::DrainingCaptures);
        let mut index = 0u64;
        while let Some(mut capture) = player.next_capture()? {
            let raw = capture
                .ir
                .take()
                .ok_or(RawToDepthError::MissingRawFrame { frame: index })?;
            let color = if input_config.color_track_enabled {
                capture.color.take()
            } else {
                None
            };

            let engine_started = Instant::now();
            let engine_output = engine.process(&raw.data)?;
            let engine_time = engine_started.elapsed();

            let combined = reconstructor.reconstruct(engine_output, color)?;
            recorder.write_capture(&combined)?;
            self.metrics.record_frame(engine_time);

            for observer in &mut self.observers {
                observer.on_capture(index, &combined);
            }
            index += 1;
        }

        let summary = recorder.flush()?;
        self.transition(PipelineState::Finalized);

        let metrics = self.metrics.summary();
        tracing::info!("{}", metrics);

        let report = RunReport {
            input: input.to_path_buf(),
            output: summary.path.clone(),
            depth_mode: input_config.depth_mode,
            captures_written: summary.capture_count,
            imu_samples_written: summary.imu_sample_count,
            output_size_mb: summary.file_size_mb(),
            started_at,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            metrics,
        };
        for observer in &mut self.observers {
            observer.on_finished(&report);
        }
        Ok(report)
    }
}
