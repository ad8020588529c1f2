//! Engine and observer helpers

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rawtodepth_rs::engine::{EngineResultCode, SimulatedEngineFactory};
use rawtodepth_rs::pipeline::{FrameObserver, Reprocessor, RunReport};
use rawtodepth_rs::Capture;

/// Frame period used by test engines, one frame every 1/30 s
pub const TEST_FRAME_PERIOD_TICKS: u64 = 3_000;

/// Simulated engine with a fixed frame period
pub fn simulated_factory() -> SimulatedEngineFactory {
    SimulatedEngineFactory::new().with_frame_period_ticks(TEST_FRAME_PERIOD_TICKS)
}

/// Reprocessor around a simulated engine
pub fn reprocessor_with(factory: SimulatedEngineFactory) -> Reprocessor {
    Reprocessor::new(Box::new(factory))
}

/// Engine whose creation fails
pub fn failing_init_factory(code: i32) -> SimulatedEngineFactory {
    simulated_factory().with_init_failure(EngineResultCode(code))
}

/// Engine that fails on frame `frame`
pub fn failing_frame_factory(frame: u64, code: i32) -> SimulatedEngineFactory {
    simulated_factory().with_frame_failure(frame, EngineResultCode(code))
}

/// Expected timestamp of output frame `index` for [`simulated_factory`]
pub fn expected_timestamp(index: u64) -> Duration {
    rawtodepth_rs::types::ticks_to_duration(index * TEST_FRAME_PERIOD_TICKS)
}

/// What a [`RecordingObserver`] saw
#[derive(Debug, Default)]
pub struct Observed {
    pub indices: Vec<u64>,
    pub captures: Vec<Capture>,
    pub finished: Option<RunReport>,
}

/// Observer that keeps everything it is shown
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub observed: Arc<Mutex<Observed>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameObserver for RecordingObserver {
    fn on_capture(&mut self, index: u64, capture: &Capture) {
        let mut observed = self.observed.lock().unwrap();
        observed.indices.push(index);
        observed.captures.push(capture.clone());
    }

    fn on_finished(&mut self, report: &RunReport) {
        self.observed.lock().unwrap().finished = Some(report.clone());
    }
}
