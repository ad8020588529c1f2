//! Hooks that see every reprocessed frame

use crate::types::Capture;

use super::orchestrator::RunReport;

/// Receives combined captures after they are written to the output archive
///
/// Observers are called synchronously from the processing loop and must not
/// hold on to the capture.
pub trait FrameObserver {
    /// Called once per written capture, `index` counts from 0
    fn on_capture(&mut self, index: u64, capture: &Capture);

    /// Called after the output archive was finalized
    fn on_finished(&mut self, _report: &RunReport) {}
}

/// Logs reprocessing progress
#[derive(Debug, Clone)]
pub struct ProgressObserver {
    total: usize,
    every: u64,
}

impl ProgressObserver {
    /// Log every `every`-th frame out of `total`
    pub fn new(total: usize, every: u64) -> Self {
        Self {
            total,
            every: every.max(1),
        }
    }
}

impl FrameObserver for ProgressObserver {
    fn on_capture(&mut self, index: u64, capture: &Capture) {
        let frame = index + 1;
        if frame % self.every != 0 && frame != self.total as u64 {
            return;
        }
        let timestamp = capture
            .ir_image()
            .map(|ir| ir.timestamp.as_micros())
            .unwrap_or_default();
        tracing::info!(
            "Processed frame {}/{} (t = {} us)",
            frame,
            self.total,
            timestamp
        );
    }

    fn on_finished(&mut self, report: &RunReport) {
        tracing::info!(
            "Wrote {} ({:.2} MB)",
            report.output.display(),
            report.output_size_mb
        );
    }
}
