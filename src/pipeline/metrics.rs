//! Per-run processing statistics

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

/// Size of the rolling window for recent engine times
const RECENT_WINDOW_SIZE: usize = 100;

/// Statistics for one reprocessing run
///
/// Tracks frame counts and depth engine wall-clock time. Owned by the
/// orchestrator and reported when the run ends.
#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    /// Number of frames the engine processed successfully
    pub frames_processed: u64,
    /// Number of IMU samples copied to the output
    pub imu_samples_written: u64,
    /// Total engine time over all frames
    pub total_engine_time: Duration,
    /// Engine time of the most recent frame
    pub last_engine_time: Duration,
    /// Minimum engine time observed
    pub min_engine_time: Duration,
    /// Maximum engine time observed
    pub max_engine_time: Duration,
    /// Rolling window of recent engine times for jitter calculation
    pub recent_engine_times: VecDeque<Duration>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            frames_processed: 0,
            imu_samples_written: 0,
            total_engine_time: Duration::ZERO,
            last_engine_time: Duration::ZERO,
            min_engine_time: Duration::MAX,
            max_engine_time: Duration::ZERO,
            recent_engine_times: VecDeque::with_capacity(RECENT_WINDOW_SIZE),
        }
    }
}

impl PipelineMetrics {
    /// Create empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successfully processed frame
    pub fn record_frame(&mut self, engine_time: Duration) {
        self.frames_processed += 1;
        self.total_engine_time += engine_time;
        self.last_engine_time = engine_time;

        if engine_time < self.min_engine_time {
            self.min_engine_time = engine_time;
        }
        if engine_time > self.max_engine_time {
            self.max_engine_time = engine_time;
        }

        self.recent_engine_times.push_back(engine_time);
        if self.recent_engine_times.len() > RECENT_WINDOW_SIZE {
            self.recent_engine_times.pop_front();
        }
    }

    /// Record one IMU sample copied to the output
    pub fn record_imu_sample(&mut self) {
        self.imu_samples_written += 1;
    }

    /// Average engine time per frame, `None` when no frame was processed
    pub fn average_engine_time(&self) -> Option<Duration> {
        if self.frames_processed == 0 {
            return None;
        }
        let nanos = self.total_engine_time.as_nanos() / self.frames_processed as u128;
        Some(Duration::from_nanos(nanos as u64))
    }

    /// Minimum engine time, `None` when no frame was processed
    pub fn min_engine_time(&self) -> Option<Duration> {
        (self.frames_processed > 0).then_some(self.min_engine_time)
    }

    /// Jitter (max - min) over the recent window
    pub fn jitter(&self) -> Duration {
        let min = self.recent_engine_times.iter().min().copied();
        let max = self.recent_engine_times.iter().max().copied();
        match (min, max) {
            (Some(min), Some(max)) => max.saturating_sub(min),
            _ => Duration::ZERO,
        }
    }

    /// Snapshot for the run report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_processed: self.frames_processed,
            imu_samples_written: self.imu_samples_written,
            total_engine_time_ms: self.total_engine_time.as_secs_f64() * 1000.0,
            average_engine_time_ms: self
                .average_engine_time()
                .map(|d| d.as_secs_f64() * 1000.0),
            min_engine_time_ms: self.min_engine_time().map(|d| d.as_secs_f64() * 1000.0),
            max_engine_time_ms: (self.frames_processed > 0)
                .then(|| self.max_engine_time.as_secs_f64() * 1000.0),
        }
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Serializable view of [`PipelineMetrics`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub frames_processed: u64,
    pub imu_samples_written: u64,
    pub total_engine_time_ms: f64,
    pub average_engine_time_ms: Option<f64>,
    pub min_engine_time_ms: Option<f64>,
    pub max_engine_time_ms: Option<f64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total Frames Processed: {}", self.frames_processed)?;
        match self.average_engine_time_ms {
            Some(avg) => write!(f, "Average Processing Time Per Frame: {:.3} ms", avg),
            None => write!(f, "Average Processing Time Per Frame: no frames processed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_is_none_without_frames() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.average_engine_time(), None);
        assert_eq!(metrics.min_engine_time(), None);
        assert_eq!(metrics.jitter(), Duration::ZERO);

        let summary = metrics.summary();
        assert!(summary.to_string().contains("no frames processed"));
    }

    #[test]
    fn test_record_frame_tracks_min_max_and_average() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_frame(Duration::from_millis(10));
        metrics.record_frame(Duration::from_millis(30));
        metrics.record_frame(Duration::from_millis(20));

        assert_eq!(metrics.frames_processed, 3);
        assert_eq!(metrics.average_engine_time(), Some(Duration::from_millis(20)));
        assert_eq!(metrics.min_engine_time(), Some(Duration::from_millis(10)));
        assert_eq!(metrics.max_engine_time, Duration::from_millis(30));
        assert_eq!(metrics.last_engine_time, Duration::from_millis(20));
        assert_eq!(metrics.jitter(), Duration::from_millis(20));
    }

    #[test]
    fn test_recent_window_is_bounded() {
        let mut metrics = PipelineMetrics::new();
        for i in 0..(RECENT_WINDOW_SIZE as u64 + 10) {
            metrics.record_frame(Duration::from_micros(i));
        }
        assert_eq!(metrics.recent_engine_times.len(), RECENT_WINDOW_SIZE);
        assert_eq!(metrics.frames_processed, RECENT_WINDOW_SIZE as u64 + 10);
    }

    #[test]
    fn test_summary_display() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_frame(Duration::from_millis(4));
        metrics.record_imu_sample();

        let summary = metrics.summary();
        assert_eq!(summary.imu_samples_written, 1);
        let text = summary.to_string();
        assert!(text.contains("Total Frames Processed: 1"));
        assert!(text.contains("4.000 ms"));
    }

    #[test]
    fn test_reset() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_frame(Duration::from_millis(1));
        metrics.reset();
        assert_eq!(metrics.frames_processed, 0);
        assert_eq!(metrics.min_engine_time, Duration::MAX);
    }
}
