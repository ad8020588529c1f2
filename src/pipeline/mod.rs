//! Raw-to-depth reprocessing pipeline.
//!
//! Captures flow from the input archive through the depth engine into the
//! output archive, one frame at a time:
//!
//! ```text
//! [SessionPlayer] ──► [DepthEngineContext] ──► [FrameReconstructor] ──► [SessionRecorder]
//!                                                                  └──► [FrameObserver]s
//! ```
//!
//! # Design
//!
//! - **Single-threaded** - the engine context is owned by the orchestrator and used sequentially.
//! - **One output buffer** - sized once by the engine and borrowed per frame.
//! - **Typed plane views** - [`PlaneLayout`] bounds-checks every plane against the buffer.
//! - **Fatal errors** - no retries; a failure moves the run to [`PipelineState::Aborted`].

pub mod metrics;
pub mod observer;
pub mod orchestrator;
pub mod reconstruct;

pub use metrics::{MetricsSummary, PipelineMetrics};
pub use observer::{FrameObserver, ProgressObserver};
pub use orchestrator::{
    validate_input, PipelineState, ReprocessOptions, Reprocessor, RunReport, ValidatedInput,
};
pub use reconstruct::{FrameLayout, FrameReconstructor, PlaneLayout};
