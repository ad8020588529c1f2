//! # rawtodepth-rs: Raw IR to Depth Reprocessor
//!
//! Converts a capture archive recorded in raw IR mode into an archive of
//! computed depth and IR frames. Every raw frame is run through a depth engine,
//! the engine output is split into depth/IR planes, and the result is written
//! alongside the untouched color and IMU streams.
//!
//! ## Architecture
//!
//! - **Session**: archive reader ([`SessionPlayer`]) and writer ([`SessionRecorder`])
//! - **Engine**: the [`engine::DepthEngine`] capability trait, its owning context and a simulated engine
//! - **Pipeline**: frame reconstruction, metrics and the [`Reprocessor`] state machine
//! - **Config**: TOML run configuration with command-line overrides
//!
//! ## Configuration
//!
//! The default config file lives in the platform config directory under
//! `dev.rawtodepth-rs/config.toml`. See [`config`] for the format.
//!
//! ## Example
//!
//! ```ignore
//! use rawtodepth_rs::{engine::SimulatedEngineFactory, pipeline::Reprocessor};
//!
//! fn main() -> rawtodepth_rs::Result<()> {
//!     let mut reprocessor = Reprocessor::new(Box::new(SimulatedEngineFactory::new()));
//!     let report = reprocessor.run("raw.mkv", "out_depth.mkv")?;
//!     println!("{}", report.metrics);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::RunConfig;
pub use error::{ErrorClass, RawToDepthError, Result, ResultExt};
pub use pipeline::{PipelineState, Reprocessor, RunReport};
pub use session::{SessionPlayer, SessionRecorder};
pub use types::{Capture, DepthMode, DeviceConfiguration, Image, ImageFormat, ImuSample};
