//! Error handling for the raw-to-depth reprocessor
//!
//! This module defines the error type shared by the archive, engine and
//! pipeline layers, a Result alias, and a coarse classification used when
//! reporting failures.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineResultCode;
use crate::types::DepthMode;

/// Main error type for reprocessing operations
#[derive(Error, Debug)]
pub enum RawToDepthError {
    /// The input archive does not exist
    #[error("Invalid Input File: {0:?} not found")]
    ArchiveNotFound(PathBuf),

    /// The archive exists but cannot be interpreted
    #[error("Corrupt archive {path:?}: {reason}")]
    CorruptArchive { path: PathBuf, reason: String },

    /// The output archive could not be created
    #[error("Failed to create archive {path:?}: {source}")]
    ArchiveCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Archive writer called out of order
    #[error("Archive misuse: {0}")]
    ArchiveMisuse(String),

    /// The depth calibration attachment is absent
    #[error("No Depth Calibration Found (attachment {0:?})")]
    MissingCalibration(String),

    /// A required tag is absent
    #[error("{0} Tag Not Found")]
    MissingTag(String),

    /// A tag holds an unexpected value
    #[error("{tag} Tag <{found}> does not match <{expected}>")]
    TagMismatch {
        tag: String,
        found: String,
        expected: String,
    },

    /// Depth mode has no engine mapping
    #[error("Depth mode {0} has no depth engine mapping")]
    UnsupportedDepthMode(DepthMode),

    /// Engine creation failed
    #[error("Depth Engine Failure (result code {0})")]
    EngineInit(EngineResultCode),

    /// Engine failed on a frame
    #[error("Depth Engine Processing error on frame {frame}. Error code: {code}")]
    EngineProcess { frame: u64, code: EngineResultCode },

    /// Engine reported success with output that breaks its contract
    #[error("Depth engine contract violation: {0}")]
    EngineContract(String),

    /// An input capture carries no raw IR image
    #[error("Capture {frame} has no raw IR image")]
    MissingRawFrame { frame: u64 },

    /// Errors related to configuration loading
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RawToDepthError>,
    },
}

/// Coarse failure class, used for reporting only; every class is fatal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Detected before any engine work
    Precondition,
    /// Depth engine failure
    Engine,
    /// Archive I/O
    Io,
    /// Archive writer used out of order
    Misuse,
}

impl RawToDepthError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        RawToDepthError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classify the error, looking through context wrappers
    pub fn class(&self) -> ErrorClass {
        match self {
            RawToDepthError::ArchiveNotFound(_)
            | RawToDepthError::CorruptArchive { .. }
            | RawToDepthError::MissingCalibration(_)
            | RawToDepthError::MissingTag(_)
            | RawToDepthError::TagMismatch { .. }
            | RawToDepthError::UnsupportedDepthMode(_)
            | RawToDepthError::Config(_) => ErrorClass::Precondition,
            RawToDepthError::EngineInit(_)
            | RawToDepthError::EngineProcess { .. }
            | RawToDepthError::EngineContract(_)
            | RawToDepthError::MissingRawFrame { .. } => ErrorClass::Engine,
            RawToDepthError::ArchiveCreate { .. }
            | RawToDepthError::Io(_)
            | RawToDepthError::Serialization(_) => ErrorClass::Io,
            RawToDepthError::ArchiveMisuse(_) => ErrorClass::Misuse,
            RawToDepthError::WithContext { source, .. } => source.class(),
        }
    }

    /// Strip context wrappers
    pub fn root(&self) -> &RawToDepthError {
        match self {
            RawToDepthError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<bincode::Error> for RawToDepthError {
    fn from(err: bincode::Error) -> Self {
        RawToDepthError::Serialization(err.to_string())
    }
}

/// Result type alias for reprocessing operations
pub type Result<T> = std::result::Result<T, RawToDepthError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_mismatch_display() {
        let err = RawToDepthError::TagMismatch {
            tag: "K4A_IR_MODE".to_string(),
            found: "COMPRESSED".to_string(),
            expected: "RAW".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "K4A_IR_MODE Tag <COMPRESSED> does not match <RAW>"
        );
    }

    #[test]
    fn test_error_with_context() {
        let err = RawToDepthError::MissingTag("K4A_IR_MODE".to_string());
        let with_ctx = err.with_context("Validating input");
        assert!(with_ctx.to_string().contains("Validating input"));
        assert!(matches!(with_ctx.root(), RawToDepthError::MissingTag(_)));
    }

    #[test]
    fn test_error_class() {
        assert_eq!(
            RawToDepthError::MissingCalibration("depth_cal.ccb".into()).class(),
            ErrorClass::Precondition
        );
        assert_eq!(
            RawToDepthError::EngineProcess {
                frame: 3,
                code: EngineResultCode(7),
            }
            .class(),
            ErrorClass::Engine
        );
        assert_eq!(
            RawToDepthError::ArchiveMisuse("late header".into())
                .with_context("writing")
                .class(),
            ErrorClass::Misuse
        );
    }

    #[test]
    fn test_engine_process_message_carries_code() {
        let err = RawToDepthError::EngineProcess {
            frame: 12,
            code: EngineResultCode(204),
        };
        assert!(err.to_string().contains("Error code: 204"));
    }
}
