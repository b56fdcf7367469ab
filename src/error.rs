use thiserror::Error;

use crate::types::FrameSource;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor is not available")]
    Unavailable,
    #[error("failed to lock {source_kind} image buffer: {reason}")]
    BufferLock {
        source_kind: &'static str,
        reason: String,
    },
    #[error("coordinate mapping failed: {0}")]
    Mapping(String),
    #[error("{source_kind} frame holds {actual} samples, destination expects {expected}")]
    SizeMismatch {
        source_kind: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl SensorError {
    pub fn buffer_lock(source: FrameSource, reason: impl Into<String>) -> Self {
        SensorError::BufferLock {
            source_kind: source.label(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{what} length mismatch: got {actual}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("color conversion failed: {0}")]
    ColorConversion(String),
}

impl PipelineError {
    pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(PipelineError::LengthMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}

/// Failure of a single tick. The controller stays usable afterwards.
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("renderer rejected frame: {0:#}")]
    Render(anyhow::Error),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown display mode {0:?}")]
    UnknownMode(String),
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum PositionLogError {
    #[error("failed to read position log: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected three coordinates, found {found}")]
    FieldCount { line: usize, found: usize },
    #[error("line {line}: invalid coordinate {value:?}")]
    InvalidCoordinate { line: usize, value: String },
}
