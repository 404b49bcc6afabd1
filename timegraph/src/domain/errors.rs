//! Structured error types for timegraph
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Only the capture file boundary can fail at runtime; contract breaches in
//! the engine itself are assertions.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Unsupported capture format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Callstack event at tick {time} references unknown callstack {hash:#x}")]
    UnknownCallstack { time: u64, hash: u64 },

    #[error("Invalid capture file name: {0}")]
    InvalidFileName(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_callstack_display() {
        let err = CaptureError::UnknownCallstack { time: 12, hash: 0xff };
        assert_eq!(err.to_string(), "Callstack event at tick 12 references unknown callstack 0xff");
    }

    #[test]
    fn test_version_error_display() {
        let err = CaptureError::UnsupportedVersion { found: 9, expected: 1 };
        assert!(err.to_string().contains("version 9"));
    }
}
