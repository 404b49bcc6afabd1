//! Domain model for timegraph
//!
//! Identifiers that must not be mixed up (thread ids, track ids), the
//! packed RGBA color shared by tracks and primitives, and the error type of
//! the capture file boundary.

pub mod errors;
pub mod types;

pub use types::{Color, Tid, TrackId};

pub use errors::CaptureError;
