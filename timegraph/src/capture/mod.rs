//! Capture model
//!
//! Everything known about one capture besides the timers themselves:
//! process identity, instrumented functions, sampled callstacks and
//! per-function statistics. Timers live in the tracks.

pub mod callstack;
pub mod capture_data;
pub mod function;

pub use callstack::{Callstack, CallstackData, CallstackEvent};
pub use capture_data::{AddressInfo, CaptureData, SharedCaptureData};
pub use function::{FunctionInfo, FunctionStats, InstrumentationKind};
