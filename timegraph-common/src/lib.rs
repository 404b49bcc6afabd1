//! # Shared Data Structures (Capture Producer ↔ Timeline Engine)
//!
//! Defines the wire-level records exchanged between the capture pipeline and
//! the timeline engine. The producer side only ever deals in these types; the
//! engine decodes them into tracks.
//!
//! ## Key Types
//!
//! - [`TimerInfo`] - One completed timer (function call, scheduling slice, GPU job)
//! - [`TimerType`] - Discriminant selecting which track a timer is routed to
//! - [`ApiEvent`] - Manual-instrumentation payload carried in a timer's registers
//!
//! ## Instrumentation Payload Layout
//!
//! Manually instrumented functions (value tracking, async start/stop, string
//! events) carry their payload in [`TimerInfo::registers`]:
//!
//! ```text
//! registers[0]      type tag (API_EVENT_* constant, low 8 bits)
//! registers[1]      value bits (or async id)
//! registers[2..6]   name, UTF-8, NUL padded (max 32 bytes)
//! ```
//!
//! The payload is schema-less: the tag alone selects how the value bits are
//! interpreted.

use serde::{Deserialize, Serialize};

// ============================================================================
// Instrumentation Event Tags
// ============================================================================

/// Synchronous scope start (handled as a regular function timer)
pub const API_EVENT_SCOPE_START: u8 = 0;

/// Synchronous scope stop
pub const API_EVENT_SCOPE_STOP: u8 = 1;

/// Asynchronous scope start, `value` holds the async id
pub const API_EVENT_SCOPE_START_ASYNC: u8 = 2;

/// Asynchronous scope stop, `value` holds the async id
pub const API_EVENT_SCOPE_STOP_ASYNC: u8 = 3;

/// String payload, `value` holds the id the string is attached to
pub const API_EVENT_STRING: u8 = 4;

/// Tracked `i32` value
pub const API_EVENT_TRACK_INT: u8 = 5;

/// Tracked `i64` value
pub const API_EVENT_TRACK_INT64: u8 = 6;

/// Tracked `u32` value
pub const API_EVENT_TRACK_UINT: u8 = 7;

/// Tracked `u64` value
pub const API_EVENT_TRACK_UINT64: u8 = 8;

/// Tracked `f32` value
pub const API_EVENT_TRACK_FLOAT: u8 = 9;

/// Tracked `f64` value
pub const API_EVENT_TRACK_DOUBLE: u8 = 10;

/// Number of registers carried by a timer
pub const NUM_REGISTERS: usize = 6;

/// Maximum encoded name length in bytes
pub const MAX_EVENT_NAME_LEN: usize = 32;

/// Thread id used by the synthetic "all threads" process track
pub const ALL_THREADS_FAKE_TID: i32 = -1;

// ============================================================================
// Timers
// ============================================================================

/// Timer discriminant
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimerType {
    /// Ordinary instrumented function call
    #[default]
    Function = 0,
    /// Scheduling slice of a thread on a core
    CoreActivity = 1,
    /// Job executed on a GPU timeline
    GpuActivity = 2,
    /// Profiler self-instrumentation marker
    Introspection = 3,
}

/// A single completed timer as produced by the capture pipeline
///
/// Immutable once handed to the engine. `start`/`end` are ticks of the
/// capture clock; they only become time through the capture's min timestamp
/// and tick period.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimerInfo {
    /// First tick covered by the timer
    pub start: u64,

    /// Last tick covered by the timer
    pub end: u64,

    /// Process the timer belongs to
    pub process_id: i32,

    /// Thread that produced the timer
    pub thread_id: i32,

    /// Nesting level within its track (0 = outermost)
    pub depth: u8,

    /// Routing discriminant
    pub timer_type: TimerType,

    /// Absolute address of the instrumented function (0 if none)
    pub function_address: u64,

    /// Core id for [`TimerType::CoreActivity`], -1 otherwise
    pub processor: i32,

    /// String key of the GPU timeline for [`TimerType::GpuActivity`]
    pub timeline_hash: u64,

    /// Opaque payload registers (manual instrumentation)
    pub registers: [u64; NUM_REGISTERS],
}

impl TimerInfo {
    /// Duration in ticks (saturating for malformed timers)
    #[must_use]
    pub fn elapsed_ticks(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

// ============================================================================
// Instrumentation Payload
// ============================================================================

/// Decoded manual-instrumentation payload
///
/// `event_type` is kept raw so that unknown tags can be reported by the
/// consumer instead of being lost here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiEvent {
    pub event_type: u8,
    pub name: String,
    pub value: u64,
}

impl ApiEvent {
    #[must_use]
    pub fn new(event_type: u8, name: impl Into<String>, value: u64) -> Self {
        Self { event_type, name: name.into(), value }
    }

    /// Decode the payload carried by a timer's registers
    #[must_use]
    pub fn decode(registers: &[u64; NUM_REGISTERS]) -> Self {
        let mut bytes = Vec::with_capacity(MAX_EVENT_NAME_LEN);
        for word in &registers[2..] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        bytes.truncate(len);

        #[allow(clippy::cast_possible_truncation)]
        let event_type = (registers[0] & 0xff) as u8;

        Self { event_type, name: String::from_utf8_lossy(&bytes).into_owned(), value: registers[1] }
    }

    /// Encode into timer registers
    ///
    /// Names longer than [`MAX_EVENT_NAME_LEN`] bytes are truncated on a
    /// character boundary.
    #[must_use]
    pub fn encode(&self) -> [u64; NUM_REGISTERS] {
        let mut name_end = self.name.len().min(MAX_EVENT_NAME_LEN);
        while !self.name.is_char_boundary(name_end) {
            name_end -= 1;
        }

        let mut name_bytes = [0u8; MAX_EVENT_NAME_LEN];
        name_bytes[..name_end].copy_from_slice(&self.name.as_bytes()[..name_end]);

        let mut registers = [0u64; NUM_REGISTERS];
        registers[0] = u64::from(self.event_type);
        registers[1] = self.value;
        for (register, chunk) in registers[2..].iter_mut().zip(name_bytes.chunks_exact(8)) {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            *register = u64::from_le_bytes(word);
        }
        registers
    }
}

// ============================================================================
// Value Encoding
// ============================================================================
//
// Tracked values travel as raw `u64` bits. The helpers below define the bit
// layout for every numeric kind so producer and consumer agree.

#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn encode_i32(value: i32) -> u64 {
    u64::from(value as u32)
}

#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn encode_i64(value: i64) -> u64 {
    value as u64
}

#[must_use]
pub fn encode_f32(value: f32) -> u64 {
    u64::from(value.to_bits())
}

#[must_use]
pub fn encode_f64(value: f64) -> u64 {
    value.to_bits()
}

#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn decode_i32(bits: u64) -> i32 {
    bits as u32 as i32
}

#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn decode_i64(bits: u64) -> i64 {
    bits as i64
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn decode_u32(bits: u64) -> u32 {
    bits as u32
}

#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn decode_f32(bits: u64) -> f32 {
    f32::from_bits(bits as u32)
}

#[must_use]
pub fn decode_f64(bits: u64) -> f64 {
    f64::from_bits(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_event_encode_decode() {
        let event = ApiEvent::new(API_EVENT_TRACK_DOUBLE, "frame_time", encode_f64(16.6));
        let decoded = ApiEvent::decode(&event.encode());
        assert_eq!(decoded, event);
        assert!((decode_f64(decoded.value) - 16.6).abs() < f64::EPSILON);
    }

    #[test]
    fn test_long_name_truncated_on_char_boundary() {
        let name = "é".repeat(20); // 40 bytes
        let decoded = ApiEvent::decode(&ApiEvent::new(API_EVENT_STRING, name, 0).encode());
        assert_eq!(decoded.name, "é".repeat(16));
    }

    #[test]
    fn test_negative_values_survive() {
        assert_eq!(decode_i32(encode_i32(-42)), -42);
        assert_eq!(decode_i64(encode_i64(i64::MIN)), i64::MIN);
        assert!((decode_f32(encode_f32(-1.5)) + 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_elapsed_ticks_saturates() {
        let timer = TimerInfo { start: 10, end: 5, ..TimerInfo::default() };
        assert_eq!(timer.elapsed_ticks(), 0);
    }
}
