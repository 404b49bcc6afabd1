//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing an arena index
//! where a thread id is expected, and make function signatures more expressive.

use serde::{Deserialize, Serialize};
use std::fmt;
use timegraph_common::ALL_THREADS_FAKE_TID;

/// Track handle
///
/// Stable index into the track arena owned by the registry. Keyed lookups
/// (by thread id, GPU timeline, metric name) resolve to a `TrackId`; the
/// arena is the single owner of every track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub usize);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Track#{}", self.0)
    }
}

/// Thread ID
///
/// Thread id as reported by the capture producer. The negative sentinel
/// [`ALL_THREADS_FAKE_TID`] addresses the synthetic process track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tid(pub i32);

impl Tid {
    pub const ALL_THREADS: Tid = Tid(ALL_THREADS_FAKE_TID);

    /// Returns true for the "all threads" sentinel
    #[must_use]
    pub fn is_all_threads(self) -> bool {
        self == Self::ALL_THREADS
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

impl From<i32> for Tid {
    fn from(tid: i32) -> Self {
        Tid(tid)
    }
}

/// RGBA color, 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Pack into a single word (used for lock-free color storage)
    #[must_use]
    pub const fn to_bits(self) -> u32 {
        u32::from_be_bytes([self.r, self.g, self.b, self.a])
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        let [r, g, b, a] = bits.to_be_bytes();
        Self { r, g, b, a }
    }

    /// Same color with a different alpha
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}
