//! # Draw Primitives
//!
//! The engine never rasterizes. Every frame it fills a [`Batcher`] with
//! backend-agnostic primitives (boxes, lines, text) in world coordinates; a
//! presentation layer is free to turn them into pixels however it likes.
//!
//! ```text
//! TimeGraph::draw
//!     │
//!     ├──► Track::update_primitives ──► Batcher (boxes / lines / labels)
//!     └──► iterator overlay        ──► Batcher (overlay boxes / lines)
//! ```
//!
//! World space: x grows with time, y grows downwards from the top of the
//! first track.

pub mod batcher;
pub mod palette;
pub mod time_format;

pub use batcher::{Batcher, PickingMode, Point, Primitive, Shape};
pub use time_format::pretty_time;
