//! # timegraph - Profiler Timeline Engine
//!
//! Turns a stream of completed timers into a zoomable, multi-track timeline
//! and persists whole captures to disk.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Capture Producer                            │
//! │        (timers, callstacks, thread names, strings)              │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ crossbeam channel
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   timegraph (This Crate)                        │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │  TimerSink   │──▶│   Tracks     │──▶│  TimeGraph   │        │
//! │  │  (ingest)    │   │  (chains)    │   │  (draw)      │        │
//! │  └──────────────┘   └──────────────┘   └──────────────┘        │
//! │         │                                     │                 │
//! │         ▼                                     ▼                 │
//! │  ┌──────────────┐                     ┌──────────────┐         │
//! │  │ CaptureData  │────────────────────▶│  Serializer  │         │
//! │  │ (callstacks) │                     │  (.orbit)    │         │
//! │  └──────────────┘                     └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! ### Storage and Capture
//!
//! - [`storage`]: Append-only block chains of timers, readable while written
//! - [`capture`]: Functions, callstacks and per-function statistics of a capture
//! - [`string_manager`]: Key to string table shared by tracks
//! - [`instrumentation`]: Manual instrumentation decoding (async scopes, values)
//!
//! ### Timeline
//!
//! - [`tracks`]: Thread, scheduler, GPU, graph and async tracks
//! - [`time_graph`]: Viewport, track ordering, navigation and drawing
//! - [`render`]: Primitive batcher, palette and time formatting
//!
//! ### I/O
//!
//! - [`export`]: Capture file save and load
//! - [`producer`]: Channel ingestion and a synthetic producer
//! - [`cli`]: Command-line argument parsing
//! - [`domain`]: Core domain types (Tid, TrackId, Color) and errors
//!
//! ## Typical Usage
//!
//! ```bash
//! # Record five seconds of synthetic capture and save it
//! ./timegraph --demo --duration 5 --export demo
//!
//! # Summarize a saved capture
//! ./timegraph --replay demo.orbit
//! ```
//!
//! ## Key Concepts
//!
//! - **Tick**: Raw capture clock unit, converted to time through the tick period
//! - **Depth**: Nesting level of a timer within its thread
//! - **Track**: One horizontal lane group of the timeline
//! - **Picking**: Drawing with timer identities attached so clicks resolve to timers

// Expose modules for testing
pub mod capture;
pub mod cli;
pub mod domain;
pub mod export;
pub mod instrumentation;
pub mod producer;
pub mod render;
pub mod storage;
pub mod string_manager;
pub mod time_graph;
pub mod tracks;
