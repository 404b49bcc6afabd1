//! # Tracks
//!
//! A track is one horizontal lane of the timeline. The set of track kinds is
//! closed, so dispatch goes through the [`Track`] enum rather than trait
//! objects.
//!
//! | Kind      | Keyed by            | Rows            | Content              |
//! |-----------|---------------------|-----------------|----------------------|
//! | Scheduler | singleton           | one per core    | scheduling slices    |
//! | Thread    | thread id           | one per depth   | timers + event strip |
//! | Gpu       | timeline string key | one per depth   | GPU jobs             |
//! | Graph     | metric name         | single polyline | scalar samples       |
//! | Async     | async scope name    | one per lane    | async timers         |
//!
//! Tracks are appended to by the ingestion context through `&self` and read
//! concurrently by the consumer; all shared state is either lock-free
//! (chains, atomics) or behind short `parking_lot` locks.

pub mod async_track;
pub mod depth_chains;
pub mod gpu_track;
pub mod graph_track;
pub mod scheduler_track;
pub mod thread_track;

pub use async_track::AsyncTrack;
pub use depth_chains::DepthChains;
pub use gpu_track::{map_gpu_timeline_to_track_label, GpuTrack};
pub use graph_track::{GraphSample, GraphTrack, TrackValue};
pub use scheduler_track::SchedulerTrack;
pub use thread_track::ThreadTrack;

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use timegraph_common::TimerInfo;

use crate::capture::CallstackEvent;
use crate::domain::Color;
use crate::render::batcher::{Z_VALUE_BOX_ACTIVE, Z_VALUE_BOX_INACTIVE, Z_VALUE_TEXT, Z_VALUE_TRACK};
use crate::render::{palette, Batcher, Point};
use crate::storage::{ChainSnapshot, TimerChain};
use crate::time_graph::{TimeGraphLayout, Viewport};

/// Horizontal offset of a track label from the left edge of the world
const LABEL_OFFSET_X: f64 = 5.0;

// =============================================================================
// SHARED STATE
// =============================================================================

/// Name, label and color shared by every track kind
#[derive(Debug)]
pub struct TrackHeader {
    name: RwLock<String>,
    label: RwLock<String>,
    color: AtomicU32,
}

impl TrackHeader {
    #[must_use]
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        let name = name.into();
        Self {
            label: RwLock::new(name.clone()),
            name: RwLock::new(name),
            color: AtomicU32::new(color.to_bits()),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.label.read().clone()
    }

    pub fn set_label(&self, label: impl Into<String>) {
        *self.label.write() = label.into();
    }

    #[must_use]
    pub fn color(&self) -> Color {
        Color::from_bits(self.color.load(Ordering::Relaxed))
    }

    pub fn set_color(&self, color: Color) {
        self.color.store(color.to_bits(), Ordering::Relaxed);
    }
}

/// Everything a track needs to turn its content into primitives
#[derive(Debug, Clone, Copy)]
pub struct DrawContext<'a> {
    pub viewport: &'a Viewport,
    pub layout: &'a TimeGraphLayout,
    /// Sampled callstack events in `[min_tick, max_tick]`, in time order
    pub events: &'a [CallstackEvent],
    pub selected: Option<&'a TimerInfo>,
    pub min_tick: u64,
    pub max_tick: u64,
}

// =============================================================================
// TRACK
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Scheduler,
    Thread,
    Gpu,
    Graph,
    Async,
}

#[derive(Debug)]
pub enum Track {
    Scheduler(SchedulerTrack),
    Thread(ThreadTrack),
    Gpu(GpuTrack),
    Graph(GraphTrack),
    Async(AsyncTrack),
}

impl Track {
    #[must_use]
    pub fn kind(&self) -> TrackKind {
        match self {
            Track::Scheduler(_) => TrackKind::Scheduler,
            Track::Thread(_) => TrackKind::Thread,
            Track::Gpu(_) => TrackKind::Gpu,
            Track::Graph(_) => TrackKind::Graph,
            Track::Async(_) => TrackKind::Async,
        }
    }

    #[must_use]
    pub fn header(&self) -> &TrackHeader {
        match self {
            Track::Scheduler(track) => &track.header,
            Track::Thread(track) => &track.header,
            Track::Gpu(track) => &track.header,
            Track::Graph(track) => &track.header,
            Track::Async(track) => &track.header,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.header().name()
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.header().label()
    }

    #[must_use]
    pub fn color(&self) -> Color {
        self.header().color()
    }

    #[must_use]
    pub fn as_thread(&self) -> Option<&ThreadTrack> {
        match self {
            Track::Thread(track) => Some(track),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_graph(&self) -> Option<&GraphTrack> {
        match self {
            Track::Graph(track) => Some(track),
            _ => None,
        }
    }

    /// Route a timer into the track.
    ///
    /// # Panics
    ///
    /// Graph tracks hold samples, not timers; routing a timer to one is a
    /// programming error.
    pub fn on_timer(&self, timer: &TimerInfo) {
        match self {
            Track::Scheduler(track) => track.on_timer(timer),
            Track::Thread(track) => track.on_timer(timer),
            Track::Gpu(track) => track.on_timer(timer),
            Track::Async(track) => track.on_timer(timer),
            Track::Graph(track) => {
                panic!("Timer routed to graph track \"{}\"", track.header.name());
            }
        }
    }

    /// Number of timers held (graph samples are not timers)
    #[must_use]
    pub fn num_timers(&self) -> usize {
        match self {
            Track::Graph(_) => 0,
            _ => self.chains().map_or(0, DepthChains::num_timers),
        }
    }

    /// Timers routed here but not stored
    #[must_use]
    pub fn num_dropped(&self) -> usize {
        match self {
            Track::Scheduler(track) => track.num_dropped(),
            _ => 0,
        }
    }

    /// True iff nothing was ever appended
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Track::Thread(track) => track.is_empty(),
            Track::Graph(track) => track.is_empty(),
            _ => self.num_timers() == 0,
        }
    }

    #[must_use]
    pub fn min_time(&self) -> Option<u64> {
        match self {
            Track::Graph(track) => track.min_time(),
            _ => self.chains().and_then(DepthChains::min_time),
        }
    }

    #[must_use]
    pub fn max_time(&self) -> Option<u64> {
        match self {
            Track::Graph(track) => track.max_time(),
            _ => self.chains().and_then(DepthChains::max_time),
        }
    }

    /// Number of rows stacked inside the track
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Track::Graph(_) => 1,
            _ => self.chains().map_or(0, DepthChains::num_rows),
        }
    }

    #[must_use]
    pub fn height(&self, layout: &TimeGraphLayout) -> f64 {
        match self {
            Track::Scheduler(track) => track.height(layout),
            Track::Thread(track) => track.height(layout),
            Track::Gpu(track) => track.height(layout),
            Track::Graph(track) => track.height(layout),
            Track::Async(track) => track.height(layout),
        }
    }

    /// Row storage of timer-bearing tracks
    #[must_use]
    pub fn chains(&self) -> Option<&DepthChains> {
        match self {
            Track::Scheduler(track) => Some(&track.cores),
            Track::Thread(track) => Some(&track.chains),
            Track::Gpu(track) => Some(&track.chains),
            Track::Async(track) => Some(&track.lanes),
            Track::Graph(_) => None,
        }
    }

    /// Every timer chain of the track
    #[must_use]
    pub fn timer_chains(&self) -> Vec<Arc<TimerChain>> {
        self.chains().map(|chains| chains.rows().iter().cloned().collect()).unwrap_or_default()
    }

    /// Emit the track background, label and the content visible in
    /// `[ctx.min_tick, ctx.max_tick]`, with the track's top at `y`
    pub fn update_primitives(&self, batcher: &mut Batcher, ctx: &DrawContext<'_>, y: f64) {
        let viewport = ctx.viewport;
        batcher.add_box(
            Point::new(viewport.world_start_x(), y),
            Point::new(viewport.world_width(), self.height(ctx.layout)),
            Z_VALUE_TRACK,
            palette::TRACK_BACKGROUND,
            None,
        );
        batcher.add_text(
            Point::new(viewport.world_start_x() + LABEL_OFFSET_X, y),
            Z_VALUE_TEXT,
            palette::TEXT,
            self.label(),
        );

        match self {
            Track::Scheduler(track) => track.update_primitives(batcher, ctx, y),
            Track::Thread(track) => track.update_primitives(batcher, ctx, y),
            Track::Gpu(track) => track.update_primitives(batcher, ctx, y),
            Track::Graph(track) => track.update_primitives(batcher, ctx, y),
            Track::Async(track) => track.update_primitives(batcher, ctx, y),
        }
    }

    // -------------------------------------------------------------------------
    // Navigation (thread and GPU tracks)
    // -------------------------------------------------------------------------

    fn navigable_chains(&self) -> Option<&DepthChains> {
        match self {
            Track::Thread(track) => Some(&track.chains),
            Track::Gpu(track) => Some(&track.chains),
            _ => None,
        }
    }

    #[must_use]
    pub fn left(&self, from: &TimerInfo) -> Option<TimerInfo> {
        self.navigable_chains()?.left(from)
    }

    #[must_use]
    pub fn right(&self, from: &TimerInfo) -> Option<TimerInfo> {
        self.navigable_chains()?.right(from)
    }

    #[must_use]
    pub fn up(&self, from: &TimerInfo) -> Option<TimerInfo> {
        self.navigable_chains()?.up(from)
    }

    #[must_use]
    pub fn down(&self, from: &TimerInfo) -> Option<TimerInfo> {
        self.navigable_chains()?.down(from)
    }
}

// =============================================================================
// DRAW HELPERS
// =============================================================================

/// Emit one row of timers: a box per timer at least one world unit wide,
/// otherwise a vertical line, with at most one line per world unit.
pub(crate) fn draw_timer_row(
    batcher: &mut Batcher,
    ctx: &DrawContext<'_>,
    snapshot: &ChainSnapshot<TimerInfo>,
    y: f64,
    height: f64,
    mut color_of: impl FnMut(&TimerInfo) -> Color,
) {
    let mut last_line_unit = f64::NEG_INFINITY;

    for timer in snapshot.query_range(ctx.min_tick, ctx.max_tick) {
        let is_selected = ctx.selected == Some(timer);
        let is_inactive = match ctx.selected {
            Some(selected) => !is_selected && selected.function_address != timer.function_address,
            None => false,
        };

        let color = if is_selected {
            palette::SELECTION
        } else if is_inactive {
            color_of(timer).with_alpha(palette::INACTIVE_ALPHA)
        } else {
            color_of(timer)
        };
        let z = if is_inactive { Z_VALUE_BOX_INACTIVE } else { Z_VALUE_BOX_ACTIVE };

        let x0 = ctx.viewport.world_from_tick(timer.start);
        let x1 = ctx.viewport.world_from_tick(timer.end);
        let width = x1 - x0;

        if width >= 1.0 {
            batcher.add_box(Point::new(x0, y), Point::new(width, height), z, color, Some(timer));
        } else {
            let unit = x0.floor();
            if unit == last_line_unit && !is_selected {
                continue;
            }
            last_line_unit = unit;
            batcher.add_line(Point::new(x0, y), Point::new(x0, y + height), z, color, Some(timer));
        }
    }
}
