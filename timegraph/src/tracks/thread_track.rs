//! Per-thread track: an event strip on top, one timer row per depth below

use std::sync::atomic::{AtomicUsize, Ordering};
use timegraph_common::{TimerInfo, TimerType};

use super::{draw_timer_row, DepthChains, DrawContext, TrackHeader};
use crate::domain::Tid;
use crate::render::batcher::Z_VALUE_EVENT;
use crate::render::{palette, Batcher, Point};
use crate::time_graph::TimeGraphLayout;

#[derive(Debug)]
pub struct ThreadTrack {
    pub(crate) header: TrackHeader,
    tid: Tid,
    pub(crate) chains: DepthChains,
    num_events: AtomicUsize,
}

impl ThreadTrack {
    #[must_use]
    pub fn new(tid: impl Into<Tid>, name: impl Into<String>) -> Self {
        let tid = tid.into();
        Self {
            header: TrackHeader::new(name, palette::color_for_tid(tid)),
            tid,
            chains: DepthChains::new(),
            num_events: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn on_timer(&self, timer: &TimerInfo) {
        if timer.timer_type == TimerType::Introspection {
            self.header.set_color(palette::INTROSPECTION_GREEN);
        }
        self.chains.append(usize::from(timer.depth), *timer);
    }

    /// Count a sampled callstack event landing on this thread
    pub fn on_callstack_event(&self) {
        self.num_events.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn num_events(&self) -> usize {
        self.num_events.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.num_timers() == 0 && self.num_events() == 0
    }

    #[must_use]
    pub fn height(&self, layout: &TimeGraphLayout) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let depth = self.chains.num_rows() as f64;
        layout.track_top_margin()
            + layout.event_track_height()
            + layout.space_between_tracks_and_thread()
            + depth * layout.text_box_height()
            + layout.track_bottom_margin()
    }

    /// Top of the timer row at `depth`, for a track whose top is at `y`
    #[must_use]
    pub fn y_from_depth(&self, y: f64, depth: u8, layout: &TimeGraphLayout) -> f64 {
        y + layout.track_top_margin()
            + layout.event_track_height()
            + layout.space_between_tracks_and_thread()
            + f64::from(depth) * layout.text_box_height()
    }

    pub(crate) fn update_primitives(&self, batcher: &mut Batcher, ctx: &DrawContext<'_>, y: f64) {
        let layout = ctx.layout;
        let event_y = y + layout.track_top_margin();
        let all_threads = self.tid.is_all_threads();
        for event in ctx
            .events
            .iter()
            .filter(|event| all_threads || event.thread_id == self.tid.0)
        {
            let x = ctx.viewport.world_from_tick(event.time);
            batcher.add_vertical_line(
                Point::new(x, event_y),
                layout.event_track_height(),
                Z_VALUE_EVENT,
                palette::EVENT,
            );
        }

        let color = self.header.color();
        for (depth, chain) in self.chains.rows().iter().enumerate() {
            let depth = u8::try_from(depth).unwrap_or(u8::MAX);
            let row_y = self.y_from_depth(y, depth, layout);
            let height = layout.text_box_height();
            draw_timer_row(batcher, ctx, &chain.snapshot(), row_y, height, |timer| {
                if timer.timer_type == TimerType::Introspection {
                    palette::INTROSPECTION_GREEN
                } else {
                    color
                }
            });
        }
    }
}
