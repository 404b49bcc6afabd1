//! Scheduler track: one row per core, slices colored by thread

use std::sync::atomic::{AtomicUsize, Ordering};
use timegraph_common::TimerInfo;

use super::{draw_timer_row, DepthChains, DrawContext, TrackHeader};
use crate::domain::Tid;
use crate::render::{palette, Batcher};
use crate::time_graph::TimeGraphLayout;

#[derive(Debug)]
pub struct SchedulerTrack {
    pub(crate) header: TrackHeader,
    pub(crate) cores: DepthChains,
    num_dropped: AtomicUsize,
}

impl Default for SchedulerTrack {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerTrack {
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: TrackHeader::new("Scheduler", palette::SCHEDULER_TRACK),
            cores: DepthChains::new(),
            num_dropped: AtomicUsize::new(0),
        }
    }

    /// Slices are keyed by `processor`; slices without a core are dropped
    /// and counted in [`Self::num_dropped`]
    pub fn on_timer(&self, timer: &TimerInfo) {
        match usize::try_from(timer.processor) {
            Ok(core) => self.cores.append(core, *timer),
            Err(_) => {
                self.num_dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Scheduling slice of thread {} without a core, dropping it",
                    timer.thread_id
                );
            }
        }
    }

    #[must_use]
    pub fn num_dropped(&self) -> usize {
        self.num_dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn num_cores(&self) -> usize {
        self.cores.num_rows()
    }

    #[must_use]
    pub fn height(&self, layout: &TimeGraphLayout) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let cores = self.num_cores() as f64;
        layout.track_top_margin()
            + cores * (layout.core_height() + layout.space_between_cores())
            + layout.track_bottom_margin()
    }

    pub(crate) fn update_primitives(&self, batcher: &mut Batcher, ctx: &DrawContext<'_>, y: f64) {
        let layout = ctx.layout;
        let row_height = layout.core_height() + layout.space_between_cores();
        for (core, chain) in self.cores.rows().iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let row_y = y + layout.track_top_margin() + core as f64 * row_height;
            draw_timer_row(batcher, ctx, &chain.snapshot(), row_y, layout.core_height(), |timer| {
                palette::color_for_tid(Tid(timer.thread_id))
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timegraph_common::TimerType;

    fn slice(processor: i32, start: u64) -> TimerInfo {
        TimerInfo {
            start,
            end: start + 5,
            processor,
            timer_type: TimerType::CoreActivity,
            ..TimerInfo::default()
        }
    }

    #[test]
    fn test_rows_per_core() {
        let track = SchedulerTrack::new();
        track.on_timer(&slice(0, 0));
        track.on_timer(&slice(3, 10));
        track.on_timer(&slice(3, 20));
        assert_eq!(track.num_cores(), 4);
        assert_eq!(track.cores.num_timers(), 3);
    }

    #[test]
    fn test_negative_core_dropped() {
        let track = SchedulerTrack::new();
        track.on_timer(&slice(-1, 0));
        track.on_timer(&slice(1, 10));
        assert_eq!(track.cores.num_timers(), 1);
        assert_eq!(track.num_dropped(), 1);
    }
}
