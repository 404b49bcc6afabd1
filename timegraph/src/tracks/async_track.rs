//! Async track: completed async scopes packed into non-overlapping lanes

use parking_lot::Mutex;
use timegraph_common::TimerInfo;

use super::{draw_timer_row, DepthChains, DrawContext, TrackHeader};
use crate::render::{palette, Batcher};
use crate::time_graph::TimeGraphLayout;

/// Async scopes of one name. Scopes may overlap freely, so each timer is
/// placed on the first lane that is free at its start:
///
/// ```text
/// lane 0: [a.........]  [c....]
/// lane 1:     [b.............]
/// ```
#[derive(Debug)]
pub struct AsyncTrack {
    pub(crate) header: TrackHeader,
    pub(crate) lanes: DepthChains,
    lane_ends: Mutex<Vec<u64>>,
}

impl AsyncTrack {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            header: TrackHeader::new(name, palette::color_for_string(name)),
            lanes: DepthChains::new(),
            lane_ends: Mutex::new(Vec::new()),
        }
    }

    pub fn on_timer(&self, timer: &TimerInfo) {
        let lane = {
            let mut ends = self.lane_ends.lock();
            let lane = match ends.iter().position(|&end| end <= timer.start) {
                Some(lane) => lane,
                None => {
                    ends.push(0);
                    ends.len() - 1
                }
            };
            ends[lane] = timer.end;
            lane
        };
        let depth = u8::try_from(lane).unwrap_or(u8::MAX);
        self.lanes.append(lane, TimerInfo { depth, ..*timer });
    }

    #[must_use]
    pub fn num_lanes(&self) -> usize {
        self.lanes.num_rows()
    }

    #[must_use]
    pub fn height(&self, layout: &TimeGraphLayout) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let lanes = self.num_lanes() as f64;
        layout.track_top_margin() + lanes * layout.text_box_height() + layout.track_bottom_margin()
    }

    pub(crate) fn update_primitives(&self, batcher: &mut Batcher, ctx: &DrawContext<'_>, y: f64) {
        let layout = ctx.layout;
        let color = self.header.color();
        for (lane, chain) in self.lanes.rows().iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let row_y = y + layout.track_top_margin() + lane as f64 * layout.text_box_height();
            let height = layout.text_box_height();
            draw_timer_row(batcher, ctx, &chain.snapshot(), row_y, height, |_| color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(start: u64, end: u64) -> TimerInfo {
        TimerInfo { start, end, ..TimerInfo::default() }
    }

    #[test]
    fn test_overlapping_scopes_get_lanes() {
        let track = AsyncTrack::new("load");
        track.on_timer(&scope(0, 100));
        track.on_timer(&scope(40, 200));
        track.on_timer(&scope(120, 150));
        assert_eq!(track.num_lanes(), 2);

        let lane = |i: usize| -> Vec<TimerInfo> {
            let chain = track.lanes.row(i);
            chain.map(|chain| chain.snapshot().iter().copied().collect()).unwrap_or_default()
        };
        assert_eq!(lane(0), vec![scope(0, 100), scope(120, 150)]);
        assert_eq!(lane(1).iter().map(|t| t.depth).collect::<Vec<_>>(), vec![1]);
    }
}
