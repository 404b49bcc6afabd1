//! GPU timeline track, one per hardware queue

use timegraph_common::TimerInfo;

use super::{draw_timer_row, DepthChains, DrawContext, TrackHeader};
use crate::render::{palette, Batcher};
use crate::time_graph::TimeGraphLayout;

/// Human label for a driver timeline name.
///
/// ```
/// use timegraph::tracks::map_gpu_timeline_to_track_label;
/// assert_eq!(map_gpu_timeline_to_track_label("gfx"), "Graphics queue");
/// assert_eq!(map_gpu_timeline_to_track_label("sdma1"), "Transfer queue");
/// assert_eq!(map_gpu_timeline_to_track_label("vcn_dec"), "vcn_dec");
/// ```
#[must_use]
pub fn map_gpu_timeline_to_track_label(timeline: &str) -> String {
    let queue = if timeline == "gfx" {
        "Graphics queue"
    } else if timeline.starts_with("sdma") {
        "Transfer queue"
    } else if timeline.starts_with("comp") {
        "Compute queue"
    } else {
        return timeline.to_string();
    };
    queue.to_string()
}

#[derive(Debug)]
pub struct GpuTrack {
    pub(crate) header: TrackHeader,
    timeline_hash: u64,
    pub(crate) chains: DepthChains,
}

impl GpuTrack {
    #[must_use]
    pub fn new(timeline_hash: u64, timeline: &str) -> Self {
        let header = TrackHeader::new(timeline, palette::color_for_string(timeline));
        header.set_label(map_gpu_timeline_to_track_label(timeline));
        Self { header, timeline_hash, chains: DepthChains::new() }
    }

    #[must_use]
    pub fn timeline_hash(&self) -> u64 {
        self.timeline_hash
    }

    pub fn on_timer(&self, timer: &TimerInfo) {
        self.chains.append(usize::from(timer.depth), *timer);
    }

    #[must_use]
    pub fn height(&self, layout: &TimeGraphLayout) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let depth = self.chains.num_rows() as f64;
        layout.track_top_margin() + depth * layout.text_box_height() + layout.track_bottom_margin()
    }

    pub(crate) fn update_primitives(&self, batcher: &mut Batcher, ctx: &DrawContext<'_>, y: f64) {
        let layout = ctx.layout;
        for (depth, chain) in self.chains.rows().iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let row_y = y + layout.track_top_margin() + depth as f64 * layout.text_box_height();
            let height = layout.text_box_height();
            draw_timer_row(batcher, ctx, &chain.snapshot(), row_y, height, |timer| {
                palette::color_for_id(timer.function_address)
            });
        }
    }
}
