//! Graph track: a named scalar metric drawn as a step line

use std::sync::atomic::{AtomicU64, Ordering};

use super::{DrawContext, TrackHeader};
use crate::render::batcher::Z_VALUE_BOX_ACTIVE;
use crate::render::{palette, Batcher, Point};
use crate::storage::{BlockChain, Extent};
use crate::time_graph::TimeGraphLayout;

/// Typed value of a value-tracking event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackValue {
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl TrackValue {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            TrackValue::I32(v) => f64::from(v),
            TrackValue::I64(v) => v as f64,
            TrackValue::U32(v) => f64::from(v),
            TrackValue::U64(v) => v as f64,
            TrackValue::F32(v) => f64::from(v),
            TrackValue::F64(v) => v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphSample {
    pub tick: u64,
    pub value: TrackValue,
}

impl Extent for GraphSample {
    fn start_tick(&self) -> u64 {
        self.tick
    }

    fn end_tick(&self) -> u64 {
        self.tick
    }
}

#[derive(Debug)]
pub struct GraphTrack {
    pub(crate) header: TrackHeader,
    samples: BlockChain<GraphSample>,
    min_value: AtomicU64,
    max_value: AtomicU64,
}

impl GraphTrack {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            header: TrackHeader::new(name, palette::color_for_string(name)),
            samples: BlockChain::new(),
            min_value: AtomicU64::new(f64::INFINITY.to_bits()),
            max_value: AtomicU64::new(f64::NEG_INFINITY.to_bits()),
        }
    }

    /// Record a sample. Samples are expected in tick order.
    pub fn add_value(&self, tick: u64, value: TrackValue) {
        let v = value.as_f64();
        if v < f64::from_bits(self.min_value.load(Ordering::Relaxed)) {
            self.min_value.store(v.to_bits(), Ordering::Relaxed);
        }
        if v > f64::from_bits(self.max_value.load(Ordering::Relaxed)) {
            self.max_value.store(v.to_bits(), Ordering::Relaxed);
        }
        self.samples.append(GraphSample { tick, value });
    }

    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn samples(&self) -> Vec<GraphSample> {
        self.samples.snapshot().iter().copied().collect()
    }

    /// Smallest and largest sample value
    #[must_use]
    pub fn value_range(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        Some((
            f64::from_bits(self.min_value.load(Ordering::Relaxed)),
            f64::from_bits(self.max_value.load(Ordering::Relaxed)),
        ))
    }

    #[must_use]
    pub fn min_time(&self) -> Option<u64> {
        self.samples.snapshot().min_tick()
    }

    #[must_use]
    pub fn max_time(&self) -> Option<u64> {
        self.samples.snapshot().max_tick()
    }

    #[must_use]
    pub fn height(&self, layout: &TimeGraphLayout) -> f64 {
        layout.track_top_margin() + layout.graph_track_height() + layout.track_bottom_margin()
    }

    pub(crate) fn update_primitives(&self, batcher: &mut Batcher, ctx: &DrawContext<'_>, y: f64) {
        let Some((min, max)) = self.value_range() else {
            return;
        };
        let graph_height = ctx.layout.graph_track_height();
        let bottom = y + ctx.layout.track_top_margin() + graph_height;
        let range = max - min;
        let y_of = |value: f64| {
            let normalized = if range > 0.0 { (value - min) / range } else { 0.5 };
            bottom - normalized * graph_height
        };

        let snapshot = self.samples.snapshot();
        // The step entering the window starts at the last sample before it
        let entering = snapshot.nearest_before(ctx.min_tick, |_| true);
        let mut previous: Option<Point> = None;
        for sample in entering.into_iter().chain(snapshot.query_range(ctx.min_tick, ctx.max_tick)) {
            let point = Point::new(
                ctx.viewport.world_from_tick(sample.tick),
                y_of(sample.value.as_f64()),
            );
            if let Some(prev) = previous {
                let corner = Point::new(point.x, prev.y);
                batcher.add_line(prev, corner, Z_VALUE_BOX_ACTIVE, palette::GRAPH_LINE, None);
                batcher.add_line(corner, point, Z_VALUE_BOX_ACTIVE, palette::GRAPH_LINE, None);
            }
            previous = Some(point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::batcher::PickingMode;
    use crate::time_graph::Viewport;

    #[test]
    fn test_value_range_tracks_extremes() {
        let track = GraphTrack::new("fps");
        assert_eq!(track.value_range(), None);
        track.add_value(10, TrackValue::I32(-4));
        track.add_value(20, TrackValue::F64(60.5));
        track.add_value(30, TrackValue::U64(12));
        assert_eq!(track.value_range(), Some((-4.0, 60.5)));
        assert_eq!(track.num_samples(), 3);
        assert_eq!(track.min_time(), Some(10));
        assert_eq!(track.max_time(), Some(30));
    }

    #[test]
    fn test_as_f64() {
        assert!((TrackValue::F32(1.5).as_f64() - 1.5).abs() < f64::EPSILON);
        assert!((TrackValue::I64(-9).as_f64() + 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_step_line_enters_from_sample_before_window() {
        let mut viewport = Viewport::new(1.0);
        viewport.set_capture_range(0, 1000);
        viewport.set_world(0.0, 1000.0, 0.0, 500.0);
        viewport.set_min_max(100.0, 1000.0);
        let layout = TimeGraphLayout::default();
        let ctx = DrawContext {
            viewport: &viewport,
            layout: &layout,
            events: &[],
            selected: None,
            min_tick: 100,
            max_tick: 1000,
        };

        let track = GraphTrack::new("fps");
        track.add_value(10, TrackValue::I32(0));
        track.add_value(500, TrackValue::I32(10));

        let mut batcher = Batcher::new(PickingMode::None);
        track.update_primitives(&mut batcher, &ctx, 0.0);
        assert_eq!(batcher.num_lines(), 2);
    }
}
