//! Iterator overlay: time spans between user-placed iterators
//!
//! ```text
//!  │ iter A        │ iter B            │ iter C
//!  │░░░ A to B ░░░░│▓▓▓▓ B to C ▓▓▓▓▓▓▓│
//!  │──────────── Total ────────────────│
//! ```

// World coordinates are f64, iterator counts are small
#![allow(clippy::cast_precision_loss)]

use rustc_hash::FxHashMap;
use std::time::Duration;
use timegraph_common::TimerInfo;

use super::{TimeGraphLayout, Viewport};
use crate::capture::FunctionInfo;
use crate::domain::{Color, Tid};
use crate::render::batcher::{Z_VALUE_OVERLAY, Z_VALUE_TEXT};
use crate::render::{palette, pretty_time, Batcher, Point};

const TEXT_LEFT_OFFSET: f64 = 5.0;
const SPACE_FOR_LINE: f64 = 10.0;

#[derive(Debug, Default, Clone)]
pub struct IteratorOverlay {
    timers: FxHashMap<u64, TimerInfo>,
    functions: FxHashMap<u64, FunctionInfo>,
}

fn box_color(index: usize) -> Color {
    if index % 2 == 0 {
        palette::ITERATOR_LIGHT_BLUE_GRAY
    } else {
        palette::ITERATOR_MID_BLUE_GRAY
    }
}

impl IteratorOverlay {
    /// Replace the iterators. Both maps are keyed by iterator id.
    ///
    /// # Panics
    ///
    /// Panics if an iterator has no function.
    pub fn set_data(
        &mut self,
        timers: FxHashMap<u64, TimerInfo>,
        functions: FxHashMap<u64, FunctionInfo>,
    ) {
        for id in timers.keys() {
            assert!(functions.contains_key(id), "Iterator {id} has no function");
        }
        self.timers = timers;
        self.functions = functions;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    fn function_name(&self, id: u64) -> &str {
        self.functions.get(&id).map_or("", FunctionInfo::display_name)
    }

    fn duration(viewport: &Viewport, from: &TimerInfo, to: &TimerInfo) -> String {
        let us = viewport.us_from_tick(to.start) - viewport.us_from_tick(from.start);
        pretty_time(Duration::from_secs_f64(us.max(0.0) / 1_000_000.0))
    }

    /// Emit the overlay over the whole visible world
    pub fn draw(&self, batcher: &mut Batcher, viewport: &Viewport, layout: &TimeGraphLayout) {
        if self.timers.is_empty() || batcher.picking_mode().is_picking() {
            return;
        }

        let mut iterators: Vec<(u64, &TimerInfo)> =
            self.timers.iter().map(|(&id, timer)| (id, timer)).collect();
        iterators.sort_by_key(|&(id, timer)| (timer.start, id));

        let top = viewport.world_top_y();
        let height = viewport.world_height();
        let xs: Vec<f64> =
            iterators.iter().map(|(_, timer)| viewport.world_from_tick(timer.start)).collect();

        for (&(_, timer), &x) in iterators.iter().zip(&xs) {
            batcher.add_vertical_line(
                Point::new(x, top),
                height,
                Z_VALUE_OVERLAY,
                palette::color_for_tid(Tid(timer.thread_id)),
            );
        }

        let middle = top + height / 2.0;
        let count = iterators.len();
        if count > 1 {
            let height_per_text = (height / 2.0 - layout.bottom_margin()) / (count - 1) as f64;
            for k in 1..count {
                let (id_a, from) = iterators[k - 1];
                let (id_b, to) = iterators[k];
                let label = format!("{} to {}", self.function_name(id_a), self.function_name(id_b));
                let text_y = middle + k as f64 * height_per_text;
                Self::draw_box(
                    batcher,
                    (xs[k - 1], xs[k]),
                    (top, height),
                    box_color(k - 1),
                    &format!("{label}: {}", Self::duration(viewport, from, to)),
                    text_y,
                );
            }
        }

        if count > 2 {
            let last = count - 1;
            let time = Self::duration(viewport, iterators[0].1, iterators[last].1);
            Self::draw_box(
                batcher,
                (xs[0], xs[last]),
                (top, height),
                palette::TRANSPARENT,
                &format!("Total: {time}"),
                middle,
            );
        }
    }

    fn draw_box(
        batcher: &mut Batcher,
        (x0, x1): (f64, f64),
        (top, height): (f64, f64),
        color: Color,
        text: &str,
        text_y: f64,
    ) {
        let pos = Point::new(x0, top);
        batcher.add_box(pos, Point::new(x1 - x0, height), Z_VALUE_OVERLAY, color, None);
        let text_pos = Point::new(x0 + TEXT_LEFT_OFFSET, text_y - SPACE_FOR_LINE);
        batcher.add_text(text_pos, Z_VALUE_TEXT, palette::TEXT, text);
        let line_y = text_y - SPACE_FOR_LINE / 2.0;
        let (from, to) = (Point::new(x0, line_y), Point::new(x1, line_y));
        batcher.add_line(from, to, Z_VALUE_OVERLAY, palette::TEXT, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{PickingMode, Shape};

    fn viewport() -> Viewport {
        let mut viewport = Viewport::new(1.0);
        viewport.set_capture_range(0, 1000);
        viewport.set_world(0.0, 1000.0, 0.0, 400.0);
        viewport.set_min_max(0.0, 1000.0);
        viewport
    }

    fn overlay(n: u64) -> IteratorOverlay {
        let timers = (0..n)
            .map(|id| {
                let start = 100 * (id + 1);
                (id, TimerInfo { start, end: start + 5, ..TimerInfo::default() })
            })
            .collect();
        let functions = (0..n).map(|id| (id, FunctionInfo::new(format!("f{id}"), id, 0))).collect();
        let mut overlay = IteratorOverlay::default();
        overlay.set_data(timers, functions);
        overlay
    }

    fn texts(batcher: &Batcher) -> Vec<String> {
        batcher
            .primitives()
            .iter()
            .filter_map(|p| match &p.shape {
                Shape::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_three_iterators_draw_total() {
        let mut batcher = Batcher::new(PickingMode::None);
        overlay(3).draw(&mut batcher, &viewport(), &TimeGraphLayout::default());
        let texts = texts(&batcher);
        assert_eq!(texts.len(), 3);
        assert!(texts[0].starts_with("f0 to f1: "));
        assert!(texts[1].starts_with("f1 to f2: "));
        assert!(texts[2].starts_with("Total: "));
        assert_eq!(batcher.num_boxes(), 3);
    }

    #[test]
    fn test_two_iterators_no_total() {
        let mut batcher = Batcher::new(PickingMode::None);
        overlay(2).draw(&mut batcher, &viewport(), &TimeGraphLayout::default());
        assert_eq!(texts(&batcher).len(), 1);
    }

    #[test]
    fn test_skipped_while_picking() {
        let mut batcher = Batcher::new(PickingMode::Click);
        overlay(3).draw(&mut batcher, &viewport(), &TimeGraphLayout::default());
        assert!(batcher.is_empty());
    }
}
