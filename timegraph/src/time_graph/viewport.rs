//! Visible time window and the tick ↔ microsecond ↔ world transforms.
//!
//! ## Coordinate Spaces
//!
//! ```text
//! tick   (capture clock, u64)
//!   │  us = (tick − capture_min_tick) × tick_period_us
//!   ▼
//! us     (f64, 0 = first tick of the capture)
//!   │  x = world_start_x + (us − min_time_us) / (max_time_us − min_time_us) × world_width
//!   ▼
//! world  (f64, what draw primitives are expressed in)
//! ```
//!
//! ## Invariant
//!
//! After every mutating operation:
//! `0 ≤ min_time_us ≤ max_time_us ≤ capture_span_us`.

// Tick counts are converted to and from f64 microseconds throughout
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use super::layout::TimeGraphLayout;

/// Per-step zoom factor increment (×1.1 / ÷1.1)
const ZOOM_INCREMENT: f64 = 0.1;

/// Smallest accepted time window: one nanosecond
const MIN_TIME_WINDOW_US: f64 = 0.001;

/// Extent multiplier applied when zooming onto a range
const ZOOM_PADDING: f64 = 1.1;

/// Where a target lands when moved into view (0 = left edge, 1 = right edge)
pub const DEFAULT_MOVE_INTO_VIEW_DISTANCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityType {
    /// Non-empty intersection with the window
    PartlyVisible,
    /// Strictly inside the window
    FullyVisible,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    tick_period_us: f64,
    capture_min_tick: u64,
    capture_span_us: f64,
    min_time_us: f64,
    max_time_us: f64,
    world_start_x: f64,
    world_width: f64,
    world_top_y: f64,
    world_height: f64,
}

impl Viewport {
    /// Empty viewport over a 1000×1000 world
    ///
    /// # Panics
    ///
    /// Panics if `tick_period_us` is not strictly positive.
    #[must_use]
    pub fn new(tick_period_us: f64) -> Self {
        assert!(tick_period_us > 0.0, "Tick period must be positive, got {tick_period_us}");
        Self {
            tick_period_us,
            capture_min_tick: 0,
            capture_span_us: 0.0,
            min_time_us: 0.0,
            max_time_us: 0.0,
            world_start_x: 0.0,
            world_width: 1000.0,
            world_top_y: 0.0,
            world_height: 1000.0,
        }
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// Update the capture extent the window is clamped to
    pub fn set_capture_range(&mut self, min_tick: u64, max_tick: u64) {
        self.capture_min_tick = min_tick;
        self.capture_span_us = max_tick.saturating_sub(min_tick) as f64 * self.tick_period_us;
        self.min_time_us = self.min_time_us.clamp(0.0, self.capture_span_us);
        self.max_time_us = self.max_time_us.clamp(self.min_time_us, self.capture_span_us);
    }

    pub fn set_world(&mut self, start_x: f64, width: f64, top_y: f64, height: f64) {
        self.world_start_x = start_x;
        self.world_width = width;
        self.world_top_y = top_y;
        self.world_height = height;
    }

    pub fn set_world_top_y(&mut self, top_y: f64) {
        self.world_top_y = top_y;
    }

    #[must_use]
    pub fn tick_period_us(&self) -> f64 {
        self.tick_period_us
    }

    #[must_use]
    pub fn capture_min_tick(&self) -> u64 {
        self.capture_min_tick
    }

    #[must_use]
    pub fn capture_span_us(&self) -> f64 {
        self.capture_span_us
    }

    #[must_use]
    pub fn min_time_us(&self) -> f64 {
        self.min_time_us
    }

    #[must_use]
    pub fn max_time_us(&self) -> f64 {
        self.max_time_us
    }

    #[must_use]
    pub fn current_time_span_us(&self) -> f64 {
        self.max_time_us - self.min_time_us
    }

    #[must_use]
    pub fn world_start_x(&self) -> f64 {
        self.world_start_x
    }

    #[must_use]
    pub fn world_width(&self) -> f64 {
        self.world_width
    }

    #[must_use]
    pub fn world_top_y(&self) -> f64 {
        self.world_top_y
    }

    #[must_use]
    pub fn world_height(&self) -> f64 {
        self.world_height
    }

    /// First and last visible tick
    #[must_use]
    pub fn visible_tick_range(&self) -> (u64, u64) {
        (self.tick_from_us(self.min_time_us), self.tick_from_us(self.max_time_us))
    }

    // =========================================================================
    // TRANSFORMS
    // =========================================================================

    #[must_use]
    pub fn us_from_tick(&self, tick: u64) -> f64 {
        let delta = if tick >= self.capture_min_tick {
            (tick - self.capture_min_tick) as f64
        } else {
            -((self.capture_min_tick - tick) as f64)
        };
        delta * self.tick_period_us
    }

    #[must_use]
    pub fn tick_from_us(&self, us: f64) -> u64 {
        let ticks = (us / self.tick_period_us).round();
        if ticks >= 0.0 {
            self.capture_min_tick.saturating_add(ticks as u64)
        } else {
            self.capture_min_tick.saturating_sub((-ticks) as u64)
        }
    }

    /// World x of a tick; `world_start_x` when the window is empty
    #[must_use]
    pub fn world_from_tick(&self, tick: u64) -> f64 {
        self.world_from_us(self.us_from_tick(tick))
    }

    #[must_use]
    pub fn world_from_us(&self, us: f64) -> f64 {
        let window = self.current_time_span_us();
        if window > 0.0 {
            self.world_start_x + (us - self.min_time_us) / window * self.world_width
        } else {
            self.world_start_x
        }
    }

    #[must_use]
    pub fn tick_from_world(&self, world_x: f64) -> u64 {
        let ratio = if self.world_width == 0.0 {
            0.0
        } else {
            (world_x - self.world_start_x) / self.world_width
        };
        self.tick_from_us(self.time_from_ratio(ratio))
    }

    /// Microseconds at a fraction of the visible window
    #[must_use]
    pub fn time_from_ratio(&self, ratio: f64) -> f64 {
        self.min_time_us + ratio * self.current_time_span_us()
    }

    /// Length of a fraction of the visible window
    #[must_use]
    pub fn time_interval_us(&self, ratio: f64) -> f64 {
        ratio * self.current_time_span_us()
    }

    // =========================================================================
    // ZOOM & PAN
    // =========================================================================

    /// Show the last `history_us` of the capture
    pub fn zoom_all(&mut self, history_us: f64) {
        self.max_time_us = self.capture_span_us;
        self.min_time_us = (self.max_time_us - history_us).max(0.0);
    }

    /// Center on `[min_tick, max_tick]` with 10% padding
    pub fn zoom_ticks(&mut self, min_tick: u64, max_tick: u64) {
        let start = self.us_from_tick(min_tick);
        let end = self.us_from_tick(max_tick);
        let mid = start + (end - start) / 2.0;
        let extent = ZOOM_PADDING * (end - start) / 2.0;
        self.set_min_max(mid - extent, mid + extent);
    }

    /// Zoom anchored at `mouse_ratio` of the window. Positive `delta` widens
    /// the window by 10%, anything else narrows it.
    ///
    /// Returns false if the resulting window would be under one nanosecond.
    pub fn zoom_time(&mut self, delta: f64, mouse_ratio: f64) -> bool {
        let scale = if delta > 0.0 { 1.0 + ZOOM_INCREMENT } else { 1.0 / (1.0 + ZOOM_INCREMENT) };

        let reference_us = self.time_from_ratio(mouse_ratio);
        let time_left = (reference_us - self.min_time_us).max(0.0);
        let time_right = (self.max_time_us - reference_us).max(0.0);

        let min_us = reference_us - scale * time_left;
        let max_us = reference_us + scale * time_right;
        if max_us - min_us < MIN_TIME_WINDOW_US {
            return false;
        }

        self.set_min_max(min_us, max_us);
        true
    }

    /// Move the window to `[min_us, max_us]`, keeping its width where the
    /// capture allows it
    pub fn set_min_max(&mut self, min_us: f64, max_us: f64) {
        let (min_us, max_us) = if min_us <= max_us { (min_us, max_us) } else { (max_us, min_us) };
        let desired_window = max_us - min_us;
        self.min_time_us = min_us.clamp(0.0, self.capture_span_us);
        self.max_time_us = (self.min_time_us + desired_window).min(self.capture_span_us);
    }

    /// Drag remapping: the time under `initial_x` when the drag started
    /// (`initial_time_us`) follows the cursor to `current_x`
    pub fn pan_time(&mut self, initial_x: i32, current_x: i32, width: i32, initial_time_us: f64) {
        if width == 0 {
            return;
        }
        let window = self.current_time_span_us();
        let width = f64::from(width);
        let initial_local_time = f64::from(initial_x) / width * window;
        let dt = f64::from(current_x - initial_x) / width * window;
        let current_time = initial_time_us - dt;

        self.min_time_us =
            (current_time - initial_local_time).min(self.capture_span_us - window).max(0.0);
        self.max_time_us = (self.min_time_us + window).min(self.capture_span_us);
    }

    /// Slider positioning: `ratio` 0 shows the start of the capture, 1 its end
    pub fn on_drag(&mut self, ratio: f64) {
        let window = self.current_time_span_us();
        self.min_time_us = (ratio.clamp(0.0, 1.0) * (self.capture_span_us - window)).max(0.0);
        self.max_time_us = (self.min_time_us + window).min(self.capture_span_us);
    }

    // =========================================================================
    // VISIBILITY
    // =========================================================================

    #[must_use]
    pub fn is_fully_visible(&self, min_tick: u64, max_tick: u64) -> bool {
        let start = self.us_from_tick(min_tick);
        let end = self.us_from_tick(max_tick);
        start > self.min_time_us && end < self.max_time_us
    }

    #[must_use]
    pub fn is_partly_visible(&self, min_tick: u64, max_tick: u64) -> bool {
        let start = self.us_from_tick(min_tick);
        let end = self.us_from_tick(max_tick);
        !(self.min_time_us > end || self.max_time_us < start)
    }

    #[must_use]
    pub fn is_visible(&self, visibility: VisibilityType, min_tick: u64, max_tick: u64) -> bool {
        match visibility {
            VisibilityType::PartlyVisible => self.is_partly_visible(min_tick, max_tick),
            VisibilityType::FullyVisible => self.is_fully_visible(min_tick, max_tick),
        }
    }

    /// Pan (or zoom, if the range does not fit) just enough for the range to
    /// become visible. `distance` places the range's center within the window.
    pub fn horizontally_move_into_view(
        &mut self,
        visibility: VisibilityType,
        min_tick: u64,
        max_tick: u64,
        distance: f64,
    ) {
        if self.is_visible(visibility, min_tick, max_tick) {
            return;
        }

        let start = self.us_from_tick(min_tick);
        let end = self.us_from_tick(max_tick);
        let window = self.current_time_span_us();

        if visibility == VisibilityType::FullyVisible && window < end - start {
            self.zoom_ticks(min_tick, max_tick);
            return;
        }

        let mid = start + (end - start) / 2.0;
        // Mirror the landing position when moving left
        let distance = if start < self.min_time_us { 1.0 - distance } else { distance };
        self.set_min_max(mid - window * (1.0 - distance), mid + window * distance);
    }

    /// Scroll vertically the minimum needed for `[box_y, box_y + box_height]`
    /// to be on screen with margins. Boxes taller than the screen are
    /// aligned at their top.
    pub fn vertically_move_into_view(
        &mut self,
        box_y: f64,
        box_height: f64,
        layout: &TimeGraphLayout,
    ) {
        let max_top = box_y - layout.space_between_tracks() - layout.top_margin();
        let min_top = box_y + box_height + layout.bottom_margin() - self.world_height;
        self.world_top_y = if min_top <= max_top {
            self.world_top_y.clamp(min_top, max_top)
        } else {
            max_top
        };
    }
}
