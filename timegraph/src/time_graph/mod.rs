//! # Time Graph
//!
//! The timeline engine of one capture: it owns the tracks (through the
//! [`TrackRegistry`]), the visible time window ([`Viewport`]) and the
//! vertical layout, and turns them into draw primitives on demand.
//!
//! ## Data Flow
//!
//! ```text
//! producer thread                      consumer (UI) thread
//! ───────────────                      ────────────────────
//! TimerSink::ingest ──► TrackRegistry ◄── TimeGraph::update_primitives
//!        │                 │ tracks          │ sort + layout
//!        ▼                 ▼                 ▼
//!   CaptureData       lock-free chains    Batcher (boxes, lines, text)
//! ```
//!
//! ## Sub-Modules
//!
//! - `viewport` - Time window, coordinate transforms, zoom and pan
//! - `layout` - Vertical sizes and vertical zoom scale
//! - `registry` - Track arena, timer routing, ingestion handle
//! - `sort` - Track ordering and thread filter
//! - `navigation` - Jumping between timers
//! - `overlay` - Iterator overlay

pub mod config;
pub mod layout;
pub mod navigation;
pub mod overlay;
pub mod registry;
pub mod sort;
pub mod viewport;

pub use config::TimeGraphConfig;
pub use layout::TimeGraphLayout;
pub use navigation::{JumpDirection, JumpScope};
pub use overlay::IteratorOverlay;
pub use registry::{TimerSink, TrackRegistry};
pub use viewport::{VisibilityType, Viewport, DEFAULT_MOVE_INTO_VIEW_DISTANCE};

use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Instant;
use timegraph_common::TimerInfo;

use crate::capture::{CallstackEvent, FunctionInfo, SharedCaptureData};
use crate::domain::{Tid, TrackId};
use crate::render::{Batcher, PickingMode};
use crate::string_manager::StringManager;
use crate::tracks::{DrawContext, Track, TrackKind};

/// Per-step vertical zoom factor increment
const VERTICAL_ZOOM_INCREMENT: f64 = 0.1;

/// A sorted track with its vertical placement
#[derive(Debug, Clone)]
pub struct LaidOutTrack {
    pub id: TrackId,
    pub track: Arc<Track>,
    pub y: f64,
    pub height: f64,
}

#[derive(Debug)]
pub struct TimeGraph {
    config: TimeGraphConfig,
    registry: Arc<TrackRegistry>,
    capture: SharedCaptureData,
    viewport: Viewport,
    layout: TimeGraphLayout,

    // Sorting
    sorted_tracks: Vec<LaidOutTrack>,
    thread_filter: String,
    last_sort: Option<Instant>,
    capturing: bool,
    total_height: f64,

    // Selection
    selected_callstack_events: FxHashMap<i32, Vec<CallstackEvent>>,
    selected_timer: Option<TimerInfo>,
    overlay: IteratorOverlay,

    batcher: Batcher,
    needs_redraw: bool,
}

impl TimeGraph {
    #[must_use]
    pub fn new(config: TimeGraphConfig, capture: SharedCaptureData) -> Self {
        Self::with_string_manager(config, capture, Arc::new(StringManager::new()))
    }

    /// Time graph resolving string keys through an existing table
    #[must_use]
    pub fn with_string_manager(
        config: TimeGraphConfig,
        capture: SharedCaptureData,
        strings: Arc<StringManager>,
    ) -> Self {
        Self {
            registry: TrackRegistry::new(strings),
            viewport: Viewport::new(config.tick_period_us),
            layout: config.layout.clone(),
            config,
            capture,
            sorted_tracks: Vec::new(),
            thread_filter: String::new(),
            last_sort: None,
            capturing: false,
            total_height: 0.0,
            selected_callstack_events: FxHashMap::default(),
            selected_timer: None,
            overlay: IteratorOverlay::default(),
            batcher: Batcher::default(),
            needs_redraw: true,
        }
    }

    /// Ingestion handle for the producer context
    #[must_use]
    pub fn sink(&self) -> TimerSink {
        TimerSink::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.capture),
            self.config.tick_period_us,
        )
    }

    pub fn process_timer(&self, timer: &TimerInfo, function: Option<&FunctionInfo>) {
        self.registry.process_timer(timer, function);
    }

    #[must_use]
    pub fn config(&self) -> &TimeGraphConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TrackRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn capture(&self) -> &SharedCaptureData {
        &self.capture
    }

    #[must_use]
    pub fn string_manager(&self) -> &Arc<StringManager> {
        self.registry.string_manager()
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn layout(&self) -> &TimeGraphLayout {
        &self.layout
    }

    /// Drop all tracks and selections. No ingestion may be in flight.
    pub fn clear(&mut self) {
        self.registry.clear();
        self.sorted_tracks.clear();
        self.selected_callstack_events.clear();
        self.selected_timer = None;
        self.overlay = IteratorOverlay::default();
        self.viewport.set_capture_range(0, 0);
        self.last_sort = None;
        self.total_height = 0.0;
        self.needs_redraw = true;
    }

    #[must_use]
    pub fn num_timers(&self) -> usize {
        self.registry.num_timers()
    }

    #[must_use]
    pub fn num_cores(&self) -> usize {
        self.registry.num_cores()
    }

    /// Returns whether anything changed since the last call
    pub fn take_needs_update(&mut self) -> bool {
        let ingested = self.registry.take_needs_update();
        std::mem::take(&mut self.needs_redraw) || ingested
    }

    /// Every timer ingested so far, in start order
    #[must_use]
    pub fn ingested_timers(&self) -> Vec<TimerInfo> {
        let mut timers: Vec<TimerInfo> = self
            .registry
            .tracks()
            .into_iter()
            .filter(|(_, track)| track.kind() != TrackKind::Async)
            .flat_map(|(_, track)| track.timer_chains())
            .flat_map(|chain| chain.snapshot().iter().copied().collect::<Vec<_>>())
            .collect();
        timers.sort_by_key(|timer| (timer.start, timer.end));
        timers
    }

    // =========================================================================
    // CAPTURE RANGE
    // =========================================================================

    /// First and last tick of the capture
    #[must_use]
    pub fn capture_range(&self) -> Option<(u64, u64)> {
        self.registry.capture_range()
    }

    fn refresh_capture_range(&mut self) {
        if let Some((min, max)) = self.registry.capture_range() {
            self.viewport.set_capture_range(min, max);
        }
    }

    /// Recompute the capture range by scanning every track and the sampled
    /// callstack events
    pub fn update_capture_min_max_timestamps(&mut self) {
        let extra = {
            let capture = self.capture.read();
            let callstacks = capture.callstack_data();
            callstacks.min_time().zip(callstacks.max_time())
        };
        self.registry.recompute_capture_range(extra);
        self.refresh_capture_range();
    }

    // =========================================================================
    // ZOOM & PAN
    // =========================================================================

    pub fn set_world(&mut self, start_x: f64, width: f64, top_y: f64, height: f64) {
        self.viewport.set_world(start_x, width, top_y, height);
        self.needs_redraw = true;
    }

    /// Show the last `history_seconds` of the capture
    pub fn zoom_all(&mut self) {
        self.update_capture_min_max_timestamps();
        self.viewport.zoom_all(self.config.history_us());
        self.needs_redraw = true;
    }

    /// Center on a timer with some padding
    pub fn zoom(&mut self, timer: &TimerInfo) {
        self.zoom_ticks(timer.start, timer.end);
    }

    pub fn zoom_ticks(&mut self, min_tick: u64, max_tick: u64) {
        self.refresh_capture_range();
        self.viewport.zoom_ticks(min_tick, max_tick);
        self.needs_redraw = true;
    }

    /// Mouse-wheel zoom; returns false if the window would get too small
    pub fn zoom_time(&mut self, delta: f64, mouse_ratio: f64) -> bool {
        self.refresh_capture_range();
        let zoomed = self.viewport.zoom_time(delta, mouse_ratio);
        self.needs_redraw |= zoomed;
        zoomed
    }

    pub fn set_min_max(&mut self, min_us: f64, max_us: f64) {
        self.refresh_capture_range();
        self.viewport.set_min_max(min_us, max_us);
        self.needs_redraw = true;
    }

    pub fn pan_time(&mut self, initial_x: i32, current_x: i32, width: i32, initial_time_us: f64) {
        self.refresh_capture_range();
        self.viewport.pan_time(initial_x, current_x, width, initial_time_us);
        self.needs_redraw = true;
    }

    pub fn on_drag(&mut self, ratio: f64) {
        self.refresh_capture_range();
        self.viewport.on_drag(ratio);
        self.needs_redraw = true;
    }

    /// Scale the layout around the mouse. `mouse_relative_position` is 0 at
    /// the top of the screen and 1 at the bottom.
    pub fn vertical_zoom(&mut self, delta: f64, mouse_relative_position: f64) {
        let ratio = if delta > 0.0 {
            1.0 + VERTICAL_ZOOM_INCREMENT
        } else {
            1.0 / (1.0 + VERTICAL_ZOOM_INCREMENT)
        };

        let height = self.viewport.world_height();
        let top = self.viewport.world_top_y();
        let mouse_y = top + mouse_relative_position * height;
        let new_top = mouse_y / ratio - (mouse_y - top);

        let lower = -1.5 * self.layout.slider_width();
        let upper = (self.total_height - height).max(lower);
        self.viewport.set_world_top_y(new_top.clamp(lower, upper));

        self.layout.set_scale(self.layout.scale() / ratio);
        self.layout_tracks();
        self.needs_redraw = true;
    }

    // =========================================================================
    // TRANSFORMS
    // =========================================================================

    #[must_use]
    pub fn us_from_tick(&self, tick: u64) -> f64 {
        self.viewport.us_from_tick(tick)
    }

    #[must_use]
    pub fn tick_from_us(&self, us: f64) -> u64 {
        self.viewport.tick_from_us(us)
    }

    #[must_use]
    pub fn world_from_tick(&self, tick: u64) -> f64 {
        self.viewport.world_from_tick(tick)
    }

    #[must_use]
    pub fn tick_from_world(&self, world_x: f64) -> u64 {
        self.viewport.tick_from_world(world_x)
    }

    // =========================================================================
    // SORTING & LAYOUT
    // =========================================================================

    pub fn set_thread_filter(&mut self, filter: &str) {
        filter.clone_into(&mut self.thread_filter);
        self.last_sort = None;
        self.needs_redraw = true;
    }

    #[must_use]
    pub fn thread_filter(&self) -> &str {
        &self.thread_filter
    }

    /// While capturing, tracks are re-sorted at most once per resort interval
    pub fn set_capturing(&mut self, capturing: bool) {
        self.capturing = capturing;
    }

    /// Recompute the track order, labels and placement
    pub fn sort_tracks(&mut self) {
        if self.capturing
            && self.last_sort.is_some_and(|last| last.elapsed() < self.config.resort_interval)
        {
            return;
        }
        self.last_sort = Some(Instant::now());

        let ordered = {
            let capture = self.capture.read();
            let event_counts: FxHashMap<i32, usize> =
                capture.callstack_data().callstack_events_counts_per_tid().collect();

            // Every sampled thread and the process itself get a track
            self.registry.get_or_create_thread_track(Tid::ALL_THREADS);
            for &tid in event_counts.keys() {
                self.registry.get_or_create_thread_track(Tid(tid));
            }

            let num_cores = self.registry.num_cores();
            let mut scheduler = None;
            let mut process = None;
            let mut gpu = Vec::new();
            let mut graphs = Vec::new();
            let mut asyncs = Vec::new();
            let mut threads: FxHashMap<Tid, (TrackId, Arc<Track>)> = FxHashMap::default();

            for (id, track) in self.registry.tracks() {
                match &*track {
                    Track::Scheduler(_) => {
                        track.header().set_label(format!("Scheduler ({num_cores} cores)"));
                        scheduler = Some((id, track));
                    }
                    Track::Gpu(_) => gpu.push((id, track)),
                    Track::Graph(_) => graphs.push((id, track)),
                    Track::Async(_) => asyncs.push((id, track)),
                    Track::Thread(thread) => {
                        let tid = thread.tid();
                        if tid.is_all_threads() {
                            thread.header.set_name(capture.process_name());
                            thread
                                .header
                                .set_label(format!("{} (all threads)", capture.process_name()));
                            process = Some((id, track));
                        } else {
                            let name = capture.thread_name(tid.0);
                            thread.header.set_name(name);
                            thread.header.set_label(format!("{name} [{}]", tid.0));
                            threads.insert(tid, (id, track));
                        }
                    }
                }
            }

            let tokens = sort::filter_tokens(&self.thread_filter);
            let thread_order =
                sort::sorted_thread_ids(&self.registry.thread_call_counts(), &event_counts);

            let mut ordered: Vec<(TrackId, Arc<Track>)> = Vec::new();
            ordered.extend(scheduler);
            ordered.extend(gpu);
            ordered.extend(graphs);
            ordered.extend(asyncs);
            ordered.extend(process);
            ordered.retain(|(_, track)| !track.is_empty());
            ordered.extend(
                thread_order
                    .into_iter()
                    .filter_map(|tid| threads.remove(&tid))
                    .filter(|(_, track)| {
                        !track.is_empty() && sort::matches_filter(&track.name(), &tokens)
                    }),
            );
            ordered
        };

        log::debug!("Sorted {} tracks", ordered.len());
        self.sorted_tracks = ordered
            .into_iter()
            .map(|(id, track)| LaidOutTrack { id, track, y: 0.0, height: 0.0 })
            .collect();
        self.layout_tracks();
    }

    /// Stack the sorted tracks top to bottom
    fn layout_tracks(&mut self) {
        let mut y = self.layout.scheduler_track_offset();
        for laid_out in &mut self.sorted_tracks {
            laid_out.y = y;
            laid_out.height = laid_out.track.height(&self.layout);
            y += laid_out.height + self.layout.space_between_tracks();
        }
        self.total_height = y;
    }

    #[must_use]
    pub fn sorted_tracks(&self) -> &[LaidOutTrack] {
        &self.sorted_tracks
    }

    /// Height of all stacked tracks
    #[must_use]
    pub fn total_height(&self) -> f64 {
        self.total_height
    }

    // =========================================================================
    // DRAWING
    // =========================================================================

    /// Rebuild the primitives of the visible tracks
    pub fn update_primitives(&mut self, picking_mode: PickingMode) {
        self.refresh_capture_range();
        self.sort_tracks();
        self.layout_tracks();
        self.batcher.start_new_frame(picking_mode);

        let (min_tick, max_tick) = self.viewport.visible_tick_range();
        // Copied out so the producer can keep writing while tracks draw
        let events = self
            .capture
            .read()
            .callstack_data()
            .events_in_range(min_tick, max_tick.saturating_add(1))
            .to_vec();
        let ctx = DrawContext {
            viewport: &self.viewport,
            layout: &self.layout,
            events: &events,
            selected: self.selected_timer.as_ref(),
            min_tick,
            max_tick,
        };

        let top = self.viewport.world_top_y();
        let bottom = top + self.viewport.world_height();
        for laid_out in &self.sorted_tracks {
            if laid_out.y + laid_out.height < top || laid_out.y > bottom {
                continue;
            }
            laid_out.track.update_primitives(&mut self.batcher, &ctx, laid_out.y);
        }

        self.overlay.draw(&mut self.batcher, &self.viewport, &self.layout);
    }

    /// Rebuild and return the current frame
    pub fn draw(&mut self, picking_mode: PickingMode) -> &Batcher {
        self.update_primitives(picking_mode);
        &self.batcher
    }

    #[must_use]
    pub fn batcher(&self) -> &Batcher {
        &self.batcher
    }

    /// Timer drawn under a world position
    pub fn pick_timer(&mut self, world_x: f64, world_y: f64) -> Option<TimerInfo> {
        self.update_primitives(PickingMode::Click);
        self.batcher.pick(world_x, world_y).copied()
    }

    pub fn set_iterator_overlay_data(
        &mut self,
        timers: FxHashMap<u64, TimerInfo>,
        functions: FxHashMap<u64, FunctionInfo>,
    ) {
        self.overlay.set_data(timers, functions);
        self.needs_redraw = true;
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Callstack events between two world x positions (either order).
    ///
    /// Replaces the previous selection. Every event is cached under its own
    /// thread and under the all-threads bucket.
    pub fn select_events(
        &mut self,
        world_x0: f64,
        world_x1: f64,
        tid: Tid,
    ) -> Vec<CallstackEvent> {
        let (x0, x1) = if world_x0 <= world_x1 {
            (world_x0, world_x1)
        } else {
            (world_x1, world_x0)
        };
        let t0 = self.viewport.tick_from_world(x0);
        let t1 = self.viewport.tick_from_world(x1);

        let events = {
            let capture = self.capture.read();
            if tid.is_all_threads() {
                capture.callstack_events_in_time_range(t0, t1)
            } else {
                capture.callstack_events_of_tid_in_time_range(tid.0, t0, t1)
            }
        };

        self.selected_callstack_events.clear();
        for event in &events {
            if event.thread_id != Tid::ALL_THREADS.0 {
                self.selected_callstack_events
                    .entry(event.thread_id)
                    .or_default()
                    .push(*event);
            }
            self.selected_callstack_events
                .entry(Tid::ALL_THREADS.0)
                .or_default()
                .push(*event);
        }
        self.needs_redraw = true;
        events
    }

    /// Events of the last selection cached for `tid`
    #[must_use]
    pub fn selected_callstack_events(&self, tid: Tid) -> &[CallstackEvent] {
        self.selected_callstack_events.get(&tid.0).map_or(&[][..], Vec::as_slice)
    }

    #[must_use]
    pub fn selected_timer(&self) -> Option<&TimerInfo> {
        self.selected_timer.as_ref()
    }

    /// Select a timer (or clear the selection) and scroll it into view
    pub fn select(&mut self, timer: Option<&TimerInfo>) {
        self.selected_timer = timer.copied();
        if let Some(timer) = timer {
            self.horizontally_move_into_view(
                VisibilityType::PartlyVisible,
                timer.start,
                timer.end,
                DEFAULT_MOVE_INTO_VIEW_DISTANCE,
            );
            self.vertically_move_into_view(timer);
        }
        self.needs_redraw = true;
    }

    pub fn select_and_zoom(&mut self, timer: &TimerInfo) {
        self.zoom(timer);
        self.select(Some(timer));
    }

    // =========================================================================
    // VISIBILITY
    // =========================================================================

    #[must_use]
    pub fn is_fully_visible(&self, min_tick: u64, max_tick: u64) -> bool {
        self.viewport.is_fully_visible(min_tick, max_tick)
    }

    #[must_use]
    pub fn is_partly_visible(&self, min_tick: u64, max_tick: u64) -> bool {
        self.viewport.is_partly_visible(min_tick, max_tick)
    }

    #[must_use]
    pub fn is_visible(&self, visibility: VisibilityType, min_tick: u64, max_tick: u64) -> bool {
        self.viewport.is_visible(visibility, min_tick, max_tick)
    }

    pub fn horizontally_move_into_view(
        &mut self,
        visibility: VisibilityType,
        min_tick: u64,
        max_tick: u64,
        distance: f64,
    ) {
        self.refresh_capture_range();
        self.viewport.horizontally_move_into_view(visibility, min_tick, max_tick, distance);
        self.needs_redraw = true;
    }

    /// Scroll so the row of `timer` is on screen
    pub fn vertically_move_into_view(&mut self, timer: &TimerInfo) {
        let Some(track) = self.track_of(timer) else {
            return;
        };
        self.layout_tracks();
        let Some(laid_out) =
            self.sorted_tracks.iter().find(|laid_out| Arc::ptr_eq(&laid_out.track, &track))
        else {
            return;
        };

        let box_y = match laid_out.track.as_thread() {
            Some(thread) => thread.y_from_depth(laid_out.y, timer.depth, &self.layout),
            None => {
                laid_out.y
                    + self.layout.track_top_margin()
                    + f64::from(timer.depth) * self.layout.text_box_height()
            }
        };
        self.viewport.vertically_move_into_view(box_y, self.layout.text_box_height(), &self.layout);
        self.needs_redraw = true;
    }
}

