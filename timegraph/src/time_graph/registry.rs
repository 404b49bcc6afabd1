//! # Track Registry
//!
//! Owns every track of a capture and routes incoming timers to them.
//!
//! ```text
//!                    ┌────────────── Mutex<RegistryInner> ──────────────┐
//! process_timer ───► │ arena: Vec<Arc<Track>>   (TrackId = index)       │
//!                    │ tid → id, gpu hash → id, name → id (graph/async) │
//!                    │ call counts, cores seen, capture min/max ticks   │
//!                    └──────────────────────────────────────────────────┘
//!                              │ Arc<Track> handed out
//!                              ▼
//!                    track.on_timer()   (outside the lock, lock-free append)
//! ```
//!
//! The mutex only covers registry bookkeeping. Appending to a track never
//! takes it, and it is never held while calling into the instrumentation
//! manager (whose listener creates async tracks through the registry).

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use timegraph_common::{TimerInfo, TimerType, API_EVENT_STRING};

use crate::capture::{
    Callstack, CallstackEvent, FunctionInfo, InstrumentationKind, SharedCaptureData,
};
use crate::domain::{Tid, TrackId};
use crate::instrumentation::{
    api_event_from_timer, decode_track_value, ManualInstrumentationManager,
};
use crate::string_manager::StringManager;
use crate::tracks::{
    AsyncTrack, GpuTrack, GraphTrack, SchedulerTrack, ThreadTrack, Track, TrackKind,
};

#[derive(Debug)]
struct RegistryInner {
    tracks: Vec<Arc<Track>>,
    scheduler: Option<TrackId>,
    threads: FxHashMap<i32, TrackId>,
    gpu: FxHashMap<u64, TrackId>,
    graphs: FxHashMap<String, TrackId>,
    asyncs: FxHashMap<String, TrackId>,
    thread_call_counts: FxHashMap<i32, u64>,
    cores_seen: FxHashSet<i32>,
    capture_min_tick: u64,
    capture_max_tick: u64,
}

impl Default for RegistryInner {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            scheduler: None,
            threads: FxHashMap::default(),
            gpu: FxHashMap::default(),
            graphs: FxHashMap::default(),
            asyncs: FxHashMap::default(),
            thread_call_counts: FxHashMap::default(),
            cores_seen: FxHashSet::default(),
            capture_min_tick: u64::MAX,
            capture_max_tick: 0,
        }
    }
}

impl RegistryInner {
    fn push(&mut self, track: Track) -> TrackId {
        let id = TrackId(self.tracks.len());
        log::debug!("Created {:?} track \"{}\" as {id}", track.kind(), track.name());
        self.tracks.push(Arc::new(track));
        id
    }

    fn get(&self, id: TrackId) -> Arc<Track> {
        Arc::clone(&self.tracks[id.0])
    }

    fn widen(&mut self, start: u64, end: u64) {
        self.capture_min_tick = self.capture_min_tick.min(start);
        self.capture_max_tick = self.capture_max_tick.max(end);
    }

    fn scheduler_track(&mut self) -> Arc<Track> {
        let id = match self.scheduler {
            Some(id) => id,
            None => {
                let id = self.push(Track::Scheduler(SchedulerTrack::new()));
                self.scheduler = Some(id);
                id
            }
        };
        self.get(id)
    }

    fn thread_track(&mut self, tid: i32) -> Arc<Track> {
        let id = match self.threads.get(&tid) {
            Some(&id) => id,
            None => {
                let id = self.push(Track::Thread(ThreadTrack::new(tid, String::new())));
                self.threads.insert(tid, id);
                id
            }
        };
        self.get(id)
    }

    fn gpu_track(&mut self, timeline_hash: u64, strings: &StringManager) -> Arc<Track> {
        let id = match self.gpu.get(&timeline_hash) {
            Some(&id) => id,
            None => {
                let timeline = strings
                    .get(timeline_hash)
                    .unwrap_or_else(|| format!("{timeline_hash:#x}"));
                let id = self.push(Track::Gpu(GpuTrack::new(timeline_hash, &timeline)));
                self.gpu.insert(timeline_hash, id);
                id
            }
        };
        self.get(id)
    }

    fn graph_track(&mut self, name: &str) -> Arc<Track> {
        let id = match self.graphs.get(name) {
            Some(&id) => id,
            None => {
                let id = self.push(Track::Graph(GraphTrack::new(name)));
                self.graphs.insert(name.to_string(), id);
                id
            }
        };
        self.get(id)
    }

    fn async_track(&mut self, name: &str) -> Arc<Track> {
        let id = match self.asyncs.get(name) {
            Some(&id) => id,
            None => {
                let id = self.push(Track::Async(AsyncTrack::new(name)));
                self.asyncs.insert(name.to_string(), id);
                id
            }
        };
        self.get(id)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

#[derive(Debug)]
pub struct TrackRegistry {
    inner: Mutex<RegistryInner>,
    string_manager: Arc<StringManager>,
    instrumentation: ManualInstrumentationManager,
    needs_update: AtomicBool,
}

impl TrackRegistry {
    /// New registry wired to receive completed async timers from its own
    /// instrumentation manager
    #[must_use]
    pub fn new(string_manager: Arc<StringManager>) -> Arc<Self> {
        let registry = Arc::new(Self {
            inner: Mutex::new(RegistryInner::default()),
            string_manager,
            instrumentation: ManualInstrumentationManager::new(),
            needs_update: AtomicBool::new(false),
        });

        let weak: Weak<Self> = Arc::downgrade(&registry);
        registry.instrumentation.add_async_timer_listener(move |name, timer| {
            if let Some(registry) = weak.upgrade() {
                registry.on_async_timer(name, timer);
            }
        });
        registry
    }

    #[must_use]
    pub fn string_manager(&self) -> &Arc<StringManager> {
        &self.string_manager
    }

    #[must_use]
    pub fn instrumentation(&self) -> &ManualInstrumentationManager {
        &self.instrumentation
    }

    /// Route one timer to its track(s)
    pub fn process_timer(&self, timer: &TimerInfo, function: Option<&FunctionInfo>) {
        self.inner.lock().widen(timer.start, timer.end);

        match function.map(|function| function.kind) {
            Some(InstrumentationKind::TrackValue) => self.process_value_tracking_timer(timer),
            Some(InstrumentationKind::TimerStartAsync | InstrumentationKind::TimerStopAsync) => {
                self.instrumentation.process_async_timer(timer);
            }
            _ => {}
        }

        let track = {
            let mut inner = self.inner.lock();
            if timer.timer_type == TimerType::GpuActivity {
                inner.gpu_track(timer.timeline_hash, &self.string_manager)
            } else if timer.timer_type == TimerType::CoreActivity {
                // The thread still gets a (possibly empty) track
                inner.thread_track(timer.thread_id);
                if timer.processor >= 0 {
                    inner.cores_seen.insert(timer.processor);
                }
                inner.scheduler_track()
            } else {
                *inner.thread_call_counts.entry(timer.thread_id).or_insert(0) += 1;
                inner.thread_track(timer.thread_id)
            }
        };
        track.on_timer(timer);

        self.needs_update.store(true, Ordering::Release);
    }

    fn process_value_tracking_timer(&self, timer: &TimerInfo) {
        let event = api_event_from_timer(timer);
        if event.event_type == API_EVENT_STRING {
            self.string_manager.add_if_not_present(event.value, event.name.clone());
            return;
        }

        let Some(value) = decode_track_value(&event) else {
            log::error!(
                "Unknown value tracking event type {} for \"{}\", dropping it",
                event.event_type,
                event.name
            );
            return;
        };
        let track = self.inner.lock().graph_track(&event.name);
        if let Some(graph) = track.as_graph() {
            graph.add_value(timer.start, value);
        }
    }

    fn on_async_timer(&self, name: &str, timer: &TimerInfo) {
        let track = self.inner.lock().async_track(name);
        track.on_timer(timer);
        self.needs_update.store(true, Ordering::Release);
    }

    /// Count a sampled callstack event on its thread and on the process track
    pub fn on_callstack_event(&self, event: &CallstackEvent) {
        let (thread, process) = {
            let mut inner = self.inner.lock();
            inner.widen(event.time, event.time);
            (inner.thread_track(event.thread_id), inner.thread_track(Tid::ALL_THREADS.0))
        };
        for track in [thread, process] {
            if let Some(thread) = track.as_thread() {
                thread.on_callstack_event();
            }
        }
        self.needs_update.store(true, Ordering::Release);
    }

    /// Drop every track and counter. No append may be in flight.
    pub fn clear(&self) {
        *self.inner.lock() = RegistryInner::default();
        self.instrumentation.clear();
        self.needs_update.store(true, Ordering::Release);
        log::info!("Cleared all tracks");
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Snapshot of the arena in creation order
    #[must_use]
    pub fn tracks(&self) -> Vec<(TrackId, Arc<Track>)> {
        self.inner
            .lock()
            .tracks
            .iter()
            .enumerate()
            .map(|(i, track)| (TrackId(i), Arc::clone(track)))
            .collect()
    }

    #[must_use]
    pub fn track(&self, id: TrackId) -> Option<Arc<Track>> {
        self.inner.lock().tracks.get(id.0).cloned()
    }

    #[must_use]
    pub fn thread_track(&self, tid: Tid) -> Option<Arc<Track>> {
        let inner = self.inner.lock();
        inner.threads.get(&tid.0).map(|&id| inner.get(id))
    }

    pub fn get_or_create_thread_track(&self, tid: Tid) -> Arc<Track> {
        self.inner.lock().thread_track(tid.0)
    }

    #[must_use]
    pub fn gpu_track(&self, timeline_hash: u64) -> Option<Arc<Track>> {
        let inner = self.inner.lock();
        inner.gpu.get(&timeline_hash).map(|&id| inner.get(id))
    }

    #[must_use]
    pub fn graph_track(&self, name: &str) -> Option<Arc<Track>> {
        let inner = self.inner.lock();
        inner.graphs.get(name).map(|&id| inner.get(id))
    }

    #[must_use]
    pub fn async_track(&self, name: &str) -> Option<Arc<Track>> {
        let inner = self.inner.lock();
        inner.asyncs.get(name).map(|&id| inner.get(id))
    }

    #[must_use]
    pub fn scheduler_track(&self) -> Option<Arc<Track>> {
        let inner = self.inner.lock();
        inner.scheduler.map(|id| inner.get(id))
    }

    /// Instrumented timers per thread
    #[must_use]
    pub fn thread_call_counts(&self) -> FxHashMap<i32, u64> {
        self.inner.lock().thread_call_counts.clone()
    }

    #[must_use]
    pub fn num_cores(&self) -> usize {
        self.inner.lock().cores_seen.len()
    }

    /// Timers ingested so far, dropped scheduling slices included. Async
    /// timers are derived from ingested start/stop pairs and are not counted
    /// again.
    #[must_use]
    pub fn num_timers(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .tracks
            .iter()
            .filter(|track| track.kind() != TrackKind::Async)
            .map(|track| track.num_timers() + track.num_dropped())
            .sum()
    }

    /// First and last tick seen, `None` before anything was ingested
    #[must_use]
    pub fn capture_range(&self) -> Option<(u64, u64)> {
        let inner = self.inner.lock();
        (inner.capture_min_tick <= inner.capture_max_tick)
            .then_some((inner.capture_min_tick, inner.capture_max_tick))
    }

    /// Recompute the capture range from track aggregates and `extra` bounds
    pub fn recompute_capture_range(&self, extra: Option<(u64, u64)>) {
        let mut inner = self.inner.lock();
        let mut min = u64::MAX;
        let mut max = 0;
        for track in &inner.tracks {
            if let (Some(start), Some(end)) = (track.min_time(), track.max_time()) {
                min = min.min(start);
                max = max.max(end);
            }
        }
        if let Some((start, end)) = extra {
            min = min.min(start);
            max = max.max(end);
        }
        inner.capture_min_tick = min;
        inner.capture_max_tick = max;
    }

    /// Returns whether anything changed since the last call
    pub fn take_needs_update(&self) -> bool {
        self.needs_update.swap(false, Ordering::AcqRel)
    }
}

// =============================================================================
// INGESTION HANDLE
// =============================================================================

/// Cloneable handle through which a producer feeds a capture.
///
/// Only one context may ingest at a time; the handle is `Send` so that
/// context can live on its own thread.
#[derive(Debug, Clone)]
pub struct TimerSink {
    registry: Arc<TrackRegistry>,
    capture: SharedCaptureData,
    tick_period_us: f64,
}

impl TimerSink {
    #[must_use]
    pub fn new(
        registry: Arc<TrackRegistry>,
        capture: SharedCaptureData,
        tick_period_us: f64,
    ) -> Self {
        Self { registry, capture, tick_period_us }
    }

    /// Route a timer whose function is already known
    pub fn process_timer(&self, timer: &TimerInfo, function: Option<&FunctionInfo>) {
        self.registry.process_timer(timer, function);
    }

    fn resolve_function(&self, timer: &TimerInfo) -> Option<FunctionInfo> {
        if timer.timer_type != TimerType::Function || timer.function_address == 0 {
            return None;
        }
        self.capture.read().selected_function(timer.function_address).cloned()
    }

    /// Route a live timer, resolving its function from the capture and
    /// updating the function's statistics
    pub fn ingest(&self, timer: &TimerInfo) {
        let function = self.resolve_function(timer);
        if let Some(function) = &function {
            #[allow(
                clippy::cast_precision_loss,
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss
            )]
            let duration_ns =
                (timer.elapsed_ticks() as f64 * self.tick_period_us * 1000.0).round() as u64;
            self.capture.write().update_function_stats(function, duration_ns);
        }
        self.registry.process_timer(timer, function.as_ref());
    }

    /// Route a timer of a loaded capture; statistics were saved with it
    pub fn replay(&self, timer: &TimerInfo) {
        let function = self.resolve_function(timer);
        self.registry.process_timer(timer, function.as_ref());
    }

    /// Returns true if the callstack was new
    pub fn add_unique_callstack(&self, callstack: Callstack) -> bool {
        self.capture.write().add_unique_callstack(callstack)
    }

    /// # Panics
    ///
    /// Panics if the event references a callstack never registered through
    /// [`TimerSink::add_unique_callstack`].
    pub fn add_callstack_event(&self, event: CallstackEvent) {
        self.capture.write().add_callstack_event(event);
        self.registry.on_callstack_event(&event);
    }

    pub fn set_thread_name(&self, tid: i32, name: impl Into<String>) {
        self.capture.write().set_thread_name(tid, name);
    }

    /// Bind a string key (GPU timeline names and the like)
    pub fn add_string(&self, key: u64, value: impl Into<String>) {
        self.registry.string_manager().add_if_not_present(key, value);
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TrackRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use timegraph_common::{
        encode_i32, ApiEvent, API_EVENT_SCOPE_START_ASYNC, API_EVENT_SCOPE_STOP_ASYNC,
        API_EVENT_TRACK_INT,
    };

    fn registry() -> Arc<TrackRegistry> {
        TrackRegistry::new(Arc::new(StringManager::new()))
    }

    fn function_timer(tid: i32, start: u64, end: u64) -> TimerInfo {
        TimerInfo {
            start,
            end,
            thread_id: tid,
            function_address: 0x1000,
            ..TimerInfo::default()
        }
    }

    #[test]
    fn test_slice_without_core_still_counts_as_ingested() {
        let registry = registry();
        let slice = TimerInfo {
            timer_type: TimerType::CoreActivity,
            processor: -1,
            ..function_timer(4, 5, 8)
        };
        registry.process_timer(&slice, None);
        registry.process_timer(&TimerInfo { processor: 0, ..slice }, None);

        assert_eq!(registry.num_timers(), 2);
        assert_eq!(registry.num_cores(), 1);
        let scheduler = registry.scheduler_track().expect("scheduler track");
        assert_eq!(scheduler.num_timers(), 1);
        assert_eq!(scheduler.num_dropped(), 1);
    }

    #[test]
    fn test_routing_by_timer_type() {
        let registry = registry();
        registry.process_timer(&function_timer(1, 10, 20), None);
        let slice = TimerInfo {
            timer_type: TimerType::CoreActivity,
            processor: 2,
            thread_id: 1,
            ..function_timer(1, 5, 8)
        };
        registry.process_timer(&slice, None);
        let gpu_job = TimerInfo {
            timer_type: TimerType::GpuActivity,
            timeline_hash: 77,
            ..function_timer(1, 30, 40)
        };
        registry.process_timer(&gpu_job, None);

        assert_eq!(registry.num_timers(), 3);
        assert_eq!(registry.num_cores(), 1);
        assert_eq!(registry.thread_call_counts().get(&1), Some(&1));
        assert!(registry.gpu_track(77).is_some());
        assert_eq!(registry.capture_range(), Some((5, 40)));
        assert!(registry.take_needs_update());
        assert!(!registry.take_needs_update());
    }

    #[test]
    fn test_gpu_track_named_from_string_table() {
        let strings = Arc::new(StringManager::new());
        strings.add_if_not_present(5, "gfx");
        let registry = TrackRegistry::new(strings);
        let gpu_job = TimerInfo {
            timer_type: TimerType::GpuActivity,
            timeline_hash: 5,
            ..TimerInfo::default()
        };
        registry.process_timer(&gpu_job, None);
        let track = registry.gpu_track(5).map(|track| track.label());
        assert_eq!(track.as_deref(), Some("Graphics queue"));
    }

    #[test]
    fn test_value_tracking_feeds_graph_and_thread() {
        let registry = registry();
        let function =
            FunctionInfo::new("track_hp", 0x1000, 0).with_kind(InstrumentationKind::TrackValue);
        let timer = TimerInfo {
            registers: ApiEvent::new(API_EVENT_TRACK_INT, "hp", encode_i32(42)).encode(),
            ..function_timer(3, 10, 11)
        };
        registry.process_timer(&timer, Some(&function));

        let graph = registry.graph_track("hp");
        let num_samples =
            graph.as_ref().and_then(|track| track.as_graph()).map(GraphTrack::num_samples);
        assert_eq!(num_samples, Some(1));
        assert_eq!(registry.num_timers(), 1, "the timer itself lands in the thread track");
    }

    #[test]
    fn test_string_event_bound_in_string_table() {
        let registry = registry();
        let function =
            FunctionInfo::new("track_str", 0x1000, 0).with_kind(InstrumentationKind::TrackValue);
        let timer = TimerInfo {
            registers: ApiEvent::new(API_EVENT_STRING, "map.bin", 9).encode(),
            ..function_timer(3, 10, 11)
        };
        registry.process_timer(&timer, Some(&function));
        assert_eq!(registry.string_manager().get(9).as_deref(), Some("map.bin"));
        assert!(registry.graph_track("map.bin").is_none());
    }

    #[test]
    fn test_async_pairs_create_async_track() {
        let registry = registry();
        let start_fn =
            FunctionInfo::new("start", 0x1000, 0).with_kind(InstrumentationKind::TimerStartAsync);
        let stop_fn =
            FunctionInfo::new("stop", 0x2000, 0).with_kind(InstrumentationKind::TimerStopAsync);
        let start = TimerInfo {
            registers: ApiEvent::new(API_EVENT_SCOPE_START_ASYNC, "load", 1).encode(),
            ..function_timer(3, 10, 11)
        };
        let stop = TimerInfo {
            registers: ApiEvent::new(API_EVENT_SCOPE_STOP_ASYNC, "", 1).encode(),
            ..function_timer(4, 90, 91)
        };

        registry.process_timer(&start, Some(&start_fn));
        registry.process_timer(&stop, Some(&stop_fn));

        let track = registry.async_track("load");
        assert_eq!(track.as_ref().map(|track| track.num_timers()), Some(1));
        assert_eq!(track.and_then(|track| track.max_time()), Some(91));
        assert_eq!(registry.num_timers(), 2, "derived async timers are not counted");
    }

    #[test]
    fn test_clear_resets_everything() {
        let registry = registry();
        registry.process_timer(&function_timer(1, 10, 20), None);
        registry.clear();
        assert_eq!(registry.num_timers(), 0);
        assert!(registry.tracks().is_empty());
        assert_eq!(registry.capture_range(), None);
    }
}
