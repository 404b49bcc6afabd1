//! Deduplicated callstacks and the time-ordered callstack event index.
//!
//! ## Index Layout
//!
//! ```text
//! unique_callstacks: hash → Callstack        (content-addressed, insert once)
//! events:            [CallstackEvent]         (sorted by time, all threads)
//! events_by_tid:     tid → [CallstackEvent]   (sorted by time, per thread)
//! ```
//!
//! Range queries binary-search the sorted vectors: O(log n + k).
//! Hash collisions between distinct frame sequences are not detected; the
//! first callstack registered under a hash wins.

use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Immutable sequence of return addresses, innermost first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callstack {
    frames: Vec<u64>,
    hash: u64,
}

impl Callstack {
    #[must_use]
    pub fn new(frames: Vec<u64>) -> Self {
        let hash = Self::hash_frames(&frames);
        Self { frames, hash }
    }

    /// Content hash used as the callstack's identity
    #[must_use]
    pub fn hash_frames(frames: &[u64]) -> u64 {
        let mut hasher = FxHasher::default();
        frames.hash(&mut hasher);
        hasher.finish()
    }

    #[must_use]
    pub fn frames(&self) -> &[u64] {
        &self.frames
    }

    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// One sample: a thread was observed in a callstack at a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallstackEvent {
    pub time: u64,
    pub callstack_hash: u64,
    pub thread_id: i32,
}

#[derive(Debug, Default)]
pub struct CallstackData {
    unique_callstacks: FxHashMap<u64, Arc<Callstack>>,
    events: Vec<CallstackEvent>,
    events_by_tid: FxHashMap<i32, Vec<CallstackEvent>>,
    min_time: Option<u64>,
    max_time: Option<u64>,
}

impl CallstackData {
    /// Register a callstack; no-op if its hash is already known
    pub fn add_unique_callstack(&mut self, callstack: Callstack) -> bool {
        if self.unique_callstacks.contains_key(&callstack.hash()) {
            return false;
        }
        self.unique_callstacks.insert(callstack.hash(), Arc::new(callstack));
        true
    }

    /// Index one event.
    ///
    /// # Panics
    ///
    /// Panics if the event references a callstack that was never registered.
    pub fn add_callstack_event(&mut self, event: CallstackEvent) {
        assert!(
            self.unique_callstacks.contains_key(&event.callstack_hash),
            "Callstack event at tick {} references unregistered callstack {:#x}",
            event.time,
            event.callstack_hash
        );

        insert_sorted(&mut self.events, event);
        insert_sorted(self.events_by_tid.entry(event.thread_id).or_default(), event);

        self.min_time = Some(self.min_time.map_or(event.time, |t| t.min(event.time)));
        self.max_time = Some(self.max_time.map_or(event.time, |t| t.max(event.time)));
    }

    #[must_use]
    pub fn has_callstack(&self, hash: u64) -> bool {
        self.unique_callstacks.contains_key(&hash)
    }

    #[must_use]
    pub fn callstack(&self, hash: u64) -> Option<&Arc<Callstack>> {
        self.unique_callstacks.get(&hash)
    }

    pub fn unique_callstacks(&self) -> impl Iterator<Item = &Arc<Callstack>> {
        self.unique_callstacks.values()
    }

    #[must_use]
    pub fn num_unique_callstacks(&self) -> usize {
        self.unique_callstacks.len()
    }

    /// All events, ordered by time
    #[must_use]
    pub fn events(&self) -> &[CallstackEvent] {
        &self.events
    }

    #[must_use]
    pub fn callstack_events_count(&self) -> usize {
        self.events.len()
    }

    /// Event count for every thread that has at least one event
    pub fn callstack_events_counts_per_tid(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.events_by_tid.iter().map(|(&tid, events)| (tid, events.len()))
    }

    /// Events with `t0 <= time < t1`, all threads
    #[must_use]
    pub fn callstack_events_in_time_range(&self, t0: u64, t1: u64) -> Vec<CallstackEvent> {
        self.events_in_range(t0, t1).to_vec()
    }

    /// Events of one thread with `t0 <= time < t1`
    #[must_use]
    pub fn callstack_events_of_tid_in_time_range(
        &self,
        tid: i32,
        t0: u64,
        t1: u64,
    ) -> Vec<CallstackEvent> {
        self.events_by_tid
            .get(&tid)
            .map(|events| range_of(events, t0, t1).to_vec())
            .unwrap_or_default()
    }

    /// Borrowing variant of [`Self::callstack_events_in_time_range`]
    #[must_use]
    pub fn events_in_range(&self, t0: u64, t1: u64) -> &[CallstackEvent] {
        range_of(&self.events, t0, t1)
    }

    #[must_use]
    pub fn min_time(&self) -> Option<u64> {
        self.min_time
    }

    #[must_use]
    pub fn max_time(&self) -> Option<u64> {
        self.max_time
    }
}

/// Keeps `events` time-ordered; equal times stay in arrival order
fn insert_sorted(events: &mut Vec<CallstackEvent>, event: CallstackEvent) {
    if events.last().is_none_or(|last| last.time <= event.time) {
        events.push(event);
    } else {
        let index = events.partition_point(|e| e.time <= event.time);
        events.insert(index, event);
    }
}

fn range_of(events: &[CallstackEvent], t0: u64, t1: u64) -> &[CallstackEvent] {
    let begin = events.partition_point(|e| e.time < t0);
    let end = events.partition_point(|e| e.time < t1).max(begin);
    &events[begin..end]
}
