//! # Manual Instrumentation
//!
//! Manually instrumented functions carry an [`ApiEvent`] payload in their
//! timer registers. This module decodes those payloads and pairs async
//! start/stop timers into completed async timers.
//!
//! ## Async Scopes
//!
//! ```text
//! START_ASYNC(id=7) @ t0 ──┐
//!                          ├──► listeners("name", TimerInfo { start: t0, end: t1 })
//! STOP_ASYNC(id=7)  @ t1 ──┘
//! ```
//!
//! Listeners are registered explicitly and called synchronously, in
//! registration order, on the thread that delivered the stop timer.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use timegraph_common::{
    decode_f32, decode_f64, decode_i32, decode_i64, decode_u32, ApiEvent, TimerInfo,
    API_EVENT_SCOPE_START_ASYNC, API_EVENT_SCOPE_STOP_ASYNC, API_EVENT_TRACK_DOUBLE,
    API_EVENT_TRACK_FLOAT, API_EVENT_TRACK_INT, API_EVENT_TRACK_INT64, API_EVENT_TRACK_UINT,
    API_EVENT_TRACK_UINT64,
};

use crate::tracks::TrackValue;

/// Callback receiving completed async timers along with their scope name
pub type AsyncTimerListener = dyn Fn(&str, &TimerInfo) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Decode the instrumentation payload carried by a timer
#[must_use]
pub fn api_event_from_timer(timer: &TimerInfo) -> ApiEvent {
    ApiEvent::decode(&timer.registers)
}

/// Typed value of a value-tracking event, `None` for other tags
#[must_use]
pub fn decode_track_value(event: &ApiEvent) -> Option<TrackValue> {
    let value = match event.event_type {
        API_EVENT_TRACK_INT => TrackValue::I32(decode_i32(event.value)),
        API_EVENT_TRACK_INT64 => TrackValue::I64(decode_i64(event.value)),
        API_EVENT_TRACK_UINT => TrackValue::U32(decode_u32(event.value)),
        API_EVENT_TRACK_UINT64 => TrackValue::U64(event.value),
        API_EVENT_TRACK_FLOAT => TrackValue::F32(decode_f32(event.value)),
        API_EVENT_TRACK_DOUBLE => TrackValue::F64(decode_f64(event.value)),
        _ => return None,
    };
    Some(value)
}

#[derive(Default)]
pub struct ManualInstrumentationManager {
    listeners: Mutex<Vec<(ListenerId, Arc<AsyncTimerListener>)>>,
    next_listener_id: AtomicU64,
    open_async_scopes: Mutex<FxHashMap<u64, TimerInfo>>,
}

impl fmt::Debug for ManualInstrumentationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualInstrumentationManager")
            .field("listeners", &self.listeners.lock().len())
            .field("open_async_scopes", &self.open_async_scopes.lock().len())
            .finish()
    }
}

impl ManualInstrumentationManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_async_timer_listener(
        &self,
        listener: impl Fn(&str, &TimerInfo) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the listener was not registered
    pub fn remove_async_timer_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Feed one async start or stop timer
    pub fn process_async_timer(&self, timer: &TimerInfo) {
        let event = api_event_from_timer(timer);
        match event.event_type {
            API_EVENT_SCOPE_START_ASYNC => {
                self.open_async_scopes.lock().insert(event.value, *timer);
            }
            API_EVENT_SCOPE_STOP_ASYNC => {
                let Some(start) = self.open_async_scopes.lock().remove(&event.value) else {
                    log::debug!("Async stop for id {} without matching start", event.value);
                    return;
                };
                let name = api_event_from_timer(&start).name;
                let async_timer = TimerInfo { end: timer.end, ..start };
                self.notify(&name, &async_timer);
            }
            other => {
                log::error!("Unexpected event type {other} in async timer, dropping it");
            }
        }
    }

    #[must_use]
    pub fn num_open_async_scopes(&self) -> usize {
        self.open_async_scopes.lock().len()
    }

    /// Forget open scopes, listeners stay registered
    pub fn clear(&self) {
        self.open_async_scopes.lock().clear();
    }

    fn notify(&self, name: &str, timer: &TimerInfo) {
        // Snapshot so listeners may (un)register without deadlocking.
        let listeners: Vec<Arc<AsyncTimerListener>> =
            self.listeners.lock().iter().map(|(_, listener)| Arc::clone(listener)).collect();
        for listener in listeners {
            listener(name, timer);
        }
    }
}
