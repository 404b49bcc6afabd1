//! # Capture Producer
//!
//! Feeds a [`TimerSink`] from a channel. The binary's demo mode runs a
//! synthetic producer thread on the sending side:
//!
//! ```text
//! synthetic producer ──► bounded(1000) ──► run_ingestion ──► TimerSink
//!    (thread)              channel          (thread)          (tracks)
//! ```

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]

use crossbeam_channel::{Receiver, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use timegraph_common::{
    encode_f64, ApiEvent, TimerInfo, TimerType, API_EVENT_SCOPE_START_ASYNC,
    API_EVENT_SCOPE_STOP_ASYNC, API_EVENT_TRACK_DOUBLE,
};

use crate::capture::{Callstack, CallstackEvent, FunctionInfo, InstrumentationKind};
use crate::string_manager::StringManager;
use crate::time_graph::TimerSink;

/// Channel capacity between a producer and the ingestion loop
pub const CHANNEL_CAPACITY: usize = 1000;

/// One message of the capture stream
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    Timer(TimerInfo),
    /// Must precede every event referencing it
    Callstack(Callstack),
    CallstackEvent(CallstackEvent),
    ThreadName { tid: i32, name: String },
    String { key: u64, value: String },
}

/// Apply one capture message
pub fn apply_event(sink: &TimerSink, event: CaptureEvent) {
    match event {
        CaptureEvent::Timer(timer) => sink.ingest(&timer),
        CaptureEvent::Callstack(callstack) => {
            sink.add_unique_callstack(callstack);
        }
        CaptureEvent::CallstackEvent(event) => sink.add_callstack_event(event),
        CaptureEvent::ThreadName { tid, name } => sink.set_thread_name(tid, name),
        CaptureEvent::String { key, value } => sink.add_string(key, value),
    }
}

/// Ingest until every sender is gone. Returns the number of messages.
pub fn run_ingestion(rx: &Receiver<CaptureEvent>, sink: &TimerSink) -> usize {
    let mut count = 0;
    for event in rx {
        apply_event(sink, event);
        count += 1;
    }
    log::debug!("Capture stream closed after {count} messages");
    count
}

/// Ingest whatever is queued without blocking
pub fn drain_events(rx: &Receiver<CaptureEvent>, sink: &TimerSink) -> usize {
    let mut count = 0;
    while let Ok(event) = rx.try_recv() {
        apply_event(sink, event);
        count += 1;
    }
    count
}

// =============================================================================
// SYNTHETIC PRODUCER
// =============================================================================

const MODULE_BASE: u64 = 0x40_0000;
const MAIN_LOOP: u64 = 0x1000;
const UPDATE: u64 = 0x2000;
const RENDER: u64 = 0x3000;
const TRACK_FPS: u64 = 0x4000;
const LOAD_START: u64 = 0x5000;
const LOAD_STOP: u64 = 0x6000;

const MAIN_TID: i32 = 100;
const WORKER_TIDS: [i32; 2] = [101, 102];
const NUM_CORES: i32 = 4;

/// Simulated duration of one frame
const FRAME_NS: u64 = 16_000_000;
/// Frames between the start and the stop of an async load
const LOAD_FRAMES: u64 = 3;

const GPU_TIMELINE: &str = "gfx";

/// Functions instrumented by the synthetic producer
#[must_use]
pub fn demo_functions() -> Vec<FunctionInfo> {
    vec![
        FunctionInfo::new("main_loop", MAIN_LOOP, MODULE_BASE),
        FunctionInfo::new("update", UPDATE, MODULE_BASE),
        FunctionInfo::new("render", RENDER, MODULE_BASE),
        FunctionInfo::new("track_fps", TRACK_FPS, MODULE_BASE)
            .with_kind(InstrumentationKind::TrackValue),
        FunctionInfo::new("load_start", LOAD_START, MODULE_BASE)
            .with_kind(InstrumentationKind::TimerStartAsync),
        FunctionInfo::new("load_stop", LOAD_STOP, MODULE_BASE)
            .with_kind(InstrumentationKind::TimerStopAsync),
    ]
}

fn demo_callstacks() -> [Callstack; 2] {
    [
        Callstack::new(vec![MODULE_BASE + UPDATE + 0x10, MODULE_BASE + MAIN_LOOP + 0x20]),
        Callstack::new(vec![MODULE_BASE + RENDER + 0x18, MODULE_BASE + MAIN_LOOP + 0x20]),
    ]
}

/// Messages sent once before the first frame
#[must_use]
pub fn preamble() -> Vec<CaptureEvent> {
    let mut events = vec![
        CaptureEvent::String {
            key: StringManager::key_for(GPU_TIMELINE),
            value: GPU_TIMELINE.to_string(),
        },
        CaptureEvent::ThreadName { tid: MAIN_TID, name: "main".to_string() },
    ];
    for (i, &tid) in WORKER_TIDS.iter().enumerate() {
        events.push(CaptureEvent::ThreadName { tid, name: format!("worker-{}", i + 1) });
    }
    events.extend(demo_callstacks().into_iter().map(CaptureEvent::Callstack));
    events
}

fn timer(tid: i32, start: u64, end: u64, depth: u8, function: u64) -> TimerInfo {
    TimerInfo {
        start,
        end,
        process_id: 1,
        thread_id: tid,
        depth,
        function_address: MODULE_BASE + function,
        processor: -1,
        ..TimerInfo::default()
    }
}

/// Messages of frame `frame`, starting at tick `base`
#[must_use]
pub fn generate_frame(frame: u64, base: u64) -> Vec<CaptureEvent> {
    let start = base + frame * FRAME_NS;
    let mut events = Vec::new();

    // Nested main thread timers
    let update_end = start + FRAME_NS * 2 / 5;
    let render_end = start + FRAME_NS * 9 / 10;
    events.push(CaptureEvent::Timer(timer(MAIN_TID, start + 100_000, update_end, 1, UPDATE)));
    events.push(CaptureEvent::Timer(timer(MAIN_TID, update_end, render_end, 1, RENDER)));
    events.push(CaptureEvent::Timer(timer(MAIN_TID, start, start + FRAME_NS - 1, 0, MAIN_LOOP)));

    // Workers pick up a variable share of the frame
    for (i, &tid) in WORKER_TIDS.iter().enumerate() {
        let offset = (frame * 7 + i as u64 * 3) % 5 * 1_000_000;
        let job_start = start + offset;
        events.push(CaptureEvent::Timer(timer(tid, job_start, job_start + 4_000_000, 0, UPDATE)));
    }

    // Scheduling slices
    let threads = [MAIN_TID, WORKER_TIDS[0], WORKER_TIDS[1]];
    for core in 0..NUM_CORES {
        let tid = threads[usize::try_from((frame + core as u64) % 3).unwrap_or(0)];
        events.push(CaptureEvent::Timer(TimerInfo {
            timer_type: TimerType::CoreActivity,
            processor: core,
            ..timer(tid, start, start + FRAME_NS / 2, 0, 0)
        }));
    }

    // GPU job for the frame
    events.push(CaptureEvent::Timer(TimerInfo {
        timer_type: TimerType::GpuActivity,
        timeline_hash: StringManager::key_for(GPU_TIMELINE),
        ..timer(MAIN_TID, render_end, render_end + FRAME_NS / 4, 0, RENDER)
    }));

    // Frame rate sample
    let fps = 60.0 - (frame % 10) as f64;
    events.push(CaptureEvent::Timer(TimerInfo {
        registers: ApiEvent::new(API_EVENT_TRACK_DOUBLE, "fps", encode_f64(fps)).encode(),
        ..timer(MAIN_TID, render_end, render_end + 1_000, 1, TRACK_FPS)
    }));

    // Async loads spanning several frames
    if frame % LOAD_FRAMES == 0 {
        events.push(CaptureEvent::Timer(TimerInfo {
            registers: ApiEvent::new(API_EVENT_SCOPE_START_ASYNC, "asset_load", frame / LOAD_FRAMES)
                .encode(),
            ..timer(WORKER_TIDS[0], start, start + 1_000, 1, LOAD_START)
        }));
    } else if frame % LOAD_FRAMES == LOAD_FRAMES - 1 {
        events.push(CaptureEvent::Timer(TimerInfo {
            registers: ApiEvent::new(API_EVENT_SCOPE_STOP_ASYNC, "asset_load", frame / LOAD_FRAMES)
                .encode(),
            ..timer(WORKER_TIDS[1], start, start + 1_000, 1, LOAD_STOP)
        }));
    }

    // One sample per thread
    let callstacks = demo_callstacks();
    for (i, &tid) in threads.iter().enumerate() {
        let callstack = &callstacks[(usize::try_from(frame).unwrap_or(0) + i) % callstacks.len()];
        events.push(CaptureEvent::CallstackEvent(CallstackEvent {
            time: start + 500_000 * (i as u64 + 1),
            callstack_hash: callstack.hash(),
            thread_id: tid,
        }));
    }

    events
}

/// Spawn a producer thread sending frames for `duration`, then hanging up.
/// The thread returns the number of frames sent.
#[must_use]
pub fn spawn_synthetic_producer(tx: Sender<CaptureEvent>, duration: Duration) -> JoinHandle<u64> {
    std::thread::spawn(move || {
        let started = Instant::now();
        let base = FRAME_NS;

        for event in preamble() {
            if tx.send(event).is_err() {
                return 0;
            }
        }

        let mut frame = 0;
        while started.elapsed() < duration {
            for event in generate_frame(frame, base) {
                if tx.send(event).is_err() {
                    log::warn!("Ingestion side hung up after {frame} frames");
                    return frame;
                }
            }
            frame += 1;
            std::thread::sleep(Duration::from_millis(2));
        }
        log::info!("Synthetic producer sent {frame} frames");
        frame
    })
}
