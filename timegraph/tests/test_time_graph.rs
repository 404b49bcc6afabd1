use timegraph::capture::{Callstack, CallstackEvent, CaptureData, FunctionInfo, InstrumentationKind};
use timegraph::domain::Tid;
use timegraph::string_manager::StringManager;
use timegraph::time_graph::{JumpDirection, JumpScope, TimeGraph, TimeGraphConfig};
use timegraph::tracks::TrackKind;
use timegraph_common::{encode_f64, ApiEvent, TimerInfo, TimerType, API_EVENT_TRACK_DOUBLE};

const TICK: u64 = 0x1010;

/// One tick per microsecond keeps the expected numbers readable
fn time_graph() -> TimeGraph {
    let config = TimeGraphConfig { tick_period_us: 1.0, ..TimeGraphConfig::default() };
    let capture = CaptureData::new(7, "game", [FunctionInfo::new("tick", 0x10, 0x1000)]);
    TimeGraph::new(config, capture.into_shared())
}

fn timer(tid: i32, start: u64, end: u64, depth: u8) -> TimerInfo {
    TimerInfo {
        start,
        end,
        thread_id: tid,
        depth,
        function_address: TICK,
        processor: -1,
        ..TimerInfo::default()
    }
}

fn assert_window_invariant(graph: &TimeGraph) {
    let viewport = graph.viewport();
    assert!(viewport.min_time_us() >= 0.0, "min {} below zero", viewport.min_time_us());
    assert!(viewport.min_time_us() <= viewport.max_time_us());
    assert!(viewport.max_time_us() <= viewport.capture_span_us() + 1e-9);
}

#[test]
fn test_find_function_calls_on_one_thread() {
    let graph = time_graph();
    for (start, end) in [(100, 150), (200, 260), (300, 310)] {
        graph.process_timer(&timer(123, start, end, 0), None);
    }

    let next = graph.find_next_function_call(TICK, 150, Some(Tid(123))).expect("next call");
    assert_eq!((next.start, next.end), (200, 260));

    let previous =
        graph.find_previous_function_call(TICK, 300, Some(Tid(123))).expect("previous call");
    assert_eq!((previous.start, previous.end), (200, 260));

    assert!(graph.find_next_function_call(TICK, 310, Some(Tid(123))).is_none());
    assert!(graph.find_next_function_call(TICK, 150, Some(Tid(5))).is_none());
}

#[test]
fn test_select_events_caches_thread_and_process() {
    let mut graph = time_graph();
    graph.process_timer(&timer(123, 100, 310, 0), None);

    let sink = graph.sink();
    let callstack = Callstack::new(vec![0x1010, 0x2020]);
    let hash = callstack.hash();
    sink.add_unique_callstack(callstack);
    for time in [60, 120, 200] {
        sink.add_callstack_event(CallstackEvent { time, callstack_hash: hash, thread_id: 123 });
    }

    graph.set_world(0.0, 1000.0, 0.0, 1000.0);
    graph.zoom_all();
    let x0 = graph.world_from_tick(60);
    let x1 = graph.world_from_tick(150);

    let events = graph.select_events(x1, x0, Tid(123));
    assert_eq!(events.iter().map(|event| event.time).collect::<Vec<_>>(), vec![60, 120]);
    assert_eq!(graph.selected_callstack_events(Tid(123)).len(), 2);
    assert_eq!(graph.selected_callstack_events(Tid::ALL_THREADS).len(), 2);
    assert!(graph.selected_callstack_events(Tid(9)).is_empty());
}

fn graph_with_samples(samples: &[(u64, i32)]) -> TimeGraph {
    let mut graph = time_graph();
    graph.process_timer(&timer(123, 0, 1000, 0), None);
    let sink = graph.sink();
    let callstack = Callstack::new(vec![0x1010, 0x2020]);
    let hash = callstack.hash();
    sink.add_unique_callstack(callstack);
    for &(time, thread_id) in samples {
        sink.add_callstack_event(CallstackEvent { time, callstack_hash: hash, thread_id });
    }
    graph.set_world(0.0, 1000.0, 0.0, 1000.0);
    graph.zoom_all();
    graph
}

#[test]
fn test_select_all_threads_files_events_under_their_thread() {
    let mut graph = graph_with_samples(&[(60, 123), (120, 456), (200, 123)]);
    let x0 = graph.world_from_tick(50);
    let x1 = graph.world_from_tick(150);

    let events = graph.select_events(x0, x1, Tid::ALL_THREADS);
    assert_eq!(events.len(), 2);
    assert_eq!(graph.selected_callstack_events(Tid(123)).len(), 1);
    assert_eq!(graph.selected_callstack_events(Tid(456)).len(), 1);
    assert_eq!(graph.selected_callstack_events(Tid::ALL_THREADS).len(), 2);
}

#[test]
fn test_new_selection_replaces_previous() {
    let mut graph = graph_with_samples(&[(60, 123), (120, 456), (600, 456)]);

    let (x0, x1) = (graph.world_from_tick(50), graph.world_from_tick(100));
    assert_eq!(graph.select_events(x0, x1, Tid(123)).len(), 1);
    assert_eq!(graph.selected_callstack_events(Tid(123)).len(), 1);

    let (x0, x1) = (graph.world_from_tick(100), graph.world_from_tick(700));
    let events = graph.select_events(x0, x1, Tid(456));
    assert_eq!(events.iter().map(|event| event.time).collect::<Vec<_>>(), vec![120, 600]);
    assert!(graph.selected_callstack_events(Tid(123)).is_empty());
    assert_eq!(graph.selected_callstack_events(Tid(456)).len(), 2);
    assert_eq!(graph.selected_callstack_events(Tid::ALL_THREADS), events.as_slice());
}

#[test]
fn test_num_timers_matches_ingested() {
    let graph = time_graph();
    for i in 0..500 {
        graph.process_timer(&timer(i % 4, i as u64 * 10, i as u64 * 10 + 5, (i % 3) as u8), None);
    }
    assert_eq!(graph.num_timers(), 500);
    assert_eq!(graph.ingested_timers().len(), 500);
}

#[test]
fn test_window_stays_inside_capture() {
    let mut graph = time_graph();
    graph.process_timer(&timer(1, 1_000, 11_000, 0), None);
    graph.set_world(0.0, 1000.0, 0.0, 1000.0);
    graph.zoom_all();
    assert_window_invariant(&graph);

    for step in 0..20 {
        graph.zoom_time(-1.0, 0.25);
        assert_window_invariant(&graph);
        graph.pan_time(100, 100 + step * 13, 1000, graph.viewport().min_time_us());
        assert_window_invariant(&graph);
    }
    graph.on_drag(1.0);
    assert_window_invariant(&graph);
    graph.set_min_max(20_000.0, -50.0);
    assert_window_invariant(&graph);
    for _ in 0..40 {
        graph.zoom_time(1.0, 0.9);
        assert_window_invariant(&graph);
    }
    assert!((graph.viewport().current_time_span_us() - 10_000.0).abs() < 1e-6);
}

#[test]
fn test_world_tick_inverse() {
    let mut graph = time_graph();
    graph.process_timer(&timer(1, 1_000, 11_000, 0), None);
    graph.set_world(0.0, 1000.0, 0.0, 1000.0);
    graph.zoom_all();
    graph.set_min_max(2_000.0, 4_000.0);

    for tick in (3_000..=5_000).step_by(50) {
        let round_trip = graph.tick_from_world(graph.world_from_tick(tick));
        assert!(round_trip.abs_diff(tick) <= 1, "{tick} came back as {round_trip}");
    }
}

#[test]
fn test_sort_order_and_labels() {
    let mut graph = time_graph();
    let sink = graph.sink();
    {
        let mut capture = graph.capture().write();
        capture.set_thread_name(1, "render");
        capture.set_thread_name(2, "worker");
    }

    for i in 0..3 {
        graph.process_timer(&timer(1, i * 100, i * 100 + 50, 0), None);
    }
    for i in 0..5 {
        graph.process_timer(&timer(2, i * 100, i * 100 + 50, 0), None);
    }
    graph.process_timer(
        &TimerInfo { timer_type: TimerType::CoreActivity, processor: 0, ..timer(2, 0, 40, 0) },
        None,
    );
    sink.add_string(StringManager::key_for("gfx"), "gfx");
    graph.process_timer(
        &TimerInfo {
            timer_type: TimerType::GpuActivity,
            timeline_hash: StringManager::key_for("gfx"),
            ..timer(1, 60, 90, 0)
        },
        None,
    );
    let fps = FunctionInfo::new("fps", 0x20, 0x1000).with_kind(InstrumentationKind::TrackValue);
    graph.process_timer(
        &TimerInfo {
            function_address: fps.absolute_address(),
            registers: ApiEvent::new(API_EVENT_TRACK_DOUBLE, "fps", encode_f64(59.5)).encode(),
            ..timer(1, 70, 71, 1)
        },
        Some(&fps),
    );

    graph.sort_tracks();
    let kinds: Vec<TrackKind> =
        graph.sorted_tracks().iter().map(|laid_out| laid_out.track.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            TrackKind::Scheduler,
            TrackKind::Gpu,
            TrackKind::Graph,
            TrackKind::Thread,
            TrackKind::Thread,
        ]
    );

    let labels: Vec<String> =
        graph.sorted_tracks().iter().map(|laid_out| laid_out.track.label()).collect();
    assert_eq!(labels[0], "Scheduler (1 cores)");
    assert_eq!(labels[1], "Graphics queue");
    assert_eq!(labels[3], "worker [2]");
    assert_eq!(labels[4], "render [1]");

    // Tracks are stacked without overlap
    for pair in graph.sorted_tracks().windows(2) {
        assert!(pair[0].y + pair[0].height <= pair[1].y);
    }

    graph.set_thread_filter("rend");
    graph.sort_tracks();
    let threads: Vec<String> = graph
        .sorted_tracks()
        .iter()
        .filter(|laid_out| laid_out.track.kind() == TrackKind::Thread)
        .map(|laid_out| laid_out.track.name())
        .collect();
    assert_eq!(threads, vec!["render".to_string()]);
}

#[test]
fn test_jump_to_neighbor_box() {
    let mut graph = time_graph();
    let first = timer(3, 100, 200, 0);
    let child = timer(3, 120, 180, 1);
    let second = timer(3, 300, 400, 0);
    for t in [&first, &child, &second] {
        graph.process_timer(t, None);
    }
    graph.zoom_all();
    graph.sort_tracks();

    let right = graph.jump_to_neighbor_box(&first, JumpDirection::Next, JumpScope::SameDepth);
    assert_eq!(right, Some(second));
    assert_eq!(graph.selected_timer(), Some(&second));

    let down = graph.jump_to_neighbor_box(&first, JumpDirection::Down, JumpScope::SameDepth);
    assert_eq!(down, Some(child));

    let up = graph.jump_to_neighbor_box(&child, JumpDirection::Top, JumpScope::SameDepth);
    assert_eq!(up, Some(first));

    let previous =
        graph.jump_to_neighbor_box(&first, JumpDirection::Previous, JumpScope::SameDepth);
    assert_eq!(previous, None);
    // Nothing found keeps the previous selection
    assert_eq!(graph.selected_timer(), Some(&first));
}
