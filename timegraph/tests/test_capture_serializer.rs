use rustc_hash::FxHashMap;
use timegraph::capture::{AddressInfo, Callstack, CallstackEvent, CaptureData, FunctionInfo};
use timegraph::export::{
    generate_capture_info, include_capture_extension, load_capture, read_capture, save_capture,
    write_capture,
};
use timegraph::string_manager::StringManager;
use timegraph::time_graph::{TimeGraph, TimeGraphConfig};
use timegraph_common::{TimerInfo, TimerType};

const MODULE_BASE: u64 = 0x1000;

fn functions() -> [FunctionInfo; 2] {
    [FunctionInfo::new("update", 0x10, MODULE_BASE), FunctionInfo::new("render", 0x20, MODULE_BASE)]
}

fn timer(tid: i32, start: u64, end: u64, function: &FunctionInfo) -> TimerInfo {
    TimerInfo {
        start,
        end,
        thread_id: tid,
        function_address: function.absolute_address(),
        processor: -1,
        ..TimerInfo::default()
    }
}

fn address_infos() -> [AddressInfo; 2] {
    [
        AddressInfo {
            absolute_address: MODULE_BASE + 0x14,
            offset_in_function: 4,
            function_name: "update".to_string(),
            module_path: "/opt/game/bin/game".to_string(),
        },
        AddressInfo {
            absolute_address: MODULE_BASE + 0x28,
            offset_in_function: 8,
            function_name: "render".to_string(),
            module_path: "/opt/game/bin/game".to_string(),
        },
    ]
}

fn recorded_graph() -> TimeGraph {
    let capture = CaptureData::new(42, "game", functions()).into_shared();
    let graph = TimeGraph::new(TimeGraphConfig::default(), capture);
    let sink = graph.sink();
    let [update, render] = functions();

    sink.set_thread_name(1, "main");
    sink.set_thread_name(2, "worker");
    sink.add_string(StringManager::key_for("gfx"), "gfx");

    for i in 0..10 {
        sink.ingest(&timer(1, i * 1_000, i * 1_000 + 400, &update));
        sink.ingest(&timer(2, i * 1_000 + 100, i * 1_000 + 900, &render));
    }
    sink.ingest(&TimerInfo {
        timer_type: TimerType::GpuActivity,
        timeline_hash: StringManager::key_for("gfx"),
        ..timer(1, 500, 700, &render)
    });

    let callstack =
        Callstack::new(vec![update.absolute_address() + 4, render.absolute_address() + 8]);
    let hash = callstack.hash();
    sink.add_unique_callstack(callstack);
    for time in [150, 2_150, 4_150] {
        sink.add_callstack_event(CallstackEvent { time, callstack_hash: hash, thread_id: 2 });
    }
    for info in address_infos() {
        graph.capture().write().insert_address_info(info);
    }
    graph
}

#[test]
fn test_include_capture_extension() {
    assert_eq!(include_capture_extension("foo.orbit"), "foo.orbit");
    assert_eq!(include_capture_extension("foo"), "foo.orbit");
}

#[test]
fn test_generate_capture_info_counts() {
    let graph = recorded_graph();
    let capture = graph.capture().read();
    let info = generate_capture_info(&capture, &graph.string_manager().key_to_string_map());

    assert_eq!(info.process_id, 42);
    assert_eq!(info.process_name, "game");
    assert_eq!(info.selected_functions.len(), 2);
    assert_eq!(info.callstacks.len(), 1);
    assert_eq!(info.callstack_events.len(), 3);
    assert_eq!(info.thread_names.len(), 2);
    let gfx = info.key_to_string.get(&StringManager::key_for("gfx"));
    assert_eq!(gfx.map(String::as_str), Some("gfx"));

    let update_stats = info.function_stats[&(MODULE_BASE + 0x10)];
    assert_eq!(update_stats.count, 10);
    // GPU jobs are not function calls
    assert_eq!(info.function_stats[&(MODULE_BASE + 0x20)].count, 10);
}

#[test]
fn test_stream_round_trip_keeps_timers() {
    let graph = recorded_graph();
    let info = {
        let capture = graph.capture().read();
        generate_capture_info(&capture, &FxHashMap::default())
    };
    let timers = graph.ingested_timers();

    let mut buffer = Vec::new();
    write_capture(&mut buffer, info.clone(), timers.clone()).expect("write");
    let file = read_capture(buffer.as_slice()).expect("read");
    assert_eq!(file.capture, info);
    assert_eq!(file.timers, timers);

    assert_eq!(file.capture.selected_functions, functions().to_vec());
    assert_eq!(file.capture.address_infos, address_infos().to_vec());
    let [callstack] = file.capture.callstacks.as_slice() else {
        panic!("expected one callstack, got {:?}", file.capture.callstacks);
    };
    assert_eq!(callstack.data, vec![MODULE_BASE + 0x14, MODULE_BASE + 0x28]);
    assert_eq!(callstack.hash, Callstack::hash_frames(&callstack.data));
    let times: Vec<u64> = file.capture.callstack_events.iter().map(|event| event.time).collect();
    assert_eq!(times, vec![150, 2_150, 4_150]);
    let events = &file.capture.callstack_events;
    assert!(events.iter().all(|event| event.callstack_hash == callstack.hash));
    assert_eq!(file.timers.len(), 21);
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut graph = recorded_graph();
    graph.sort_tracks();

    let written = save_capture(&graph, &dir.path().join("session")).expect("save");
    assert_eq!(written, dir.path().join("session.orbit"));

    let mut loaded = load_capture(&written, TimeGraphConfig::default()).expect("load");
    loaded.sort_tracks();

    assert_eq!(loaded.num_timers(), graph.num_timers());
    assert_eq!(loaded.ingested_timers(), graph.ingested_timers());
    assert_eq!(loaded.capture_range(), graph.capture_range());

    let labels = |graph: &TimeGraph| {
        graph.sorted_tracks().iter().map(|t| t.track.label()).collect::<Vec<_>>()
    };
    assert_eq!(labels(&loaded), labels(&graph));

    let capture = loaded.capture().read();
    assert_eq!(capture.thread_name(2), "worker");
    assert_eq!(capture.callstack_data().callstack_events_count(), 3);
    assert_eq!(capture.function_stats_or_default(&functions()[0]).count, 10);

    let original = graph.capture().read();
    for function in functions() {
        assert_eq!(capture.selected_function(function.absolute_address()), Some(&function));
    }
    for info in address_infos() {
        assert_eq!(capture.address_info(info.absolute_address), Some(&info));
    }
    let hashes = |capture: &CaptureData| {
        let mut hashes: Vec<(u64, Vec<u64>)> = capture
            .callstack_data()
            .unique_callstacks()
            .map(|callstack| (callstack.hash(), callstack.frames().to_vec()))
            .collect();
        hashes.sort_unstable();
        hashes
    };
    assert_eq!(hashes(&*capture), hashes(&*original));
    assert_eq!(capture.callstack_data().events(), original.callstack_data().events());
    assert_eq!(capture.capture_start_time(), original.capture_start_time());
    assert_eq!(
        loaded.string_manager().key_to_string_map(),
        graph.string_manager().key_to_string_map()
    );
}

#[test]
fn test_load_missing_file_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(load_capture(&dir.path().join("absent.orbit"), TimeGraphConfig::default()).is_err());
}
