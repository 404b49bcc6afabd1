use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use timegraph::capture::CaptureData;
use timegraph::domain::Tid;
use timegraph::render::batcher::PickingMode;
use timegraph::time_graph::{TimeGraph, TimeGraphConfig};
use timegraph_common::TimerInfo;

const NUM_THREADS: i32 = 4;
const TIMERS_PER_THREAD: u64 = 5_000;

#[test]
fn test_draw_while_ingesting() {
    let capture = CaptureData::new(1, "app", []).into_shared();
    let mut graph = TimeGraph::new(TimeGraphConfig::default(), capture);
    let sink = graph.sink();
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            for i in 0..TIMERS_PER_THREAD {
                for tid in 0..NUM_THREADS {
                    let start = i * 100;
                    sink.process_timer(
                        &TimerInfo {
                            start,
                            end: start + 50 + u64::from(tid.unsigned_abs()),
                            thread_id: tid,
                            depth: u8::try_from(i % 4).unwrap_or(0),
                            processor: -1,
                            ..TimerInfo::default()
                        },
                        None,
                    );
                }
            }
            done.store(true, Ordering::Release);
        })
    };

    let mut frames = 0;
    let mut last_len = 0;
    while !done.load(Ordering::Acquire) {
        graph.zoom_all();
        let batcher = graph.draw(PickingMode::Click);
        for timer in batcher.primitives().iter().filter_map(|primitive| primitive.timer.as_ref()) {
            assert!(timer.start <= timer.end);
            assert!((0..NUM_THREADS).contains(&timer.thread_id));
        }

        // Snapshots taken mid-write only ever grow and stay sorted
        if let Some(track) = graph.registry().thread_track(Tid(0)) {
            let chains = track.timer_chains();
            let len: usize = chains.iter().map(|chain| chain.snapshot().len()).sum();
            assert!(len >= last_len, "published timers went from {last_len} to {len}");
            last_len = len;
            for chain in &chains {
                let snapshot = chain.snapshot();
                let starts: Vec<u64> = snapshot.query_range(0, u64::MAX).map(|t| t.start).collect();
                assert_eq!(starts.len(), snapshot.len());
                assert!(starts.windows(2).all(|pair| pair[0] <= pair[1]));
            }
        }
        frames += 1;
    }
    producer.join().expect("producer thread");

    let expected = usize::try_from(TIMERS_PER_THREAD).unwrap_or(usize::MAX) * NUM_THREADS as usize;
    assert_eq!(graph.num_timers(), expected);
    assert_eq!(graph.ingested_timers().len(), expected);
    graph.zoom_all();
    let batcher = graph.draw(PickingMode::Click);
    assert!(batcher.primitives().iter().any(|primitive| primitive.timer.is_some()));
    assert!(frames > 0);
}
