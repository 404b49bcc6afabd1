//! # timegraph - Main Entry Point
//!
//! Supports two operational modes:
//! - **Demo** (`--demo`): Record from the synthetic producer while redrawing the timeline
//! - **Replay** (`--replay capture.orbit`): Load a saved capture and summarize it
//!
//! Either mode can save the resulting capture with `--export <PATH>`.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::bounded;
use log::{info, warn};
use std::time::{Duration, Instant};

use timegraph::capture::CaptureData;
use timegraph::cli::Args;
use timegraph::export::{load_capture, save_capture};
use timegraph::producer::{demo_functions, drain_events, spawn_synthetic_producer, CHANNEL_CAPACITY};
use timegraph::render::batcher::PickingMode;
use timegraph::render::time_format::pretty_time;
use timegraph::time_graph::{TimeGraph, TimeGraphConfig};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;

/// Redraw period of the demo loop
const UPDATE_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("missing required argument") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    if !args.history_seconds.is_finite() || args.history_seconds <= 0.0 {
        anyhow::bail!("--history-seconds must be a positive number, got {}", args.history_seconds);
    }
    let config =
        TimeGraphConfig { history_seconds: args.history_seconds, ..TimeGraphConfig::default() };

    let mut time_graph = if let Some(ref path) = args.replay {
        load_capture(path, config).with_context(|| format!("Failed to replay {}", path.display()))?
    } else if args.demo {
        record_demo(&args, config)?
    } else {
        anyhow::bail!(
            "Missing required argument: --replay <FILE> or --demo\n\n\
             Usage:\n  \
             timegraph --demo                Record a synthetic capture\n  \
             timegraph --replay FILE.orbit   Summarize a saved capture\n\n\
             Run 'timegraph --help' for more options"
        )
    };

    if let Some(ref filter) = args.thread_filter {
        time_graph.set_thread_filter(filter);
    }
    time_graph.zoom_all();
    let num_primitives = time_graph.draw(PickingMode::None).len();

    if !args.quiet {
        print_summary(&time_graph, num_primitives);
    }

    if let Some(ref export_path) = args.export {
        let written = save_capture(&time_graph, export_path)?;
        println!("export: {}", written.display());
    }

    Ok(())
}

/// Run the synthetic producer for `--duration` seconds, ingesting on this
/// thread and redrawing every [`UPDATE_INTERVAL`]
fn record_demo(args: &Args, config: TimeGraphConfig) -> Result<TimeGraph> {
    let capture = CaptureData::new(
        i32::try_from(std::process::id()).unwrap_or_default(),
        "timegraph-demo",
        demo_functions(),
    );
    let mut time_graph = TimeGraph::new(config, capture.into_shared());
    time_graph.set_capturing(true);
    let sink = time_graph.sink();

    let (tx, rx) = bounded(CHANNEL_CAPACITY);
    let producer = spawn_synthetic_producer(tx, Duration::from_secs(args.duration));
    info!("Recording synthetic capture for {}s", args.duration);

    // -------------------------------------------------------------------------
    // Main Event Loop
    // -------------------------------------------------------------------------
    let mut last_update = Instant::now();
    let mut num_events = 0;
    loop {
        num_events += drain_events(&rx, &sink);

        if last_update.elapsed() >= UPDATE_INTERVAL {
            if time_graph.take_needs_update() {
                time_graph.zoom_all();
                let num_primitives = time_graph.draw(PickingMode::None).len();
                info!("{} timers, {num_primitives} primitives", time_graph.num_timers());
            }
            last_update = Instant::now();
        }

        if producer.is_finished() && rx.is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    let frames = producer
        .join()
        .map_err(|_| anyhow::anyhow!("Synthetic producer thread panicked"))?;
    // Anything sent between the last drain and the hang-up
    num_events += drain_events(&rx, &sink);
    if frames == 0 {
        warn!("Synthetic producer sent no frames");
    }
    info!("Ingested {num_events} events from {frames} frames");

    time_graph.set_capturing(false);
    time_graph.update_capture_min_max_timestamps();
    Ok(time_graph)
}

fn print_summary(time_graph: &TimeGraph, num_primitives: usize) {
    let capture = time_graph.capture().read();
    println!("timegraph v{}", env!("CARGO_PKG_VERSION"));
    println!("process: {} (pid {})", capture.process_name(), capture.process_id());
    if let Some((min, max)) = time_graph.capture_range() {
        let span_us = time_graph.us_from_tick(max) - time_graph.us_from_tick(min);
        let duration = Duration::from_secs_f64(span_us.max(0.0) / 1_000_000.0);
        println!("duration: {}", pretty_time(duration));
    }
    println!("timers: {}", time_graph.num_timers());
    println!("cores: {}", time_graph.num_cores());
    println!("callstack events: {}", capture.callstack_data().callstack_events_count());
    println!("strings: {}", time_graph.string_manager().len());
    println!("primitives: {num_primitives}");
    println!("tracks:");
    for laid_out in time_graph.sorted_tracks() {
        println!(
            "  {:<10} {:<24} {:>8} timers",
            format!("{:?}", laid_out.track.kind()),
            laid_out.track.label(),
            laid_out.track.num_timers()
        );
    }
}
