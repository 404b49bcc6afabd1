//! Capture file reading and writing
//!
//! A capture file is one JSON document:
//!
//! ```text
//! {
//!   "header":  { "version": 1 },
//!   "capture": CaptureInfo,        // process, functions, callstacks, stats, strings
//!   "timers":  [TimerInfo, ...]    // every ingested timer, in start order
//! }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use timegraph_common::TimerInfo;

use crate::capture::{
    AddressInfo, Callstack, CallstackEvent, CaptureData, FunctionInfo, FunctionStats,
};
use crate::domain::CaptureError;
use crate::string_manager::StringManager;
use crate::time_graph::{TimeGraph, TimeGraphConfig};

pub const CAPTURE_FILE_EXTENSION: &str = ".orbit";

/// Bumped on every incompatible change of [`CaptureFile`]
pub const CAPTURE_FORMAT_VERSION: u32 = 1;

/// Time stamp layout used in capture file names
const FILE_NAME_TIME_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallstackInfo {
    pub data: Vec<u64>,
    pub hash: u64,
}

/// Serializable snapshot of a [`CaptureData`] and its string table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureInfo {
    pub process_id: i32,
    pub process_name: String,
    pub selected_functions: Vec<FunctionInfo>,
    pub address_infos: Vec<AddressInfo>,
    pub callstacks: Vec<CallstackInfo>,
    pub callstack_events: Vec<CallstackEvent>,
    /// Keyed by absolute function address
    pub function_stats: BTreeMap<u64, FunctionStats>,
    pub key_to_string: BTreeMap<u64, String>,
    pub thread_names: BTreeMap<i32, String>,
    pub capture_start_time: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFileHeader {
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureFile {
    pub header: CaptureFileHeader,
    pub capture: CaptureInfo,
    pub timers: Vec<TimerInfo>,
}

// =============================================================================
// PROJECTION
// =============================================================================

/// Project a capture and its string table into a serializable snapshot.
///
/// Collections are sorted by key so equal captures serialize identically.
#[must_use]
pub fn generate_capture_info(
    capture: &CaptureData,
    key_to_string: &FxHashMap<u64, String>,
) -> CaptureInfo {
    let mut selected_functions: Vec<FunctionInfo> = capture.selected_functions().cloned().collect();
    selected_functions.sort_by_key(FunctionInfo::absolute_address);

    let mut address_infos: Vec<AddressInfo> = capture.address_infos().cloned().collect();
    address_infos.sort_by_key(|info| info.absolute_address);

    let mut callstacks: Vec<CallstackInfo> = capture
        .callstack_data()
        .unique_callstacks()
        .map(|callstack| CallstackInfo {
            data: callstack.frames().to_vec(),
            hash: callstack.hash(),
        })
        .collect();
    callstacks.sort_by_key(|callstack| callstack.hash);

    CaptureInfo {
        process_id: capture.process_id(),
        process_name: capture.process_name().to_string(),
        selected_functions,
        address_infos,
        callstacks,
        callstack_events: capture.callstack_data().events().to_vec(),
        function_stats: capture
            .functions_stats()
            .iter()
            .map(|(&address, &stats)| (address, stats))
            .collect(),
        key_to_string: key_to_string.iter().map(|(&key, value)| (key, value.clone())).collect(),
        thread_names: capture
            .thread_names()
            .iter()
            .map(|(&tid, name)| (tid, name.clone()))
            .collect(),
        capture_start_time: capture.capture_start_time(),
    }
}

/// Rebuild a capture from a snapshot.
///
/// # Errors
///
/// Returns [`CaptureError::UnknownCallstack`] if an event references a
/// callstack the snapshot does not contain.
pub fn capture_data_from_info(info: &CaptureInfo) -> Result<CaptureData, CaptureError> {
    let mut capture = CaptureData::new(
        info.process_id,
        info.process_name.clone(),
        info.selected_functions.iter().cloned(),
    );
    capture.set_capture_start_time(info.capture_start_time);

    for address_info in &info.address_infos {
        capture.insert_address_info(address_info.clone());
    }
    for callstack in &info.callstacks {
        let restored = Callstack::new(callstack.data.clone());
        if restored.hash() != callstack.hash {
            log::warn!(
                "Callstack {:#x} hashes to {:#x} after load",
                callstack.hash,
                restored.hash()
            );
        }
        capture.add_unique_callstack(restored);
    }
    for event in &info.callstack_events {
        if !capture.callstack_data().has_callstack(event.callstack_hash) {
            return Err(CaptureError::UnknownCallstack {
                time: event.time,
                hash: event.callstack_hash,
            });
        }
        capture.add_callstack_event(*event);
    }
    for (&address, &stats) in &info.function_stats {
        capture.set_function_stats(address, stats);
    }
    for (&tid, name) in &info.thread_names {
        capture.set_thread_name(tid, name.clone());
    }
    Ok(capture)
}

// =============================================================================
// FILE NAMES
// =============================================================================

/// Append the capture extension unless `file_name` already ends with it.
///
/// ```
/// use timegraph::export::include_capture_extension;
/// assert_eq!(include_capture_extension("foo"), "foo.orbit");
/// assert_eq!(include_capture_extension("foo.orbit"), "foo.orbit");
/// ```
#[must_use]
pub fn include_capture_extension(file_name: &str) -> String {
    if file_name.ends_with(CAPTURE_FILE_EXTENSION) {
        file_name.to_string()
    } else {
        format!("{file_name}{CAPTURE_FILE_EXTENSION}")
    }
}

/// `<process name>_<capture start time><extension>`
#[must_use]
pub fn capture_file_name(capture: &CaptureData) -> String {
    let time = capture.capture_start_time().format(FILE_NAME_TIME_FORMAT);
    include_capture_extension(&format!("{}_{time}", capture.process_name()))
}

// =============================================================================
// READ / WRITE
// =============================================================================

/// # Errors
///
/// Returns an error if serialization or the underlying writer fails.
pub fn write_capture<W: Write>(
    writer: W,
    capture: CaptureInfo,
    timers: Vec<TimerInfo>,
) -> Result<(), CaptureError> {
    let file = CaptureFile {
        header: CaptureFileHeader { version: CAPTURE_FORMAT_VERSION },
        capture,
        timers,
    };
    serde_json::to_writer(writer, &file)?;
    Ok(())
}

/// # Errors
///
/// Returns an error if the input is not a capture file or was written by an
/// incompatible version.
pub fn read_capture<R: Read>(reader: R) -> Result<CaptureFile, CaptureError> {
    let file: CaptureFile = serde_json::from_reader(reader)?;
    if file.header.version != CAPTURE_FORMAT_VERSION {
        return Err(CaptureError::UnsupportedVersion {
            found: file.header.version,
            expected: CAPTURE_FORMAT_VERSION,
        });
    }
    Ok(file)
}

/// Save the capture shown by `time_graph` to `path` (the extension is added
/// when missing). Returns the path actually written.
///
/// # Errors
///
/// Returns an error if the path is not valid UTF-8 or the file cannot be
/// written.
pub fn save_capture(time_graph: &TimeGraph, path: &Path) -> Result<PathBuf> {
    let file_name = path
        .to_str()
        .ok_or_else(|| CaptureError::InvalidFileName(path.display().to_string()))?;
    let path = PathBuf::from(include_capture_extension(file_name));

    let info = {
        let capture = time_graph.capture().read();
        generate_capture_info(&capture, &time_graph.string_manager().key_to_string_map())
    };
    let timers = time_graph.ingested_timers();
    let num_timers = timers.len();

    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_capture(&mut writer, info, timers)
        .with_context(|| format!("Failed to write capture to {}", path.display()))?;
    writer.flush().with_context(|| format!("Failed to flush {}", path.display()))?;

    log::info!("Saved capture with {num_timers} timers to {}", path.display());
    Ok(path)
}

/// Load a capture file into a fresh time graph
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a capture file, or
/// references callstacks it does not contain.
pub fn load_capture(path: &Path, config: TimeGraphConfig) -> Result<TimeGraph> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let CaptureFile { capture: info, timers, .. } = read_capture(BufReader::new(file))
        .with_context(|| format!("Failed to read capture {}", path.display()))?;

    let capture = capture_data_from_info(&info)?;
    let strings = Arc::new(StringManager::new());
    for (&key, value) in &info.key_to_string {
        strings.add_if_not_present(key, value.clone());
    }

    let mut time_graph = TimeGraph::with_string_manager(config, capture.into_shared(), strings);
    let sink = time_graph.sink();
    for timer in &timers {
        sink.replay(timer);
    }
    for event in &info.callstack_events {
        time_graph.registry().on_callstack_event(event);
    }
    time_graph.update_capture_min_max_timestamps();

    log::info!(
        "Loaded capture of {} ({} timers, {} callstack events) from {}",
        info.process_name,
        timers.len(),
        info.callstack_events.len(),
        path.display()
    );
    Ok(time_graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn capture() -> CaptureData {
        let mut capture = CaptureData::new(42, "game", [FunctionInfo::new("tick", 0x10, 0x1000)]);
        if let chrono::LocalResult::Single(time) = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7) {
            capture.set_capture_start_time(time);
        }
        capture
    }

    #[test]
    fn test_capture_file_name() {
        assert_eq!(capture_file_name(&capture()), "game_2024_03_09_14_05_07.orbit");
    }

    #[test]
    fn test_extension_only_exact_suffix() {
        assert_eq!(include_capture_extension("foo.orb"), "foo.orb.orbit");
        assert_eq!(include_capture_extension(""), ".orbit");
    }

    #[test]
    fn test_unknown_callstack_rejected() {
        let mut info = generate_capture_info(&capture(), &FxHashMap::default());
        info.callstack_events.push(CallstackEvent {
            time: 5,
            callstack_hash: 0xdead,
            thread_id: 1,
        });
        let err = capture_data_from_info(&info).err();
        assert!(matches!(err, Some(CaptureError::UnknownCallstack { time: 5, hash: 0xdead })));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let info = generate_capture_info(&capture(), &FxHashMap::default());
        let mut buffer = Vec::new();
        let file = CaptureFile {
            header: CaptureFileHeader { version: 99 },
            capture: info,
            timers: Vec::new(),
        };
        serde_json::to_writer(&mut buffer, &file).expect("serialize");
        assert!(matches!(
            read_capture(buffer.as_slice()),
            Err(CaptureError::UnsupportedVersion { found: 99, .. })
        ));
    }
}
