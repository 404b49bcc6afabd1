//! Per-capture model: process identity, selected functions, callstacks and
//! running statistics.

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::callstack::{Callstack, CallstackData, CallstackEvent};
use super::function::{FunctionInfo, FunctionStats};

/// Capture data shared between the producer and the consumer
pub type SharedCaptureData = Arc<RwLock<CaptureData>>;

/// Symbol offset information for a sampled address
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressInfo {
    pub absolute_address: u64,
    pub offset_in_function: u64,
    pub function_name: String,
    pub module_path: String,
}

#[derive(Debug)]
pub struct CaptureData {
    process_id: i32,
    process_name: String,
    /// Keyed by absolute address
    selected_functions: FxHashMap<u64, FunctionInfo>,
    address_infos: FxHashMap<u64, AddressInfo>,
    callstack_data: CallstackData,
    /// Keyed by absolute address
    functions_stats: FxHashMap<u64, FunctionStats>,
    thread_names: FxHashMap<i32, String>,
    capture_start_time: DateTime<Local>,
}

impl Default for CaptureData {
    fn default() -> Self {
        Self {
            process_id: -1,
            process_name: String::new(),
            selected_functions: FxHashMap::default(),
            address_infos: FxHashMap::default(),
            callstack_data: CallstackData::default(),
            functions_stats: FxHashMap::default(),
            thread_names: FxHashMap::default(),
            capture_start_time: Local::now(),
        }
    }
}

impl CaptureData {
    #[must_use]
    pub fn new(
        process_id: i32,
        process_name: impl Into<String>,
        selected_functions: impl IntoIterator<Item = FunctionInfo>,
    ) -> Self {
        Self {
            process_id,
            process_name: process_name.into(),
            selected_functions: selected_functions
                .into_iter()
                .map(|function| (function.absolute_address(), function))
                .collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn into_shared(self) -> SharedCaptureData {
        Arc::new(RwLock::new(self))
    }

    #[must_use]
    pub fn process_id(&self) -> i32 {
        self.process_id
    }

    #[must_use]
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    #[must_use]
    pub fn capture_start_time(&self) -> DateTime<Local> {
        self.capture_start_time
    }

    pub fn set_capture_start_time(&mut self, time: DateTime<Local>) {
        self.capture_start_time = time;
    }

    // -------------------------------------------------------------------------
    // Functions
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn selected_function(&self, absolute_address: u64) -> Option<&FunctionInfo> {
        self.selected_functions.get(&absolute_address)
    }

    pub fn selected_functions(&self) -> impl Iterator<Item = &FunctionInfo> {
        self.selected_functions.values()
    }

    /// Fold one call into the function's statistics
    pub fn update_function_stats(&mut self, function: &FunctionInfo, duration_ns: u64) {
        self.functions_stats.entry(function.absolute_address()).or_default().record(duration_ns);
    }

    #[must_use]
    pub fn function_stats_or_default(&self, function: &FunctionInfo) -> FunctionStats {
        self.functions_stats.get(&function.absolute_address()).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn functions_stats(&self) -> &FxHashMap<u64, FunctionStats> {
        &self.functions_stats
    }

    /// Restore previously saved statistics (capture load)
    pub(crate) fn set_function_stats(&mut self, absolute_address: u64, stats: FunctionStats) {
        self.functions_stats.insert(absolute_address, stats);
    }

    // -------------------------------------------------------------------------
    // Addresses
    // -------------------------------------------------------------------------

    /// Insert or replace the info for an absolute address
    pub fn insert_address_info(&mut self, info: AddressInfo) {
        self.address_infos.insert(info.absolute_address, info);
    }

    #[must_use]
    pub fn address_info(&self, absolute_address: u64) -> Option<&AddressInfo> {
        self.address_infos.get(&absolute_address)
    }

    pub fn address_infos(&self) -> impl Iterator<Item = &AddressInfo> {
        self.address_infos.values()
    }

    // -------------------------------------------------------------------------
    // Callstacks
    // -------------------------------------------------------------------------

    pub fn add_unique_callstack(&mut self, callstack: Callstack) -> bool {
        self.callstack_data.add_unique_callstack(callstack)
    }

    /// # Panics
    ///
    /// Panics if the referenced callstack was never registered.
    pub fn add_callstack_event(&mut self, event: CallstackEvent) {
        self.callstack_data.add_callstack_event(event);
    }

    #[must_use]
    pub fn callstack_data(&self) -> &CallstackData {
        &self.callstack_data
    }

    #[must_use]
    pub fn callstack_events_in_time_range(&self, t0: u64, t1: u64) -> Vec<CallstackEvent> {
        self.callstack_data.callstack_events_in_time_range(t0, t1)
    }

    #[must_use]
    pub fn callstack_events_of_tid_in_time_range(
        &self,
        tid: i32,
        t0: u64,
        t1: u64,
    ) -> Vec<CallstackEvent> {
        self.callstack_data.callstack_events_of_tid_in_time_range(tid, t0, t1)
    }

    // -------------------------------------------------------------------------
    // Threads
    // -------------------------------------------------------------------------

    pub fn set_thread_name(&mut self, tid: i32, name: impl Into<String>) {
        self.thread_names.insert(tid, name.into());
    }

    /// Thread name, empty if unknown
    #[must_use]
    pub fn thread_name(&self, tid: i32) -> &str {
        self.thread_names.get(&tid).map_or("", String::as_str)
    }

    #[must_use]
    pub fn thread_names(&self) -> &FxHashMap<i32, String> {
        &self.thread_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_identity() {
        let capture = CaptureData::default();
        assert_eq!(capture.process_id(), -1);
        assert_eq!(capture.process_name(), "");
        assert_eq!(capture.selected_functions().count(), 0);
    }

    #[test]
    fn test_selected_functions_keyed_by_absolute_address() {
        let capture = CaptureData::new(42, "p", [FunctionInfo::new("foo", 123, 15)]);
        assert_eq!(capture.selected_function(138).map(|f| f.name.as_str()), Some("foo"));
        assert!(capture.selected_function(123).is_none());
    }

    #[test]
    fn test_address_info_upsert() {
        let mut capture = CaptureData::default();
        let mut info = AddressInfo { absolute_address: 987, ..AddressInfo::default() };
        capture.insert_address_info(info.clone());
        info.offset_in_function = 4;
        capture.insert_address_info(info.clone());
        capture.insert_address_info(info);
        assert_eq!(capture.address_infos().count(), 1);
        assert_eq!(capture.address_info(987).map(|i| i.offset_in_function), Some(4));
    }

    #[test]
    fn test_function_stats_monotonic() {
        let function = FunctionInfo::new("foo", 10, 0);
        let mut capture = CaptureData::new(1, "p", [function.clone()]);
        let mut previous = capture.function_stats_or_default(&function);
        for duration in [30, 10, 50, 20] {
            capture.update_function_stats(&function, duration);
            let stats = capture.function_stats_or_default(&function);
            assert!(stats.count > previous.count);
            assert!(stats.total_time_ns >= previous.total_time_ns);
            assert!(stats.min_ns <= stats.average_time_ns && stats.average_time_ns <= stats.max_ns);
            previous = stats;
        }
        assert_eq!(previous.min_ns, 10);
        assert_eq!(previous.max_ns, 50);
    }

    #[test]
    fn test_thread_names() {
        let mut capture = CaptureData::default();
        capture.set_thread_name(12, "render");
        assert_eq!(capture.thread_name(12), "render");
        assert_eq!(capture.thread_name(13), "");
    }
}
