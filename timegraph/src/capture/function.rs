//! Instrumented functions and their running statistics

use serde::{Deserialize, Serialize};

/// Role a function plays in manual instrumentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InstrumentationKind {
    /// Ordinary function
    #[default]
    None,
    TimerStart,
    TimerStop,
    TimerStartAsync,
    TimerStopAsync,
    /// Carries a tracked value (or a string event) in its payload
    TrackValue,
}

/// A function selected for instrumentation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub pretty_name: String,
    /// Address relative to the module base
    pub address: u64,
    pub module_base_address: u64,
    pub size: u64,
    pub module_path: String,
    pub kind: InstrumentationKind,
}

impl FunctionInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, address: u64, module_base_address: u64) -> Self {
        Self { name: name.into(), address, module_base_address, ..Self::default() }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: InstrumentationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Address at which timers for this function are reported
    #[must_use]
    pub fn absolute_address(&self) -> u64 {
        self.address.wrapping_add(self.module_base_address)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.pretty_name.is_empty() {
            &self.name
        } else {
            &self.pretty_name
        }
    }
}

/// Running per-function statistics (nanoseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionStats {
    pub count: u64,
    pub total_time_ns: u64,
    pub average_time_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
}

impl FunctionStats {
    /// Fold one call into the statistics
    pub fn record(&mut self, duration_ns: u64) {
        self.count += 1;
        self.total_time_ns = self.total_time_ns.saturating_add(duration_ns);
        self.average_time_ns = self.total_time_ns / self.count;
        if self.count == 1 || duration_ns < self.min_ns {
            self.min_ns = duration_ns;
        }
        if duration_ns > self.max_ns {
            self.max_ns = duration_ns;
        }
    }
}
