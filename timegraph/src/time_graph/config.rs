//! Time graph configuration

use std::time::Duration;

use super::layout::TimeGraphLayout;

/// Tunables of a [`TimeGraph`](super::TimeGraph)
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGraphConfig {
    /// How much of the capture end `zoom_all` shows
    pub history_seconds: f64,

    /// Duration of one capture clock tick
    pub tick_period_us: f64,

    /// Minimum interval between track re-sorts while capturing
    pub resort_interval: Duration,

    pub layout: TimeGraphLayout,
}

impl Default for TimeGraphConfig {
    fn default() -> Self {
        Self {
            history_seconds: 2.0,
            // Nanosecond ticks
            tick_period_us: 0.001,
            resort_interval: Duration::from_millis(1000),
            layout: TimeGraphLayout::default(),
        }
    }
}

impl TimeGraphConfig {
    #[must_use]
    pub fn history_us(&self) -> f64 {
        self.history_seconds * 1_000_000.0
    }
}
