//! Human readable durations for labels

use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Format a duration with the largest unit that keeps the value above one
///
/// ```
/// use std::time::Duration;
/// use timegraph::render::pretty_time;
///
/// assert_eq!(pretty_time(Duration::from_nanos(1_500)), "1.500 us");
/// ```
#[must_use]
pub fn pretty_time(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if duration < Duration::from_micros(1) {
        format!("{:.3} ns", secs * 1e9)
    } else if duration < Duration::from_millis(1) {
        format!("{:.3} us", secs * 1e6)
    } else if duration < Duration::from_secs(1) {
        format!("{:.3} ms", secs * 1e3)
    } else if duration < MINUTE {
        format!("{secs:.3} s")
    } else if duration < HOUR {
        format!("{:.3} min", secs / 60.0)
    } else if duration < DAY {
        format!("{:.3} h", secs / 3600.0)
    } else {
        format!("{:.3} days", secs / 86_400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_selection() {
        assert_eq!(pretty_time(Duration::from_nanos(12)), "12.000 ns");
        assert_eq!(pretty_time(Duration::from_micros(250)), "250.000 us");
        assert_eq!(pretty_time(Duration::from_millis(16)), "16.000 ms");
        assert_eq!(pretty_time(Duration::from_secs(2)), "2.000 s");
        assert_eq!(pretty_time(Duration::from_secs(90)), "1.500 min");
        assert_eq!(pretty_time(Duration::from_secs(2 * 3600)), "2.000 h");
        assert_eq!(pretty_time(Duration::from_secs(36 * 3600)), "1.500 days");
    }
}
