pub mod keycode;

use std::time::Duration;

/// Convert positive, finite seconds to a Duration
pub fn secs_to_duration(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// Format a delay in milliseconds for menus and log lines
pub fn format_millis(secs: f64) -> String {
    format!("{:.0} ms", secs * 1000.0)
}
