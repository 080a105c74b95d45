//! Progress logging utilities.

use log::info;

use crate::error_handling::{EventType, MonitorStats};

/// Logs a one-line summary of the checks done so far.
///
/// # Arguments
///
/// * `start_time` - When monitoring started
/// * `stats` - Shared monitoring counters
pub fn log_progress(start_time: std::time::Instant, stats: &MonitorStats) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let checks = stats.total_checks();
    let rate = if elapsed_secs > 0.0 {
        checks as f64 * 60.0 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "{} checks ({} failed) in {:.0} seconds (~{:.1} checks/min), {} restock(s) announced",
        checks,
        stats.total_failed_checks(),
        elapsed_secs,
        rate,
        stats.get_event_count(EventType::BecameAvailable)
    );
}
