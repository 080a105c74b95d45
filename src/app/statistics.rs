//! Statistics printing.

use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{EventType, MonitorStats};
use crate::models::CheckOutcome;
use crate::notification::DeliveryStatus;

/// Prints check, delivery and event counts, then a one-line summary.
pub fn print_final_statistics(stats: &MonitorStats, elapsed_seconds: f64) {
    print_check_statistics(stats);

    let deliveries = stats.total_deliveries();
    if deliveries > 0 {
        info!("Delivery Counts ({} total):", deliveries);
        for status in DeliveryStatus::iter() {
            let count = stats.get_delivery_count(status);
            if count > 0 {
                info!("   {}: {}", status.as_str(), count);
            }
        }
    }

    let notable: Vec<(EventType, usize)> = EventType::iter()
        .map(|event| (event, stats.get_event_count(event)))
        .filter(|(_, count)| *count > 0)
        .collect();
    if !notable.is_empty() {
        info!("Events:");
        for (event, count) in notable {
            info!("   {}: {}", event.as_str(), count);
        }
    }

    let checks = stats.total_checks();
    info!(
        "✅ Ran {} check{} ({} failed) and {} deliver{} in {:.1}s",
        checks,
        if checks == 1 { "" } else { "s" },
        stats.total_failed_checks(),
        deliveries,
        if deliveries == 1 { "y" } else { "ies" },
        elapsed_seconds
    );
}

/// Prints the per-outcome check counts, skipping outcomes never seen.
pub fn print_check_statistics(stats: &MonitorStats) {
    let total = stats.total_checks();
    if total == 0 {
        return;
    }
    info!("Check Counts ({} total):", total);
    for outcome in CheckOutcome::iter() {
        let count = stats.get_check_count(outcome);
        if count > 0 {
            info!("   {}: {}", outcome.as_str(), count);
        }
    }
}
