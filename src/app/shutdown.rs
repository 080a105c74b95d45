//! Graceful shutdown handling.

use tokio_util::sync::CancellationToken;

use crate::scheduler::Supervisor;

/// Shuts down all background tasks gracefully.
///
/// Stops the progress logger, then cancels every link task and waits for
/// them to exit. Checks and deliveries in flight are abandoned; nothing they
/// would have recorded is half-applied.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    logging_task: Option<tokio::task::JoinHandle<()>>,
    supervisor: Supervisor,
) {
    // Signal logging task to stop and await it
    cancel.cancel();
    if let Some(logging_task) = logging_task {
        let _ = logging_task.await;
    }

    supervisor.shutdown().await;
}
