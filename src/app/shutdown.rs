//! Graceful shutdown handling.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{Diagnostics, FlushOutcome};

/// Stops the review task, flushes what is still buffered and closes every
/// connection.
///
/// The review task runs one last review after cancellation, so records logged
/// just before shutdown are still shown.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    review_task: Option<JoinHandle<()>>,
    diagnostics: &Arc<Diagnostics>,
) -> FlushOutcome {
    cancel.cancel();
    if let Some(review_task) = review_task {
        if let Err(e) = review_task.await {
            log::warn!("Diagnostics review task ended abnormally: {e}");
        }
    }

    let outcome = diagnostics.flush().await;
    diagnostics.connections().close_all().await;
    outcome
}
