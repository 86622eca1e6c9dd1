//! Concurrent rendering of independent jobs.

use futures::future::join_all;
use tokio::sync::{watch, Semaphore};
use tracing::info;

use recaps_models::{RenderJob, RenderOutcome};

use crate::error::RenderResult;
use crate::renderer::Renderer;

/// Render `jobs` with at most `max_concurrent_renders` in flight.
///
/// Each job gets its own result, in input order; a failure never aborts the
/// others.
pub async fn render_batch(
    renderer: &Renderer,
    jobs: &[RenderJob],
    cancel: Option<watch::Receiver<bool>>,
) -> Vec<RenderResult<RenderOutcome>> {
    let permits = renderer.config().max_concurrent_renders.max(1);
    let semaphore = Semaphore::new(permits);
    info!(jobs = jobs.len(), max_concurrent = permits, "Starting render batch");

    let futures = jobs.iter().map(|job| {
        let semaphore = &semaphore;
        let cancel = cancel.clone();
        async move {
            // Never closed, so acquire only waits
            let _permit = semaphore.acquire().await.ok();
            renderer.render(job, cancel).await
        }
    });

    let results = join_all(futures).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    info!(
        succeeded,
        failed = results.len() - succeeded,
        "Render batch finished"
    );
    results
}
