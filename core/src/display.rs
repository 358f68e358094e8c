use crate::row::Row;
use crate::sequence::RowSequence;
use crate::session::PipelineStats;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

/// Publishes the first `threshold` rows of a fresh load immediately.
///
/// The filtered count is reported as the true total even though only a
/// slice is visible; the divergence is the signal that the remainder is
/// still loading.
pub(crate) async fn publish_initial(
    sequence: &RowSequence,
    master: &Arc<Vec<Arc<Row>>>,
    threshold: usize,
) {
    let visible = threshold.min(master.len());
    let initial = master[..visible].to_vec();
    sequence.replace(initial, master.len(), master.len()).await;
    info!(visible, total = master.len(), "initial rows published");
}

/// Streams the rows beyond the initial slice into the sequence in bounded
/// batches, yielding between appends.
///
/// The whole task runs under a batch-loading class token. Suspension is
/// delay-then-check: after every pause the token decides whether the next
/// batch may apply, and the append itself re-checks under the sequence
/// lock, so a batch whose token was cancelled between delay and apply is
/// a silent no-op.
pub(crate) fn spawn_batch_append(
    sequence: Arc<RowSequence>,
    master: Arc<Vec<Arc<Row>>>,
    stats: Arc<PipelineStats>,
    token: CancellationToken,
    start_at: usize,
    batch_size: usize,
    grace: Duration,
    pause: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if start_at >= master.len() {
            return;
        }
        tokio::select! {
            _ = token.cancelled() => return,
            _ = sleep(grace) => {}
        }
        let mut next = start_at;
        while next < master.len() {
            let end = (next + batch_size).min(master.len());
            let batch = master[next..end].to_vec();
            if !sequence.append_if(&token, batch).await {
                debug!(next, "batch append superseded");
                return;
            }
            stats.batches_applied.fetch_add(1, Ordering::Relaxed);
            next = end;
            if next < master.len() {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = sleep(pause) => {}
                }
            }
        }
        debug!(rows = master.len(), "progressive display complete");
    })
}
