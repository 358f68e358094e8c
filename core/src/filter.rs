use crate::cancel::CancelRegistry;
use crate::cancel::OpClass;
use crate::row::Row;
use crate::sequence::RowSequence;
use crate::session::PipelineStats;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::debug;

/// Token-check cadence during a scan. Substring tests are cheap; checking
/// every row would cost more than the scan itself.
const SCAN_CANCEL_STRIDE: usize = 1024;

/// Trims and case-folds a raw query. `None` means "no filter".
pub(crate) fn normalize_query(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Runs one filter pass over a master-cache snapshot and publishes the
/// result as a single wholesale replacement.
///
/// The pass takes a fresh search-class token, superseding any pass still
/// in flight; the superseded pass's publish is rejected by the token
/// re-check under the sequence lock, so an older result can never
/// overwrite a newer one no matter which scan finishes first. A replaced
/// sequence must not receive stale progressive-load appends either, so
/// the batch-loading class is superseded before publishing.
pub(crate) async fn execute_query(
    cancel: &CancelRegistry,
    sequence: &RowSequence,
    master: Arc<Vec<Arc<Row>>>,
    index_built: &AtomicBool,
    stats: &PipelineStats,
    query: &str,
) {
    let token = cancel.begin(OpClass::Search).await;
    let total = master.len();

    let matches = match normalize_query(query) {
        // No filter: the whole master cache becomes the sequence.
        None => master.as_ref().clone(),
        Some(needle) => {
            let index_ready = index_built.load(Ordering::Acquire);
            let scan_token = token.clone();
            let scan_master = master.clone();
            let started = Instant::now();
            let outcome = tokio::task::spawn_blocking(move || {
                let mut hits = Vec::new();
                for (position, row) in scan_master.iter().enumerate() {
                    if position % SCAN_CANCEL_STRIDE == 0 && scan_token.is_cancelled() {
                        return None;
                    }
                    if row.matches(&needle, index_ready) {
                        hits.push(row.clone());
                    }
                }
                Some(hits)
            })
            .await;
            match outcome {
                Ok(Some(hits)) => {
                    stats.filter_passes.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        hits = hits.len(),
                        total,
                        index_ready,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "filter pass scanned"
                    );
                    hits
                }
                Ok(None) => {
                    debug!("filter scan superseded mid-flight");
                    return;
                }
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => return,
            }
        }
    };

    cancel.supersede(OpClass::BatchLoad).await;
    let filtered = matches.len();
    if !sequence.replace_if(&token, matches, filtered, total).await {
        debug!("filter result dropped, superseded before publish");
    }
}
