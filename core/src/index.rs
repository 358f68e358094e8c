use crate::row::Row;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Outcome of one index-build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    /// Rows whose search string was computed by this run.
    pub rows_indexed: usize,
    /// Rows that already carried a search string and were skipped.
    pub rows_skipped: usize,
    /// Whether the run covered the whole cache without being superseded.
    pub completed: bool,
}

/// Computes the search string for every parent row that does not have one
/// yet, fanning out over `max_workers` blocking workers on disjoint slices
/// of the master-cache snapshot.
///
/// The build is idempotent: each row is checked before any work is done,
/// so a rerun over an indexed cache reports zero rows indexed. A run
/// superseded mid-flight stops at the next token check and keeps whatever
/// it already wrote; recomputing those strings later would be wasteful but
/// never incorrect, so there is no rollback. Only an uncancelled, complete
/// run sets `index_built`, the flag the filter engine consults to switch
/// matching strategies.
pub(crate) async fn build_search_index(
    master: Arc<Vec<Arc<Row>>>,
    token: CancellationToken,
    index_built: Arc<AtomicBool>,
    max_workers: usize,
) -> IndexReport {
    let started = Instant::now();
    let indexed = Arc::new(AtomicUsize::new(0));
    let skipped = Arc::new(AtomicUsize::new(0));

    let workers = max_workers.clamp(1, master.len().max(1));
    let chunk_len = master.len().div_ceil(workers).max(1);

    let mut handles = Vec::with_capacity(workers);
    for start in (0..master.len()).step_by(chunk_len) {
        let master = master.clone();
        let token = token.clone();
        let indexed = indexed.clone();
        let skipped = skipped.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let end = (start + chunk_len).min(master.len());
            for row in &master[start..end] {
                if token.is_cancelled() {
                    return false;
                }
                if row.ensure_search_index() {
                    indexed.fetch_add(1, Ordering::Relaxed);
                } else {
                    skipped.fetch_add(1, Ordering::Relaxed);
                }
            }
            true
        }));
    }

    let mut covered = true;
    for handle in handles {
        match handle.await {
            Ok(done) => covered &= done,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                warn!("index worker aborted: {err}");
                covered = false;
            }
        }
    }

    let completed = covered && !token.is_cancelled();
    let report = IndexReport {
        rows_indexed: indexed.load(Ordering::Relaxed),
        rows_skipped: skipped.load(Ordering::Relaxed),
        completed,
    };
    if completed {
        index_built.store(true, Ordering::Release);
        info!(
            rows_indexed = report.rows_indexed,
            rows_skipped = report.rows_skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search index built"
        );
    } else {
        debug!(
            rows_indexed = report.rows_indexed,
            "search index build superseded before completion"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Address;
    use crate::model::Contact;
    use pretty_assertions::assert_eq;

    fn master(count: usize) -> Arc<Vec<Arc<Row>>> {
        Arc::new(
            (1..=count as u64)
                .map(|id| {
                    Row::parent_row(Arc::new(
                        Contact::new(id, format!("contact {id}"), format!("c{id}@example.com"))
                            .with_address(Address::new("home", "street", "Marseille", "13001")),
                    ))
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn second_run_does_no_redundant_work() {
        let rows = master(64);
        let flag = Arc::new(AtomicBool::new(false));

        let first = build_search_index(rows.clone(), CancellationToken::new(), flag.clone(), 4).await;
        assert_eq!(first.rows_indexed, 64);
        assert_eq!(first.rows_skipped, 0);
        assert!(first.completed);
        assert!(flag.load(Ordering::Acquire));

        let snapshot: Vec<String> = rows
            .iter()
            .map(|row| row.search_index().expect("indexed").to_string())
            .collect();

        let second = build_search_index(rows.clone(), CancellationToken::new(), flag.clone(), 4).await;
        assert_eq!(second.rows_indexed, 0);
        assert_eq!(second.rows_skipped, 64);
        assert!(second.completed);

        for (row, before) in rows.iter().zip(&snapshot) {
            assert_eq!(row.search_index(), Some(before.as_str()));
        }
    }

    #[tokio::test]
    async fn cancelled_run_leaves_the_flag_unset() {
        let rows = master(16);
        let flag = Arc::new(AtomicBool::new(false));
        let token = CancellationToken::new();
        token.cancel();

        let report = build_search_index(rows.clone(), token, flag.clone(), 2).await;
        assert!(!report.completed);
        assert!(!flag.load(Ordering::Acquire));
        // Whatever was written before the cancellation is retained.
        assert_eq!(report.rows_indexed, rows.iter().filter(|row| row.search_index().is_some()).count());
    }

    #[tokio::test]
    async fn empty_cache_still_counts_as_built() {
        let flag = Arc::new(AtomicBool::new(false));
        let report =
            build_search_index(Arc::new(Vec::new()), CancellationToken::new(), flag.clone(), 4)
                .await;
        assert!(report.completed);
        assert_eq!(report.rows_indexed, 0);
        assert!(flag.load(Ordering::Acquire));
    }
}
