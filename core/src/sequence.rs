use crate::row::Row;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// What the last mutation of the displayed sequence did. One stamp is
/// emitted per bulk operation, never one per row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceChange {
    Reset,
    Replaced,
    Appended { count: usize },
    Inserted { at: usize, count: usize },
    Removed { count: usize },
}

/// Snapshot of the sequence's observable attributes after a mutation.
///
/// `filtered` counts the parent rows passing the active filter; `visible`
/// is the published length. The two intentionally diverge while the
/// remainder of a fresh load streams in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceStamp {
    pub version: u64,
    pub change: SequenceChange,
    pub visible: usize,
    pub filtered: usize,
    pub total: usize,
}

/// The currently displayed, ordered row list.
///
/// This is the single consumer-facing owner of structural display state:
/// every mutation funnels through its lock, and the token-gated variants
/// re-check their cancellation token inside the critical section. That is
/// what guarantees an operation superseded mid-flight can never publish
/// over its successor's result.
pub(crate) struct RowSequence {
    state: Mutex<SequenceState>,
    stamp_tx: watch::Sender<SequenceStamp>,
}

struct SequenceState {
    rows: Vec<Arc<Row>>,
    filtered: usize,
    total: usize,
    version: u64,
}

impl RowSequence {
    pub(crate) fn new() -> Self {
        let (stamp_tx, _) = watch::channel(SequenceStamp {
            version: 0,
            change: SequenceChange::Reset,
            visible: 0,
            filtered: 0,
            total: 0,
        });
        Self {
            state: Mutex::new(SequenceState {
                rows: Vec::new(),
                filtered: 0,
                total: 0,
                version: 0,
            }),
            stamp_tx,
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SequenceStamp> {
        self.stamp_tx.subscribe()
    }

    pub(crate) async fn rows(&self) -> Vec<Arc<Row>> {
        self.state.lock().await.rows.clone()
    }

    /// (filtered, total) as last published.
    pub(crate) async fn counts(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.filtered, state.total)
    }

    /// Unconditional wholesale replacement; used by the load path before
    /// any background work is in flight.
    pub(crate) async fn replace(&self, rows: Vec<Arc<Row>>, filtered: usize, total: usize) {
        let mut state = self.state.lock().await;
        state.rows = rows;
        state.filtered = filtered;
        state.total = total;
        self.emit(&mut state, SequenceChange::Replaced);
    }

    /// Wholesale replacement on behalf of a cancellable operation. The
    /// token is re-checked under the lock; a superseded operation's result
    /// is silently dropped.
    pub(crate) async fn replace_if(
        &self,
        token: &CancellationToken,
        rows: Vec<Arc<Row>>,
        filtered: usize,
        total: usize,
    ) -> bool {
        let mut state = self.state.lock().await;
        if token.is_cancelled() {
            return false;
        }
        state.rows = rows;
        state.filtered = filtered;
        state.total = total;
        self.emit(&mut state, SequenceChange::Replaced);
        true
    }

    /// Appends one batch as a single mutation, unless the batch-loading
    /// token was cancelled in the meantime.
    pub(crate) async fn append_if(&self, token: &CancellationToken, batch: Vec<Arc<Row>>) -> bool {
        let mut state = self.state.lock().await;
        if token.is_cancelled() {
            return false;
        }
        let count = batch.len();
        state.rows.extend(batch);
        self.emit(&mut state, SequenceChange::Appended { count });
        true
    }

    /// Splices `children` in immediately after `parent`, preserving their
    /// order. No-op (returns 0) when the parent is not currently visible.
    pub(crate) async fn insert_children_after(
        &self,
        parent: &Arc<Row>,
        children: &[Arc<Row>],
    ) -> usize {
        let mut state = self.state.lock().await;
        let Some(position) = state.rows.iter().position(|row| Arc::ptr_eq(row, parent)) else {
            return 0;
        };
        let at = position + 1;
        state.rows.splice(at..at, children.iter().cloned());
        self.emit(
            &mut state,
            SequenceChange::Inserted {
                at,
                count: children.len(),
            },
        );
        children.len()
    }

    /// Removes every child of `parent` from the sequence, wherever it
    /// sits. Returns the number of rows removed.
    pub(crate) async fn remove_children_of(&self, parent: &Arc<Row>) -> usize {
        let mut state = self.state.lock().await;
        let before = state.rows.len();
        state
            .rows
            .retain(|row| row.parent().is_none_or(|owner| !Arc::ptr_eq(&owner, parent)));
        let removed = before - state.rows.len();
        if removed > 0 {
            self.emit(&mut state, SequenceChange::Removed { count: removed });
        }
        removed
    }

    fn emit(&self, state: &mut SequenceState, change: SequenceChange) {
        state.version += 1;
        let _ = self.stamp_tx.send(SequenceStamp {
            version: state.version,
            change,
            visible: state.rows.len(),
            filtered: state.filtered,
            total: state.total,
        });
    }
}
