use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Classes of background work whose instances supersede one another.
/// Starting a new operation of a class cancels the previous one of the
/// same class and never disturbs the other classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum OpClass {
    Debounce,
    Search,
    Indexing,
    BatchLoad,
}

/// Owns the session root cancellation scope and one live child token per
/// operation class. Cancelling the root (teardown) fans out to every
/// class; tokens handed out after teardown are born cancelled, so late
/// operations become silent no-ops.
pub(crate) struct CancelRegistry {
    root: CancellationToken,
    slots: Mutex<HashMap<OpClass, CancellationToken>>,
}

impl CancelRegistry {
    pub(crate) fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Cancels the class's current token, installs a fresh child of the
    /// root in its place, and returns it.
    pub(crate) async fn begin(&self, class: OpClass) -> CancellationToken {
        let fresh = self.root.child_token();
        let mut slots = self.slots.lock().await;
        if let Some(previous) = slots.insert(class, fresh.clone()) {
            previous.cancel();
        }
        fresh
    }

    /// Cancels the class's current operation without starting a new one.
    pub(crate) async fn supersede(&self, class: OpClass) {
        if let Some(previous) = self.slots.lock().await.remove(&class) {
            previous.cancel();
        }
    }

    /// Cancels the root scope and, transitively, every class.
    pub(crate) fn shutdown(&self) {
        self.root.cancel();
    }

    pub(crate) fn is_shutdown(&self) -> bool {
        self.root.is_cancelled()
    }
}
