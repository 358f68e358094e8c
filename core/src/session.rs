use crate::cancel::CancelRegistry;
use crate::cancel::OpClass;
use crate::config::SessionConfig;
use crate::display;
use crate::error::Result;
use crate::error::RolodexError;
use crate::expand;
use crate::filter;
use crate::index;
use crate::index::IndexReport;
use crate::materialize;
use crate::model::Contact;
use crate::model::ContactStore;
use crate::row::Row;
use crate::sequence::RowSequence;
use crate::sequence::SequenceStamp;
use crate::source;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::sync::RwLock;
use tokio::sync::watch;
use tracing::info;
use tracing::warn;

/// Counters bumped by background stages; read through [`StatsSnapshot`].
#[derive(Debug, Default)]
pub(crate) struct PipelineStats {
    pub(crate) filter_passes: AtomicUsize,
    pub(crate) batches_applied: AtomicUsize,
}

/// Point-in-time view of the session's pipeline counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub filter_passes: usize,
    pub batches_applied: usize,
    pub index_built: bool,
}

/// Outcome of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub contacts: usize,
    pub initial_visible: usize,
}

/// A single-dataset directory session: load, progressive display,
/// background indexing, debounced filtering, and expansion, behind one
/// cloneable handle.
///
/// All structural display mutation funnels through the session's row
/// sequence; background work computes pure results and hands them back
/// for token-gated application. `shutdown` cancels the root scope and
/// with it every class of background work.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    store: RwLock<ContactStore>,
    master: RwLock<Arc<Vec<Arc<Row>>>>,
    sequence: Arc<RowSequence>,
    cancel: CancelRegistry,
    index_built: Arc<AtomicBool>,
    query: Mutex<String>,
    stats: Arc<PipelineStats>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate().map_err(RolodexError::InvalidConfig)?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                store: RwLock::new(ContactStore::default()),
                master: RwLock::new(Arc::new(Vec::new())),
                sequence: Arc::new(RowSequence::new()),
                cancel: CancelRegistry::new(),
                index_built: Arc::new(AtomicBool::new(false)),
                query: Mutex::new(String::new()),
                stats: Arc::new(PipelineStats::default()),
            }),
        })
    }

    /// Reads, parses, and loads a dataset from disk. An unreadable or
    /// unparsable source leaves the session empty but usable: "no data
    /// loaded" rather than a crash.
    pub async fn load_from_path(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        match source::read_contacts(path).await {
            Ok(contacts) => Ok(self.load_contacts(contacts).await),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "load failed; no data loaded");
                self.clear_dataset().await;
                Err(err)
            }
        }
    }

    /// Replaces the dataset wholesale: supersedes all in-flight work,
    /// rebuilds the master cache, publishes the initial display slice,
    /// then starts the progressive batch append and (unless disabled) a
    /// background index build.
    pub async fn load_contacts(&self, contacts: Vec<Contact>) -> LoadReport {
        let started = Instant::now();
        self.supersede_all().await;

        let store = ContactStore::from_contacts(contacts);
        let rows =
            materialize::materialize_parent_rows(store.contacts(), self.inner.config.max_workers)
                .await;
        let master = Arc::new(rows);
        let total = master.len();

        self.inner.index_built.store(false, Ordering::Release);
        *self.inner.store.write().await = store;
        *self.inner.master.write().await = master.clone();
        self.inner.query.lock().await.clear();

        display::publish_initial(
            &self.inner.sequence,
            &master,
            self.inner.config.initial_display_rows,
        )
        .await;
        let initial_visible = total.min(self.inner.config.initial_display_rows);

        let batch_token = self.inner.cancel.begin(OpClass::BatchLoad).await;
        display::spawn_batch_append(
            self.inner.sequence.clone(),
            master,
            self.inner.stats.clone(),
            batch_token,
            initial_visible,
            self.inner.config.batch_size,
            self.inner.config.batch_grace(),
            self.inner.config.batch_pause(),
        );

        if self.inner.config.auto_index {
            let session = self.clone();
            tokio::spawn(async move {
                session.rebuild_index().await;
            });
        }

        info!(
            contacts = total,
            initial_visible,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dataset loaded"
        );
        LoadReport {
            contacts: total,
            initial_visible,
        }
    }

    /// Builds search strings for every not-yet-indexed row of the current
    /// master cache. Supersedes an in-flight build; rerunning after a
    /// completed build is a no-op.
    pub async fn rebuild_index(&self) -> IndexReport {
        let token = self.inner.cancel.begin(OpClass::Indexing).await;
        let master = self.master_rows().await;
        index::build_search_index(
            master,
            token,
            self.inner.index_built.clone(),
            self.inner.config.max_workers,
        )
        .await
    }

    /// Registers a keystroke of query input. The actual filter pass runs
    /// only after the input stays quiet for the debounce interval; every
    /// call restarts that wait, so a burst of keystrokes coalesces into
    /// one pass over the final text.
    pub async fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        *self.inner.query.lock().await = text.clone();
        let token = self.inner.cancel.begin(OpClass::Debounce).await;
        let debounce = self.inner.config.debounce();
        let session = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }
            session.run_filter_pass(&text).await;
        });
    }

    /// Drops the query and restores the full master cache immediately,
    /// without waiting out a debounce interval.
    pub async fn clear_query(&self) {
        self.inner.query.lock().await.clear();
        self.inner.cancel.supersede(OpClass::Debounce).await;
        self.run_filter_pass("").await;
    }

    async fn run_filter_pass(&self, text: &str) {
        let master = self.master_rows().await;
        filter::execute_query(
            &self.inner.cancel,
            &self.inner.sequence,
            master,
            &self.inner.index_built,
            &self.inner.stats,
            text,
        )
        .await;
    }

    /// Toggles a parent row's expansion, splicing its (lazily
    /// materialized) children in or out of the displayed sequence.
    pub async fn toggle_expand(&self, row: &Arc<Row>) -> bool {
        expand::toggle_expand(&self.inner.sequence, row).await
    }

    /// Snapshot of the currently displayed rows.
    pub async fn rows(&self) -> Vec<Arc<Row>> {
        self.inner.sequence.rows().await
    }

    /// (filtered, total) as last published.
    pub async fn counts(&self) -> (usize, usize) {
        self.inner.sequence.counts().await
    }

    /// Change notifications: one stamp per bulk sequence mutation.
    pub fn subscribe(&self) -> watch::Receiver<SequenceStamp> {
        self.inner.sequence.subscribe()
    }

    /// The complete, filter-independent parent-row cache for the current
    /// load.
    pub async fn master_rows(&self) -> Arc<Vec<Arc<Row>>> {
        self.inner.master.read().await.clone()
    }

    /// Number of contacts in the loaded dataset (zero when no data is
    /// loaded).
    pub async fn contact_count(&self) -> usize {
        self.inner.store.read().await.len()
    }

    pub async fn query(&self) -> String {
        self.inner.query.lock().await.clone()
    }

    pub fn index_built(&self) -> bool {
        self.inner.index_built.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            filter_passes: self.inner.stats.filter_passes.load(Ordering::Relaxed),
            batches_applied: self.inner.stats.batches_applied.load(Ordering::Relaxed),
            index_built: self.index_built(),
        }
    }

    /// Tears the session down: cancels the root cancellation scope, which
    /// fans out to every class of background work. Call once at session
    /// end; later background activity becomes a silent no-op.
    pub fn shutdown(&self) {
        self.inner.cancel.shutdown();
        info!("session torn down");
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.cancel.is_shutdown()
    }

    async fn clear_dataset(&self) {
        self.supersede_all().await;
        self.inner.index_built.store(false, Ordering::Release);
        *self.inner.store.write().await = ContactStore::default();
        *self.inner.master.write().await = Arc::new(Vec::new());
        self.inner.query.lock().await.clear();
        self.inner.sequence.replace(Vec::new(), 0, 0).await;
    }

    async fn supersede_all(&self) {
        for class in [
            OpClass::Debounce,
            OpClass::Search,
            OpClass::Indexing,
            OpClass::BatchLoad,
        ] {
            self.inner.cancel.supersede(class).await;
        }
    }
}
