//! Debounced user search for the two user pickers of a reconciliation session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use stockroom_core::models::directory::DirectoryUser;

use crate::reconcile::ReconcileBackend;

/// Which picker a search belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchSlot {
    Reference,
    Target,
}

impl SearchSlot {
    fn index(self) -> usize {
        match self {
            SearchSlot::Reference => 0,
            SearchSlot::Target => 1,
        }
    }
}

/// Search results delivered for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub slot: SearchSlot,
    pub query: String,
    /// Matching users, or the error message of a failed search.
    pub users: Result<Vec<DirectoryUser>, String>,
}

/// Owns one pending timer task per slot.
///
/// New input for a slot aborts that slot's pending task. Dropping the
/// debouncer aborts everything still pending.
pub struct SearchDebouncer<B: ReconcileBackend + 'static> {
    backend: Arc<B>,
    delay: Duration,
    min_query_len: usize,
    pending: [Option<JoinHandle<()>>; 2],
    tx: mpsc::UnboundedSender<SearchResults>,
    rx: mpsc::UnboundedReceiver<SearchResults>,
}

impl<B: ReconcileBackend + 'static> SearchDebouncer<B> {
    pub fn new(backend: Arc<B>, delay: Duration, min_query_len: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            backend,
            delay,
            min_query_len,
            pending: [None, None],
            tx,
            rx,
        }
    }

    /// Record new input for `slot`.
    ///
    /// Queries shorter than the minimum clear the slot's results right away and
    /// schedule nothing. Must be called from within a tokio runtime.
    pub fn input(&mut self, slot: SearchSlot, query: &str) {
        self.cancel(slot);

        let query = query.trim().to_string();
        if query.chars().count() < self.min_query_len {
            let _ = self.tx.send(SearchResults {
                slot,
                query,
                users: Ok(Vec::new()),
            });
            return;
        }

        let backend = self.backend.clone();
        let tx = self.tx.clone();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(?slot, query = %query, "running debounced search");
            let users = backend
                .search_users(&query)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(SearchResults { slot, query, users });
        });
        self.pending[slot.index()] = Some(handle);
    }

    /// Abort the pending search for `slot`, if any.
    pub fn cancel(&mut self, slot: SearchSlot) {
        if let Some(handle) = self.pending[slot.index()].take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, slot: SearchSlot) -> bool {
        self.pending[slot.index()]
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Wait for the next delivered result.
    pub async fn next(&mut self) -> Option<SearchResults> {
        self.rx.recv().await
    }

    /// Take a delivered result without waiting.
    pub fn try_next(&mut self) -> Option<SearchResults> {
        self.rx.try_recv().ok()
    }
}

impl<B: ReconcileBackend + 'static> Drop for SearchDebouncer<B> {
    fn drop(&mut self) {
        for handle in self.pending.iter_mut().filter_map(Option::take) {
            handle.abort();
        }
    }
}
