use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Where the currently published list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    Empty,
    Cache,
    Network,
}

/// Snapshot of one published collection.
///
/// `items` is replaced wholesale, never patched. `generation` is the run that
/// last wrote this state (0 before any run).
#[derive(Debug, Clone)]
pub struct ViewState<T> {
    pub items: Arc<Vec<T>>,
    pub loading: bool,
    pub error: Option<String>,
    pub origin: Origin,
    pub generation: u64,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            loading: false,
            error: None,
            origin: Origin::Empty,
            generation: 0,
        }
    }
}

/// Published state plus the run counter guarding it.
///
/// Every run takes a generation from `begin`. A run may write state only if
/// no newer run has written already, so a slow response resolving last
/// cannot overwrite fresher data.
pub(crate) struct Collection<T> {
    name: &'static str,
    tx: watch::Sender<ViewState<T>>,
    started: AtomicU64,
}

impl<T> Collection<T> {
    pub(crate) fn new(name: &'static str) -> Self {
        let (tx, _rx) = watch::channel(ViewState::default());
        Self {
            name,
            tx,
            started: AtomicU64::new(0),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.tx.subscribe()
    }

    pub(crate) fn snapshot(&self) -> ViewState<T> {
        let state = self.tx.borrow();
        ViewState {
            items: Arc::clone(&state.items),
            loading: state.loading,
            error: state.error.clone(),
            origin: state.origin,
            generation: state.generation,
        }
    }

    /// Start a run: mark loading, clear the previous error.
    pub(crate) fn begin(&self) -> u64 {
        let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        generation
    }

    /// Replace the published items. Returns whether the write was accepted.
    ///
    /// Cached data never replaces data that already came from the network.
    pub(crate) fn publish(&self, generation: u64, items: Vec<T>, origin: Origin) -> bool {
        let name = self.name;
        self.tx.send_if_modified(|state| {
            if generation < state.generation {
                tracing::debug!(collection = name, generation, current = state.generation, "Dropping stale result");
                return false;
            }
            if origin == Origin::Cache && state.origin == Origin::Network {
                return false;
            }
            state.items = Arc::new(items);
            state.origin = origin;
            state.generation = generation;
            if origin == Origin::Network {
                state.error = None;
            }
            true
        })
    }

    /// Record a failed run. Previously published items stay as they are.
    pub(crate) fn fail(&self, generation: u64, error: String) -> bool {
        let name = self.name;
        self.tx.send_if_modified(|state| {
            if generation < state.generation {
                tracing::debug!(collection = name, generation, current = state.generation, "Dropping stale error");
                return false;
            }
            state.error = Some(error);
            state.generation = generation;
            true
        })
    }

    /// End a run. Only the newest started run clears `loading`.
    pub(crate) fn finish(&self, generation: u64) {
        let latest = self.started.load(Ordering::SeqCst);
        self.tx.send_if_modified(|state| {
            if generation == latest && state.loading {
                state.loading = false;
                true
            } else {
                false
            }
        });
    }
}
