//! Change notification.
//!
//! The signal carries no payload: observers re-pull whatever they show from
//! the index. One added edge can create two nodes, so a precise "what
//! changed" set is not worth computing.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of the async subscription channel. Lagging subscribers only
/// lose duplicate signals.
const CHANNEL_CAPACITY: usize = 16;

/// The graph changed; re-read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphChanged;

type Observer = Arc<dyn Fn() + Send + Sync>;

/// Broadcasts [`GraphChanged`] to every observer.
///
/// Cloning yields another handle to the same set of observers.
#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Arc<Inner>,
}

struct Inner {
    observers: Mutex<Vec<Observer>>,
    tx: broadcast::Sender<GraphChanged>,
    generation: AtomicU64,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                observers: Mutex::new(Vec::new()),
                tx,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Registers a callback run synchronously on every [`fire`](Self::fire).
    pub fn observe(&self, observer: impl Fn() + Send + Sync + 'static) {
        self.inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    /// Returns a receiver for async consumers.
    pub fn subscribe(&self) -> broadcast::Receiver<GraphChanged> {
        self.inner.tx.subscribe()
    }

    /// Tells every observer the graph changed.
    pub fn fire(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("Graph changed (generation {})", generation);

        let observers: Vec<Observer> = self
            .inner
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer();
        }

        // No subscribers is fine.
        let _ = self.inner.tx.send(GraphChanged);
    }

    /// Number of times [`fire`](Self::fire) has run.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("generation", &self.generation())
            .field("subscribers", &self.inner.tx.receiver_count())
            .finish()
    }
}
