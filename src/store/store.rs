use super::subscription::{Listener, ListenerSet, Subscription};
use parking_lot::{ReentrantMutex, RwLock};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

/// A container owning a single state value.
///
/// The state only changes through [`set_state`](Store::set_state) and its
/// variants. A change is detected by identity: the updater must return a new
/// `Arc` to change the state, and handing back the current one is a no-op.
/// Every change notifies all registered listeners before the write returns.
///
/// Cloning a `Store` yields another handle to the same state and listeners.
pub struct Store<S> {
    state: Arc<RwLock<Arc<S>>>,
    writer: Arc<ReentrantMutex<()>>,
    listeners: Arc<ListenerSet>,
}

impl<S> Store<S> {
    /// Create a new store with the given initial state.
    pub fn new(initial: S) -> Self {
        Self::from_arc(Arc::new(initial))
    }

    /// Create a new store around an already shared state value.
    pub fn from_arc(initial: Arc<S>) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            writer: Arc::new(ReentrantMutex::new(())),
            listeners: Arc::new(ListenerSet::new()),
        }
    }

    /// The current state.
    pub fn get_snapshot(&self) -> Arc<S> {
        Arc::clone(&self.state.read())
    }

    /// Read the state without cloning the snapshot handle.
    ///
    /// The state lock is held while `f` runs, so `f` must not write to this
    /// store.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        let state = self.state.read();
        f(&state)
    }

    /// Compute the next state from the current one.
    ///
    /// Returning the very same `Arc` leaves the store untouched and notifies
    /// nobody. A panicking updater unwinds before anything is written.
    ///
    /// Writers are serialized: an updater always sees the state left by the
    /// previous write. An updater may itself write to the store on the same
    /// thread; the outer result then replaces the inner one.
    pub fn set_state<F>(&self, updater: F)
    where
        F: FnOnce(&Arc<S>) -> Arc<S>,
    {
        match self.write(|current| Ok::<_, Infallible>(updater(current))) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    /// Fallible [`set_state`](Store::set_state): an `Err` from the updater is
    /// returned unchanged and the state stays as it was.
    pub fn try_set_state<F, E>(&self, updater: F) -> Result<(), E>
    where
        F: FnOnce(&Arc<S>) -> Result<Arc<S>, E>,
    {
        self.write(updater)
    }

    /// Replace the state with a new value. Always notifies.
    pub fn set(&self, next: S) {
        self.set_state(|_| Arc::new(next));
    }

    /// Replace the state with a shared value. No-op if `next` is the current state.
    pub fn replace(&self, next: Arc<S>) {
        self.set_state(|_| next);
    }

    /// Register a listener, called after every state change.
    ///
    /// Subscribing a listener that is already registered has no further
    /// effect. The returned [`Subscription`] removes the listener when it is
    /// disposed or dropped.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        let added = self.listeners.insert(&listener);
        tracing::trace!(added, listeners = self.listeners.len(), "store listener subscribed");
        Subscription::new(listener, &self.listeners)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Capability handle for writing to this store.
    pub fn setter(&self) -> SetState<S> {
        SetState {
            store: self.clone(),
        }
    }

    /// Whether both handles refer to the same store.
    pub fn ptr_eq(&self, other: &Store<S>) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    fn write<F, E>(&self, updater: F) -> Result<(), E>
    where
        F: FnOnce(&Arc<S>) -> Result<Arc<S>, E>,
    {
        let changed = {
            let _writing = self.writer.lock();
            let current = self.get_snapshot();
            let next = updater(&current)?;
            if Arc::ptr_eq(&current, &next) {
                false
            } else {
                *self.state.write() = next;
                true
            }
        };

        if changed {
            self.notify();
        } else {
            tracing::trace!("state unchanged, skipping notification");
        }
        Ok(())
    }

    /// Notify all listeners of a state change.
    fn notify(&self) {
        let listeners = self.listeners.snapshot();
        tracing::trace!(listeners = listeners.len(), "state changed, notifying listeners");
        for listener in &listeners {
            listener.call();
        }
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            writer: Arc::clone(&self.writer),
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.get_snapshot())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Write access to a store, without the ability to read or subscribe.
///
/// Forwards to [`Store::set_state`] and [`Store::try_set_state`] unchanged.
pub struct SetState<S> {
    store: Store<S>,
}

impl<S> SetState<S> {
    /// See [`Store::set_state`].
    pub fn set_state<F>(&self, updater: F)
    where
        F: FnOnce(&Arc<S>) -> Arc<S>,
    {
        self.store.set_state(updater);
    }

    /// See [`Store::try_set_state`].
    pub fn try_set_state<F, E>(&self, updater: F) -> Result<(), E>
    where
        F: FnOnce(&Arc<S>) -> Result<Arc<S>, E>,
    {
        self.store.try_set_state(updater)
    }

    /// Whether this setter writes to `store`.
    pub fn targets(&self, store: &Store<S>) -> bool {
        self.store.ptr_eq(store)
    }
}

impl<S> Clone for SetState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}
