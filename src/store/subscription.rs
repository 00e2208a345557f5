use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};

/// A change callback registered with a store.
///
/// Listeners are compared by identity: clones of one `Listener` are the
/// same listener, two `Listener::new` calls never are.
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn() + Send + Sync>);

impl Listener {
    /// Wrap a callback into a listener handle.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Invoke the callback.
    pub fn call(&self) {
        (self.0)();
    }

    /// Whether both handles refer to the same listener.
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity key, stable while any clone of this listener is alive.
    fn key(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

#[derive(Default)]
struct Entries {
    // Listener identity to registration sequence number.
    by_identity: HashMap<usize, u64>,
    by_sequence: BTreeMap<u64, Listener>,
    next_sequence: u64,
}

/// Insertion-ordered set of listeners, deduplicated by identity.
#[derive(Default)]
pub(crate) struct ListenerSet {
    entries: RwLock<Entries>,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns false if the listener was already registered.
    pub(crate) fn insert(&self, listener: &Listener) -> bool {
        let mut entries = self.entries.write();
        let sequence = entries.next_sequence;
        if entries.by_identity.contains_key(&listener.key()) {
            return false;
        }
        entries.next_sequence += 1;
        entries.by_identity.insert(listener.key(), sequence);
        entries.by_sequence.insert(sequence, listener.clone());
        true
    }

    /// Returns false if the listener was not registered.
    pub(crate) fn remove(&self, listener: &Listener) -> bool {
        let mut entries = self.entries.write();
        match entries.by_identity.remove(&listener.key()) {
            Some(sequence) => {
                entries.by_sequence.remove(&sequence);
                true
            }
            None => false,
        }
    }

    /// Stable copy of the current listeners in registration order, safe to
    /// iterate while the set is being changed.
    pub(crate) fn snapshot(&self) -> Vec<Listener> {
        self.entries.read().by_sequence.values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().by_sequence.len()
    }
}

/// Disposer returned by [`Store::subscribe`](crate::Store::subscribe).
///
/// Dropping the subscription removes its listener. Use [`detach`](Self::detach)
/// to keep the listener registered for as long as the store lives.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    listener: Option<Listener>,
    listeners: Weak<ListenerSet>,
}

impl Subscription {
    pub(crate) fn new(listener: Listener, listeners: &Arc<ListenerSet>) -> Self {
        Self {
            listener: Some(listener),
            listeners: Arc::downgrade(listeners),
        }
    }

    /// Remove exactly this subscription's listener. Calling it again is a no-op.
    pub fn unsubscribe(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        if let Some(listeners) = self.listeners.upgrade() {
            let removed = listeners.remove(&listener);
            tracing::trace!(removed, remaining = listeners.len(), "store listener unsubscribed");
        }
    }

    /// Whether [`unsubscribe`](Self::unsubscribe) has not run yet.
    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    /// Give up the disposer, leaving the listener registered.
    pub fn detach(mut self) {
        self.listener = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_set_collapses_duplicates() {
        let set = ListenerSet::new();
        let listener = Listener::new(|| {});

        assert!(set.insert(&listener));
        assert!(!set.insert(&listener.clone()));
        assert_eq!(set.len(), 1);

        assert!(set.insert(&Listener::new(|| {})));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn snapshot_keeps_registration_order_after_removals() {
        let set = ListenerSet::new();
        let listeners: Vec<_> = (0..6).map(|_| Listener::new(|| {})).collect();
        for listener in &listeners {
            set.insert(listener);
        }

        set.remove(&listeners[1]);
        set.remove(&listeners[4]);
        set.insert(&listeners[1]);

        let order: Vec<_> = set
            .snapshot()
            .iter()
            .map(|listener| listeners.iter().position(|l| l.ptr_eq(listener)))
            .collect();
        assert_eq!(order, vec![Some(0), Some(2), Some(3), Some(5), Some(1)]);
    }

    #[test]
    fn removing_many_listeners_empties_the_set() {
        let set = ListenerSet::new();
        let listeners: Vec<_> = (0..1_000).map(|_| Listener::new(|| {})).collect();
        for listener in &listeners {
            assert!(set.insert(listener));
        }
        for listener in listeners.iter().rev() {
            assert!(set.remove(listener));
        }
        assert_eq!(set.len(), 0);
        assert!(set.snapshot().is_empty());
    }

    #[test]
    fn removing_unknown_listener_is_noop() {
        let set = ListenerSet::new();
        set.insert(&Listener::new(|| {}));

        assert!(!set.remove(&Listener::new(|| {})));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn subscription_outliving_its_set_is_harmless() {
        let set = Arc::new(ListenerSet::new());
        let listener = Listener::new(|| {});
        set.insert(&listener);
        let mut subscription = Subscription::new(listener, &set);

        drop(set);
        subscription.unsubscribe();
        assert!(!subscription.is_active());
    }
}
