use super::scoped::{use_store, ScopeToken};
use crate::error::Result;
use crate::runtime::RenderCx;
use std::fmt;
use std::sync::Arc;

type CompareFn<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// How [`read_selected`] decides two selected values are equivalent.
pub struct SelectorOptions<T> {
    compare: CompareFn<T>,
}

impl<T> SelectorOptions<T> {
    /// Use a custom comparator, e.g. a shallow comparison for values the
    /// selector rebuilds on every call.
    pub fn with_compare<F>(compare: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(compare),
        }
    }
}

impl<U: 'static> SelectorOptions<Arc<U>> {
    /// Treat selected `Arc`s as equal only when they point to the same value.
    pub fn by_identity() -> Self {
        Self::with_compare(Arc::ptr_eq)
    }
}

/// Compares with `==`.
impl<T: PartialEq + 'static> Default for SelectorOptions<T> {
    fn default() -> Self {
        Self::with_compare(|prev: &T, next: &T| prev == next)
    }
}

impl<T> Clone for SelectorOptions<T> {
    fn clone(&self) -> Self {
        Self {
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<T> fmt::Debug for SelectorOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorOptions").finish_non_exhaustive()
    }
}

/// The last value a selector call site handed out.
#[derive(Debug)]
pub struct SelectorMemo<T> {
    previous: Option<Arc<T>>,
}

impl<T> SelectorMemo<T> {
    pub fn new() -> Self {
        Self { previous: None }
    }

    /// Accept `next` unless `compare` finds it equivalent to the previous
    /// value, in which case the previous `Arc` is returned.
    ///
    /// The memo is only written after `compare` returns.
    pub fn resolve<C>(&mut self, next: T, compare: C) -> Arc<T>
    where
        C: FnOnce(&T, &T) -> bool,
    {
        if let Some(previous) = &self.previous {
            if compare(previous, &next) {
                return Arc::clone(previous);
            }
        }
        self.accept(next)
    }

    /// Cache `next` unconditionally.
    pub fn accept(&mut self, next: T) -> Arc<T> {
        let next = Arc::new(next);
        self.previous = Some(Arc::clone(&next));
        next
    }

    pub fn previous(&self) -> Option<&Arc<T>> {
        self.previous.as_ref()
    }
}

impl<T> Default for SelectorMemo<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a slice of the store provided for `scope`, re-rendering only when
/// that slice changes.
///
/// The returned `Arc` stays the same across renders as long as the
/// comparator in `options` judges the selected value unchanged, and the
/// component is only marked as needing a render when it does change. In
/// [`RenderMode::Server`](crate::runtime::RenderMode::Server) the selector
/// runs fresh on every call and the memo is left alone.
///
/// # Examples
///
/// ```
/// use context_select::runtime::Component;
/// use context_select::{create_scoped_store, read_selected, SelectorOptions};
/// use std::sync::Arc;
///
/// #[derive(Clone)]
/// struct Counters { a: u32, b: u32 }
///
/// let (scope, provider) = create_scoped_store(Counters { a: 1, b: 1 });
/// let mut view = Component::new(move |cx| {
///     read_selected(cx, &scope, |s: &Counters| s.a, SelectorOptions::default())
/// });
///
/// provider.provide(|| {
///     let first = view.render().unwrap();
///     provider.store().set_state(|s| Arc::new(Counters { b: 2, ..(**s).clone() }));
///     assert!(!view.needs_render());
///     assert!(Arc::ptr_eq(&first, &view.render().unwrap()));
/// });
/// ```
pub fn read_selected<S, T, F>(
    cx: &mut RenderCx<'_>,
    scope: &ScopeToken<S>,
    selector: F,
    options: SelectorOptions<T>,
) -> Result<Arc<T>>
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
    F: Fn(&S) -> T + Send + Sync + 'static,
{
    let memo = cx.use_ref(SelectorMemo::<T>::new);
    let store = match use_store(scope) {
        Ok(store) => store,
        Err(err) => {
            cx.skip_sync_external_store();
            return Err(err);
        }
    };
    let selector = Arc::new(selector);
    let compare = options.compare;

    let get_selected_snapshot = {
        let store = store.clone();
        let selector = Arc::clone(&selector);
        move || {
            let next = selector(&*store.get_snapshot());
            // The comparator may write to the store and re-enter this read.
            let previous = memo.lock().previous().cloned();
            match previous {
                Some(previous) if compare(&previous, &next) => previous,
                _ => memo.lock().accept(next),
            }
        }
    };

    let get_server_selected_snapshot = {
        let store = store.clone();
        move || Arc::new(selector(&*store.get_snapshot()))
    };

    Ok(cx.use_sync_external_store(
        |listener| store.subscribe(listener),
        get_selected_snapshot,
        get_server_selected_snapshot,
    ))
}
