use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Provided {
    context_id: usize,
    value: Arc<dyn Any + Send + Sync>,
}

// Thread-local stack of provided values, innermost last
thread_local! {
    static PROVIDER_STACK: RefCell<Vec<Provided>> = const { RefCell::new(Vec::new()) };
}

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A scope token for passing a value down a composition tree.
///
/// Values are provided with [`Context::provide`] for the duration of a
/// closure and read back with [`Context::get`] from anywhere inside it,
/// including nested component renders. The innermost provider wins.
///
/// # Examples
///
/// ```
/// use context_select::runtime::Context;
///
/// let theme = Context::<&'static str>::new();
/// assert_eq!(theme.get(), None);
///
/// theme.provide("dark", || {
///     assert_eq!(theme.get(), Some("dark"));
///     theme.provide("light", || assert_eq!(theme.get(), Some("light")));
///     assert_eq!(theme.get(), Some("dark"));
/// });
/// ```
pub struct Context<T> {
    id: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Clone + Send + Sync + 'static> Context<T> {
    /// Create a new scope token, distinct from every other one.
    pub fn new() -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            _marker: PhantomData,
        }
    }

    /// Run `f` with `value` provided for this context.
    ///
    /// The value is withdrawn when `f` returns, or when it unwinds.
    pub fn provide<F, R>(&self, value: T, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        PROVIDER_STACK.with(|stack| {
            stack.borrow_mut().push(Provided {
                context_id: self.id,
                value: Arc::new(value),
            });
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        PROVIDER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// The nearest provided value, or `None` outside of any provider.
    pub fn get(&self) -> Option<T> {
        PROVIDER_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .rev()
                .find(|provided| provided.context_id == self.id)
                .and_then(|provided| provided.value.downcast_ref::<T>().cloned())
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Context<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Context<T> {}

impl<T> PartialEq for Context<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Context<T> {}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_do_not_see_each_other() {
        let first = Context::<u8>::new();
        let second = Context::<u8>::new();

        first.provide(1, || {
            assert_eq!(first.get(), Some(1));
            assert_eq!(second.get(), None);
        });
    }

    #[test]
    fn provider_is_withdrawn_after_panic() {
        let ctx = Context::<u8>::new();

        let result = std::panic::catch_unwind(|| ctx.provide(1, || panic!("render failed")));

        assert!(result.is_err());
        assert_eq!(ctx.get(), None);
    }

    #[test]
    fn provide_returns_closure_result() {
        let ctx = Context::<String>::new();
        let len = ctx.provide("scoped".to_string(), || ctx.get().map(|s| s.len()));
        assert_eq!(len, Some(6));
    }
}
