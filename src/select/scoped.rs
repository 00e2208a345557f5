use crate::error::{MissingProviderError, Result};
use crate::runtime::Context;
use crate::store::{SetState, Store};
use std::fmt;

/// Scope token for looking up the store of a [`StoreProvider`].
pub struct ScopeToken<S> {
    context: Context<Store<S>>,
}

impl<S> Clone for ScopeToken<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for ScopeToken<S> {}

impl<S> fmt::Debug for ScopeToken<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScopeToken").field(&self.context).finish()
    }
}

/// Makes one store available to everything rendered inside it.
///
/// Every mount supplies the store allocated by [`create_scoped_store`], so
/// consumers never observe the store instance change.
pub struct StoreProvider<S> {
    context: Context<Store<S>>,
    store: Store<S>,
}

impl<S: Send + Sync + 'static> StoreProvider<S> {
    /// Mount the provider around `children`.
    pub fn provide<F, R>(&self, children: F) -> R
    where
        F: FnOnce() -> R,
    {
        tracing::debug!(
            state = std::any::type_name::<S>(),
            "mounting store provider"
        );
        self.context.provide(self.store.clone(), children)
    }

    /// The store this provider supplies.
    pub fn store(&self) -> &Store<S> {
        &self.store
    }
}

impl<S> Clone for StoreProvider<S> {
    fn clone(&self) -> Self {
        Self {
            context: self.context,
            store: self.store.clone(),
        }
    }
}

impl<S> fmt::Debug for StoreProvider<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreProvider")
            .field("context", &self.context)
            .field("listeners", &self.store.listener_count())
            .finish()
    }
}

/// Allocate a store holding `initial` and a scope to share it through.
///
/// # Examples
///
/// ```
/// use context_select::{create_scoped_store, use_store};
///
/// let (scope, provider) = create_scoped_store(10);
/// assert!(use_store(&scope).is_err());
///
/// provider.provide(|| {
///     let store = use_store(&scope).unwrap();
///     assert_eq!(*store.get_snapshot(), 10);
/// });
/// ```
pub fn create_scoped_store<S>(initial: S) -> (ScopeToken<S>, StoreProvider<S>)
where
    S: Send + Sync + 'static,
{
    let context = Context::new();
    let provider = StoreProvider {
        context,
        store: Store::new(initial),
    };
    (ScopeToken { context }, provider)
}

/// Resolve the store provided for `scope` at the current position.
pub fn use_store<S>(scope: &ScopeToken<S>) -> Result<Store<S>>
where
    S: Send + Sync + 'static,
{
    scope.context.get().ok_or_else(|| {
        tracing::debug!(
            state = std::any::type_name::<S>(),
            "no store provider mounted for scope"
        );
        MissingProviderError::for_state::<S>()
    })
}

/// Write access to the store provided for `scope`, without subscribing to it.
pub fn read_setter<S>(scope: &ScopeToken<S>) -> Result<SetState<S>>
where
    S: Send + Sync + 'static,
{
    Ok(use_store(scope)?.setter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn every_mount_supplies_the_same_store() {
        let (scope, provider) = create_scoped_store(0);

        let first = provider.provide(|| use_store(&scope)).unwrap();
        let second = provider.clone().provide(|| use_store(&scope)).unwrap();

        assert!(first.ptr_eq(&second));
        assert!(first.ptr_eq(provider.store()));
    }

    #[test]
    fn separate_scopes_are_isolated() {
        let (scope_a, provider_a) = create_scoped_store(1);
        let (scope_b, _provider_b) = create_scoped_store(1);

        provider_a.provide(|| {
            assert!(use_store(&scope_a).is_ok());
            assert_eq!(
                use_store(&scope_b).unwrap_err(),
                MissingProviderError::for_state::<i32>()
            );
        });
    }

    #[test]
    fn setter_targets_provided_store() {
        let (scope, provider) = create_scoped_store(String::from("a"));

        provider.provide(|| {
            let setter = read_setter(&scope).unwrap();
            setter.set_state(|s| Arc::new(format!("{s}b")));
        });

        assert_eq!(provider.store().get_snapshot().as_str(), "ab");
    }

    #[test]
    fn setter_outside_provider_fails() {
        let (scope, _provider) = create_scoped_store(0u64);
        assert!(read_setter(&scope).is_err());
    }
}
