//! # Context Select
//!
//! Scoped state stores with selector subscriptions.
//!
//! A component that reads shared state through a selector only re-renders
//! when the slice it selected changes, not on every write to the store.
//!
//! ## Store (State container)
//!
//! - `Store<T>` - Owns one state value, changed through updater functions
//! - Identity-based change detection: returning the same `Arc` is a no-op
//! - Listeners notified synchronously after every change
//!
//! ## Selectors (Scoped reads)
//!
//! - `create_scoped_store` - One store plus a provider sharing it down a tree
//! - `read_selected` - Memoized projection of the provided store's state
//! - `read_setter` - Write access without subscribing
//!
//! ## Runtime (Host primitives)
//!
//! - `Context<T>` - Scope propagation
//! - `Component` - Render function with hook state and tearing-safe
//!   external store reads
//!
//! ## Example
//!
//! ```
//! use context_select::runtime::Component;
//! use context_select::{create_scoped_store, read_selected, read_setter, SelectorOptions};
//! use std::sync::Arc;
//!
//! let (scope, provider) = create_scoped_store(vec!["milk".to_string()]);
//!
//! let mut list_len = Component::new(move |cx| {
//!     read_selected(cx, &scope, |items: &Vec<String>| items.len(), SelectorOptions::default())
//! });
//!
//! provider.provide(|| {
//!     assert_eq!(*list_len.render().unwrap(), 1);
//!
//!     let set_items = read_setter(&scope).unwrap();
//!     set_items.set_state(|items| {
//!         let mut items = (**items).clone();
//!         items.push("eggs".to_string());
//!         Arc::new(items)
//!     });
//!
//!     assert!(list_len.needs_render());
//!     assert_eq!(*list_len.render().unwrap(), 2);
//! });
//! ```

pub mod error;
pub mod runtime;
pub mod select;
pub mod store;

// Re-export main types for convenience
pub use error::{MissingProviderError, Result};
pub use select::{
    create_scoped_store, read_selected, read_setter, use_store, ScopeToken, SelectorMemo,
    SelectorOptions, StoreProvider,
};
pub use store::{Listener, SetState, Store, Subscription};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let store = Store::new(0);
        assert_eq!(*store.get_snapshot(), 0);
        store.set(42);
        assert_eq!(*store.get_snapshot(), 42);
    }
}
