//! Scoped stores and selector reads.
//!
//! [`create_scoped_store`] allocates a store and a provider that shares it
//! down a composition tree. Components read the part of the state they need
//! with [`read_selected`] and write through [`read_setter`].

mod scoped;
mod selector;

pub use scoped::{create_scoped_store, read_setter, use_store, ScopeToken, StoreProvider};
pub use selector::{read_selected, SelectorMemo, SelectorOptions};
