//! The state container.
//!
//! A [`Store`] owns one state value, changes it only through updater
//! functions and notifies its listeners synchronously after every change.

mod store;
mod subscription;

pub use store::{SetState, Store};
pub use subscription::{Listener, Subscription};
