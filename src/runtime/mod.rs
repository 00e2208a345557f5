//! Host primitives the selector layer runs on.
//!
//! This module provides scope propagation ([`Context`]) and a small
//! component host ([`Component`], [`RenderCx`]) with the tearing-safe
//! external store read used by selector hooks.

mod component;
mod context;

pub use component::{Component, RenderCx, RenderMode};
pub use context::Context;
