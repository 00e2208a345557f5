//! Error types for store resolution.

use thiserror::Error;

/// Raised when a store is resolved for a scope token that has no mounted
/// provider on the current composition path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("store provider is missing: no store is registered for `{state}`")]
pub struct MissingProviderError {
    state: &'static str,
}

impl MissingProviderError {
    pub(crate) fn for_state<S: ?Sized>() -> Self {
        Self {
            state: std::any::type_name::<S>(),
        }
    }

    /// Type name of the state the missing store would have held.
    pub fn state_type(&self) -> &'static str {
        self.state
    }
}

/// Result type for store resolution.
pub type Result<T> = std::result::Result<T, MissingProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_the_state_type() {
        let err = MissingProviderError::for_state::<u32>();
        assert_eq!(err.state_type(), "u32");
        assert_eq!(
            err.to_string(),
            "store provider is missing: no store is registered for `u32`"
        );
    }
}
