//! Error types for the stowage engine.

use thiserror::Error;

/// Result type alias for stowage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of record an identifier failed to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A storage container.
    Container,
    /// A stowed item.
    Item,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Container => f.write_str("Container"),
            EntityKind::Item => f.write_str("Item"),
        }
    }
}

/// Errors that can occur during stowage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A container or item identifier did not resolve.
    #[error("{kind} with ID {id} not found")]
    NotFound {
        /// What was being looked up.
        kind: EntityKind,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// Item geometry is unusable (non-positive dimension, larger than container, out of bounds).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Container definition is unusable.
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    /// The search completed without finding a free position.
    #[error("No valid placement found for item: {0}")]
    NoPlacement(String),

    /// The search gave up after checking the configured number of candidates.
    #[error("Search budget exceeded after {0} candidates")]
    SearchBudgetExceeded(u64),

    /// The requested change conflicts with current state.
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Backing store failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Shorthand for an unresolved container id.
    pub fn container_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: EntityKind::Container,
            id: id.into(),
        }
    }

    /// Shorthand for an unresolved item id.
    pub fn item_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: EntityKind::Item,
            id: id.into(),
        }
    }

    /// Returns true for identifier resolution failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true when a search ran but found nothing, as opposed to rejecting its input.
    pub fn is_search_exhausted(&self) -> bool {
        matches!(
            self,
            Error::NoPlacement(_) | Error::SearchBudgetExceeded(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::container_not_found("C-9");
        assert_eq!(err.to_string(), "Container with ID C-9 not found");
        assert!(err.is_not_found());
        assert!(!err.is_search_exhausted());
    }

    #[test]
    fn test_search_exhausted_is_not_invalid_geometry() {
        assert!(Error::NoPlacement("I1".into()).is_search_exhausted());
        assert!(Error::SearchBudgetExceeded(10).is_search_exhausted());
        assert!(!Error::InvalidGeometry("too large".into()).is_search_exhausted());
    }
}
