//! Domain error model.

use thiserror::Error;

/// Result type used across the membership crates.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Component crates wrap this in their own error enums; the variants here are
/// the failures every component can run into.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Settings are missing or inconsistent (e.g. an unknown group id in an
    /// override list).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A value failed validation (e.g. malformed identifier).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested record was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A store could not read or write a record.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The entity schema and the caller disagree (e.g. no mutator for a
    /// property that was supposedly diffable).
    #[error("contract violation: {0}")]
    Contract(String),
}

impl DomainError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = DomainError::configuration("group 42 not found");
        assert_eq!(err.to_string(), "configuration error: group 42 not found");

        let err = DomainError::not_found("user 7");
        assert!(err.to_string().contains("user 7"));
    }
}
