use thiserror::Error;

/// Failure at the persistence boundary, independent of the backing store.
///
/// `UniqueViolation` is the only variant callers branch on: every invariant
/// that protects a slot or a room is enforced by a store-level uniqueness
/// constraint, and losing that race surfaces here rather than as a raw
/// driver error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed store record: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}
