//! Error types returned by the alias store.

use thiserror::Error;

/// Errors returned by [`AliasStore`](crate::storage::AliasStore) and the
/// [`Shortener`](crate::service::Shortener) facade.
///
/// Every variant is an expected outcome of a request, not a fault in the
/// store. Stale expiry-index entries never surface here; they are
/// discarded silently by the sweeper.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The target is not an absolute URL.
    #[error("invalid target")]
    InvalidTarget,

    /// The alias does not match `[A-Za-z0-9_-]{1,64}`.
    #[error("invalid alias format")]
    InvalidAliasFormat,

    /// The alias already names a live record.
    #[error("alias already in use")]
    AliasConflict,

    /// The alias is absent or its record has expired.
    #[error("alias not found or expired")]
    NotFound,

    /// An update was requested without a new alias or a new TTL.
    #[error("nothing to update, provide a new alias and/or a ttl")]
    NothingToUpdate,

    /// Every generated alias collided with a live record.
    #[error("failed to generate a free alias after {attempts} attempts")]
    AliasGenerationFailed { attempts: usize },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
