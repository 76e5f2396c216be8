//! The record store boundary.
//!
//! QR generation and lookup need only four capabilities from wherever asset
//! rows live: fetch by business id, fetch by internal id, fetch a set of
//! business ids, and overwrite one asset's QR field. [`RecordStore`] is that
//! contract; callers hand an implementation to
//! [`QrService`](crate::service::QrService).

use thiserror::Error;

use crate::asset::AssetRecord;

/// Failures reported by a record store.
///
/// Provider-specific codes are mapped into this closed set at the store
/// boundary so the core never inspects them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The addressed record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The write collides with existing data.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller may not perform this operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The store could not be reached or failed internally.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Create a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create a permission-denied error.
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Result type for record store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Access to authoritative asset records.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Fetch an asset by its unique business identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried. A missing record is
    /// `Ok(None)`, not an error.
    async fn get_by_asset_id(&self, asset_id: &str) -> StoreResult<Option<AssetRecord>>;

    /// Fetch an asset by its internal row identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn get_by_id(&self, id: i64) -> StoreResult<Option<AssetRecord>>;

    /// Fetch every asset whose business identifier is in `asset_ids`.
    ///
    /// Identifiers with no record are simply absent from the result, which is
    /// in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn get_many_by_asset_ids(&self, asset_ids: &[String]) -> StoreResult<Vec<AssetRecord>>;

    /// Overwrite the stored QR image of the asset with internal id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such row exists, or another
    /// variant if the write is rejected.
    async fn set_qr_code(&self, id: i64, qr_code: &str, fingerprint: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        assert!(StoreError::not_found("AST-1").to_string().contains("not found"));
        assert!(StoreError::conflict("dup").to_string().contains("conflict"));
        assert!(StoreError::permission_denied("rls")
            .to_string()
            .contains("permission denied"));
        assert!(StoreError::unavailable("timeout")
            .to_string()
            .contains("unavailable"));
    }

    #[test]
    fn test_store_error_clone_eq() {
        let err = StoreError::conflict("dup");
        assert_eq!(err.clone(), err);
    }
}
