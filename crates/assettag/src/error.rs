//! Error types for assettag.
//!
//! This module defines the crate-wide error type along with [`ErrorKind`], the
//! closed taxonomy callers use to tell a bad code apart from a deleted asset,
//! a rendering failure, or a rejected write.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// The main error type for assettag operations.
#[derive(Error, Debug)]
pub enum Error {
    // === QR Errors ===
    /// The payload could not be serialized or rendered as a QR image.
    #[error("failed to generate QR code: {message}")]
    Encoding {
        /// Description of what went wrong.
        message: String,
    },

    /// The scanned text is not a recognized asset payload.
    #[error("not a recognized asset QR code")]
    InvalidPayload,

    /// A well-formed payload referenced an asset that does not exist.
    #[error("asset {asset_id} no longer exists")]
    AssetNotFound {
        /// The business identifier that was looked up.
        asset_id: String,
    },

    /// The rendered QR image could not be written back to the asset.
    #[error("failed to save QR code to asset {asset_id}: {source}")]
    Persist {
        /// The business identifier of the asset.
        asset_id: String,
        /// The store's rejection.
        #[source]
        source: StoreError,
    },

    // === Storage Errors ===
    /// The record store rejected a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for assettag operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

/// The category an [`Error`] falls into, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rendering or serialization could not produce an image.
    EncodingFailure,
    /// Decoded text is not an asset envelope.
    InvalidPayload,
    /// Well-formed payload, but no matching record.
    NotFound,
    /// The record store rejected the QR write.
    PersistFailure,
    /// Any other record store failure.
    Store,
    /// Configuration could not be loaded or is invalid.
    Config,
    /// File system failure.
    Io,
    /// Bug.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::EncodingFailure => "encoding_failure",
            Self::InvalidPayload => "invalid_payload",
            Self::NotFound => "not_found",
            Self::PersistFailure => "persist_failure",
            Self::Store => "store",
            Self::Config => "config",
            Self::Io => "io",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// A failure flattened to its kind and message, suitable for per-item
/// reporting in bulk results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrFailure {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl From<&Error> for QrFailure {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<Error> for QrFailure {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

impl Error {
    /// Create a new encoding error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create an asset-not-found error.
    #[must_use]
    pub fn asset_not_found(asset_id: impl Into<String>) -> Self {
        Self::AssetNotFound {
            asset_id: asset_id.into(),
        }
    }

    /// Create a persist error for the given asset.
    #[must_use]
    pub fn persist(asset_id: impl Into<String>, source: StoreError) -> Self {
        Self::Persist {
            asset_id: asset_id.into(),
            source,
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Encoding { .. } => ErrorKind::EncodingFailure,
            Self::InvalidPayload => ErrorKind::InvalidPayload,
            Self::AssetNotFound { .. } | Self::Store(StoreError::NotFound(_)) => {
                ErrorKind::NotFound
            }
            Self::Persist { .. } => ErrorKind::PersistFailure,
            Self::Store(_)
            | Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. } => ErrorKind::Store,
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => ErrorKind::Config,
            Self::Io(_) | Self::DirectoryCreate { .. } => ErrorKind::Io,
            Self::Json(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error means the asset does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this error came from rendering.
    #[must_use]
    pub fn is_encoding_failure(&self) -> bool {
        matches!(self, Self::Encoding { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidPayload;
        assert_eq!(err.to_string(), "not a recognized asset QR code");

        let err = Error::encoding("data too long");
        assert_eq!(err.to_string(), "failed to generate QR code: data too long");
    }

    #[test]
    fn test_asset_not_found_display() {
        let err = Error::asset_not_found("AST-001");
        assert_eq!(err.to_string(), "asset AST-001 no longer exists");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_persist_error_display() {
        let err = Error::persist("AST-001", StoreError::permission_denied("read-only"));
        let msg = err.to_string();
        assert!(msg.contains("AST-001"));
        assert!(msg.contains("read-only"));
        assert_eq!(err.kind(), ErrorKind::PersistFailure);
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::encoding("x").kind(), ErrorKind::EncodingFailure);
        assert_eq!(Error::InvalidPayload.kind(), ErrorKind::InvalidPayload);
        assert_eq!(
            Error::Store(StoreError::not_found("AST-9")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            Error::Store(StoreError::unavailable("offline")).kind(),
            ErrorKind::Store
        );
        assert_eq!(
            Error::ConfigValidation {
                message: "bad".to_string()
            }
            .kind(),
            ErrorKind::Config
        );
        assert_eq!(Error::internal("bug").kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_kind_display_matches_serde() {
        for kind in [
            ErrorKind::EncodingFailure,
            ErrorKind::InvalidPayload,
            ErrorKind::NotFound,
            ErrorKind::PersistFailure,
            ErrorKind::Store,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_qr_failure_from_error() {
        let failure = QrFailure::from(Error::encoding("capacity exceeded"));
        assert_eq!(failure.kind, ErrorKind::EncodingFailure);
        assert!(failure.message.contains("capacity exceeded"));
    }

    #[test]
    fn test_is_encoding_failure() {
        assert!(Error::encoding("x").is_encoding_failure());
        assert!(!Error::InvalidPayload.is_encoding_failure());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_database_open_error_display() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err = Error::DatabaseOpen {
                path: PathBuf::from("/nonexistent/path/db.sqlite"),
                source: sqlite_err,
            };
            assert!(err.to_string().contains("/nonexistent/path/db.sqlite"));
            assert_eq!(err.kind(), ErrorKind::Store);
        }
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
