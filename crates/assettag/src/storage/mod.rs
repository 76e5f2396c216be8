//! Storage layer for assettag.
//!
//! This module provides `SQLite`-based persistent storage for asset records
//! and implements [`RecordStore`] on top of it.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info, warn};

use crate::asset::{AssetRecord, AssetStatus, NewAsset, Profile};
use crate::error::{Error, Result};
use crate::store::{RecordStore, StoreError, StoreResult};

/// Columns selected for every asset read, with assignee and creator names
/// joined in from profiles.
const ASSET_SELECT: &str = r"
    SELECT a.id, a.asset_id, a.name, a.description, a.category, a.status,
           a.location, a.value, a.qr_code, a.qr_fingerprint, a.assignee_id,
           a.created_by, a.created_at, a.updated_at,
           assignee.full_name, creator.full_name
    FROM assets a
    LEFT JOIN profiles assignee ON assignee.id = a.assignee_id
    LEFT JOIN profiles creator ON creator.id = a.created_by
";

/// Filter for listing assets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssetFilter {
    /// Only assets in this category.
    pub category: Option<String>,
    /// Only assets with this status.
    pub status: Option<AssetStatus>,
    /// Maximum number of results; 0 for unlimited.
    pub limit: usize,
}

/// Storage engine for asset records.
///
/// The connection sits behind a mutex so the store can be shared across
/// tasks; every operation holds the lock for a single statement or query.
/// Clones share the same connection.
#[derive(Debug, Clone)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Arc<Mutex<Connection>>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Insert a new asset and return the stored record.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError::Conflict`] if the business identifier is
    /// already taken, or an error if the database operation fails.
    pub fn insert_asset(&self, asset: &NewAsset) -> Result<AssetRecord> {
        let id = {
            let conn = self.conn()?;
            let taken: i32 = conn.query_row(
                "SELECT COUNT(*) FROM assets WHERE asset_id = ?1",
                [&asset.asset_id],
                |row| row.get(0),
            )?;
            if taken > 0 {
                return Err(StoreError::conflict(format!(
                    "asset id \"{}\" already exists",
                    asset.asset_id
                ))
                .into());
            }

            let now = Utc::now().to_rfc3339();
            conn.execute(
                r"
                INSERT INTO assets (asset_id, name, description, category, status,
                                    location, value, assignee_id, created_by,
                                    created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                ",
                params![
                    asset.asset_id,
                    asset.name,
                    asset.description,
                    asset.category,
                    asset.status.as_str(),
                    asset.location,
                    asset.value,
                    asset.assignee_id,
                    asset.created_by,
                    now,
                ],
            )?;
            conn.last_insert_rowid()
        };

        debug!("Inserted asset {} with id {}", asset.asset_id, id);
        self.asset_by_id(id)?
            .ok_or_else(|| Error::internal(format!("inserted asset {id} vanished")))
    }

    /// Get an asset by its business identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn asset_by_asset_id(&self, asset_id: &str) -> Result<Option<AssetRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("{ASSET_SELECT} WHERE a.asset_id = ?1"),
                [asset_id],
                Self::row_to_asset,
            )
            .optional()?;
        Ok(record)
    }

    /// Get an asset by its internal identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn asset_by_id(&self, id: i64) -> Result<Option<AssetRecord>> {
        let conn = self.conn()?;
        let record = conn
            .query_row(
                &format!("{ASSET_SELECT} WHERE a.id = ?1"),
                [id],
                Self::row_to_asset,
            )
            .optional()?;
        Ok(record)
    }

    /// Get every asset whose business identifier is in `asset_ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn assets_by_asset_ids(&self, asset_ids: &[String]) -> Result<Vec<AssetRecord>> {
        if asset_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; asset_ids.len()].join(", ");
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("{ASSET_SELECT} WHERE a.asset_id IN ({placeholders})"))?;
        let records = stmt
            .query_map(params_from_iter(asset_ids.iter()), Self::row_to_asset)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// List assets, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_assets(&self, filter: &AssetFilter) -> Result<Vec<AssetRecord>> {
        let limit = if filter.limit == 0 {
            -1
        } else {
            i64::try_from(filter.limit).unwrap_or(i64::MAX)
        };
        let status = filter.status.map(|s| s.as_str());

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r"{ASSET_SELECT}
            WHERE (?1 IS NULL OR a.category = ?1)
              AND (?2 IS NULL OR a.status = ?2)
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT ?3
            "
        ))?;
        let records = stmt
            .query_map(params![filter.category, status, limit], Self::row_to_asset)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Store a rendered QR image on the asset with internal id `id`.
    ///
    /// Returns `false` if no such asset exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_qr_code(&self, id: i64, qr_code: &str, fingerprint: &str) -> Result<bool> {
        let conn = self.conn()?;
        let affected = conn.execute(
            r"
            UPDATE assets SET qr_code = ?1, qr_fingerprint = ?2, updated_at = ?3
            WHERE id = ?4
            ",
            params![qr_code, fingerprint, Utc::now().to_rfc3339(), id],
        )?;
        Ok(affected > 0)
    }

    /// Delete an asset by business identifier.
    ///
    /// Returns `true` if an asset was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_asset(&self, asset_id: &str) -> Result<bool> {
        let affected = self
            .conn()?
            .execute("DELETE FROM assets WHERE asset_id = ?1", [asset_id])?;
        if affected > 0 {
            info!("Deleted asset {asset_id}");
        }
        Ok(affected > 0)
    }

    /// Insert or replace a profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.conn()?.execute(
            r"
            INSERT INTO profiles (id, full_name, email) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET full_name = excluded.full_name, email = excluded.email
            ",
            params![profile.id, profile.full_name, profile.email],
        )?;
        Ok(())
    }

    /// Count total assets in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Convert a database row to an `AssetRecord`.
    fn row_to_asset(row: &rusqlite::Row) -> rusqlite::Result<AssetRecord> {
        let status_str: String = row.get(5)?;
        let created_at: String = row.get(12)?;
        let updated_at: String = row.get(13)?;

        let status = status_str.parse().unwrap_or_else(|_| {
            warn!("Unknown asset status: {status_str}, defaulting to active");
            AssetStatus::Active
        });

        Ok(AssetRecord {
            id: row.get(0)?,
            asset_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            status,
            location: row.get(6)?,
            value: row.get(7)?,
            qr_code: row.get(8)?,
            qr_fingerprint: row.get(9)?,
            assignee_id: row.get(10)?,
            created_by: row.get(11)?,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
            assignee_name: row.get(14)?,
            created_by_name: row.get(15)?,
        })
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

/// Map a storage failure into the record store taxonomy.
fn to_store_error(err: Error) -> StoreError {
    match err {
        Error::Store(err) => err,
        Error::DatabaseQuery(rusqlite::Error::SqliteFailure(failure, message)) => {
            let message = message.unwrap_or_else(|| failure.to_string());
            match failure.code {
                ErrorCode::ConstraintViolation => StoreError::Conflict(message),
                ErrorCode::ReadOnly
                | ErrorCode::PermissionDenied
                | ErrorCode::AuthorizationForStatementDenied => {
                    StoreError::PermissionDenied(message)
                }
                _ => StoreError::Unavailable(message),
            }
        }
        other => StoreError::Unavailable(other.to_string()),
    }
}

impl Storage {
    /// Run a storage call on the blocking pool.
    async fn run_blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Storage) -> Result<T> + Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || op(&storage))
            .await
            .map_err(|e| StoreError::unavailable(format!("storage task failed: {e}")))?
            .map_err(to_store_error)
    }
}

#[async_trait::async_trait]
impl RecordStore for Storage {
    async fn get_by_asset_id(&self, asset_id: &str) -> StoreResult<Option<AssetRecord>> {
        let asset_id = asset_id.to_string();
        self.run_blocking(move |storage| storage.asset_by_asset_id(&asset_id))
            .await
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<AssetRecord>> {
        self.run_blocking(move |storage| storage.asset_by_id(id)).await
    }

    async fn get_many_by_asset_ids(&self, asset_ids: &[String]) -> StoreResult<Vec<AssetRecord>> {
        let asset_ids = asset_ids.to_vec();
        self.run_blocking(move |storage| storage.assets_by_asset_ids(&asset_ids))
            .await
    }

    async fn set_qr_code(&self, id: i64, qr_code: &str, fingerprint: &str) -> StoreResult<()> {
        let qr_code = qr_code.to_string();
        let fingerprint = fingerprint.to_string();
        self.run_blocking(move |storage| {
            if storage.update_qr_code(id, &qr_code, &fingerprint)? {
                Ok(())
            } else {
                Err(Error::Store(StoreError::not_found(format!(
                    "asset with id {id}"
                ))))
            }
        })
        .await
    }
}
