//! QR generation, persistence, and lookup against a record store.
//!
//! [`QrService`] is constructed explicitly with the store and renderer it
//! should use. It holds no process-wide state, so tests and embedders can run
//! several services side by side against different stores.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::asset::AssetRecord;
use crate::config::Config;
use crate::encoder::{settle_all, BulkQrResult, QrEncoder};
use crate::error::{Error, Result};
use crate::payload::{parse_qr_data, AssetIdentity};
use crate::render::{renderer_for, QrImage, QrOptions, QrRenderer};
use crate::store::{RecordStore, StoreError};

/// Result of resolving a scanned payload.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// The payload names an asset that exists. `asset` is the current record;
    /// `hint` is what the code claimed at print time and may be stale.
    Found {
        /// The authoritative record.
        asset: AssetRecord,
        /// The identity decoded from the payload.
        hint: AssetIdentity,
    },
    /// The payload is well formed but the asset is gone.
    NotFound {
        /// The business identifier from the payload.
        asset_id: String,
    },
    /// The text is not an asset payload.
    Invalid,
}

impl LookupOutcome {
    /// Collapse into the record or the matching error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] or [`Error::InvalidPayload`].
    pub fn into_asset(self) -> Result<AssetRecord> {
        match self {
            Self::Found { asset, .. } => Ok(asset),
            Self::NotFound { asset_id } => Err(Error::asset_not_found(asset_id)),
            Self::Invalid => Err(Error::InvalidPayload),
        }
    }
}

/// What [`QrService::generate_for_asset`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedQr {
    /// A new image was rendered and stored.
    Rendered {
        /// The business identifier.
        asset_id: String,
        /// The stored image.
        image: QrImage,
    },
    /// The stored image already matched the asset and was kept.
    Unchanged {
        /// The business identifier.
        asset_id: String,
        /// The stored image blob.
        qr_code: String,
    },
}

impl GeneratedQr {
    /// The business identifier.
    #[must_use]
    pub fn asset_id(&self) -> &str {
        match self {
            Self::Rendered { asset_id, .. } | Self::Unchanged { asset_id, .. } => asset_id,
        }
    }

    /// The image blob now stored on the asset.
    #[must_use]
    pub fn qr_code(&self) -> &str {
        match self {
            Self::Rendered { image, .. } => &image.data,
            Self::Unchanged { qr_code, .. } => qr_code,
        }
    }

    /// Whether rendering happened.
    #[must_use]
    pub fn was_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

/// Generates, stores, and resolves asset QR codes.
#[derive(Debug, Clone)]
pub struct QrService {
    store: Arc<dyn RecordStore>,
    encoder: QrEncoder,
    base_url: String,
}

impl QrService {
    /// Create a service.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        renderer: Arc<dyn QrRenderer>,
        options: QrOptions,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            encoder: QrEncoder::new(renderer, options),
            base_url: base_url.into(),
        }
    }

    /// Create a service using the renderer, options, and base URL from
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the configured colors are malformed.
    pub fn from_config(store: Arc<dyn RecordStore>, config: &Config) -> Result<Self> {
        Ok(Self::new(
            store,
            renderer_for(config.qr.format),
            config.qr.options()?,
            config.app.base_url.clone(),
        ))
    }

    /// The encoder this service renders with.
    #[must_use]
    pub fn encoder(&self) -> &QrEncoder {
        &self.encoder
    }

    /// The identity a QR code for `record` should carry.
    #[must_use]
    pub fn identity_for(&self, record: &AssetRecord) -> AssetIdentity {
        record.identity(&self.base_url)
    }

    /// Whether the stored image is missing or was rendered from a different
    /// identity or with different options.
    #[must_use]
    pub fn needs_regeneration(&self, record: &AssetRecord) -> bool {
        if !record.has_qr_code() {
            return true;
        }
        let expected = self.encoder.fingerprint(&self.identity_for(record));
        record.qr_fingerprint.as_deref() != Some(expected.as_str())
    }

    /// Render a QR code for one asset and store it on the record.
    ///
    /// Unless `force` is set, an existing image that still matches the asset
    /// is kept.
    ///
    /// # Errors
    ///
    /// Returns a not-found error if the asset does not exist, an encoding
    /// error if rendering fails, and a persist error if the store rejects the
    /// write.
    pub async fn generate_for_asset(&self, asset_id: &str, force: bool) -> Result<GeneratedQr> {
        let record = self
            .store
            .get_by_asset_id(asset_id)
            .await?
            .ok_or_else(|| Error::asset_not_found(asset_id))?;

        if !force && !self.needs_regeneration(&record) {
            debug!("Stored QR code for {asset_id} is current");
            if let Some(qr_code) = record.qr_code {
                return Ok(GeneratedQr::Unchanged {
                    asset_id: record.asset_id,
                    qr_code,
                });
            }
        }

        let image = self.render_and_store(record).await?;
        Ok(GeneratedQr::Rendered {
            asset_id: asset_id.to_string(),
            image,
        })
    }

    /// Render and store QR codes for many assets.
    ///
    /// Fetches all records in one call, then renders and writes each asset on
    /// its own task. Returns one result per input id, in input order; a
    /// missing asset or a failed render or write affects only its own slot.
    ///
    /// # Errors
    ///
    /// Returns an error only if the initial fetch fails.
    pub async fn generate_bulk_for_assets(&self, asset_ids: &[String]) -> Result<Vec<BulkQrResult>> {
        let records: HashMap<String, AssetRecord> = self
            .store
            .get_many_by_asset_ids(asset_ids)
            .await?
            .into_iter()
            .map(|record| (record.asset_id.clone(), record))
            .collect();
        debug!(
            "Bulk QR generation: {} requested, {} found",
            asset_ids.len(),
            records.len()
        );

        let jobs = asset_ids.iter().map(|asset_id| {
            let service = self.clone();
            let record = records.get(asset_id).cloned();
            let asset_id = asset_id.clone();
            async move {
                match record {
                    Some(record) => service.render_and_store(record).await,
                    None => Err(Error::asset_not_found(asset_id)),
                }
            }
        });
        let outcomes = settle_all(jobs).await;

        let results: Vec<BulkQrResult> = asset_ids
            .iter()
            .zip(outcomes)
            .map(|(asset_id, outcome)| {
                let outcome =
                    outcome.unwrap_or_else(|| Err(Error::internal("bulk task panicked")));
                if let Err(err) = &outcome {
                    warn!("QR generation failed for {asset_id}: {err}");
                }
                BulkQrResult::new(asset_id.clone(), outcome)
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!("Generated {succeeded} of {} QR codes", results.len());
        Ok(results)
    }

    /// Resolve scanned text to the current asset record.
    ///
    /// Only the business identifier from the payload is used to query the
    /// store. The decoded identity is returned next to the record as a hint
    /// and never merged into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails for a reason other than the asset
    /// being absent.
    pub async fn lookup_asset_by_qr(&self, raw: &str) -> Result<LookupOutcome> {
        let Some(hint) = parse_qr_data(raw) else {
            debug!("Scanned text is not an asset payload");
            return Ok(LookupOutcome::Invalid);
        };

        match self.store.get_by_asset_id(&hint.asset_id).await {
            Ok(Some(asset)) => {
                debug!("Resolved QR code to asset {}", asset.asset_id);
                Ok(LookupOutcome::Found { asset, hint })
            }
            Ok(None) | Err(StoreError::NotFound(_)) => Ok(LookupOutcome::NotFound {
                asset_id: hint.asset_id,
            }),
            Err(err) => Err(err.into()),
        }
    }

    async fn render_and_store(&self, record: AssetRecord) -> Result<QrImage> {
        let identity = self.identity_for(&record);
        let fingerprint = self.encoder.fingerprint(&identity);
        let image = self.encoder.generate_asset_qr_blocking(identity).await?;

        match self
            .store
            .set_qr_code(record.id, &image.data, &fingerprint)
            .await
        {
            Ok(()) => {
                info!("Stored QR code for asset {}", record.asset_id);
                Ok(image)
            }
            Err(StoreError::NotFound(_)) => Err(Error::asset_not_found(record.asset_id)),
            Err(err) => Err(Error::persist(record.asset_id, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::asset::NewAsset;
    use crate::error::ErrorKind;
    use crate::payload::{serialize_identity, QrPayload};
    use crate::render::QrFormat;
    use crate::scan::decode_image_bytes;
    use crate::storage::Storage;

    const BASE_URL: &str = "https://tracker.example";

    /// In-memory store with failure injection and a query log.
    #[derive(Debug, Default)]
    struct MemoryStore {
        records: Mutex<Vec<AssetRecord>>,
        fail_writes: Mutex<HashMap<String, StoreError>>,
        fail_reads: Mutex<Option<StoreError>>,
        queried: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        fn with_assets(asset_ids: &[&str]) -> Self {
            let store = Self::default();
            {
                let mut records = store.records.lock().unwrap();
                for (i, asset_id) in asset_ids.iter().enumerate() {
                    records.push(record(i64::try_from(i).unwrap() + 1, asset_id));
                }
            }
            store
        }

        fn fail_write_for(&self, asset_id: &str, err: StoreError) {
            self.fail_writes
                .lock()
                .unwrap()
                .insert(asset_id.to_string(), err);
        }

        fn stored(&self, asset_id: &str) -> AssetRecord {
            self.records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.asset_id == asset_id)
                .cloned()
                .unwrap()
        }
    }

    #[async_trait::async_trait]
    impl RecordStore for MemoryStore {
        async fn get_by_asset_id(
            &self,
            asset_id: &str,
        ) -> crate::store::StoreResult<Option<AssetRecord>> {
            self.queried.lock().unwrap().push(asset_id.to_string());
            if let Some(err) = self.fail_reads.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.asset_id == asset_id)
                .cloned())
        }

        async fn get_by_id(&self, id: i64) -> crate::store::StoreResult<Option<AssetRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned())
        }

        async fn get_many_by_asset_ids(
            &self,
            asset_ids: &[String],
        ) -> crate::store::StoreResult<Vec<AssetRecord>> {
            if let Some(err) = self.fail_reads.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| asset_ids.contains(&r.asset_id))
                .cloned()
                .collect())
        }

        async fn set_qr_code(
            &self,
            id: i64,
            qr_code: &str,
            fingerprint: &str,
        ) -> crate::store::StoreResult<()> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| StoreError::not_found(format!("asset with id {id}")))?;
            if let Some(err) = self.fail_writes.lock().unwrap().get(&record.asset_id) {
                return Err(err.clone());
            }
            record.qr_code = Some(qr_code.to_string());
            record.qr_fingerprint = Some(fingerprint.to_string());
            Ok(())
        }
    }

    fn record(id: i64, asset_id: &str) -> AssetRecord {
        let now = Utc::now();
        AssetRecord {
            id,
            asset_id: asset_id.to_string(),
            name: format!("Asset {asset_id}"),
            description: None,
            category: "it-equipment".to_string(),
            status: crate::asset::AssetStatus::Active,
            location: None,
            value: None,
            qr_code: None,
            qr_fingerprint: None,
            assignee_id: None,
            created_by: None,
            created_at: now,
            updated_at: now,
            assignee_name: None,
            created_by_name: None,
        }
    }

    fn service(store: Arc<dyn RecordStore>) -> QrService {
        QrService::new(
            store,
            renderer_for(QrFormat::Png),
            QrOptions::default(),
            BASE_URL,
        )
    }

    fn scan_text(asset_id: &str, name: &str) -> String {
        serialize_identity(&AssetIdentity::new(
            asset_id,
            name,
            "furniture",
            format!("https://old.example/asset/{asset_id}"),
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_for_asset_persists_image() {
        let store = Arc::new(MemoryStore::with_assets(&["AST-001"]));
        let service = service(store.clone());

        let generated = service.generate_for_asset("AST-001", false).await.unwrap();

        assert!(generated.was_rendered());
        assert_eq!(generated.asset_id(), "AST-001");
        let stored = store.stored("AST-001");
        assert_eq!(stored.qr_code.as_deref(), Some(generated.qr_code()));
        assert!(!service.needs_regeneration(&stored));
    }

    #[tokio::test]
    async fn test_generate_for_asset_skips_current_image_unless_forced() {
        let store = Arc::new(MemoryStore::with_assets(&["AST-001"]));
        let service = service(store.clone());

        let first = service.generate_for_asset("AST-001", false).await.unwrap();
        let second = service.generate_for_asset("AST-001", false).await.unwrap();
        assert!(!second.was_rendered());
        assert_eq!(second.qr_code(), first.qr_code());

        let forced = service.generate_for_asset("AST-001", true).await.unwrap();
        assert!(forced.was_rendered());
    }

    #[tokio::test]
    async fn test_renamed_asset_needs_regeneration() {
        let store = Arc::new(MemoryStore::with_assets(&["AST-001"]));
        let service = service(store.clone());
        service.generate_for_asset("AST-001", false).await.unwrap();

        let mut renamed = store.stored("AST-001");
        renamed.name = "Renamed".to_string();
        assert!(service.needs_regeneration(&renamed));

        let other_options = QrService::new(
            store.clone(),
            renderer_for(QrFormat::Svg),
            QrOptions::default(),
            BASE_URL,
        );
        assert!(other_options.needs_regeneration(&store.stored("AST-001")));
    }

    #[tokio::test]
    async fn test_generate_for_missing_asset() {
        let service = service(Arc::new(MemoryStore::default()));
        let err = service.generate_for_asset("AST-404", false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_persist_failure_is_reported() {
        let store = Arc::new(MemoryStore::with_assets(&["AST-001"]));
        store.fail_write_for("AST-001", StoreError::permission_denied("read-only"));
        let service = service(store.clone());

        let err = service.generate_for_asset("AST-001", false).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PersistFailure);
        assert!(store.stored("AST-001").qr_code.is_none());
    }

    #[tokio::test]
    async fn test_bulk_for_assets_isolates_each_item() {
        crate::logging::init_test_logging();
        let store = Arc::new(MemoryStore::with_assets(&["AST-001", "AST-002", "AST-003"]));
        store.fail_write_for("AST-002", StoreError::unavailable("timeout"));
        let service = service(store.clone());
        let ids: Vec<String> = ["AST-003", "AST-404", "AST-002", "AST-001"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let results = service.generate_bulk_for_assets(&ids).await.unwrap();

        let seen: Vec<&str> = results.iter().map(|r| r.asset_id.as_str()).collect();
        assert_eq!(seen, vec!["AST-003", "AST-404", "AST-002", "AST-001"]);
        assert!(results[0].is_success());
        assert_eq!(results[1].failure().unwrap().kind, ErrorKind::NotFound);
        assert_eq!(results[2].failure().unwrap().kind, ErrorKind::PersistFailure);
        assert!(results[3].is_success());

        assert!(store.stored("AST-001").has_qr_code());
        assert!(!store.stored("AST-002").has_qr_code());
        assert!(store.stored("AST-003").has_qr_code());
    }

    #[tokio::test]
    async fn test_bulk_fetch_failure_fails_whole_call() {
        let store = Arc::new(MemoryStore::with_assets(&["AST-001"]));
        *store.fail_reads.lock().unwrap() = Some(StoreError::unavailable("offline"));
        let service = service(store);

        let err = service
            .generate_bulk_for_assets(&["AST-001".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[tokio::test]
    async fn test_lookup_uses_only_asset_id() {
        let store = Arc::new(MemoryStore::with_assets(&["AST-001"]));
        let service = service(store.clone());

        let outcome = service
            .lookup_asset_by_qr(&scan_text("AST-001", "Stale Name"))
            .await
            .unwrap();

        let LookupOutcome::Found { asset, hint } = outcome else {
            panic!("expected a found outcome");
        };
        assert_eq!(asset.name, "Asset AST-001");
        assert_eq!(asset.category, "it-equipment");
        assert_eq!(hint.name, "Stale Name");
        assert_eq!(*store.queried.lock().unwrap(), vec!["AST-001".to_string()]);
    }

    #[tokio::test]
    async fn test_lookup_distinguishes_not_found_from_invalid() {
        let store = Arc::new(MemoryStore::with_assets(&["AST-001"]));
        let service = service(store.clone());

        let missing = service
            .lookup_asset_by_qr(&scan_text("AST-999", "Gone"))
            .await
            .unwrap();
        assert_eq!(
            missing,
            LookupOutcome::NotFound {
                asset_id: "AST-999".to_string()
            }
        );
        assert_eq!(
            missing.into_asset().unwrap_err().kind(),
            ErrorKind::NotFound
        );

        for raw in ["hello world", r#"{"type":"user","id":"AST-001","name":"x"}"#, ""] {
            let outcome = service.lookup_asset_by_qr(raw).await.unwrap();
            assert_eq!(outcome, LookupOutcome::Invalid);
            assert_eq!(
                outcome.into_asset().unwrap_err().kind(),
                ErrorKind::InvalidPayload
            );
        }
        // Invalid input never reaches the store.
        assert_eq!(store.queried.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_propagates_store_failure() {
        let store = Arc::new(MemoryStore::with_assets(&["AST-001"]));
        *store.fail_reads.lock().unwrap() = Some(StoreError::unavailable("offline"));
        let service = service(store);

        let err = service
            .lookup_asset_by_qr(&scan_text("AST-001", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[tokio::test]
    async fn test_lookup_treats_store_not_found_as_missing() {
        let store = Arc::new(MemoryStore::with_assets(&["AST-001"]));
        *store.fail_reads.lock().unwrap() = Some(StoreError::not_found("AST-001"));
        let service = service(store);

        let outcome = service
            .lookup_asset_by_qr(&scan_text("AST-001", "x"))
            .await
            .unwrap();
        assert!(matches!(outcome, LookupOutcome::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_macbook_round_trip_through_sqlite() {
        let storage = Arc::new(Storage::open_in_memory().unwrap());
        storage
            .insert_asset(&NewAsset::new("AST-001", "MacBook Pro", "it-equipment"))
            .unwrap();
        let service = QrService::new(
            storage.clone(),
            renderer_for(QrFormat::Png),
            QrOptions::default(),
            "https://x",
        );

        let generated = service.generate_for_asset("AST-001", false).await.unwrap();
        let GeneratedQr::Rendered { image, .. } = generated else {
            panic!("expected a fresh render");
        };

        let scanned = decode_image_bytes(&image.to_bytes().unwrap())
            .unwrap()
            .expect("rendered code should decode");
        assert_eq!(scanned, image.text);
        let payload: QrPayload = serde_json::from_str(&scanned).unwrap();
        assert_eq!(payload.payload_type, "asset");
        assert_eq!(payload.id, "AST-001");
        assert_eq!(payload.name, "MacBook Pro");
        assert_eq!(payload.category, "it-equipment");
        assert_eq!(payload.url, "https://x/asset/AST-001");
        assert_eq!(image.size, 200);

        let asset = service
            .lookup_asset_by_qr(&scanned)
            .await
            .unwrap()
            .into_asset()
            .unwrap();
        assert_eq!(asset.asset_id, "AST-001");
        assert_eq!(asset.qr_code.as_deref(), Some(image.data.as_str()));
    }
}
