//! Asset QR generation.
//!
//! [`QrEncoder`] turns an [`AssetIdentity`] into a rendered [`QrImage`]. The
//! bulk variant renders every identity on its own blocking task and waits for
//! all of them, so one bad item never cancels or hides the others.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{Error, QrFailure, Result};
use crate::payload::{serialize_identity, AssetIdentity};
use crate::render::{renderer_for, QrFormat, QrImage, QrOptions, QrRenderer};

/// Outcome for one item of a bulk run.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkQrResult {
    /// The business identifier the item was requested for.
    pub asset_id: String,
    /// The image, or why there is none.
    pub outcome: std::result::Result<QrImage, QrFailure>,
}

impl BulkQrResult {
    /// Build a result from an operation outcome.
    #[must_use]
    pub fn new(asset_id: impl Into<String>, outcome: Result<QrImage>) -> Self {
        Self {
            asset_id: asset_id.into(),
            outcome: outcome.map_err(QrFailure::from),
        }
    }

    /// Whether this item succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The failure, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&QrFailure> {
        self.outcome.as_ref().err()
    }
}

/// Renders asset identities as QR images with a fixed renderer and options.
#[derive(Debug, Clone)]
pub struct QrEncoder {
    renderer: Arc<dyn QrRenderer>,
    options: QrOptions,
}

impl Default for QrEncoder {
    fn default() -> Self {
        Self::new(renderer_for(QrFormat::Png), QrOptions::default())
    }
}

impl QrEncoder {
    /// Create an encoder.
    #[must_use]
    pub fn new(renderer: Arc<dyn QrRenderer>, options: QrOptions) -> Self {
        Self { renderer, options }
    }

    /// The options used when none are given.
    #[must_use]
    pub fn options(&self) -> &QrOptions {
        &self.options
    }

    /// The output format of this encoder.
    #[must_use]
    pub fn format(&self) -> QrFormat {
        self.renderer.format()
    }

    /// Generate a QR image for `identity` with this encoder's options.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the identity lacks an id or name, if the
    /// payload exceeds the code's capacity, or if rendering fails.
    pub fn generate_asset_qr(&self, identity: &AssetIdentity) -> Result<QrImage> {
        self.generate_asset_qr_with(identity, &self.options)
    }

    /// Generate a QR image for `identity` with explicit options.
    ///
    /// # Errors
    ///
    /// See [`QrEncoder::generate_asset_qr`].
    pub fn generate_asset_qr_with(
        &self,
        identity: &AssetIdentity,
        options: &QrOptions,
    ) -> Result<QrImage> {
        let text = serialize_identity(identity)?;
        let image = self.renderer.render(&text, options)?;
        debug!(
            "Rendered {} QR code for {} ({} payload bytes)",
            image.format,
            identity.asset_id,
            text.len()
        );
        Ok(image)
    }

    /// Generate on a blocking thread, leaving the async runtime free.
    ///
    /// # Errors
    ///
    /// See [`QrEncoder::generate_asset_qr`]; also fails if the blocking task
    /// panics.
    pub async fn generate_asset_qr_blocking(&self, identity: AssetIdentity) -> Result<QrImage> {
        let encoder = self.clone();
        tokio::task::spawn_blocking(move || encoder.generate_asset_qr(&identity))
            .await
            .map_err(|e| Error::internal(format!("render task failed: {e}")))?
    }

    /// Generate QR images for many identities concurrently.
    ///
    /// Returns exactly one result per input, in input order. A failed item is
    /// reported in its own slot and does not affect the others.
    pub async fn generate_bulk_qr_codes(&self, identities: &[AssetIdentity]) -> Vec<BulkQrResult> {
        let jobs = identities.iter().cloned().map(|identity| {
            let encoder = self.clone();
            async move { encoder.generate_asset_qr_blocking(identity).await }
        });
        let outcomes = settle_all(jobs).await;

        identities
            .iter()
            .zip(outcomes)
            .map(|(identity, outcome)| {
                let outcome = outcome.unwrap_or_else(|| Err(Error::internal("render task panicked")));
                if let Err(err) = &outcome {
                    warn!("QR generation failed for {:?}: {err}", identity.asset_id);
                }
                BulkQrResult::new(identity.asset_id.clone(), outcome)
            })
            .collect()
    }

    /// Fingerprint of what a freshly rendered image for `identity` would
    /// show: the identity plus this encoder's format and options.
    #[must_use]
    pub fn fingerprint(&self, identity: &AssetIdentity) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(identity.fingerprint().as_bytes());
        hasher.update(format!("{}|{:?}", self.format(), self.options).as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

/// Run every future on its own task and wait for all of them.
///
/// The output has one slot per input, in input order. A slot is `None` only
/// if its task panicked or was aborted.
pub(crate) async fn settle_all<I, F, T>(jobs: I) -> Vec<Option<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut set = JoinSet::new();
    let mut count = 0;
    for (index, job) in jobs.into_iter().enumerate() {
        set.spawn(async move { (index, job.await) });
        count += 1;
    }

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(count).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, value)) => slots[index] = Some(value),
            Err(e) => warn!("bulk task did not complete: {e}"),
        }
    }
    slots
}
