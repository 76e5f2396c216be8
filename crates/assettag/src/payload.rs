//! The asset QR payload: what gets encoded into a code and read back out.
//!
//! The wire format is a single JSON object:
//!
//! ```text
//! {"type":"asset","id":"AST-001","name":"MacBook Pro","category":"it-equipment","url":"https://x/asset/AST-001","timestamp":"2024-05-01T12:00:00.000Z"}
//! ```
//!
//! Readers ignore unknown fields and default the optional ones, so codes
//! printed by older or newer writers still resolve.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};

/// Discriminator value marking a payload as an asset identity.
pub const PAYLOAD_TYPE: &str = "asset";

/// Category reported when a payload carries none.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// The identity fields embedded in an asset QR code.
///
/// Only `asset_id` is authoritative; the other fields are hints for a human
/// glancing at a raw scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetIdentity {
    /// Unique business identifier.
    pub asset_id: String,
    /// Display name at the time the code was generated.
    pub name: String,
    /// Category slug at the time the code was generated.
    pub category: String,
    /// Canonical deep link to the asset.
    pub url: String,
}

impl AssetIdentity {
    /// Create an identity from its parts.
    #[must_use]
    pub fn new(
        asset_id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            name: name.into(),
            category: category.into(),
            url: url.into(),
        }
    }

    /// Check that the required fields are present.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if `asset_id` or `name` is blank.
    pub fn validate(&self) -> Result<()> {
        if self.asset_id.trim().is_empty() {
            return Err(Error::encoding("asset id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(Error::encoding(format!(
                "asset {} has an empty name",
                self.asset_id
            )));
        }
        Ok(())
    }

    /// BLAKE3 fingerprint over every embedded field.
    ///
    /// Two identities with the same fingerprint produce payloads that differ
    /// only in their timestamp.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for field in [&self.asset_id, &self.name, &self.category, &self.url] {
            hasher.update(field.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// The serialized envelope around an [`AssetIdentity`].
///
/// Field order here is the order on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrPayload {
    /// Always [`PAYLOAD_TYPE`].
    #[serde(rename = "type")]
    pub payload_type: String,
    /// Asset business identifier.
    pub id: String,
    /// Asset name.
    pub name: String,
    /// Asset category.
    pub category: String,
    /// Asset deep link.
    pub url: String,
    /// ISO-8601 generation time.
    pub timestamp: String,
}

impl QrPayload {
    /// Wrap an identity, stamped with the given generation time.
    #[must_use]
    pub fn new(identity: &AssetIdentity, generated_at: DateTime<Utc>) -> Self {
        Self {
            payload_type: PAYLOAD_TYPE.to_string(),
            id: identity.asset_id.clone(),
            name: identity.name.clone(),
            category: identity.category.clone(),
            url: identity.url.clone(),
            timestamp: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Serialize to the canonical compact JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Serialize an identity as payload text stamped with the current time.
///
/// # Errors
///
/// Returns an encoding error if the identity is missing required fields.
pub fn serialize_identity(identity: &AssetIdentity) -> Result<String> {
    identity.validate()?;
    QrPayload::new(identity, Utc::now()).to_text()
}

/// Parse scanned text back into an asset identity.
///
/// Returns `None` for anything that is not an asset payload: non-JSON text,
/// JSON without `"type": "asset"`, or a payload missing `id` or `name`.
/// Foreign codes are expected input, so this never errors.
#[must_use]
pub fn parse_qr_data(raw: &str) -> Option<AssetIdentity> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            trace!("scanned text is not JSON: {err}");
            return None;
        }
    };
    let object = value.as_object()?;

    if object.get("type").and_then(Value::as_str) != Some(PAYLOAD_TYPE) {
        trace!("scanned JSON is not an asset payload");
        return None;
    }

    let asset_id = non_empty_str(object.get("id"))?;
    let name = non_empty_str(object.get("name"))?;
    let category = non_empty_str(object.get("category")).unwrap_or(UNKNOWN_CATEGORY);
    let url = object.get("url").and_then(Value::as_str).unwrap_or("");

    Some(AssetIdentity::new(asset_id, name, category, url))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
