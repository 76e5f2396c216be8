//! Core asset types for assettag.
//!
//! This module defines the records kept in the store: the asset itself, the
//! form used to create one, and the lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payload::AssetIdentity;

/// Lifecycle status of an asset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// In service.
    #[default]
    Active,
    /// Temporarily out of service.
    Maintenance,
    /// Permanently out of service.
    Retired,
}

impl AssetStatus {
    /// The stored representation of this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Maintenance => "maintenance",
            Self::Retired => "retired",
        }
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssetStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "maintenance" => Ok(Self::Maintenance),
            "retired" => Ok(Self::Retired),
            other => Err(format!("unknown asset status: {other}")),
        }
    }
}

/// Categories offered when adding an asset.
///
/// The store keeps categories as free text, so records may carry values
/// outside this list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AssetCategory {
    /// Laptops, monitors, peripherals.
    ItEquipment,
    /// Desks, chairs, storage.
    Furniture,
    /// Projectors, cameras, audio.
    AvEquipment,
    /// Cars, vans, carts.
    Vehicles,
    /// Hand and power tools.
    Tools,
    /// Anything else.
    Other,
}

impl AssetCategory {
    /// The stored representation of this category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ItEquipment => "it-equipment",
            Self::Furniture => "furniture",
            Self::AvEquipment => "av-equipment",
            Self::Vehicles => "vehicles",
            Self::Tools => "tools",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asset as held by the record store.
///
/// `assignee_name` and `created_by_name` are joined in from profiles when the
/// record is read and are never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Internal row identifier.
    pub id: i64,
    /// Unique business identifier, e.g. `AST-001`.
    pub asset_id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Category slug.
    pub category: String,
    /// Lifecycle status.
    pub status: AssetStatus,
    /// Where the asset lives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Monetary value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Rendered QR image (data URL or SVG document).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    /// Fingerprint of the identity `qr_code` was rendered from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_fingerprint: Option<String>,
    /// Profile the asset is assigned to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    /// Profile that created the asset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last modified.
    pub updated_at: DateTime<Utc>,
    /// Assignee display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_name: Option<String>,
    /// Creator display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_name: Option<String>,
}

impl AssetRecord {
    /// Build the identity to embed in a QR payload for this record.
    #[must_use]
    pub fn identity(&self, base_url: &str) -> AssetIdentity {
        AssetIdentity {
            asset_id: self.asset_id.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            url: asset_url(base_url, &self.asset_id),
        }
    }

    /// Whether a QR image has been stored for this record.
    #[must_use]
    pub fn has_qr_code(&self) -> bool {
        self.qr_code.as_deref().is_some_and(|qr| !qr.is_empty())
    }
}

/// A new asset to insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAsset {
    /// Unique business identifier.
    pub asset_id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Category slug.
    pub category: String,
    /// Lifecycle status.
    pub status: AssetStatus,
    /// Where the asset lives.
    pub location: Option<String>,
    /// Monetary value.
    pub value: Option<f64>,
    /// Profile the asset is assigned to.
    pub assignee_id: Option<String>,
    /// Profile creating the asset.
    pub created_by: Option<String>,
}

impl NewAsset {
    /// Create a new active asset with only the required fields set.
    #[must_use]
    pub fn new(
        asset_id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            name: name.into(),
            description: None,
            category: category.into(),
            status: AssetStatus::Active,
            location: None,
            value: None,
            assignee_id: None,
            created_by: None,
        }
    }
}

/// A user profile, referenced by assets for display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile identifier.
    pub id: String,
    /// Display name.
    pub full_name: String,
    /// Contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Canonical deep link to an asset's detail view.
#[must_use]
pub fn asset_url(base_url: &str, asset_id: &str) -> String {
    format!("{}/asset/{asset_id}", base_url.trim_end_matches('/'))
}

/// Whether an asset id is usable as a URL path segment and file name.
#[must_use]
pub fn is_valid_asset_id(asset_id: &str) -> bool {
    !asset_id.trim().is_empty()
        && asset_id != "."
        && asset_id != ".."
        && !asset_id
            .chars()
            .any(|c| matches!(c, '/' | '\\') || c.is_control())
}

/// File stem for an asset's exported image.
///
/// Anything other than letters, digits, `-` and `_` becomes `_`.
#[must_use]
pub fn file_stem(asset_id: &str) -> String {
    let stem: String = asset_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}

/// Generate a business identifier of the form `PRE-123456-42`.
///
/// The prefix is the first three letters or digits of the category, uppercased,
/// or `fallback_prefix` when the category has none. The middle part is the last six
/// digits of the epoch milliseconds; the suffix comes from the sub-second clock.
#[must_use]
pub fn generate_asset_id(
    category: Option<&str>,
    fallback_prefix: &str,
    now: DateTime<Utc>,
) -> String {
    let from_category: String = category
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(3)
        .collect();
    let prefix = if from_category.is_empty() {
        fallback_prefix.to_string()
    } else {
        from_category
    };
    let millis = now.timestamp_millis().unsigned_abs() % 1_000_000;
    let suffix = now.timestamp_subsec_micros() % 100;
    format!("{}-{millis:06}-{suffix:02}", prefix.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_round_trip_str() {
        for status in [AssetStatus::Active, AssetStatus::Maintenance, AssetStatus::Retired] {
            assert_eq!(status.as_str().parse::<AssetStatus>().unwrap(), status);
        }
        assert!("lost".parse::<AssetStatus>().is_err());
    }

    #[test]
    fn test_status_default() {
        assert_eq!(AssetStatus::default(), AssetStatus::Active);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(AssetCategory::ItEquipment.to_string(), "it-equipment");
        assert_eq!(AssetCategory::AvEquipment.to_string(), "av-equipment");
        assert_eq!(
            serde_json::to_string(&AssetCategory::ItEquipment).unwrap(),
            "\"it-equipment\""
        );
    }

    #[test]
    fn test_asset_url_trims_trailing_slash() {
        assert_eq!(asset_url("https://x", "AST-001"), "https://x/asset/AST-001");
        assert_eq!(asset_url("https://x/", "AST-001"), "https://x/asset/AST-001");
    }

    #[test]
    fn test_generate_asset_id_from_category() {
        let now = Utc.timestamp_opt(1_700_000_123, 456_789_000).unwrap();
        let id = generate_asset_id(Some("furniture"), "AST", now);
        assert_eq!(id, "FUR-123456-89");

        let id = generate_asset_id(Some("it-equipment"), "AST", now);
        assert_eq!(id, "ITE-123456-89");
    }

    #[test]
    fn test_generate_asset_id_fallback_prefix() {
        let now = Utc.timestamp_opt(1_700_000_000, 7_000_000).unwrap();
        let id = generate_asset_id(None, "AST", now);
        assert!(id.starts_with("AST-000007-"));
        let id = generate_asset_id(Some(""), "inv", now);
        assert!(id.starts_with("INV-"));
        let id = generate_asset_id(Some("--"), "AST", now);
        assert!(id.starts_with("AST-"));
    }

    #[test]
    fn test_is_valid_asset_id() {
        assert!(is_valid_asset_id("AST-001"));
        assert!(is_valid_asset_id("Büro-7"));
        assert!(!is_valid_asset_id(""));
        assert!(!is_valid_asset_id("  "));
        assert!(!is_valid_asset_id(".."));
        assert!(!is_valid_asset_id("../etc/passwd"));
        assert!(!is_valid_asset_id("a\\b"));
        assert!(!is_valid_asset_id("a\nb"));
    }

    #[test]
    fn test_file_stem_stays_in_directory() {
        assert_eq!(file_stem("AST-001"), "AST-001");
        assert_eq!(file_stem("../../etc/passwd"), "______etc_passwd");
        assert_eq!(file_stem(".."), "__");
        assert_eq!(file_stem("a b.c"), "a_b_c");
        assert_eq!(file_stem(""), "_");

        let dir = std::path::Path::new("/tmp/labels");
        let path = dir.join(format!("{}.png", file_stem("../../x")));
        assert_eq!(path.parent(), Some(dir));
    }

    #[test]
    fn test_new_asset_defaults() {
        let asset = NewAsset::new("AST-001", "MacBook Pro", "it-equipment");
        assert_eq!(asset.status, AssetStatus::Active);
        assert!(asset.description.is_none());
        assert!(asset.value.is_none());
    }
}
