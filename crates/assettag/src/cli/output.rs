//! Text and JSON renderings of command results.

use std::fmt::Write as _;

use serde_json::{json, Value};

use crate::asset::AssetRecord;
use crate::encoder::BulkQrResult;
use crate::payload::AssetIdentity;

/// Longest name shown in a table before truncation.
const NAME_WIDTH: usize = 28;

/// Render assets as a fixed-width table.
#[must_use]
pub fn asset_table(assets: &[AssetRecord]) -> String {
    if assets.is_empty() {
        return "No assets found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<16} {:<NAME_WIDTH$} {:<14} {:<12} {:<3}",
        "ASSET ID", "NAME", "CATEGORY", "STATUS", "QR"
    );
    for asset in assets {
        let _ = writeln!(
            out,
            "{:<16} {:<NAME_WIDTH$} {:<14} {:<12} {:<3}",
            asset.asset_id,
            truncate(&asset.name, NAME_WIDTH),
            asset.category,
            asset.status.as_str(),
            if asset.has_qr_code() { "yes" } else { "no" }
        );
    }
    out
}

/// Render one asset as labelled lines.
#[must_use]
pub fn asset_details(asset: &AssetRecord, url: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Asset:       {}", asset.asset_id);
    let _ = writeln!(out, "Name:        {}", asset.name);
    let _ = writeln!(out, "Category:    {}", asset.category);
    let _ = writeln!(out, "Status:      {}", asset.status);
    if let Some(description) = &asset.description {
        let _ = writeln!(out, "Description: {description}");
    }
    if let Some(location) = &asset.location {
        let _ = writeln!(out, "Location:    {location}");
    }
    if let Some(value) = asset.value {
        let _ = writeln!(out, "Value:       {value:.2}");
    }
    if let Some(assignee) = asset.assignee_name.as_ref().or(asset.assignee_id.as_ref()) {
        let _ = writeln!(out, "Assigned to: {assignee}");
    }
    if let Some(creator) = asset.created_by_name.as_ref().or(asset.created_by.as_ref()) {
        let _ = writeln!(out, "Created by:  {creator}");
    }
    let _ = writeln!(out, "Created:     {}", asset.created_at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "Updated:     {}", asset.updated_at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "URL:         {url}");
    let _ = writeln!(
        out,
        "QR code:     {}",
        if asset.has_qr_code() { "stored" } else { "none" }
    );
    out
}

/// Render decoded identity fields.
#[must_use]
pub fn identity_details(identity: &AssetIdentity) -> String {
    format!(
        "Asset:    {}\nName:     {}\nCategory: {}\nURL:      {}\n",
        identity.asset_id, identity.name, identity.category, identity.url
    )
}

/// Render bulk results, one line per item, followed by a tally.
#[must_use]
pub fn bulk_summary(results: &[BulkQrResult]) -> String {
    let mut out = String::new();
    for result in results {
        match &result.outcome {
            Ok(image) => {
                let _ = writeln!(
                    out,
                    "ok      {} ({} px {})",
                    result.asset_id, image.size, image.format
                );
            }
            Err(failure) => {
                let _ = writeln!(
                    out,
                    "failed  {} [{}] {}",
                    result.asset_id, failure.kind, failure.message
                );
            }
        }
    }
    let succeeded = results.iter().filter(|r| r.is_success()).count();
    let _ = writeln!(out, "{succeeded} of {} succeeded", results.len());
    out
}

/// Bulk results as JSON, without image data.
#[must_use]
pub fn bulk_json(results: &[BulkQrResult]) -> Value {
    Value::Array(
        results
            .iter()
            .map(|result| match &result.outcome {
                Ok(image) => json!({
                    "asset_id": result.asset_id,
                    "success": true,
                    "format": image.format,
                    "size": image.size,
                }),
                Err(failure) => json!({
                    "asset_id": result.asset_id,
                    "success": false,
                    "error": failure,
                }),
            })
            .collect(),
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}
