//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::asset::{AssetCategory, AssetStatus};

/// Asset record commands.
#[derive(Debug, Subcommand)]
pub enum AssetCommand {
    /// Add an asset and generate its QR code
    Add(AddAssetCommand),

    /// List assets, newest first
    List(ListAssetsCommand),

    /// Show one asset
    Show {
        /// Asset id, e.g. AST-001
        asset_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete an asset
    Delete {
        /// Asset id, e.g. AST-001
        asset_id: String,
    },
}

/// Arguments for adding an asset.
#[derive(Debug, Args)]
pub struct AddAssetCommand {
    /// Display name
    pub name: String,

    /// Category
    #[arg(long, value_enum)]
    pub category: AssetCategory,

    /// Asset id (generated from the category when omitted)
    #[arg(long)]
    pub asset_id: Option<String>,

    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,

    /// Lifecycle status
    #[arg(long, value_enum, default_value = "active")]
    pub status: AssetStatus,

    /// Where the asset lives
    #[arg(long)]
    pub location: Option<String>,

    /// Monetary value
    #[arg(long)]
    pub value: Option<f64>,

    /// Skip generating the QR code
    #[arg(long)]
    pub no_qr: bool,
}

/// Arguments for listing assets.
#[derive(Debug, Args)]
pub struct ListAssetsCommand {
    /// Filter by category
    #[arg(long, value_enum)]
    pub category: Option<AssetCategory>,

    /// Filter by status
    #[arg(long, value_enum)]
    pub status: Option<AssetStatus>,

    /// Maximum number of results (0 for all)
    #[arg(short, long, default_value = "50")]
    pub limit: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// QR code commands.
#[derive(Debug, Subcommand)]
pub enum QrCommand {
    /// Generate and store the QR code for an asset
    Generate {
        /// Asset id, e.g. AST-001
        asset_id: String,

        /// Keep the stored code if it still matches the asset
        #[arg(long)]
        if_stale: bool,

        /// Also write the image to this file
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Generate and store QR codes for several assets
    Bulk {
        /// Asset ids
        #[arg(required = true)]
        asset_ids: Vec<String>,

        /// Write each image into this directory as <asset-id>.<ext>
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Decode a scanned payload without touching the store
    Parse {
        /// The scanned text
        payload: String,
    },

    /// Resolve a scanned payload or QR image to its asset
    Lookup {
        /// The scanned text
        #[arg(required_unless_present = "image", conflicts_with = "image")]
        payload: Option<String>,

        /// Decode the payload from a PNG or JPEG image
        #[arg(short, long, value_name = "FILE")]
        image: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON format
    Json,
}
