//! Command-line interface for assettag.
//!
//! This module provides the CLI structure and output formatting for the
//! `assettag` binary.

mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AddAssetCommand, AssetCommand, ConfigCommand, ListAssetsCommand, OutputFormat, QrCommand,
};

use crate::logging::Verbosity;

/// assettag - Track assets with scannable QR codes
///
/// Keeps an asset register, prints a QR code per asset that links back to its
/// record, and resolves scanned codes to the current record.
#[derive(Debug, Parser)]
#[command(name = "assettag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage asset records
    #[command(subcommand)]
    Asset(AssetCommand),

    /// Generate, decode, and resolve QR codes
    #[command(subcommand)]
    Qr(QrCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetCategory, AssetStatus};
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "assettag");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["assettag", "-q", "config", "path"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["assettag", "config", "path"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["assettag", "-v", "config", "path"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["assettag", "-vv", "config", "path"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_asset_add() {
        let cli = parse(&[
            "assettag",
            "asset",
            "add",
            "MacBook Pro",
            "--category",
            "it-equipment",
            "--value",
            "2499.99",
        ]);
        let Command::Asset(AssetCommand::Add(add)) = cli.command else {
            panic!("expected asset add");
        };
        assert_eq!(add.name, "MacBook Pro");
        assert_eq!(add.category, AssetCategory::ItEquipment);
        assert_eq!(add.status, AssetStatus::Active);
        assert_eq!(add.value, Some(2499.99));
        assert!(add.asset_id.is_none());
        assert!(!add.no_qr);
    }

    #[test]
    fn test_parse_asset_add_requires_category() {
        assert!(Cli::try_parse_from(["assettag", "asset", "add", "Chair"]).is_err());
        assert!(Cli::try_parse_from([
            "assettag",
            "asset",
            "add",
            "Chair",
            "--category",
            "spaceships"
        ])
        .is_err());
    }

    #[test]
    fn test_parse_asset_list_filters() {
        let cli = parse(&[
            "assettag",
            "asset",
            "list",
            "--status",
            "maintenance",
            "--limit",
            "5",
            "-f",
            "json",
        ]);
        let Command::Asset(AssetCommand::List(list)) = cli.command else {
            panic!("expected asset list");
        };
        assert_eq!(list.status, Some(AssetStatus::Maintenance));
        assert_eq!(list.limit, 5);
        assert_eq!(list.format, OutputFormat::Json);
    }

    #[test]
    fn test_parse_qr_generate() {
        let cli = parse(&["assettag", "qr", "generate", "AST-001"]);
        assert!(matches!(
            cli.command,
            Command::Qr(QrCommand::Generate { if_stale: false, .. })
        ));

        let cli = parse(&["assettag", "qr", "generate", "AST-001", "--if-stale"]);
        assert!(matches!(
            cli.command,
            Command::Qr(QrCommand::Generate { if_stale: true, .. })
        ));
        assert!(Cli::try_parse_from(["assettag", "qr", "generate", "AST-001", "--force"]).is_err());
    }

    #[test]
    fn test_parse_qr_bulk_requires_ids() {
        assert!(Cli::try_parse_from(["assettag", "qr", "bulk"]).is_err());
        let cli = parse(&["assettag", "qr", "bulk", "AST-001", "AST-002"]);
        let Command::Qr(QrCommand::Bulk { asset_ids, .. }) = cli.command else {
            panic!("expected qr bulk");
        };
        assert_eq!(asset_ids, vec!["AST-001", "AST-002"]);
    }

    #[test]
    fn test_parse_qr_lookup_payload_or_image() {
        assert!(Cli::try_parse_from(["assettag", "qr", "lookup"]).is_err());
        assert!(Cli::try_parse_from(["assettag", "qr", "lookup", "{}", "--image", "a.png"]).is_err());

        let cli = parse(&["assettag", "qr", "lookup", "--image", "code.png"]);
        let Command::Qr(QrCommand::Lookup { payload, image, .. }) = cli.command else {
            panic!("expected qr lookup");
        };
        assert!(payload.is_none());
        assert_eq!(image, Some(PathBuf::from("code.png")));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["assettag", "-c", "/custom/config.toml", "config", "show"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
