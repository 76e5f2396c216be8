//! `assettag` - CLI for the asset register
//!
//! This binary provides the command-line interface for managing assets and
//! their QR codes.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, ensure, Context};
use chrono::Utc;
use clap::Parser;

use assettag::asset::{asset_url, file_stem, generate_asset_id, is_valid_asset_id, NewAsset};
use assettag::cli::output::{asset_details, asset_table, bulk_json, bulk_summary, identity_details};
use assettag::cli::{
    AddAssetCommand, AssetCommand, Cli, Command, ConfigCommand, ListAssetsCommand, OutputFormat,
    QrCommand,
};
use assettag::payload::parse_qr_data;
use assettag::render::stored_qr_bytes;
use assettag::scan::decode_image_bytes;
use assettag::service::GeneratedQr;
use assettag::storage::AssetFilter;
use assettag::{init_logging, Config, Error, QrService, Storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Asset(asset_cmd) => handle_asset(&config, asset_cmd).await?,
        Command::Qr(qr_cmd) => handle_qr(&config, qr_cmd).await?,
        Command::Config(config_cmd) => handle_config(&config, config_cmd)?,
    }
    Ok(())
}

fn open_storage(config: &Config) -> anyhow::Result<Arc<Storage>> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("could not open asset database {}", path.display()))?;
    Ok(Arc::new(storage))
}

fn qr_service(config: &Config, storage: Arc<Storage>) -> anyhow::Result<QrService> {
    Ok(QrService::from_config(storage, config)?)
}

async fn handle_asset(config: &Config, cmd: AssetCommand) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    match cmd {
        AssetCommand::Add(add) => handle_add(config, storage, add).await?,
        AssetCommand::List(list) => handle_list(&storage, &list)?,
        AssetCommand::Show { asset_id, format } => {
            let Some(asset) = storage.asset_by_asset_id(&asset_id)? else {
                bail!(Error::asset_not_found(asset_id));
            };
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&asset)?),
                OutputFormat::Table => {
                    let url = asset_url(&config.app.base_url, &asset.asset_id);
                    print!("{}", asset_details(&asset, &url));
                }
            }
        }
        AssetCommand::Delete { asset_id } => {
            ensure!(
                storage.delete_asset(&asset_id)?,
                Error::asset_not_found(asset_id)
            );
            println!("Deleted {asset_id}");
        }
    }
    Ok(())
}

async fn handle_add(
    config: &Config,
    storage: Arc<Storage>,
    add: AddAssetCommand,
) -> anyhow::Result<()> {
    let asset_id = match add.asset_id {
        Some(asset_id) => {
            ensure!(
                is_valid_asset_id(&asset_id),
                "asset id {asset_id:?} cannot be used in a URL or file name"
            );
            if let Some(pattern) = config.id_regex()? {
                ensure!(
                    pattern.is_match(&asset_id),
                    "asset id {asset_id} does not match pattern {}",
                    pattern.as_str()
                );
            }
            asset_id
        }
        None => generate_asset_id(
            Some(add.category.as_str()),
            &config.assets.id_prefix,
            Utc::now(),
        ),
    };

    let mut new_asset = NewAsset::new(asset_id, add.name, add.category.as_str());
    new_asset.description = add.description;
    new_asset.status = add.status;
    new_asset.location = add.location;
    new_asset.value = add.value;

    let record = storage
        .insert_asset(&new_asset)
        .with_context(|| format!("could not add asset {}", new_asset.asset_id))?;
    println!("Added {}", record.asset_id);

    if !add.no_qr {
        let service = qr_service(config, storage)?;
        service
            .generate_for_asset(&record.asset_id, true)
            .await
            .with_context(|| format!("asset {} was added without a QR code", record.asset_id))?;
        println!("Generated QR code for {}", record.asset_id);
    }
    Ok(())
}

fn handle_list(storage: &Storage, list: &ListAssetsCommand) -> anyhow::Result<()> {
    let filter = AssetFilter {
        category: list.category.map(|c| c.as_str().to_string()),
        status: list.status,
        limit: list.limit,
    };
    let assets = storage.list_assets(&filter)?;
    match list.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&assets)?),
        OutputFormat::Table => print!("{}", asset_table(&assets)),
    }
    Ok(())
}

async fn handle_qr(config: &Config, cmd: QrCommand) -> anyhow::Result<()> {
    match cmd {
        QrCommand::Generate {
            asset_id,
            if_stale,
            out,
        } => {
            let service = qr_service(config, open_storage(config)?)?;
            let generated = service.generate_for_asset(&asset_id, !if_stale).await?;
            match &generated {
                GeneratedQr::Rendered { image, .. } => {
                    println!("Generated QR code for {asset_id}");
                    println!("Payload: {}", image.text);
                }
                GeneratedQr::Unchanged { .. } => {
                    println!("QR code for {asset_id} is current");
                }
            }
            if let Some(out) = out {
                write_file(&out, &stored_qr_bytes(generated.qr_code())?)?;
                println!("Wrote {}", out.display());
            }
        }
        QrCommand::Bulk {
            asset_ids,
            out_dir,
            json,
        } => {
            let service = qr_service(config, open_storage(config)?)?;
            let results = service.generate_bulk_for_assets(&asset_ids).await?;

            if let Some(dir) = out_dir {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("could not create {}", dir.display()))?;
                for result in &results {
                    if let Ok(image) = &result.outcome {
                        let name = format!("{}.{}", file_stem(&result.asset_id), image.format);
                        let path = dir.join(name);
                        write_file(&path, &image.to_bytes()?)?;
                    }
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&bulk_json(&results))?);
            } else {
                print!("{}", bulk_summary(&results));
            }

            let failed = results.iter().filter(|r| !r.is_success()).count();
            ensure!(failed == 0, "{failed} of {} QR codes failed", results.len());
        }
        QrCommand::Parse { payload } => {
            let Some(identity) = parse_qr_data(&payload) else {
                bail!(Error::InvalidPayload);
            };
            print!("{}", identity_details(&identity));
        }
        QrCommand::Lookup {
            payload,
            image,
            format,
        } => {
            let text = match (payload, image) {
                (_, Some(path)) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("could not read {}", path.display()))?;
                    decode_image_bytes(&bytes)?
                        .with_context(|| format!("no QR code found in {}", path.display()))?
                }
                (Some(payload), None) => payload,
                (None, None) => bail!("a payload or --image is required"),
            };

            let service = qr_service(config, open_storage(config)?)?;
            let asset = service.lookup_asset_by_qr(&text).await?.into_asset()?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&asset)?),
                OutputFormat::Table => {
                    let url = asset_url(&config.app.base_url, &asset.asset_id);
                    print!("{}", asset_details(&asset, &url));
                }
            }
        }
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("could not write {}", path.display()))
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[App]");
                println!("  Base URL:           {}", config.app.base_url);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[QR]");
                println!("  Size (px):          {}", config.qr.size);
                println!("  Margin (modules):   {}", config.qr.margin);
                println!("  Colors:             {} on {}", config.qr.dark_color, config.qr.light_color);
                println!("  Error correction:   {:?}", config.qr.error_correction);
                println!("  Format:             {}", config.qr.format);
                println!();
                println!("[Assets]");
                println!("  Id prefix:          {}", config.assets.id_prefix);
                println!(
                    "  Id pattern:         {}",
                    config.assets.id_pattern.as_deref().unwrap_or("(any)")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
