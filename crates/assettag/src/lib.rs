//! `assettag` - Asset tracking with QR-code identity round trips
//!
//! This library encodes an asset's identity into a QR payload, renders and
//! stores the image on the asset record, and resolves scanned payloads back
//! to the authoritative record.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod asset;
pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod payload;
pub mod render;
pub mod scan;
pub mod service;
pub mod storage;
pub mod store;

pub use asset::{AssetRecord, AssetStatus, NewAsset};
pub use config::Config;
pub use encoder::{BulkQrResult, QrEncoder};
pub use error::{Error, ErrorKind, QrFailure, Result};
pub use logging::init_logging;
pub use payload::{parse_qr_data, AssetIdentity};
pub use render::{QrImage, QrOptions, QrRenderer};
pub use scan::{FrameDecoder, RqrrDecoder};
pub use service::{LookupOutcome, QrService};
pub use storage::Storage;
pub use store::{RecordStore, StoreError};
