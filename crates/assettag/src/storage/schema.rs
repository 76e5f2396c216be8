//! `SQLite` schema definitions for assettag.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the profiles table.
pub const CREATE_PROFILES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    email TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the assets table.
///
/// `qr_fingerprint` is added by migration 2.
pub const CREATE_ASSETS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    location TEXT,
    value REAL,
    qr_code TEXT,
    assignee_id TEXT REFERENCES profiles(id),
    created_by TEXT REFERENCES profiles(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on category for filtering.
pub const CREATE_CATEGORY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_assets_category ON assets(category)
";

/// SQL statement to create an index on status for filtering.
pub const CREATE_STATUS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_assets_status ON assets(status)
";

/// SQL statement to create an index on `created_at` for listing.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_assets_created_at ON assets(created_at DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Migration 2: remember which identity the stored QR image encodes.
pub const ADD_QR_FINGERPRINT_COLUMN: &str = r"
ALTER TABLE assets ADD COLUMN qr_fingerprint TEXT
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_PROFILES_TABLE,
    CREATE_ASSETS_TABLE,
    CREATE_CATEGORY_INDEX,
    CREATE_STATUS_INDEX,
    CREATE_CREATED_AT_INDEX,
    CREATE_METADATA_TABLE,
];
