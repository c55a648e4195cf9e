// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Budgetdesk", "budgetdesk"));

/// Environment variable overriding the database location.
pub const DB_ENV: &str = "BUDGETDESK_DB";

/// Resolve the database file: explicit path, then `BUDGETDESK_DB`, then the
/// platform data dir.
pub fn db_path(explicit: Option<&str>) -> Result<PathBuf> {
    let from_env = std::env::var(DB_ENV).ok();
    let chosen = explicit
        .or(from_env.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty());
    if let Some(p) = chosen {
        let path = PathBuf::from(p);
        if let Some(parent) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        return Ok(path);
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("budgetdesk.sqlite"))
}

pub fn open_or_init(explicit: Option<&str>) -> Result<Connection> {
    let path = db_path(explicit)?;
    log::debug!("Opening database at {}", path.display());
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn).context("Failed to initialize schema")?;
    Ok(conn)
}

/// Create every table if missing. Foreign keys are per connection, so this
/// also switches them on for `conn`.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS companies(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('INCOME','EXPENSE')),
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(name, type)
    );

    -- several entries per company/category/month/year are allowed
    CREATE TABLE IF NOT EXISTS entries(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        company_id INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        month INTEGER NOT NULL,
        year INTEGER NOT NULL,
        budget_amount TEXT NOT NULL DEFAULT '0',
        actual_amount TEXT NOT NULL DEFAULT '0',
        description TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(company_id) REFERENCES companies(id) ON DELETE RESTRICT,
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE RESTRICT
    );
    CREATE INDEX IF NOT EXISTS idx_entries_period ON entries(year, month);

    CREATE TABLE IF NOT EXISTS customers(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        address TEXT,
        industry TEXT,
        status TEXT NOT NULL DEFAULT 'ACTIVE',
        notes TEXT,
        company_id INTEGER,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(company_id) REFERENCES companies(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS contacts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        phone TEXT,
        title TEXT,
        customer_id INTEGER NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(customer_id) REFERENCES customers(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS deals(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        value TEXT NOT NULL DEFAULT '0',
        value_try TEXT NOT NULL DEFAULT '0',
        stage TEXT NOT NULL DEFAULT 'LEAD',
        probability INTEGER NOT NULL DEFAULT 0 CHECK(probability BETWEEN 0 AND 100),
        expected_close_date TEXT,
        last_contact_date TEXT,
        notes TEXT,
        customer_id INTEGER NOT NULL,
        sales_rep TEXT,
        deal_company TEXT,
        product_category TEXT,
        product_sub_category TEXT,
        currency TEXT NOT NULL DEFAULT 'TRY',
        source TEXT,
        lead_type TEXT,
        tag TEXT,
        is_stale INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY(customer_id) REFERENCES customers(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_deals_stage ON deals(stage);

    CREATE TABLE IF NOT EXISTS activities(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        type TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        date TEXT NOT NULL,
        completed INTEGER NOT NULL DEFAULT 0,
        customer_id INTEGER,
        deal_id INTEGER,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(customer_id) REFERENCES customers(id) ON DELETE CASCADE,
        FOREIGN KEY(deal_id) REFERENCES deals(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_activities_date ON activities(date);
    "#,
    )
}
