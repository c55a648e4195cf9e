// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{get_currency, maybe_print_json, set_currency};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SettingsView {
    currency: String,
    database: Option<String>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("currency", sub)) => {
            let ccy = sub.get_one::<String>("code").unwrap();
            set_currency(conn, ccy)?;
            println!("Display currency set to {}", get_currency(conn)?);
        }
        Some(("show", sub)) => {
            let view = SettingsView {
                currency: get_currency(conn)?,
                database: conn
                    .path()
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            };
            if !maybe_print_json(sub.get_flag("json"), false, &view)? {
                println!("currency: {}", view.currency);
                println!(
                    "database: {}",
                    view.database.as_deref().unwrap_or("(in memory)")
                );
            }
        }
        _ => {}
    }
    Ok(())
}
