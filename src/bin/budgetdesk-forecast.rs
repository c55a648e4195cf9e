// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use std::path::Path;

use budgetdesk::commands::forecast::{ForecastModel, ForecastOptions, read_rows, run_forecast};
use budgetdesk::utils::{maybe_print_json, month_label, parse_year, pretty_table};
use budgetdesk::{cli, db};

fn main() -> Result<()> {
    env_logger::init();
    let matches = cli::build_forecast_cli().get_matches();

    let expenses_path = matches.get_one::<String>("expenses");
    let income_path = matches.get_one::<String>("income");
    if expenses_path.is_none() && income_path.is_none() {
        bail!("Pass at least one of --expenses or --income");
    }
    let opts = ForecastOptions {
        year: parse_year(matches.get_one::<String>("year").unwrap())?,
        model: matches.get_one::<String>("model").unwrap().parse::<ForecastModel>()?,
        replace: matches.get_flag("replace"),
        dry_run: matches.get_flag("dry_run"),
    };
    let expenses = match expenses_path {
        Some(p) => read_rows(Path::new(p.trim()))?,
        None => Vec::new(),
    };
    let income = match income_path {
        Some(p) => read_rows(Path::new(p.trim()))?,
        None => Vec::new(),
    };

    let mut conn = db::open_or_init(matches.get_one::<String>("db").map(|s| s.as_str()))?;
    let projections = run_forecast(&mut conn, &opts, &expenses, &income)?;

    if maybe_print_json(matches.get_flag("json"), false, &projections)? {
        return Ok(());
    }
    let rows = projections
        .iter()
        .map(|p| {
            vec![
                p.kind.to_string(),
                p.category.clone(),
                p.company.clone(),
                format!("{} {}", month_label(p.month), p.year),
                format!("{:.2}", p.budget),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Type", "Category", "Company", "Period", "Budget"], rows)
    );
    println!(
        "{} {} projection(s) for {}{}",
        projections.len(),
        opts.model,
        opts.year,
        if opts.dry_run { " (dry run, nothing written)" } else { "" }
    );
    Ok(())
}
