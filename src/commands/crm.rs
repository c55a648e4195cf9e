// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::activities::{ActivityDetail, recent_activities};
use crate::commands::customers::{count_by_status, recent_customers};
use crate::commands::deals::all_deals;
use crate::error::DataResult;
use crate::models::{Customer, CustomerStatus, Deal, DealStage};
use crate::utils::{fmt_money, get_currency, maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub const RECENT_ACTIVITIES: usize = 5;
pub const RECENT_CUSTOMERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePipeline {
    pub stage: DealStage,
    pub count: usize,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub total_deals: usize,
    pub open_deals: usize,
    /// Sum of value over deals that are neither WON nor LOST.
    pub total_pipeline_value: Decimal,
    pub weighted_pipeline_value: Decimal,
    pub won_revenue: Decimal,
    /// Percentage of closed deals that were won; 0 with nothing closed.
    pub conversion_rate: f64,
    /// One row per stage, in pipeline order.
    pub pipeline: Vec<StagePipeline>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerCounts {
    pub total: i64,
    pub active: i64,
    pub lead: i64,
    pub inactive: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrmDashboard {
    pub customers: CustomerCounts,
    #[serde(flatten)]
    pub deals: PipelineSummary,
    pub recent_activities: Vec<ActivityDetail>,
    pub recent_customers: Vec<Customer>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let data = crm_dashboard(conn)?;
    if maybe_print_json(m.get_flag("json"), false, &data)? {
        return Ok(());
    }
    let ccy = get_currency(conn)?;
    let c = &data.customers;
    println!(
        "Customers: {} total, {} active, {} leads, {} inactive",
        c.total, c.active, c.lead, c.inactive
    );
    let p = &data.deals;
    println!(
        "Deals: {} total, {} open, pipeline {}, weighted {}, won {}, conversion {:.1}%",
        p.total_deals,
        p.open_deals,
        fmt_money(&p.total_pipeline_value, &ccy),
        fmt_money(&p.weighted_pipeline_value, &ccy),
        fmt_money(&p.won_revenue, &ccy),
        p.conversion_rate
    );
    let rows = p
        .pipeline
        .iter()
        .map(|s| {
            vec![
                s.stage.to_string(),
                s.count.to_string(),
                format!("{:.2}", s.value),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Stage", "Deals", "Value"], rows));
    let acts = data
        .recent_activities
        .iter()
        .map(|a| {
            vec![
                a.activity.date.to_string(),
                a.activity.kind.to_string(),
                a.activity.title.clone(),
                a.customer.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Type", "Activity", "Customer"], acts)
    );
    let custs = data
        .recent_customers
        .iter()
        .map(|c| vec![c.id.to_string(), c.name.clone(), c.status.to_string()])
        .collect();
    println!("{}", pretty_table(&["ID", "Customer", "Status"], custs));
    Ok(())
}

pub fn crm_dashboard(conn: &Connection) -> DataResult<CrmDashboard> {
    let mut customers = CustomerCounts::default();
    for (status, n) in count_by_status(conn)? {
        customers.total += n;
        match status {
            CustomerStatus::Active => customers.active += n,
            CustomerStatus::Lead => customers.lead += n,
            CustomerStatus::Inactive => customers.inactive += n,
        }
    }
    let deals = all_deals(conn)?;
    Ok(CrmDashboard {
        customers,
        deals: summarize_pipeline(&deals),
        recent_activities: recent_activities(conn, RECENT_ACTIVITIES)?,
        recent_customers: recent_customers(conn, RECENT_CUSTOMERS)?,
    })
}

pub fn summarize_pipeline(deals: &[Deal]) -> PipelineSummary {
    let mut pipeline: Vec<StagePipeline> = DealStage::ALL
        .iter()
        .map(|&stage| StagePipeline {
            stage,
            count: 0,
            value: Decimal::ZERO,
        })
        .collect();
    let mut open_deals = 0;
    let mut total_pipeline_value = Decimal::ZERO;
    let mut weighted_pipeline_value = Decimal::ZERO;
    let mut won_revenue = Decimal::ZERO;
    let (mut won, mut lost) = (0u32, 0u32);

    for d in deals {
        if let Some(slot) = pipeline.iter_mut().find(|s| s.stage == d.stage) {
            slot.count += 1;
            slot.value += d.value;
        }
        match d.stage {
            DealStage::Won => {
                won += 1;
                won_revenue += d.value;
            }
            DealStage::Lost => lost += 1,
            _ => {
                open_deals += 1;
                total_pipeline_value += d.value;
                weighted_pipeline_value +=
                    d.value * Decimal::from(d.probability) / Decimal::ONE_HUNDRED;
            }
        }
    }

    let closed = won + lost;
    let conversion_rate = if closed == 0 {
        0.0
    } else {
        f64::from(won) / f64::from(closed) * 100.0
    };

    PipelineSummary {
        total_deals: deals.len(),
        open_deals,
        total_pipeline_value,
        weighted_pipeline_value,
        won_revenue,
        conversion_rate,
        pipeline,
    }
}
