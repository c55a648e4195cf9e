// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use budgetdesk::commands::{activities, companies, contacts, crm, customers, deals};
use budgetdesk::error::DataError;
use budgetdesk::models::{
    ActivityFilter, ActivityType, CustomerFilter, CustomerStatus, CustomerUpdate, DealStage,
    DealUpdate, NewActivity, NewContact, NewCustomer, NewDeal,
};
use budgetdesk::{cli, db};
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn customer(conn: &Connection, name: &str) -> i64 {
    customers::create_customer(conn, &NewCustomer::named(name)).unwrap()
}

fn deal(conn: &Connection, customer_id: i64, stage: DealStage, value: i64) -> i64 {
    deals::create_deal(
        conn,
        &NewDeal {
            title: format!("{} deal", stage),
            customer_id,
            value: Decimal::from(value),
            stage: Some(stage),
            ..NewDeal::default()
        },
    )
    .unwrap()
}

fn probability(conn: &Connection, id: i64) -> u8 {
    deals::get_deal(conn, id).unwrap().deal.probability
}

#[test]
fn new_deal_gets_stage_default_probability() {
    let conn = setup();
    let c = customer(&conn, "Initech");
    let id = deal(&conn, c, DealStage::Negotiation, 100);
    let d = deals::get_deal(&conn, id).unwrap().deal;
    assert_eq!(d.probability, 75);
    assert_eq!(d.currency, "TRY");

    let explicit = deals::create_deal(
        &conn,
        &NewDeal {
            title: "Custom".into(),
            customer_id: c,
            probability: Some(40),
            ..NewDeal::default()
        },
    )
    .unwrap();
    let d = deals::get_deal(&conn, explicit).unwrap().deal;
    assert_eq!(d.stage, DealStage::Lead);
    assert_eq!(d.probability, 40);
}

#[test]
fn stage_transitions_pin_only_closed_stages() {
    let conn = setup();
    let c = customer(&conn, "Initech");
    let id = deal(&conn, c, DealStage::Lead, 100);
    deals::update_deal(
        &conn,
        id,
        &DealUpdate {
            probability: Some(33),
            ..DealUpdate::default()
        },
    )
    .unwrap();

    deals::update_deal_stage(&conn, id, DealStage::Qualified).unwrap();
    assert_eq!(probability(&conn, id), 33);
    deals::update_deal_stage(&conn, id, DealStage::Won).unwrap();
    assert_eq!(probability(&conn, id), 100);
    deals::update_deal_stage(&conn, id, DealStage::Lost).unwrap();
    assert_eq!(probability(&conn, id), 0);
    deals::update_deal_stage(&conn, id, DealStage::Proposal).unwrap();
    assert_eq!(probability(&conn, id), 0);

    assert!(matches!(
        deals::update_deal_stage(&conn, 999, DealStage::Won),
        Err(DataError::NotFound { .. })
    ));
}

#[test]
fn closed_deals_keep_their_pinned_probability_on_update() {
    let conn = setup();
    let c = customer(&conn, "Initech");
    let id = deal(&conn, c, DealStage::Proposal, 100);
    deals::update_deal(
        &conn,
        id,
        &DealUpdate {
            stage: Some(DealStage::Won),
            probability: Some(40),
            ..DealUpdate::default()
        },
    )
    .unwrap();
    assert_eq!(probability(&conn, id), 100);

    let edit = DealUpdate {
        probability: Some(40),
        ..DealUpdate::default()
    };
    deals::update_deal(&conn, id, &edit).unwrap();
    assert_eq!(probability(&conn, id), 100);

    deals::update_deal_stage(&conn, id, DealStage::Lost).unwrap();
    deals::update_deal(&conn, id, &edit).unwrap();
    assert_eq!(probability(&conn, id), 0);

    deals::update_deal_stage(&conn, id, DealStage::Negotiation).unwrap();
    deals::update_deal(&conn, id, &edit).unwrap();
    assert_eq!(probability(&conn, id), 40);
}

#[test]
fn crm_dashboard_counts_and_pipeline() {
    let conn = setup();
    let a = customer(&conn, "Alpha");
    let mut lead = NewCustomer::named("Beta");
    lead.status = CustomerStatus::Lead;
    customers::create_customer(&conn, &lead).unwrap();

    for v in [100, 200, 300] {
        deal(&conn, a, DealStage::Won, v);
    }
    deal(&conn, a, DealStage::Lost, 50);
    let proposal = deal(&conn, a, DealStage::Proposal, 1000);
    assert_eq!(probability(&conn, proposal), 50);

    let dash = crm::crm_dashboard(&conn).unwrap();
    assert_eq!(dash.customers.total, 2);
    assert_eq!(dash.customers.active, 1);
    assert_eq!(dash.customers.lead, 1);
    assert_eq!(dash.deals.total_deals, 5);
    assert_eq!(dash.deals.open_deals, 1);
    assert_eq!(dash.deals.total_pipeline_value, Decimal::from(1000));
    assert_eq!(dash.deals.weighted_pipeline_value, Decimal::from(500));
    assert_eq!(dash.deals.won_revenue, Decimal::from(600));
    assert!((dash.deals.conversion_rate - 75.0).abs() < 1e-9);
    assert_eq!(dash.deals.pipeline.len(), 6);
    assert_eq!(dash.recent_customers.len(), 2);
}

#[test]
fn empty_crm_has_zero_conversion() {
    let conn = setup();
    let dash = crm::crm_dashboard(&conn).unwrap();
    assert_eq!(dash.deals.conversion_rate, 0.0);
    assert!(dash.deals.pipeline.iter().all(|s| s.count == 0));
    assert!(dash.recent_activities.is_empty());
}

#[test]
fn customer_search_is_case_insensitive() {
    let conn = setup();
    let mut c = NewCustomer::named("Umbrella Corp");
    c.email = Some("sales@umbrella.example".into());
    customers::create_customer(&conn, &c).unwrap();
    let mut c = NewCustomer::named("Stark");
    c.phone = Some("+90 555 0101".into());
    customers::create_customer(&conn, &c).unwrap();

    let by = |term: &str| {
        customers::list_customers(
            &conn,
            &CustomerFilter {
                search: Some(term.into()),
                ..CustomerFilter::default()
            },
        )
        .unwrap()
    };
    assert_eq!(by("umbrella").len(), 1);
    assert_eq!(by("SALES@").len(), 1);
    assert_eq!(by("0101")[0].customer.name, "Stark");
    assert_eq!(by("").len(), 2);
    assert!(by("wayne").is_empty());
}

#[test]
fn search_wildcards_match_literally() {
    let conn = setup();
    customers::create_customer(&conn, &NewCustomer::named("100% Juice")).unwrap();
    customers::create_customer(&conn, &NewCustomer::named("1000 Juices")).unwrap();
    customers::create_customer(&conn, &NewCustomer::named("snake_case Ltd")).unwrap();
    customers::create_customer(&conn, &NewCustomer::named("snakeXcase Ltd")).unwrap();

    let by = |term: &str| {
        customers::list_customers(
            &conn,
            &CustomerFilter {
                search: Some(term.into()),
                ..CustomerFilter::default()
            },
        )
        .unwrap()
    };
    let pct = by("100%");
    assert_eq!(pct.len(), 1);
    assert_eq!(pct[0].customer.name, "100% Juice");
    let underscore = by("snake_case");
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].customer.name, "snake_case Ltd");
}

#[test]
fn deleting_a_customer_cascades() {
    let conn = setup();
    let c = customer(&conn, "Hooli");
    contacts::create_contact(
        &conn,
        &NewContact {
            name: "Gavin".into(),
            email: None,
            phone: None,
            title: Some("CEO".into()),
            customer_id: c,
        },
    )
    .unwrap();
    let d = deal(&conn, c, DealStage::Proposal, 10);
    activities::create_activity(
        &conn,
        &NewActivity {
            kind: ActivityType::Call,
            title: "Intro".into(),
            description: None,
            date: None,
            customer_id: Some(c),
            deal_id: Some(d),
        },
    )
    .unwrap();

    let listed = customers::list_customers(&conn, &CustomerFilter::default()).unwrap();
    assert_eq!(listed[0].contact_count, 1);
    assert_eq!(listed[0].deal_count, 1);
    assert_eq!(listed[0].activity_count, 1);

    customers::delete_customer(&conn, c).unwrap();
    for table in ["contacts", "deals", "activities"] {
        let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 0, "{} left behind", table);
    }
    assert!(matches!(
        customers::get_customer(&conn, c),
        Err(DataError::NotFound { .. })
    ));
}

#[test]
fn company_delete_detaches_customers() {
    let conn = setup();
    let co = companies::create_company(&conn, "Parent").unwrap();
    let mut c = NewCustomer::named("Child");
    c.company_id = Some(co);
    let id = customers::create_customer(&conn, &c).unwrap();
    assert_eq!(
        customers::get_customer(&conn, id).unwrap().company.as_deref(),
        Some("Parent")
    );
    companies::delete_company(&conn, co).unwrap();
    let detail = customers::get_customer(&conn, id).unwrap();
    assert_eq!(detail.customer.company_id, None);
}

#[test]
fn customer_update_clears_blank_fields() {
    let conn = setup();
    let mut c = NewCustomer::named("Wonka");
    c.notes = Some("chocolate".into());
    let id = customers::create_customer(&conn, &c).unwrap();
    customers::update_customer(
        &conn,
        id,
        &CustomerUpdate {
            notes: Some(String::new()),
            status: Some(CustomerStatus::Inactive),
            ..CustomerUpdate::default()
        },
    )
    .unwrap();
    let detail = customers::get_customer(&conn, id).unwrap();
    assert_eq!(detail.customer.notes, None);
    assert_eq!(detail.customer.status, CustomerStatus::Inactive);
}

#[test]
fn toggling_an_activity_twice_restores_it() {
    let conn = setup();
    let c = customer(&conn, "Soylent");
    let id = activities::create_activity(
        &conn,
        &NewActivity {
            kind: ActivityType::Task,
            title: "Send quote".into(),
            description: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).and_then(|d| d.and_hms_opt(9, 0, 0)),
            customer_id: Some(c),
            deal_id: None,
        },
    )
    .unwrap();
    assert!(activities::toggle_activity(&conn, id).unwrap());
    assert!(!activities::toggle_activity(&conn, id).unwrap());
    assert!(!activities::get_activity(&conn, id).unwrap().activity.completed);
}

#[test]
fn activities_list_newest_first_and_filter() {
    let conn = setup();
    let c = customer(&conn, "Tyrell");
    for (day, kind) in [
        (1, ActivityType::Call),
        (3, ActivityType::Email),
        (2, ActivityType::Call),
    ] {
        activities::create_activity(
            &conn,
            &NewActivity {
                kind,
                title: format!("day {}", day),
                description: None,
                date: NaiveDate::from_ymd_opt(2025, 5, day)
                    .and_then(|d| d.and_hms_opt(10, 0, 0)),
                customer_id: Some(c),
                deal_id: None,
            },
        )
        .unwrap();
    }
    let all = activities::list_activities(&conn, &ActivityFilter::default()).unwrap();
    assert_eq!(all[0].activity.title, "day 3");
    assert_eq!(all[0].customer.as_deref(), Some("Tyrell"));
    let calls = activities::list_activities(
        &conn,
        &ActivityFilter {
            kind: Some(ActivityType::Call),
            ..ActivityFilter::default()
        },
    )
    .unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].activity.title, "day 2");
}

#[test]
fn activity_requires_existing_links() {
    let conn = setup();
    let err = activities::create_activity(
        &conn,
        &NewActivity {
            kind: ActivityType::Note,
            title: "orphan".into(),
            description: None,
            date: None,
            customer_id: Some(42),
            deal_id: None,
        },
    );
    assert!(matches!(err, Err(DataError::NotFound { .. })));
}

#[test]
fn cli_moves_deal_stage() {
    let conn = setup();
    let c = customer(&conn, "Cyberdyne");
    let id = deal(&conn, c, DealStage::Negotiation, 500);
    let id_text = id.to_string();
    let matches = cli::build_cli().get_matches_from([
        "budgetdesk",
        "deal",
        "stage",
        "--id",
        id_text.as_str(),
        "--stage",
        "won",
    ]);
    if let Some(("deal", sub)) = matches.subcommand() {
        deals::handle(&conn, sub).unwrap();
    } else {
        panic!("deal command not parsed");
    }
    let d = deals::get_deal(&conn, id).unwrap();
    assert_eq!(d.deal.stage, DealStage::Won);
    assert_eq!(d.deal.probability, 100);
    assert_eq!(d.customer, "Cyberdyne");
}
