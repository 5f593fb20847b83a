use std::time::Duration;

use chrono::NaiveDate;
use nutri_board::engine::{Engine, Event, Mutation, Request, StubEngine};
use nutri_board::types::{CreateReportRequest, MealRequest, Product, Report, ReportStatus};

fn load_fixture_reports() -> Vec<Report> {
    let json = include_str!("fixtures/stub_reports.json");
    serde_json::from_str(json).expect("valid stub_reports.json fixture")
}

fn product(id: i64, name: &str) -> Product {
    Product {
        id,
        name: name.to_owned(),
        calories_per_100g: Some(52.0),
        proteins_per_100g: Some(0.3),
        fats_per_100g: Some(0.2),
        carbs_per_100g: Some(14.0),
        created_by: None,
        created_at: None,
    }
}

fn recv(rx: &std::sync::mpsc::Receiver<Event>) -> Event {
    rx.recv_timeout(Duration::from_secs(2))
        .expect("engine should reply within 2 seconds")
}

#[test]
fn stub_engine_pages_reports() {
    let reports = load_fixture_reports();
    assert_eq!(reports.len(), 3, "fixture should have three reports");
    assert_eq!(reports[1].status, ReportStatus::Processing);

    let handle = StubEngine {
        reports,
        ..Default::default()
    }
    .start();
    let (tx, rx) = std::sync::mpsc::channel::<Event>();

    handle.send(Request::FetchReportsPage {
        page: 2,
        size: 2,
        force: false,
        reply_tx: tx,
    });

    match recv(&rx) {
        Event::ReportsPageFetched {
            page,
            size,
            reports,
            total_count,
            background,
        } => {
            assert_eq!((page, size), (2, 2));
            assert_eq!(total_count, 3);
            assert!(!background);
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].id, 43);
        }
        _other => panic!("expected ReportsPageFetched, got a different event variant"),
    }
}

#[test]
fn stub_engine_checks_existing_periods() {
    let handle = StubEngine {
        reports: load_fixture_reports(),
        ..Default::default()
    }
    .start();
    let (tx, rx) = std::sync::mpsc::channel::<Event>();

    let d = |m, day| NaiveDate::from_ymd_opt(2025, m, day).expect("valid date");
    handle.send(Request::CheckReportExists {
        period: CreateReportRequest {
            start_date: d(3, 1),
            end_date: d(3, 7),
        },
        reply_tx: tx.clone(),
    });
    handle.send(Request::CheckReportExists {
        period: CreateReportRequest {
            start_date: d(3, 2),
            end_date: d(3, 7),
        },
        reply_tx: tx,
    });

    let mut answers = Vec::new();
    for _ in 0..2 {
        match recv(&rx) {
            Event::ReportExists { exists, .. } => answers.push(exists),
            _other => panic!("expected ReportExists"),
        }
    }
    assert_eq!(answers, vec![true, false]);
}

#[test]
fn stub_engine_latest_report_is_highest_id() {
    let handle = StubEngine {
        reports: load_fixture_reports(),
        ..Default::default()
    }
    .start();
    let (tx, rx) = std::sync::mpsc::channel::<Event>();

    handle.send(Request::FetchLatestReport { reply_tx: tx });

    match recv(&rx) {
        Event::LatestReportFetched { latest: Some(latest) } => {
            assert_eq!(latest.id, 43);
            assert_eq!(latest.status, ReportStatus::Error);
        }
        _other => panic!("expected LatestReportFetched with a report"),
    }
}

#[test]
fn stub_engine_mutations_apply_to_fixtures() {
    let handle = StubEngine {
        products: vec![product(1, "Apple"), product(2, "Pear")],
        ..Default::default()
    }
    .start();
    let (tx, rx) = std::sync::mpsc::channel::<Event>();

    handle.send(Request::DeleteProduct {
        id: 1,
        reply_tx: tx.clone(),
    });
    match recv(&rx) {
        Event::MutationOk { mutation, .. } => {
            assert_eq!(mutation, Mutation::DeleteProduct { id: 1 });
        }
        _other => panic!("expected MutationOk"),
    }

    handle.send(Request::FetchProducts {
        force: true,
        reply_tx: tx,
    });
    match recv(&rx) {
        Event::ProductsFetched { products, .. } => {
            assert_eq!(products.len(), 1);
            assert_eq!(products[0].name, "Pear");
        }
        _other => panic!("expected ProductsFetched"),
    }
}

#[test]
fn stub_engine_generate_assigns_next_id() {
    let handle = StubEngine {
        reports: load_fixture_reports(),
        ..Default::default()
    }
    .start();
    let (tx, rx) = std::sync::mpsc::channel::<Event>();

    let d = |day| NaiveDate::from_ymd_opt(2025, 4, day).expect("valid date");
    handle.send(Request::GenerateReport {
        period: CreateReportRequest {
            start_date: d(1),
            end_date: d(3),
        },
        reply_tx: tx,
    });

    match recv(&rx) {
        Event::ReportGenerated { creation } => {
            assert_eq!(creation.report_id, Some(44));
            assert_eq!(creation.status, "success");
            assert_eq!(creation.period_start.as_deref(), Some("2025-04-01"));
        }
        _other => panic!("expected ReportGenerated"),
    }
}

#[test]
fn stub_engine_logs_meals_and_totals_them() {
    let handle = StubEngine {
        products: vec![product(1, "Apple")],
        ..Default::default()
    }
    .start();
    let (tx, rx) = std::sync::mpsc::channel::<Event>();

    handle.send(Request::SaveMeal {
        request: MealRequest {
            id: None,
            meal_type_name: "Snack".to_owned(),
            product_names: vec!["Apple".to_owned()],
            quantities: vec![200],
        },
        reply_tx: tx.clone(),
    });
    match recv(&rx) {
        Event::MutationOk { mutation, .. } => {
            assert_eq!(mutation, Mutation::SaveMeal { id: None });
        }
        _other => panic!("expected MutationOk"),
    }

    let date = NaiveDate::from_ymd_opt(2025, 4, 2).expect("valid date");
    handle.send(Request::FetchMeals {
        date,
        force: true,
        reply_tx: tx,
    });
    match recv(&rx) {
        Event::MealsFetched { meals, .. } => {
            assert_eq!(meals.len(), 1);
            assert_eq!(meals[0].id, 1);
            assert!((meals[0].nutrition.calories - 104.0).abs() < 1e-9);
        }
        _other => panic!("expected MealsFetched"),
    }
}
