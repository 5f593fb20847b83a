use std::sync::mpsc::{Receiver, channel};
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nutri_board::api::ApiClient;
use nutri_board::config::types::BackendConfig;
use nutri_board::engine::{BackendEngine, Engine, EngineHandle, Event, FetchTarget, Mutation, Request};
use nutri_board::types::{Report, ReportStatus};

fn start_engine(server: &MockServer) -> EngineHandle {
    let client = ApiClient::new(&BackendConfig {
        base_url: server.uri(),
        csrf_token: Some("csrf".to_owned()),
        ..BackendConfig::default()
    })
    .expect("valid client");
    BackendEngine::new(client, Duration::from_secs(60)).start()
}

/// The engine runs on its own thread; wait for its reply without blocking
/// the test runtime.
async fn recv(rx: Receiver<Event>) -> (Event, Receiver<Event>) {
    tokio::task::spawn_blocking(move || {
        let event = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("engine should reply within 5 seconds");
        (event, rx)
    })
    .await
    .expect("receiver task")
}

#[tokio::test(flavor = "multi_thread")]
async fn reports_page_is_one_based_and_carries_the_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/reports/page"))
        .and(query_param("page", "1"))
        .and(query_param("size", "8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 9, "status": "COMPLETED", "periodStart": "2025.03.01", "periodEnd": "2025.03.02"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/api/reports/count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(9)))
        .mount(&server)
        .await;

    let engine = start_engine(&server);
    let (tx, rx) = channel();
    engine.send(Request::FetchReportsPage {
        page: 2,
        size: 8,
        force: true,
        reply_tx: tx,
    });

    match recv(rx).await.0 {
        Event::ReportsPageFetched {
            page,
            reports,
            total_count,
            background,
            ..
        } => {
            assert_eq!(page, 2);
            assert_eq!(total_count, 9);
            assert!(!background);
            assert_eq!(reports[0].id, 9);
        }
        _other => panic!("expected ReportsPageFetched"),
    }
    engine.send(Request::Shutdown);
}

#[tokio::test(flavor = "multi_thread")]
async fn forbidden_delete_reports_a_permission_message() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/products/4"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let engine = start_engine(&server);
    let (tx, rx) = channel();
    engine.send(Request::DeleteProduct { id: 4, reply_tx: tx });

    match recv(rx).await.0 {
        Event::MutationError {
            mutation, message, ..
        } => {
            assert_eq!(mutation, Mutation::DeleteProduct { id: 4 });
            assert_eq!(message, "you don't have permission to delete this product");
        }
        _other => panic!("expected MutationError"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_daily_reports_become_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/daily-reports/data"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let engine = start_engine(&server);
    let (tx, rx) = channel();
    engine.send(Request::FetchDailyReports {
        year: 2025,
        month: 3,
        force: false,
        reply_tx: tx,
    });

    match recv(rx).await.0 {
        Event::FetchError {
            target,
            message,
            background,
        } => {
            assert_eq!(target, FetchTarget::DailyReports);
            assert_eq!(message, "server error (500)");
            assert!(!background);
        }
        _other => panic!("expected FetchError"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn download_writes_the_csv_into_the_directory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/reports/12/download"))
        .respond_with(ResponseTemplate::new(200).set_body_string("date,calories\n2025-03-01,2000\n"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("temp dir");
    let engine = start_engine(&server);
    let (tx, rx) = channel();
    engine.send(Request::DownloadReport {
        report: Report {
            id: 12,
            status: ReportStatus::Completed,
            period_start: Some("2025.03.01".into()),
            period_end: Some("2025.03.07".into()),
            created_at: None,
            completed_at: None,
            total_execution_time: Some(900),
        },
        dir: dir.path().join("exports"),
        reply_tx: tx,
    });

    match recv(rx).await.0 {
        Event::ReportDownloaded { id, path } => {
            assert_eq!(id, 12);
            assert_eq!(
                path,
                dir.path().join("exports").join("report_12_20250301_20250307.csv")
            );
            let saved = std::fs::read_to_string(&path).expect("saved file");
            assert!(saved.starts_with("date,calories"));
        }
        _other => panic!("expected ReportDownloaded"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn meals_arrive_with_nutrient_totals() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/meals"))
        .and(query_param("date", "2025-03-14"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 5, "mealType": "Lunch", "mealEntries": [
                {"productName": "Rice", "quantityGrams": 200},
                {"productName": "Chicken", "quantityGrams": 150}
            ]}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Rice", "caloriesPer100g": 130, "proteinsPer100g": 2.7,
             "fatsPer100g": 0.3, "carbsPer100g": 28},
            {"id": 2, "name": "Chicken", "caloriesPer100g": 200, "proteinsPer100g": 30,
             "fatsPer100g": 8, "carbsPer100g": 0}
        ])))
        .mount(&server)
        .await;

    let engine = start_engine(&server);
    let (tx, rx) = channel();
    let date = NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date");
    engine.send(Request::FetchMeals {
        date,
        force: false,
        reply_tx: tx,
    });

    match recv(rx).await.0 {
        Event::MealsFetched { date: got, meals } => {
            assert_eq!(got, date);
            assert_eq!(meals.len(), 1);
            assert!((meals[0].nutrition.calories - 560.0).abs() < 1e-9);
            assert!((meals[0].nutrition.carbs - 56.0).abs() < 1e-9);
        }
        _other => panic!("expected MealsFetched"),
    }
    engine.send(Request::Shutdown);
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_missing_meal_says_so() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/meals/8"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = start_engine(&server);
    let (tx, rx) = channel();
    engine.send(Request::DeleteMeal { id: 8, reply_tx: tx });

    match recv(rx).await.0 {
        Event::MutationError {
            mutation, message, ..
        } => {
            assert_eq!(mutation, Mutation::DeleteMeal { id: 8 });
            assert_eq!(message, "meal not found or already deleted");
        }
        _other => panic!("expected MutationError"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn meal_catalog_lists_sorted_product_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/meal-types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "Breakfast"}, {"name": "Dinner"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "rice"}, {"id": 2, "name": "Apple"}
        ])))
        .mount(&server)
        .await;

    let engine = start_engine(&server);
    let (tx, rx) = channel();
    engine.send(Request::FetchMealCatalog { reply_tx: tx });

    match recv(rx).await.0 {
        Event::MealCatalogFetched {
            meal_types,
            product_names,
        } => {
            assert_eq!(meal_types.len(), 2);
            assert_eq!(product_names, ["Apple", "rice"]);
        }
        _other => panic!("expected MealCatalogFetched"),
    }
}
