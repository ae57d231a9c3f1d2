use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::ServerConfig;

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    server::router(Arc::new(engine), &ServerConfig::default())
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-owner-id", "u1");
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

fn expense(amount_minor: i64, date: &str) -> Value {
    json!({ "amount_minor": amount_minor, "category": "food", "date": date })
}

#[tokio::test]
async fn missing_owner_is_unauthorized() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/budgets")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let blank = app
        .oneshot(
            Request::builder()
                .uri("/budgets")
                .header("x-owner-id", "  ")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(blank.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn budget_flow_maps_outcomes_to_status_codes() {
    let app = app().await;

    let (status, budget) = send_json(
        &app,
        request(
            "PUT",
            "/budgets",
            Some(json!({ "category": "food", "limit_minor": 500_000 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(budget["period"], "monthly");

    let (status, created) = send_json(
        &app,
        request("POST", "/transactions", Some(expense(300_000, "2024-03-05"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["budget_warning"], Value::Null);
    assert_eq!(created["transaction"]["amount_minor"], 300_000);

    let (status, created) = send_json(
        &app,
        request("POST", "/transactions", Some(expense(150_000, "2024-03-12"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let warning = created["budget_warning"].as_str().unwrap();
    assert!(warning.contains("90.0%"));

    let (status, rejected) = send_json(
        &app,
        request("POST", "/transactions", Some(expense(60_000, "2024-03-20"))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(rejected["error"].as_str().unwrap().starts_with("budget exceeded"));

    let (status, report) = send_json(
        &app,
        request("GET", "/reports?from=2024-03-01&to=2024-03-31", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["total_minor"], 450_000);
    assert_eq!(report["categories"][0]["category"], "food");
    assert_eq!(report["categories"][0]["budget_limit_minor"], 500_000);
    assert_eq!(report["categories"][0]["budget_percentage"], 90.0);
}

#[tokio::test]
async fn invalid_input_is_bad_request() {
    let app = app().await;

    let (status, body) = send_json(
        &app,
        request("POST", "/transactions", Some(expense(0, "2024-03-05"))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("amount"));

    let (status, _) = send_json(
        &app,
        request("GET", "/reports?from=2024-03-31&to=2024-03-01", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_budget_period_falls_back_to_monthly() {
    let app = app().await;

    let (status, budget) = send_json(
        &app,
        request(
            "PUT",
            "/budgets",
            Some(json!({ "category": "food", "limit_minor": 500_000, "period": "yearly" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(budget["period"], "monthly");

    let (_, budgets) = send_json(&app, request("GET", "/budgets", None)).await;
    assert_eq!(budgets["budgets"][0]["period"], "monthly");
}

#[tokio::test]
async fn list_budgets_and_transactions() {
    let app = app().await;
    for category in ["rent", "food"] {
        send_json(
            &app,
            request(
                "PUT",
                "/budgets",
                Some(json!({ "category": category, "limit_minor": 100_000, "period": "weekly" })),
            ),
        )
        .await;
    }
    let (status, budgets) = send_json(&app, request("GET", "/budgets", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(budgets["budgets"][0]["category"], "food");
    assert_eq!(budgets["budgets"][1]["period"], "weekly");

    send_json(
        &app,
        request("POST", "/transactions", Some(expense(1_000, "2024-03-01"))),
    )
    .await;
    send_json(
        &app,
        request("POST", "/transactions", Some(expense(2_000, "2024-04-01"))),
    )
    .await;

    let (status, listed) = send_json(
        &app,
        request("GET", "/transactions?from=2024-03-01&to=2024-03-31", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let transactions = listed["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["date"], "2024-03-01");
}

#[tokio::test]
async fn csv_import_and_export() {
    let app = app().await;
    let csv = "amount,category,description,date\n\
               12.50,food,lunch,2024-03-02\n\
               abc,food,,2024-03-02\n\
               3.00,rent,,2024-03-01\n";

    let import = Request::builder()
        .method("POST")
        .uri("/transactions/import")
        .header("x-owner-id", "u1")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap();
    let (status, outcome) = send_json(&app, import).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["imported"], 2);
    assert_eq!(outcome["skipped"], 1);
    assert_eq!(outcome["errors"][0], "row 3: invalid amount 'abc'");

    let response = app
        .clone()
        .oneshot(request("GET", "/transactions/export", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "amount,category,description,date",
            "12.50,food,lunch,2024-03-02",
            "3.00,rent,,2024-03-01",
        ]
    );
}
