//! HTTP API flows against the full router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use ayaw::dashboard::{build_router, AppContext, AppState};
use ayaw::storage::{BetStore, MemoryStore};

use crate::mock_store::MockStore;

fn app(store: Arc<dyn BetStore>) -> (Router, AppState) {
    let state: AppState = Arc::new(AppContext::new(store));
    (build_router(state.clone()), state)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    router.clone().oneshot(request).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn decimal(v: &Value) -> Decimal {
    v.as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_bet_lifecycle_over_http() {
    let (router, _) = app(Arc::new(MemoryStore::new()));

    let resp = send(
        &router,
        "POST",
        "/api/bets",
        Some(json!({
            "date": "2024-03-10",
            "stake": "10.00",
            "potentialReturn": "25.00",
            "source": "DraftKings"
        })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let bet = json_body(resp).await;
    let id = bet["id"].as_str().unwrap().to_string();
    assert_eq!(bet["status"], "pending");

    let resp = send(
        &router,
        "PUT",
        &format!("/api/bets/{id}"),
        Some(json!({ "notes": "late line move" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["notes"], "late line move");

    let resp = send(
        &router,
        "POST",
        &format!("/api/bets/{id}/settle"),
        Some(json!({ "status": "won" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let settled = json_body(resp).await;
    assert_eq!(decimal(&settled["actualReturn"]), dec!(25));

    let stats = json_body(send(&router, "GET", "/api/stats", None).await).await;
    assert_eq!(stats["unit"], "bet");
    assert_eq!(decimal(&stats["stats"]["totalProfit"]), dec!(15));
    assert_eq!(decimal(&stats["stats"]["roi"]), dec!(150));

    let resp = send(&router, "DELETE", &format!("/api/bets/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&router, "DELETE", &format!("/api/bets/{id}"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_second_settlement_conflicts() {
    let (router, _) = app(Arc::new(MockStore::new()));
    send(
        &router,
        "POST",
        "/api/bets",
        Some(json!({ "date": "2024-03-10", "stake": "5" })),
    )
    .await;

    let lost = json!({ "status": "lost" });
    let first = send(&router, "POST", "/api/bets/MOCK-001/settle", Some(lost.clone())).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = send(&router, "POST", "/api/bets/MOCK-001/settle", Some(lost)).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = json_body(second).await;
    assert!(body["error"].as_str().unwrap().contains("lost -> lost"));

    let reopen = send(
        &router,
        "PUT",
        "/api/bets/MOCK-001",
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(reopen.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_filters_from_query_string() {
    let (router, _) = app(Arc::new(MemoryStore::new()));
    let bets = [
        json!({ "date": "2024-01-01", "stake": "10" }),
        json!({ "date": "2024-02-01", "stake": "10", "legs": [
            { "player": "LeBron James", "prop": "Over 25.5 Pts", "result": "won" },
            { "player": "Stephen Curry", "prop": "Over 4.5 3PM", "result": "lost" }
        ]}),
        json!({ "date": "2024-03-01", "stake": "10" }),
    ];
    for bet in bets {
        send(&router, "POST", "/api/bets", Some(bet)).await;
    }

    let list = json_body(send(&router, "GET", "/api/bets?viewMode=straight", None).await).await;
    let dates: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-01-01"]);

    let list = json_body(
        send(
            &router,
            "GET",
            "/api/bets?startDate=2024-01-15&endDate=2024-02-15",
            None,
        )
        .await,
    )
    .await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["kind"], "parlay");

    let stats = json_body(
        send(
            &router,
            "GET",
            "/api/stats?viewMode=props&searchTerm=curry%203pm",
            None,
        )
        .await,
    )
    .await;
    assert_eq!(stats["unit"], "leg");
    assert_eq!(stats["stats"]["totalCount"], 2);
    assert_eq!(stats["stats"]["losses"], 1);

    let resp = send(&router, "GET", "/api/bets?startDate=yesterday", None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_timeline_and_sources_endpoints() {
    let (router, _) = app(Arc::new(MemoryStore::new()));
    for (date, source, status, ret) in [
        ("2024-01-01", "FanDuel", "won", Some("30")),
        ("2024-01-02", "FanDuel", "lost", None),
        ("2024-01-02", "", "push", None),
    ] {
        let mut bet = json!({ "date": date, "stake": "10", "source": source, "status": status });
        if let Some(r) = ret {
            bet["actualReturn"] = json!(r);
        }
        let resp = send(&router, "POST", "/api/bets", Some(bet)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let timeline = json_body(send(&router, "GET", "/api/timeline", None).await).await;
    let points = timeline.as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(decimal(&points[0]["cumulative"]), dec!(20));
    assert_eq!(decimal(&points[1]["cumulative"]), dec!(10));

    let sources = json_body(send(&router, "GET", "/api/sources", None).await).await;
    assert_eq!(sources[0]["source"], "FanDuel");
    assert_eq!(sources[0]["stats"]["totalCount"], 2);
    assert_eq!(sources[1]["source"], "unknown");
}

#[tokio::test]
async fn test_import_then_export() {
    let (router, state) = app(Arc::new(MemoryStore::new()));
    let payload = json!([
        { "date": "2024-06-01", "stake": "15", "odds": "+200" },
        { "date": "not a date", "stake": "15" },
        { "date": "2024-06-02", "stake": "-1" }
    ]);

    let resp = send(&router, "POST", "/api/import", Some(payload)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let summary = json_body(resp).await;
    assert_eq!(summary, json!({ "imported": 1, "skipped": 2 }));
    assert_eq!(state.store.list_all().await.unwrap().len(), 1);

    let exported = json_body(send(&router, "GET", "/api/export", None).await).await;
    let exported = exported.as_array().unwrap();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0]["odds"], "+200");
    assert_eq!(decimal(&exported[0]["potentialReturn"]), dec!(45));
}

#[tokio::test]
async fn test_store_failure_is_500() {
    let store = Arc::new(MockStore::new());
    store.set_error("disk I/O error");
    let (router, _) = app(store.clone());

    let resp = send(&router, "GET", "/api/stats", None).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(resp).await["error"], "disk I/O error");

    store.clear_error();
    let resp = send(&router, "GET", "/api/stats", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_correcting_outcome_updates_profit() {
    let (router, _) = app(Arc::new(MockStore::new()));
    send(
        &router,
        "POST",
        "/api/bets",
        Some(json!({ "date": "2024-03-10", "stake": "10", "potentialReturn": "25" })),
    )
    .await;
    send(
        &router,
        "POST",
        "/api/bets/MOCK-001/settle",
        Some(json!({ "status": "lost" })),
    )
    .await;

    let resp = send(
        &router,
        "PUT",
        "/api/bets/MOCK-001",
        Some(json!({ "status": "won" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(decimal(&json_body(resp).await["actualReturn"]), dec!(25));

    let stats = json_body(send(&router, "GET", "/api/stats", None).await).await;
    assert_eq!(decimal(&stats["stats"]["totalProfit"]), dec!(15));
}

#[tokio::test]
async fn test_extreme_inputs_are_handled() {
    let (router, _) = app(Arc::new(MemoryStore::new()));

    let resp = send(
        &router,
        "POST",
        "/api/bets",
        Some(json!({ "date": "2024-03-10", "stake": "10", "odds": "-2147483648" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &router,
        "POST",
        "/api/bets",
        Some(json!({ "date": "2024-03-10", "stake": "1000000000000000000000000000" })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&router, "GET", "/api/stats", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["stats"]["totalCount"], 1);
}
