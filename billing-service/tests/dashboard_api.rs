mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::{app, request, send, ADMIN_TOKEN, READER_TOKEN};

#[tokio::test]
async fn index_summarises_the_store() {
    let (app, _store) = app();

    let (status, body) = send(&app, request("GET", "/home/index", Some(ADMIN_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "subscriberCount": 2,
            "itemCount": 2,
            "subscriptionCount": 1,
            "meterCount": 3,
            "pointCount": 2,
            "totalAmountCollected": 120,
            "totalAmountUncollected": 33,
            "totalBillsPaid": 1,
            "totalBillsUnpaid": 1,
        })
    );
}

#[tokio::test]
async fn table_has_counts_only() {
    let (app, _store) = app();

    let (status, body) = send(&app, request("GET", "/home/table", Some(READER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meterCount"], 3);
    assert!(body.get("totalBillsPaid").is_none());
}

#[tokio::test]
async fn items_resolve_related_names() {
    let (app, _store) = app();

    let (status, body) = send(&app, request("GET", "/home/items", Some(READER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body[0],
        json!({
            "itemId": 1,
            "subscriberName": "Amal Haddad",
            "meterNumber": 1001,
            "pointName": "North",
        })
    );
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn dashboard_requires_a_token() {
    let (app, _store) = app();

    let (status, _) = send(&app, request("GET", "/home/index", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_open() {
    let (app, _store) = app();

    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("ok"));
}
