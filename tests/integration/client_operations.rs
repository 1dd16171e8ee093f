//! Integration tests for the high-level client over a mock session

use capella_console_client::config::ClientConfig;
use capella_console_client::error::ConsoleError;
use capella_console_client::search::SearchFilters;
use serde_json::json;
use tempfile::TempDir;

use crate::support::{client_for, order, search_page, MockSession};

const TASK_ID: &str = "78616ccc-0436-4dc2-adc8-b0a1e316b095";
const ORDER_ID: &str = "c5a8f5a2-7c1e-4d3b-9b7a-0f2f4f6a9e11";

fn task(status_codes: &[&str]) -> serde_json::Value {
    json!({
        "properties": {
            "taskingrequestId": TASK_ID,
            "statusHistory": status_codes
                .iter()
                .map(|code| json!({"code": code}))
                .collect::<Vec<_>>(),
        }
    })
}

#[tokio::test]
async fn test_ids_search_follows_requested_order() {
    let session = MockSession::new();
    let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
    session.respond("/catalog/search", search_page(&ids, Some(3), None));

    let client = client_for(&session, ClientConfig::default());
    let result = client
        .search(&SearchFilters::new().filter("ids", json!(["c", "a", "b"])))
        .await
        .unwrap();
    assert_eq!(result.stac_ids(), vec!["c", "a", "b"]);

    session.respond("/catalog/search", search_page(&ids, Some(3), None));
    let sorted = client
        .search(
            &SearchFilters::new()
                .filter("ids", json!(["c", "a", "b"]))
                .sortby(["id"]),
        )
        .await
        .unwrap();
    assert_eq!(sorted.stac_ids(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_list_active_orders_filtered_by_id() {
    let session = MockSession::new();
    session.respond(
        "/orders",
        json!([
            order(ORDER_ID, 5, &["a"]),
            order("other", 10, &["b"]),
            order("gone", -1, &["c"]),
        ]),
    );

    let client = client_for(&session, ClientConfig::default());
    let orders = client
        .list_orders(Some(&[ORDER_ID.to_string()][..]), true)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_id, ORDER_ID);
}

#[tokio::test]
async fn test_list_orders_validates_ids_first() {
    let session = MockSession::new();
    let client = client_for(&session, ClientConfig::default());

    let err = client
        .list_orders(Some(&["not-a-uuid".to_string()][..]), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Validation(_)));
    assert!(session.requests().is_empty());
}

#[tokio::test]
async fn test_get_order_by_id() {
    let session = MockSession::new();
    session.respond(&format!("/orders/{ORDER_ID}"), order(ORDER_ID, 1, &["a", "b"]));

    let client = client_for(&session, ClientConfig::default());
    let orders = client
        .list_orders(Some(&[ORDER_ID.to_string()][..]), false)
        .await
        .unwrap();
    assert_eq!(orders[0].items.len(), 2);
}

#[tokio::test]
async fn test_collects_require_completed_task() {
    let session = MockSession::new();
    let client = client_for(&session, ClientConfig::default());

    let pending = task(&["received", "review"]);
    assert!(!client.is_task_completed(&pending));
    let err = client.get_collects_for_task(&pending).await.unwrap_err();
    match err {
        ConsoleError::TaskNotComplete(message) => assert_eq!(
            message,
            format!("Tasking request<{TASK_ID}> is not in completed state")
        ),
        other => panic!("expected task not complete, got {other:?}"),
    }

    session.respond(
        &format!("/collects/list/{TASK_ID}"),
        json!([{"collectId": "collect-1"}, {"collectId": "collect-2"}]),
    );
    let completed = task(&["received", "completed"]);
    let collects = client.get_collects_for_task(&completed).await.unwrap();
    assert_eq!(collects.len(), 2);
}

#[tokio::test]
async fn test_order_products_for_task() {
    let session = MockSession::new();
    session.respond(&format!("/task/{TASK_ID}"), task(&["completed"]));
    session.respond(
        &format!("/collects/list/{TASK_ID}"),
        json!([{"collectId": "collect-1"}]),
    );
    let product_ids: Vec<String> = vec!["p1".into(), "p2".into()];
    session.respond("/catalog/search", search_page(&product_ids, Some(2), None));
    session.respond("/orders", json!([order(ORDER_ID, 24, &["p1", "p2"])]));
    session.respond(
        &format!("/orders/{ORDER_ID}/download"),
        json!([
            {"id": "p1", "assets": {"HH": {"href": "https://bucket.test/p1.tif?sig=1"}}},
            {"id": "p2", "assets": {}},
        ]),
    );

    let client = client_for(&session, ClientConfig::default());
    let assets = client.order_products_for_task(TASK_ID, true).await.unwrap();

    assert_eq!(assets.len(), 2);
    assert_eq!(assets[0].href("HH"), Some("https://bucket.test/p1.tif?sig=1"));
    let search = &session.requests_to("/catalog/search")[0];
    assert_eq!(
        search.body.clone().unwrap()["query"],
        json!({"capella:collect_id": {"in": ["collect-1"]}})
    );
    // the active order covered every product
    assert!(session.requests_to("/orders/review").is_empty());
}

#[tokio::test]
async fn test_order_products_for_task_without_active_check() {
    let session = MockSession::new();
    session.respond(&format!("/task/{TASK_ID}"), task(&["completed"]));
    session.respond(
        &format!("/collects/list/{TASK_ID}"),
        json!([{"collectId": "collect-1"}]),
    );
    let product_ids: Vec<String> = vec!["p1".into()];
    session.respond("/catalog/search", search_page(&product_ids, Some(1), None));
    session.respond(
        "/orders/review",
        json!({"authorized": true, "orderDetails": {"summary": {"total": "$0.00"}}}),
    );
    session.respond("/orders", json!({"orderId": ORDER_ID, "orderStatus": "completed"}));
    session.respond(
        &format!("/orders/{ORDER_ID}/download"),
        json!([{"id": "p1", "assets": {}}]),
    );

    let client = client_for(&session, ClientConfig::default());
    let assets = client.order_products_for_task(TASK_ID, false).await.unwrap();

    assert_eq!(assets.len(), 1);
    let orders = session.requests_to("/orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].method, "POST");
    assert_eq!(session.requests_to("/orders/review").len(), 1);
}

#[tokio::test]
async fn test_presigned_assets_filtered_by_stac_id() {
    let session = MockSession::new();
    session.respond(
        &format!("/orders/{ORDER_ID}/download"),
        json!([{"id": "p1", "assets": {}}, {"id": "p2", "assets": {}}]),
    );

    let client = client_for(&session, ClientConfig::default());
    let assets = client
        .get_presigned_assets(ORDER_ID, Some(&["p2".to_string()][..]))
        .await
        .unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].id, "p2");
}

#[tokio::test]
async fn test_existing_download_is_kept() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("p1.tif");
    std::fs::write(&path, b"already here").unwrap();

    let session = MockSession::new();
    let client = client_for(&session, ClientConfig::default());
    // the URL is never contacted because the file exists
    let written = client
        .download_asset("http://127.0.0.1:9/p1.tif", &path, false, false)
        .await
        .unwrap();

    assert_eq!(written, path);
    assert_eq!(std::fs::read(&path).unwrap(), b"already here");
}
