//! Integration tests for order review, submission and active-order reuse

use capella_console_client::config::ClientConfig;
use capella_console_client::error::ConsoleError;
use capella_console_client::orders::{OrderMatcher, OrderRequest, OrderSubmitter};
use capella_console_client::StacItem;
use serde_json::json;

use crate::support::{order, search_page, MockSession, BASE_URL};

const SEARCH: &str = "/catalog/search";
const ORDERS: &str = "/orders";
const REVIEW: &str = "/orders/review";

fn config() -> ClientConfig {
    ClientConfig::default().with_base_url(BASE_URL)
}

fn stac_ids(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn authorized() -> serde_json::Value {
    json!({"authorized": true, "orderDetails": {"summary": {"total": "$0.00"}}})
}

#[tokio::test]
async fn test_active_order_reused() {
    let session = MockSession::for_customer("customer-1");
    session.respond(
        ORDERS,
        json!([
            order("old", -24, &["a", "b"]),
            order("soon", 1, &["a", "b", "c"]),
            order("later", 48, &["a", "b"]),
        ]),
    );

    let config = config();
    let order_id = OrderSubmitter::new(&*session, &config)
        .submit(&OrderRequest::for_ids(["a", "b"]).check_active_orders(true))
        .await
        .unwrap();

    assert_eq!(order_id, "later");
    let requests = session.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(
        requests[0].params,
        vec![("customerId".to_string(), "customer-1".to_string())]
    );
}

#[tokio::test]
async fn test_new_order_when_no_active_match() {
    let session = MockSession::new();
    session.respond(ORDERS, json!([order("soon", 1, &["a"])]));
    session.respond(SEARCH, search_page(&stac_ids(&["a", "z"]), Some(2), None));
    session.respond(REVIEW, authorized());
    session.respond(ORDERS, json!({"orderId": "new-order", "orderStatus": "completed"}));

    let config = config();
    let order_id = OrderSubmitter::new(&*session, &config)
        .submit(&OrderRequest::for_ids(["a", "z"]).check_active_orders(true))
        .await
        .unwrap();

    assert_eq!(order_id, "new-order");
    let posted = session
        .requests_to(ORDERS)
        .into_iter()
        .find(|r| r.method == "POST")
        .unwrap();
    assert_eq!(
        posted.body.unwrap(),
        json!({"items": [
            {"collectionId": "capella-test", "granuleId": "a"},
            {"collectionId": "capella-test", "granuleId": "z"},
        ]})
    );
}

#[tokio::test]
async fn test_item_lookup_searches_by_ids() {
    let session = MockSession::new();
    session.respond(SEARCH, search_page(&stac_ids(&["a", "b"]), Some(2), None));
    session.respond(REVIEW, authorized());

    let config = config();
    let review = OrderSubmitter::new(&*session, &config)
        .review(&OrderRequest::for_ids(["a", "b"]))
        .await
        .unwrap();

    assert!(review.authorized);
    let search = &session.requests_to(SEARCH)[0];
    assert_eq!(
        search.body.clone().unwrap(),
        json!({"ids": ["a", "b"], "limit": 2})
    );
    assert_eq!(
        session.requests_to(REVIEW)[0].body.clone().unwrap()["items"][1]["granuleId"],
        json!("b")
    );
}

#[tokio::test]
async fn test_review_denial_is_insufficient_funds() {
    let session = MockSession::new();
    session.respond(SEARCH, search_page(&stac_ids(&["a"]), Some(1), None));
    session.respond(
        REVIEW,
        json!({
            "authorized": false,
            "authorizationDenialReason": {"code": "INSUFFICIENT_FUNDS", "message": "Your balance is too low"}
        }),
    );

    let config = config();
    let err = OrderSubmitter::new(&*session, &config)
        .submit(&OrderRequest::for_ids(["a"]))
        .await
        .unwrap_err();

    match err {
        ConsoleError::InsufficientFunds(message) => assert_eq!(message, "Your balance is too low"),
        other => panic!("expected insufficient funds, got {other:?}"),
    }
    assert!(session.requests_to(ORDERS).is_empty());
}

#[tokio::test]
async fn test_rejected_order() {
    let session = MockSession::new();
    session.respond(SEARCH, search_page(&stac_ids(&["a", "b"]), Some(2), None));
    session.respond(REVIEW, authorized());
    session.respond(ORDERS, json!({"orderId": "x", "orderStatus": "rejected"}));

    let config = config();
    let err = OrderSubmitter::new(&*session, &config)
        .submit(&OrderRequest::for_ids(["a", "b"]))
        .await
        .unwrap_err();

    match err {
        ConsoleError::OrderRejected(message) => assert_eq!(message, "Order for a, b rejected."),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_no_valid_ids() {
    let session = MockSession::new();
    session.respond(SEARCH, search_page(&[], Some(0), None));

    let config = config();
    let err = OrderSubmitter::new(&*session, &config)
        .submit(&OrderRequest::for_ids(["nope"]))
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::NoValidIdentifiers(ref m) if m.contains("nope")));
    assert!(session.requests_to(REVIEW).is_empty());
}

#[tokio::test]
async fn test_supplied_items_skip_search_and_review() {
    let session = MockSession::new();
    session.respond(ORDERS, json!({"orderId": "from-items"}));

    let items = vec![
        StacItem::new("a", "col-1"),
        StacItem::new("b", "col-2"),
        StacItem::new("c", "col-1"),
    ];
    let config = config();
    let order_id = OrderSubmitter::new(&*session, &config)
        .submit(
            &OrderRequest::for_items(items)
                .omit_search(true)
                .omit_review(true),
        )
        .await
        .unwrap();

    assert_eq!(order_id, "from-items");
    assert!(session.requests_to(SEARCH).is_empty());
    assert!(session.requests_to(REVIEW).is_empty());
    let granules: Vec<_> = session.requests_to(ORDERS)[0].body.clone().unwrap()["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["granuleId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(granules, vec!["a", "c", "b"]);
}

#[tokio::test]
async fn test_missing_ids_rejected_before_any_request() {
    let session = MockSession::new();
    let config = config();

    let err = OrderSubmitter::new(&*session, &config)
        .submit(&OrderRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Validation(_)));

    let err = OrderMatcher::new(&*session)
        .find_active_order(&[])
        .await
        .unwrap_err();
    assert!(matches!(err, ConsoleError::Validation(_)));
    assert!(session.requests().is_empty());
}
