//! Unit tests for active-order matching

use capella_console_client::orders::{filter_active, find_matching, Order};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

fn order(id: &str, expiration: Option<&str>, granules: &[&str]) -> Order {
    serde_json::from_value(json!({
        "orderId": id,
        "expirationDate": expiration,
        "items": granules
            .iter()
            .map(|g| json!({"collectionId": "c", "granuleId": g}))
            .collect::<Vec<_>>(),
    }))
    .unwrap()
}

fn targets(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_latest_expiring_superset_wins() {
    let now = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
    let orders = vec![
        order("early", Some("2022-06-02T00:00:00Z"), &["x", "y", "z"]),
        order("late", Some("2022-06-10T00:00:00Z"), &["x", "y"]),
        order("expired", Some("2022-05-01T00:00:00Z"), &["x", "y", "z"]),
    ];

    let active = filter_active(orders, now);
    let ids: Vec<_> = active.iter().map(|o| o.order_id.as_str()).collect();
    assert_eq!(ids, vec!["late", "early"]);

    assert_eq!(
        find_matching(&active, &targets(&["x", "y"])).map(|o| o.order_id.as_str()),
        Some("late")
    );
    assert_eq!(
        find_matching(&active, &targets(&["z"])).map(|o| o.order_id.as_str()),
        Some("early")
    );
    assert!(find_matching(&active, &targets(&["x", "w"])).is_none());
}

#[test]
fn test_unparseable_and_missing_expirations_never_match() {
    let now = Utc::now();
    let future = (now + Duration::days(1)).to_rfc3339();
    let orders = vec![
        order("garbled", Some("soon"), &["a"]),
        order("none", None, &["a"]),
        order("ok", Some(&future), &["b"]),
    ];

    let active = filter_active(orders, now);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].order_id, "ok");
    assert!(find_matching(&active, &targets(&["a"])).is_none());
}

#[test]
fn test_expiring_exactly_now_is_active() {
    let now = Utc.with_ymd_and_hms(2022, 6, 1, 12, 0, 0).unwrap();
    let active = filter_active(vec![order("edge", Some("2022-06-01T12:00:00Z"), &["a"])], now);
    assert_eq!(active.len(), 1);
}
