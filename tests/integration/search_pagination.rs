//! Integration tests for paginated search execution

use capella_console_client::config::ClientConfig;
use capella_console_client::error::ConsoleError;
use capella_console_client::search::{SearchExecutor, SearchFilters};
use serde_json::json;

use crate::support::{ids, search_page, MockSession, BASE_URL};

const SEARCH: &str = "/catalog/search";

fn config() -> ClientConfig {
    ClientConfig::default().with_base_url(BASE_URL)
}

#[tokio::test]
async fn test_stops_at_requested_limit_across_pages() {
    let session = MockSession::new();
    let next = format!("{BASE_URL}{SEARCH}?next=token");
    session.respond(SEARCH, search_page(&ids(0, 500), Some(1500), Some(&next)));
    session.respond(SEARCH, search_page(&ids(500, 500), Some(1500), Some(&next)));
    session.respond(SEARCH, search_page(&ids(1000, 500), Some(1500), Some(&next)));

    let query = SearchFilters::new()
        .filter("product_type", "GEO")
        .filter("limit", 1200)
        .compile();
    let config = config();
    let result = SearchExecutor::new(&*session, &config)
        .execute(&query)
        .await
        .unwrap();

    assert_eq!(result.len(), 1200);
    assert_eq!(result.features()[0].id, "item-00000");
    assert_eq!(result.features()[1199].id, "item-01199");

    let requests = session.requests_to(SEARCH);
    assert_eq!(requests.len(), 3);
    let bodies: Vec<_> = requests.iter().map(|r| r.body.clone().unwrap()).collect();
    assert_eq!(bodies[0]["limit"], json!(500));
    assert!(bodies[0].get("page").is_none());
    assert_eq!(bodies[1]["page"], json!(2));
    assert_eq!(bodies[2]["page"], json!(3));
    assert_eq!(bodies[2]["limit"], json!(500));
    assert_eq!(bodies[2]["query"], json!({"sar:product_type": {"eq": "GEO"}}));
}

#[tokio::test]
async fn test_small_limit_truncates_single_page() {
    let session = MockSession::new();
    session.respond(SEARCH, search_page(&ids(0, 15), Some(100), Some("https://api.test/x")));

    let query = SearchFilters::new().filter("limit", 10).compile();
    let config = config();
    let result = SearchExecutor::new(&*session, &config)
        .execute(&query)
        .await
        .unwrap();

    assert_eq!(result.len(), 10);
    assert_eq!(result.stac_ids(), ids(0, 10));
    let requests = session.requests_to(SEARCH);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body.as_ref().unwrap()["limit"], json!(10));
}

#[tokio::test]
async fn test_number_matched_below_limit_ends_on_page_boundary() {
    let session = MockSession::new();
    let next = format!("{BASE_URL}{SEARCH}?next=token");
    session.respond(SEARCH, search_page(&ids(0, 500), Some(1200), Some(&next)));
    session.respond(SEARCH, search_page(&ids(500, 500), Some(1200), Some(&next)));
    session.respond(SEARCH, search_page(&ids(1000, 200), Some(1200), Some(&next)));
    // must stay unused: every match was collected by the third page
    session.respond(SEARCH, search_page(&ids(1200, 500), Some(1200), Some(&next)));

    let query = SearchFilters::new().filter("limit", 1500).compile();
    let config = config().with_page_size(500);
    let result = SearchExecutor::new(&*session, &config)
        .execute(&query)
        .await
        .unwrap();

    assert_eq!(result.len(), 1200);
    assert_eq!(result.page_count(), 3);
    assert_eq!(result.features()[1199].id, "item-01199");
    let requests = session.requests_to(SEARCH);
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].body.as_ref().unwrap()["limit"], json!(500));
}

#[tokio::test]
async fn test_number_matched_on_full_page_boundary() {
    let session = MockSession::new();
    let next = format!("{BASE_URL}{SEARCH}?next=token");
    session.respond(SEARCH, search_page(&ids(0, 500), Some(1000), Some(&next)));
    session.respond(SEARCH, search_page(&ids(500, 500), Some(1000), Some(&next)));
    session.respond(SEARCH, search_page(&ids(1000, 500), Some(1000), Some(&next)));

    let query = SearchFilters::new().filter("limit", 1500).compile();
    let config = config().with_page_size(500);
    let result = SearchExecutor::new(&*session, &config)
        .execute(&query)
        .await
        .unwrap();

    assert_eq!(result.len(), 1000);
    assert_eq!(session.requests_to(SEARCH).len(), 2);
}

#[tokio::test]
async fn test_stops_when_number_matched_reached() {
    let session = MockSession::new();
    let next = format!("{BASE_URL}{SEARCH}?page=2");
    session.respond(SEARCH, search_page(&ids(0, 500), Some(600), Some(&next)));
    session.respond(SEARCH, search_page(&ids(500, 100), Some(600), Some(&next)));

    let query = SearchFilters::new().filter("limit", 5000).compile();
    let config = config();
    let result = SearchExecutor::new(&*session, &config)
        .execute(&query)
        .await
        .unwrap();

    assert_eq!(result.len(), 600);
    assert_eq!(session.requests_to(SEARCH).len(), 2);
}

#[tokio::test]
async fn test_stops_without_next_link_and_tolerates_missing_count() {
    let session = MockSession::new();
    session.respond(SEARCH, search_page(&ids(0, 3), None, None));

    let config = config();
    let result = SearchExecutor::new(&*session, &config)
        .execute(&SearchFilters::new().compile())
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    // no limit given: the default cap applies to the first request
    assert_eq!(
        session.requests_to(SEARCH)[0].body.as_ref().unwrap()["limit"],
        json!(500)
    );
}

#[tokio::test]
async fn test_zero_matches_is_not_an_error() {
    let session = MockSession::new();
    session.respond(SEARCH, search_page(&[], Some(0), None));

    let config = config();
    let result = SearchExecutor::new(&*session, &config)
        .execute(&SearchFilters::new().filter("product_type", "SLC").compile())
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_foreign_next_link_rewritten_to_search_host() {
    let session = MockSession::new();
    session.respond(
        SEARCH,
        search_page(
            &ids(0, 2),
            None,
            Some("http://internal-stac:8080/search?token=abc"),
        ),
    );
    session.respond(SEARCH, search_page(&ids(2, 2), None, None));

    let config = config().with_page_size(2);
    let result = SearchExecutor::new(&*session, &config)
        .execute(&SearchFilters::new().filter("limit", 10).compile())
        .await
        .unwrap();

    assert_eq!(result.len(), 4);
    let requests = session.requests_to(SEARCH);
    assert_eq!(requests[0].url, format!("{BASE_URL}{SEARCH}"));
    assert_eq!(requests[1].url, format!("{BASE_URL}{SEARCH}?token=abc"));
}

#[tokio::test]
async fn test_duplicate_features_across_pages_dropped() {
    let session = MockSession::new();
    let next = format!("{BASE_URL}{SEARCH}?page=2");
    session.respond(SEARCH, search_page(&ids(0, 3), None, Some(&next)));
    session.respond(SEARCH, search_page(&ids(2, 3), None, None));

    let config = config().with_page_size(3);
    let result = SearchExecutor::new(&*session, &config)
        .execute(&SearchFilters::new().filter("limit", 100).compile())
        .await
        .unwrap();

    assert_eq!(result.stac_ids(), ids(0, 5));
}

#[tokio::test(start_paused = true)]
async fn test_transient_page_failure_retried() {
    let session = MockSession::new();
    session.fail(
        SEARCH,
        ConsoleError::Http {
            status: 502,
            message: "Bad Gateway".to_string(),
        },
    );
    session.fail(
        SEARCH,
        ConsoleError::Http {
            status: 503,
            message: "Service Unavailable".to_string(),
        },
    );
    session.respond(SEARCH, search_page(&ids(0, 2), Some(2), None));

    let start = tokio::time::Instant::now();
    let config = config();
    let result = SearchExecutor::new(&*session, &config)
        .execute(&SearchFilters::new().compile())
        .await
        .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(session.requests_to(SEARCH).len(), 3);
    assert!(start.elapsed() <= config.retry_policy().max_total_wait());
}

#[tokio::test]
async fn test_non_transient_page_failure_propagates() {
    let session = MockSession::new();
    session.fail(
        SEARCH,
        ConsoleError::Authorization("not authorized to perform this action".to_string()),
    );

    let config = config();
    let err = SearchExecutor::new(&*session, &config)
        .execute(&SearchFilters::new().compile())
        .await
        .unwrap_err();

    assert!(matches!(err, ConsoleError::Authorization(_)));
    assert_eq!(session.requests_to(SEARCH).len(), 1);
}
