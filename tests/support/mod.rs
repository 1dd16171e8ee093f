//! Recording in-memory session shared by the test suites

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use capella_console_client::client::ConsoleClient;
use capella_console_client::config::ClientConfig;
use capella_console_client::error::{ConsoleError, ConsoleResult};
use capella_console_client::session::ConsoleSession;
use serde_json::{json, Value};

/// Base URL the mock pretends to serve
pub const BASE_URL: &str = "https://api.test";

/// A request seen by [`MockSession`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Session answering from per-path response queues
///
/// Responses are keyed by path without host and query, so
/// `https://api.test/catalog/search?page=2` is served from the
/// `/catalog/search` queue. An empty queue answers with a 404.
pub struct MockSession {
    responses: Mutex<HashMap<String, VecDeque<ConsoleResult<Value>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    customer_id: Option<String>,
}

impl MockSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_customer(None))
    }

    pub fn for_customer(customer_id: &str) -> Arc<Self> {
        Arc::new(Self::with_customer(Some(customer_id.to_string())))
    }

    fn with_customer(customer_id: Option<String>) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            customer_id,
        }
    }

    /// Queue a successful response for `path`
    pub fn respond(&self, path: &str, body: Value) {
        self.push(path, Ok(body));
    }

    /// Queue an error response for `path`
    pub fn fail(&self, path: &str, err: ConsoleError) {
        self.push(path, Err(err));
    }

    fn push(&self, path: &str, response: ConsoleResult<Value>) {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(response);
    }

    /// All requests so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests made to `path`
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    fn answer(
        &self,
        method: &'static str,
        url: &str,
        params: &[(&str, String)],
        body: Option<Value>,
    ) -> ConsoleResult<Value> {
        let path = path_of(url);
        self.requests.lock().unwrap().push(RecordedRequest {
            method,
            url: url.to_string(),
            path: path.clone(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            body,
        });

        self.responses
            .lock()
            .unwrap()
            .get_mut(&path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(ConsoleError::Http {
                    status: 404,
                    message: format!("no mock response for {method} {path}"),
                })
            })
    }
}

#[async_trait]
impl ConsoleSession for MockSession {
    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> ConsoleResult<Value> {
        self.answer("GET", path, params, None)
    }

    async fn post_json(&self, path_or_url: &str, body: &Value) -> ConsoleResult<Value> {
        self.answer("POST", path_or_url, &[], Some(body.clone()))
    }

    fn search_url(&self) -> String {
        format!("{BASE_URL}/catalog/search")
    }

    fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref()
    }
}

/// Strip scheme, host and query from `url`
fn path_of(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    let path = match without_scheme {
        Some(rest) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => url,
    };
    path.split('?').next().unwrap_or(path).to_string()
}

/// Client over `session` using the mock base URL
pub fn client_for(session: &Arc<MockSession>, config: ClientConfig) -> ConsoleClient {
    let session: Arc<dyn ConsoleSession> = session.clone();
    ConsoleClient::with_session(session, config.with_base_url(BASE_URL)).unwrap()
}

/// STAC feature `id` in collection `capella-test`
pub fn feature(id: &str) -> Value {
    json!({
        "type": "Feature",
        "id": id,
        "collection": "capella-test",
        "properties": {"datetime": "2022-01-01T00:00:00Z"},
    })
}

/// Search page with features `ids`, an optional match count and next link
pub fn search_page(ids: &[String], number_matched: Option<u64>, next: Option<&str>) -> Value {
    let mut page = json!({
        "type": "FeatureCollection",
        "features": ids.iter().map(|id| feature(id)).collect::<Vec<_>>(),
        "links": [],
    });
    if let Some(matched) = number_matched {
        page["numberMatched"] = json!(matched);
    }
    if let Some(href) = next {
        page["links"] = json!([{"rel": "next", "href": href}]);
    }
    page
}

/// `count` sequential ids starting at `start`
pub fn ids(start: usize, count: usize) -> Vec<String> {
    (start..start + count).map(|i| format!("item-{i:05}")).collect()
}

/// Order `order_id` expiring in `expires_in_hours` (negative: expired) with granules `ids`
pub fn order(order_id: &str, expires_in_hours: i64, ids: &[&str]) -> Value {
    let expiration = chrono::Utc::now() + chrono::Duration::hours(expires_in_hours);
    json!({
        "orderId": order_id,
        "orderDate": "2022-01-01T00:00:00Z",
        "expirationDate": expiration.to_rfc3339(),
        "orderStatus": "completed",
        "items": ids
            .iter()
            .map(|id| json!({"collectionId": "capella-test", "granuleId": id}))
            .collect::<Vec<_>>(),
    })
}
