//! Paginated execution of a compiled search
//!
//! [`PageFetcher`] issues one `POST` per page (with retry), following
//! server-provided `next` links. [`SearchExecutor`] drives it until the
//! requested limit or the server-reported match count is reached, or the
//! server stops returning a `next` link.
//!
//! Includes safety mechanisms:
//! - Maximum iteration limit against servers that never stop paginating
//! - Truncation of the final page overrun

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};

use super::compiler::{CompiledQuery, SearchPayload};
use super::result::SearchResult;
use crate::config::ClientConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::retry::RetryPolicy;
use crate::session::ConsoleSession;
use crate::{Link, StacItem};

/// Maximum number of pages fetched for one search
pub const MAX_ITERATIONS: usize = 10_000;

/// One page of a search response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    /// Total matches reported by the server
    #[serde(rename = "numberMatched", default)]
    pub number_matched: Option<u64>,
    /// Features on this page
    #[serde(default)]
    pub features: Vec<StacItem>,
    /// Pagination links
    #[serde(default)]
    pub links: Vec<Link>,
}

impl SearchPage {
    /// `href` of the `next` link, if any
    pub fn next_href(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == "next")
            .map(|l| l.href.as_str())
    }
}

/// Point a `next` link at the search endpoint's host
///
/// Links whose host (and port) already match `search_url` are used as is;
/// any other link is rewritten to `search_url` keeping its query string.
pub fn resolve_next_href(search_url: &str, next_href: &str) -> String {
    let netloc = |url: &str| {
        Url::parse(url)
            .ok()
            .map(|u| (u.host_str().map(str::to_owned), u.port_or_known_default()))
    };

    let next = netloc(next_href);
    if next.is_some() && next == netloc(search_url) {
        return next_href.to_string();
    }

    let query = next_href.split_once('?').map(|(_, q)| q).unwrap_or("");
    debug!("rewriting next link {} onto {}", next_href, search_url);
    format!("{search_url}?{query}")
}

/// Fetches single search pages with retry
pub struct PageFetcher<'a> {
    session: &'a dyn ConsoleSession,
    retry: RetryPolicy,
}

impl<'a> PageFetcher<'a> {
    /// Create a fetcher using `retry` for transient failures
    pub fn new(session: &'a dyn ConsoleSession, retry: RetryPolicy) -> Self {
        Self { session, retry }
    }

    /// `POST` `payload` to the search endpoint, or to `next_href` when given
    pub async fn fetch(
        &self,
        payload: &SearchPayload,
        next_href: Option<&str>,
    ) -> ConsoleResult<SearchPage> {
        let search_url = self.session.search_url();
        let url = match next_href {
            Some(href) => resolve_next_href(&search_url, href),
            None => search_url,
        };
        let body = serde_json::to_value(payload)?;

        let session = self.session;
        let (url_ref, body_ref) = (url.as_str(), &body);
        let value = self
            .retry
            .run("catalog search", move || session.post_json(url_ref, body_ref))
            .await?;

        let page: SearchPage = serde_json::from_value(value)
            .map_err(|e| ConsoleError::Parse(format!("invalid search page from {url}: {e}")))?;
        crate::metrics::record_search_page(page.features.len());
        Ok(page)
    }
}

/// Drives [`PageFetcher`] across pages and accumulates the result
pub struct SearchExecutor<'a> {
    fetcher: PageFetcher<'a>,
    page_size: u64,
    default_limit: u64,
}

impl<'a> SearchExecutor<'a> {
    /// Executor using the page size, default limit and retry policy of `config`
    pub fn new(session: &'a dyn ConsoleSession, config: &ClientConfig) -> Self {
        Self {
            fetcher: PageFetcher::new(session, config.retry_policy().clone()),
            page_size: config.page_size(),
            default_limit: config.default_limit(),
        }
    }

    /// Run a compiled query
    pub async fn execute(&self, query: &CompiledQuery) -> ConsoleResult<SearchResult> {
        self.execute_payload(query.payload.clone()).await
    }

    /// Run `payload`, fetching pages until a stop condition holds
    ///
    /// The caller's `limit` (or the default cap) is tracked separately from
    /// the per-request `limit`: the first request asks for at most the page
    /// size, later requests for the full page size. Never fails for zero
    /// matches.
    pub async fn execute_payload(&self, mut payload: SearchPayload) -> ConsoleResult<SearchResult> {
        let requested_limit = payload.limit.unwrap_or(self.default_limit);
        payload.limit = Some(self.page_size.min(requested_limit));
        payload.page = None;

        debug!(?payload, "searching catalog");

        let mut result = SearchResult::new(payload.clone());
        let mut page_cnt: u64 = 1;
        let mut next_href: Option<String> = None;
        let mut iteration = 0;

        loop {
            // Safety check: prevent infinite loops
            if iteration >= MAX_ITERATIONS {
                return Err(ConsoleError::PaginationExceeded(MAX_ITERATIONS));
            }
            iteration += 1;

            if page_cnt > 1 {
                let collected = result.len() as u64;
                info!(
                    "\tpage {} ({} - {})",
                    page_cnt,
                    collected,
                    collected + payload.limit.unwrap_or(self.page_size)
                );
            }

            let page = self.fetcher.fetch(&payload, next_href.as_deref()).await?;
            let number_matched = page.number_matched;
            let next = page.next_href().map(str::to_string);
            let added = result.add(page.features, false);
            debug!("received {} features on page {}", added, page_cnt);

            let collected = result.len() as u64;
            let limit_reached = collected >= requested_limit
                || number_matched.is_some_and(|matched| collected >= matched);
            if limit_reached {
                break;
            }

            next_href = next;
            if next_href.is_none() {
                break;
            }

            if page_cnt == 1 {
                if let Some(matched) = number_matched {
                    info!("Matched a total of {} stac items", matched);
                }
            }

            payload.limit = Some(self.page_size);
            page_cnt += 1;
            payload.page = Some(page_cnt);
        }

        let found = result.len();
        result.truncate(usize::try_from(requested_limit).unwrap_or(usize::MAX));

        match found {
            0 => info!("found no STAC items matching your query"),
            1 => info!("found 1 STAC item"),
            _ => info!("found {} STAC items", result.len()),
        }

        Ok(result)
    }
}
