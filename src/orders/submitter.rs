//! Order submission pipeline
//!
//! resolve ids → (reuse active order) → resolve items → build payload →
//! review → create. Review denial and server rejection surface as
//! [`ConsoleError::InsufficientFunds`] and [`ConsoleError::OrderRejected`].

use tracing::{debug, info};

use super::matcher::OrderMatcher;
use super::{Order, OrderPayload, ReviewResponse};
use crate::config::ClientConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::metrics::record_order;
use crate::search::{SearchExecutor, SearchFilters};
use crate::session::ConsoleSession;
use crate::validate::stac_ids_or_items;
use crate::StacItem;

/// What to order and how
#[derive(Debug, Clone, Default)]
pub struct OrderRequest {
    stac_ids: Option<Vec<String>>,
    items: Option<Vec<StacItem>>,
    check_active_orders: bool,
    omit_search: bool,
    omit_review: bool,
}

impl OrderRequest {
    /// Order the given STAC ids
    pub fn for_ids<I, S>(stac_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stac_ids: Some(stac_ids.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Order the given STAC items, e.g. from a previous search
    pub fn for_items(items: Vec<StacItem>) -> Self {
        Self {
            items: Some(items),
            ..Self::default()
        }
    }

    /// Also supply items; explicit ids still take precedence
    pub fn with_items(mut self, items: Vec<StacItem>) -> Self {
        self.items = Some(items);
        self
    }

    /// Return an active order covering all ids instead of creating one
    pub fn check_active_orders(mut self, check: bool) -> Self {
        self.check_active_orders = check;
        self
    }

    /// Trust supplied items instead of looking them up via search
    pub fn omit_search(mut self, omit: bool) -> Self {
        self.omit_search = omit;
        self
    }

    /// Skip the review step
    pub fn omit_review(mut self, omit: bool) -> Self {
        self.omit_review = omit;
        self
    }

    /// Resolved STAC ids
    pub fn stac_ids(&self) -> ConsoleResult<Vec<String>> {
        stac_ids_or_items(self.stac_ids.as_deref(), self.items.as_deref())
    }
}

/// Reviews and creates orders through a session
pub struct OrderSubmitter<'a> {
    session: &'a dyn ConsoleSession,
    config: &'a ClientConfig,
}

impl<'a> OrderSubmitter<'a> {
    /// Submitter using `config` for item lookups
    pub fn new(session: &'a dyn ConsoleSession, config: &'a ClientConfig) -> Self {
        Self { session, config }
    }

    /// Submit `request`, returning the id of the new or reused order
    pub async fn submit(&self, request: &OrderRequest) -> ConsoleResult<String> {
        let stac_ids = request.stac_ids()?;
        info!("submitting order for {}", stac_ids.join(", "));

        if request.check_active_orders {
            let matcher = OrderMatcher::new(self.session);
            if let Some(order) = matcher.find_active_order(&stac_ids).await? {
                record_order("reused");
                return Ok(order.order_id);
            }
        }

        let items = self.resolve_items(request, &stac_ids).await?;
        if items.is_empty() {
            return Err(ConsoleError::NoValidIdentifiers(format!(
                "No valid STAC IDs in {}",
                stac_ids.join(", ")
            )));
        }

        let payload = OrderPayload::from_items(&items)?;

        if !request.omit_review {
            let review = self.review_payload(&payload).await?;
            if !review.authorized {
                record_order("denied");
                return Err(ConsoleError::InsufficientFunds(review.denial_message()));
            }
        }

        let value = self
            .session
            .post_json("/orders", &serde_json::to_value(&payload)?)
            .await?;
        let order: Order = serde_json::from_value(value)?;
        if order.is_rejected() {
            record_order("rejected");
            return Err(ConsoleError::OrderRejected(format!(
                "Order for {} rejected.",
                stac_ids.join(", ")
            )));
        }

        record_order("created");
        info!("successfully submitted order {}", order.order_id);
        Ok(order.order_id)
    }

    /// Review an order for `stac_ids` or `items` without creating it
    pub async fn review(&self, request: &OrderRequest) -> ConsoleResult<ReviewResponse> {
        let stac_ids = request.stac_ids()?;
        let items = self.resolve_items(request, &stac_ids).await?;
        if items.is_empty() {
            return Err(ConsoleError::NoValidIdentifiers(format!(
                "No valid STAC IDs in {}",
                stac_ids.join(", ")
            )));
        }
        self.review_payload(&OrderPayload::from_items(&items)?).await
    }

    async fn review_payload(&self, payload: &OrderPayload) -> ConsoleResult<ReviewResponse> {
        debug!("reviewing order for {}", payload.granule_ids().join(", "));
        let value = self
            .session
            .post_json("/orders/review", &serde_json::to_value(payload)?)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Full STAC items for the order
    ///
    /// Supplied items are used as is only when no explicit ids were given and
    /// the search is omitted; otherwise the ids are looked up.
    async fn resolve_items(
        &self,
        request: &OrderRequest,
        stac_ids: &[String],
    ) -> ConsoleResult<Vec<StacItem>> {
        let has_ids = request.stac_ids.as_ref().is_some_and(|ids| !ids.is_empty());
        if request.omit_search && !has_ids {
            if let Some(items) = &request.items {
                return Ok(items.clone());
            }
        }

        let filters = SearchFilters::new()
            .filter("ids", stac_ids.to_vec())
            .filter("limit", stac_ids.len());
        let result = SearchExecutor::new(self.session, self.config)
            .execute(&filters.compile())
            .await?;
        Ok(result.into_features())
    }
}
