//! Active-order matching
//!
//! Orders are sorted ascending by expiration and consumed from the end, so
//! they are visited latest-expiring first; consumption stops at the first
//! expired order. The first visited order whose items cover every target id
//! wins.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::Order;
use crate::error::{ConsoleError, ConsoleResult};
use crate::session::ConsoleSession;

/// Non-expired orders at `now`, latest-expiring first
///
/// The full list is sorted before filtering; orders without a parseable
/// expiration sort first and count as expired.
pub fn filter_active(mut orders: Vec<Order>, now: DateTime<Utc>) -> Vec<Order> {
    orders.sort_by_key(Order::expires_at);

    let mut active = Vec::new();
    while let Some(order) = orders.pop() {
        if !order.is_active_at(now) {
            break;
        }
        active.push(order);
    }
    active
}

/// First order in `active` containing every id of `stac_ids`
pub fn find_matching<'o>(active: &'o [Order], stac_ids: &[String]) -> Option<&'o Order> {
    active.iter().find(|order| order.contains_all(stac_ids))
}

/// Looks up the caller's orders through a session
pub struct OrderMatcher<'a> {
    session: &'a dyn ConsoleSession,
}

impl<'a> OrderMatcher<'a> {
    /// Matcher listing orders through `session`
    pub fn new(session: &'a dyn ConsoleSession) -> Self {
        Self { session }
    }

    /// All orders of the authenticated customer
    pub async fn list_orders(&self) -> ConsoleResult<Vec<Order>> {
        let params: Vec<(&str, String)> = self
            .session
            .customer_id()
            .map(|id| vec![("customerId", id.to_string())])
            .unwrap_or_default();
        let value = self.session.get_json("/orders", &params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Non-expired orders, latest-expiring first
    pub async fn active_orders(&self) -> ConsoleResult<Vec<Order>> {
        let orders = self.list_orders().await?;
        let total = orders.len();
        let active = filter_active(orders, Utc::now());
        debug!("{} of {} orders active", active.len(), total);
        Ok(active)
    }

    /// Active order containing every id of `stac_ids`
    ///
    /// # Errors
    /// [`ConsoleError::Validation`] if `stac_ids` is empty, before any request.
    pub async fn find_active_order(&self, stac_ids: &[String]) -> ConsoleResult<Option<Order>> {
        if stac_ids.is_empty() {
            return Err(ConsoleError::Validation(
                "Please provide at least one stac_id".to_string(),
            ));
        }

        let active = self.active_orders().await?;
        let found = find_matching(&active, stac_ids).cloned();
        if let Some(order) = &found {
            info!(
                "all stac ids ({}) found in active order {}",
                stac_ids.join(", "),
                order.order_id
            );
        }
        Ok(found)
    }
}
