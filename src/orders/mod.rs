//! Orders: wire types, active-order matching and submission
//!
//! [`matcher`] decides whether an existing non-expired order already covers a
//! set of STAC ids; [`submitter`] runs the review/create pipeline for new
//! orders.

pub mod matcher;
pub mod submitter;

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConsoleError, ConsoleResult};
use crate::StacItem;

pub use matcher::{filter_active, find_matching, OrderMatcher};
pub use submitter::{OrderRequest, OrderSubmitter};

/// Status the server reports for a refused order
pub const REJECTED_STATUS: &str = "rejected";

/// One ordered granule
///
/// Server orders occasionally carry items without ids; those deserialize with
/// empty ids and are skipped when matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Collection the granule belongs to
    #[serde(rename = "collectionId", default)]
    pub collection_id: String,
    /// STAC id of the granule
    #[serde(rename = "granuleId", default)]
    pub granule_id: String,
    /// Remaining item fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OrderItem {
    /// Item for `granule_id` in `collection_id`
    pub fn new(collection_id: impl Into<String>, granule_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            granule_id: granule_id.into(),
            extra: Map::new(),
        }
    }

    /// Whether both collection and granule id are set
    pub fn is_complete(&self) -> bool {
        !self.collection_id.is_empty() && !self.granule_id.is_empty()
    }
}

/// An order as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order UUID
    #[serde(rename = "orderId")]
    pub order_id: String,
    /// Expiration timestamp as sent by the server
    #[serde(rename = "expirationDate", default)]
    pub expiration_date: Option<String>,
    /// Ordered granules
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Order status, e.g. `completed` or `rejected`
    #[serde(rename = "orderStatus", default)]
    pub order_status: Option<String>,
    /// Remaining order fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    /// Parsed expiration, `None` when missing or unparseable
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiration_date.as_deref().and_then(parse_timestamp)
    }

    /// Whether the order has not expired at `now`
    ///
    /// Orders without a parseable expiration count as expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp >= now)
    }

    /// Granule ids of the complete items, in order
    pub fn granule_ids(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter(|i| i.is_complete())
            .map(|i| i.granule_id.as_str())
            .collect()
    }

    /// Whether every id of `stac_ids` is part of the order
    pub fn contains_all(&self, stac_ids: &[String]) -> bool {
        let granules: HashSet<&str> = self.granule_ids().into_iter().collect();
        stac_ids.iter().all(|id| granules.contains(id.as_str()))
    }

    /// Whether the server refused the order
    pub fn is_rejected(&self) -> bool {
        self.order_status.as_deref() == Some(REJECTED_STATUS)
    }
}

/// Parse an order timestamp
///
/// Accepts RFC 3339 and naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Body of `POST /orders` and `POST /orders/review`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    /// Items grouped by collection
    pub items: Vec<OrderItem>,
}

impl OrderPayload {
    /// Build from STAC items, grouping by collection in first-seen order
    pub fn from_items(items: &[StacItem]) -> ConsoleResult<Self> {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for item in items {
            let collection = item.collection.as_deref().ok_or_else(|| {
                ConsoleError::Validation(format!("STAC item {} has no collection", item.id))
            })?;
            match groups.iter_mut().find(|(c, _)| *c == collection) {
                Some((_, ids)) => ids.push(&item.id),
                None => groups.push((collection, vec![&item.id])),
            }
        }

        let items = groups
            .into_iter()
            .flat_map(|(collection, ids)| {
                ids.into_iter()
                    .map(move |id| OrderItem::new(collection, id))
            })
            .collect();
        Ok(Self { items })
    }

    /// Granule ids, in payload order
    pub fn granule_ids(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.granule_id.as_str()).collect()
    }
}

/// Reason attached to a denied review
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DenialReason {
    /// Human readable reason
    #[serde(default)]
    pub message: Option<String>,
    /// Remaining fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `POST /orders/review`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewResponse {
    /// Whether the caller may place the order
    #[serde(default)]
    pub authorized: bool,
    /// Why the order would be denied
    #[serde(rename = "authorizationDenialReason", default)]
    pub denial_reason: Option<DenialReason>,
    /// Cost breakdown and other fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReviewResponse {
    /// Server-provided denial message
    pub fn denial_message(&self) -> String {
        self.denial_reason
            .as_ref()
            .and_then(|r| r.message.clone())
            .unwrap_or_else(|| "order not authorized".to_string())
    }
}
