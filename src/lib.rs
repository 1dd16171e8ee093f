//! # Capella Console Client Library
//!
//! Async client for the Capella Console imagery API: authentication, STAC
//! catalog search, ordering and presigned asset download.
//!
//! ## Features
//!
//! - **Catalog Search**: keyword filters compiled into STAC search payloads,
//!   paginated with retry and truncated to the requested limit
//! - **Order Reuse**: active orders already covering the requested products are
//!   returned instead of placing a duplicate order
//! - **Order Review**: insufficient funds and rejected orders surface as typed errors
//! - **Asset Download**: streaming download of presigned assets with progress bar
//! - **Observability**: `tracing` logs and `metrics` counters, optional Prometheus exporter
//!
//! ## Quick Start
//!
//! ```no_run
//! use capella_console_client::{ClientConfig, ConsoleClient, Credentials, SearchFilters};
//! use capella_console_client::orders::OrderRequest;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Credentials::Token { token: "<jwt>".into(), check: true };
//! let client = ConsoleClient::connect(ClientConfig::from_env(), &credentials).await?;
//!
//! let filters = SearchFilters::new()
//!     .filter("bbox", json!([12.35, 41.78, 12.61, 42]))
//!     .filter("product_type", "GEO")
//!     .filter("incidence_angle__gte", 30)
//!     .filter("limit", 10)
//!     .sortby(["-datetime"]);
//! let result = client.search(&filters).await?;
//!
//! let order_id = client
//!     .submit_order(&OrderRequest::for_ids(result.stac_ids()).check_active_orders(true))
//!     .await?;
//! let assets = client.get_presigned_assets(&order_id, None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`session`] - HTTP session boundary and authentication
//! - [`search`] - Filter compilation, paginated execution, result accumulation
//! - [`orders`] - Active-order matching and order submission
//! - [`assets`] - Presigned assets and single-asset download
//! - [`client`] - [`ConsoleClient`] facade
//! - [`retry`] - Retry policy for transient failures

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Presigned assets and download
pub mod assets;

/// CLI command implementations
pub mod cli;

/// High-level client
pub mod client;

/// Client configuration
pub mod config;

/// Error types
pub mod error;

/// Request and retry metrics
pub mod metrics;

/// Order types, matching and submission
pub mod orders;

/// Retry policy
pub mod retry;

/// Catalog search
pub mod search;

/// HTTP session and authentication
pub mod session;

/// Cancellation shared across modules
pub mod shutdown;

/// Precondition checks
pub mod validate;

// Re-export commonly used types
pub use client::ConsoleClient;
pub use config::ClientConfig;
pub use error::{ConsoleError, ConsoleResult};
pub use search::{SearchFilters, SearchResult};
pub use session::{ConsoleSession, Credentials};

/// STAC item (GeoJSON feature) as returned by the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StacItem {
    /// Unique item id
    pub id: String,
    /// Collection the item belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Item properties
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Geometry, assets, links and other fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StacItem {
    /// Minimal item with `id` in `collection`
    pub fn new(id: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: Some(collection.into()),
            properties: Map::new(),
            extra: Map::new(),
        }
    }

    /// Property `key`
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// Hypermedia link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    /// Relation, e.g. `next`
    pub rel: String,
    /// Target URL
    pub href: String,
    /// Method, body and other fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
