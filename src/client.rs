//! High-level console client
//!
//! [`ConsoleClient`] bundles a session with the search, order and asset
//! components. Per-endpoint methods are thin wrappers over one request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::assets::{self, AssetDownloader, PresignedAssets};
use crate::config::ClientConfig;
use crate::error::{ConsoleError, ConsoleResult};
use crate::orders::{Order, OrderMatcher, OrderRequest, OrderSubmitter, ReviewResponse};
use crate::search::{SearchExecutor, SearchFilters, SearchResult};
use crate::session::{ConsoleSession, Credentials, HttpSession};
use crate::validate::validate_uuid;

const COMPLETED_STATUS: &str = "completed";

/// Client for the console API
pub struct ConsoleClient {
    session: Arc<dyn ConsoleSession>,
    config: ClientConfig,
    downloader: AssetDownloader,
    auth_header: Option<String>,
}

impl ConsoleClient {
    /// Authenticate against `config`'s base URL
    pub async fn connect(config: ClientConfig, credentials: &Credentials) -> ConsoleResult<Self> {
        let mut session = HttpSession::new(config.clone())?;
        session.authenticate(credentials).await?;
        let auth_header = session.authorization_header().map(str::to_string);

        let mut client = Self::with_session(Arc::new(session), config)?;
        client.auth_header = auth_header;
        Ok(client)
    }

    /// Client on top of an existing session
    pub fn with_session(
        session: Arc<dyn ConsoleSession>,
        config: ClientConfig,
    ) -> ConsoleResult<Self> {
        Ok(Self {
            downloader: AssetDownloader::new(&config)?,
            session,
            config,
            auth_header: None,
        })
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying session
    pub fn session(&self) -> &dyn ConsoleSession {
        self.session.as_ref()
    }

    /// `Authorization` header obtained by [`ConsoleClient::connect`]
    pub fn authorization_header(&self) -> Option<&str> {
        self.auth_header.as_deref()
    }

    /// Profile of the authenticated user
    pub async fn whoami(&self) -> ConsoleResult<Value> {
        self.session.get_json("/user", &[]).await
    }

    // TASKING

    /// Tasking request `tasking_request_id`
    pub async fn get_task(&self, tasking_request_id: &str) -> ConsoleResult<Value> {
        validate_uuid(tasking_request_id)?;
        self.session
            .get_json(&format!("/task/{tasking_request_id}"), &[])
            .await
    }

    /// Whether any status of `task` is `completed`
    pub fn is_task_completed(&self, task: &Value) -> bool {
        task["properties"]["statusHistory"]
            .as_array()
            .is_some_and(|history| {
                history
                    .iter()
                    .any(|status| status["code"].as_str() == Some(COMPLETED_STATUS))
            })
    }

    /// Collects of a completed `task`
    ///
    /// # Errors
    /// [`ConsoleError::TaskNotComplete`] if the task has not completed.
    pub async fn get_collects_for_task(&self, task: &Value) -> ConsoleResult<Vec<Value>> {
        let tasking_request_id = task["properties"]["taskingrequestId"]
            .as_str()
            .ok_or_else(|| {
                ConsoleError::Validation("task has no properties.taskingrequestId".to_string())
            })?;

        if !self.is_task_completed(task) {
            return Err(ConsoleError::TaskNotComplete(format!(
                "Tasking request<{tasking_request_id}> is not in completed state"
            )));
        }

        let value = self
            .session
            .get_json(&format!("/collects/list/{tasking_request_id}"), &[])
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    // ORDER

    /// List orders
    ///
    /// With `is_active` only non-expired orders (latest-expiring first),
    /// optionally restricted to `order_ids`. Otherwise the given orders, or
    /// all orders of the customer.
    pub async fn list_orders(
        &self,
        order_ids: Option<&[String]>,
        is_active: bool,
    ) -> ConsoleResult<Vec<Order>> {
        let order_ids = order_ids.filter(|ids| !ids.is_empty());
        if let Some(ids) = order_ids {
            ids.iter().try_for_each(|id| validate_uuid(id))?;
        }

        let matcher = OrderMatcher::new(self.session.as_ref());
        if is_active {
            let mut orders = matcher.active_orders().await?;
            if let Some(ids) = order_ids {
                orders.retain(|o| ids.contains(&o.order_id));
            }
            return Ok(orders);
        }

        match order_ids {
            None => matcher.list_orders().await,
            Some(ids) => {
                let mut orders = Vec::with_capacity(ids.len());
                for id in ids {
                    orders.push(self.get_order(id).await?);
                }
                Ok(orders)
            }
        }
    }

    /// Order `order_id`
    pub async fn get_order(&self, order_id: &str) -> ConsoleResult<Order> {
        validate_uuid(order_id)?;
        let value = self
            .session
            .get_json(&format!("/orders/{order_id}"), &[])
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Review an order without placing it
    pub async fn review_order(&self, request: &OrderRequest) -> ConsoleResult<ReviewResponse> {
        OrderSubmitter::new(self.session.as_ref(), &self.config)
            .review(request)
            .await
    }

    /// Submit an order, returning the new (or reused active) order id
    pub async fn submit_order(&self, request: &OrderRequest) -> ConsoleResult<String> {
        OrderSubmitter::new(self.session.as_ref(), &self.config)
            .submit(request)
            .await
    }

    // SEARCH

    /// Paginated catalog search
    ///
    /// Returns up to the default cap unless `limit` is given. Results of an
    /// `ids` search without `sortby` follow the order of the given ids.
    pub async fn search(&self, filters: &SearchFilters) -> ConsoleResult<SearchResult> {
        let compiled = filters.compile();
        let mut result = SearchExecutor::new(self.session.as_ref(), &self.config)
            .execute(&compiled)
            .await?;

        if compiled.payload.sortby.is_empty() {
            if let Some(ids) = filters.ids() {
                result.sort_by_ids(&ids);
            }
        }
        Ok(result)
    }

    // ASSETS

    /// Presigned asset hrefs of all products in `order_id`
    pub async fn get_presigned_assets(
        &self,
        order_id: &str,
        stac_ids: Option<&[String]>,
    ) -> ConsoleResult<Vec<PresignedAssets>> {
        assets::get_presigned_assets(self.session.as_ref(), order_id, stac_ids).await
    }

    /// Size in bytes of a presigned asset
    pub async fn get_asset_bytesize(&self, pre_signed_url: &str) -> ConsoleResult<u64> {
        self.downloader.bytesize(pre_signed_url).await
    }

    /// Download one presigned asset to `local_path`
    pub async fn download_asset(
        &self,
        pre_signed_url: &str,
        local_path: &Path,
        override_existing: bool,
        show_progress: bool,
    ) -> ConsoleResult<PathBuf> {
        self.downloader
            .download(pre_signed_url, local_path, override_existing, show_progress)
            .await
    }

    /// Order every product of a completed tasking request
    ///
    /// With `check_active_orders`, an active order covering all products is
    /// reused. Returns the presigned assets of the order.
    pub async fn order_products_for_task(
        &self,
        tasking_request_id: &str,
        check_active_orders: bool,
    ) -> ConsoleResult<Vec<PresignedAssets>> {
        let task = self.get_task(tasking_request_id).await?;
        let collect_ids: Vec<String> = self
            .get_collects_for_task(&task)
            .await?
            .iter()
            .filter_map(|c| c["collectId"].as_str().map(str::to_string))
            .collect();
        debug!("task {} has {} collects", tasking_request_id, collect_ids.len());

        if collect_ids.is_empty() {
            return Err(ConsoleError::NoValidIdentifiers(format!(
                "no collects found for tasking request {tasking_request_id}"
            )));
        }

        let items = self
            .search(&SearchFilters::new().filter("collect_id__in", collect_ids))
            .await?
            .into_features();
        if items.is_empty() {
            return Err(ConsoleError::NoValidIdentifiers(format!(
                "no products found for tasking request {tasking_request_id}"
            )));
        }

        let request = OrderRequest::for_items(items)
            .omit_search(true)
            .check_active_orders(check_active_orders);
        let order_id = self.submit_order(&request).await?;
        info!("ordered products of task {} in order {}", tasking_request_id, order_id);
        self.get_presigned_assets(&order_id, None).await
    }
}
