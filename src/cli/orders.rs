//! Orders command

use clap::{Args, Subcommand};
use serde_json::json;

use super::{cell_text, print_json, render_table, CliError, OutputFormat};
use crate::client::ConsoleClient;
use crate::orders::{Order, OrderRequest, ReviewResponse};

/// Orders subcommand
#[derive(Debug, Args)]
pub struct OrdersCommand {
    #[command(subcommand)]
    action: OrdersAction,
}

/// Orders actions
#[derive(Debug, Subcommand)]
enum OrdersAction {
    /// List your orders, newest first
    List {
        /// Only show active (non-expired) orders
        #[arg(long)]
        active: bool,

        /// Maximum number of orders to display
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Only show these order ids
        #[arg(long = "id")]
        order_ids: Vec<String>,
    },

    /// Submit an order for STAC ids
    Submit {
        /// STAC ids to order (repeatable)
        #[arg(long = "id", required = true)]
        stac_ids: Vec<String>,

        /// Reuse an active order containing all ids
        #[arg(long)]
        check_active: bool,

        /// Skip the order review
        #[arg(long)]
        skip_review: bool,
    },

    /// Review cost and authorization of an order without placing it
    Review {
        /// STAC ids to review (repeatable)
        #[arg(long = "id", required = true)]
        stac_ids: Vec<String>,
    },

    /// Order the products of an existing order again
    Reorder {
        /// Order id to copy
        order_id: String,
    },
}

impl OrdersCommand {
    /// Execute the orders command
    pub async fn execute(
        &self,
        client: &ConsoleClient,
        format: OutputFormat,
    ) -> Result<(), CliError> {
        match &self.action {
            OrdersAction::List {
                active,
                limit,
                order_ids,
            } => {
                let ids = (!order_ids.is_empty()).then_some(order_ids.as_slice());
                let mut orders = client.list_orders(ids, *active).await?;
                sort_by_order_date_desc(&mut orders);
                orders.truncate(*limit);
                show_orders(&orders, format)
            }
            OrdersAction::Submit {
                stac_ids,
                check_active,
                skip_review,
            } => {
                let request = OrderRequest::for_ids(stac_ids.iter().cloned())
                    .check_active_orders(*check_active)
                    .omit_review(*skip_review);
                let order_id = client.submit_order(&request).await?;
                show_order_id(&order_id, format)
            }
            OrdersAction::Review { stac_ids } => {
                let review = client
                    .review_order(&OrderRequest::for_ids(stac_ids.iter().cloned()))
                    .await?;
                show_review(&review, format)
            }
            OrdersAction::Reorder { order_id } => {
                let order = client.get_order(order_id).await?;
                let stac_ids: Vec<String> =
                    order.granule_ids().into_iter().map(str::to_string).collect();
                let new_order_id = client
                    .submit_order(&OrderRequest::for_ids(stac_ids))
                    .await?;
                show_order_id(&new_order_id, format)
            }
        }
    }
}

/// Newest `orderDate` first; orders without a date last
fn sort_by_order_date_desc(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        let date = |o: &Order| {
            o.extra
                .get("orderDate")
                .and_then(|d| d.as_str())
                .map(str::to_string)
        };
        date(b).cmp(&date(a))
    });
}

fn show_orders(orders: &[Order], format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(orders),
        OutputFormat::Human => {
            if orders.is_empty() {
                println!("Currently no orders available");
                return Ok(());
            }
            let headers: Vec<String> = ["orderId", "orderDate", "expirationDate", "status", "items"]
                .iter()
                .map(|h| h.to_string())
                .collect();
            let rows: Vec<Vec<String>> = orders
                .iter()
                .map(|o| {
                    vec![
                        o.order_id.clone(),
                        cell_text(o.extra.get("orderDate")),
                        o.expiration_date.clone().unwrap_or_else(|| "n/a".to_string()),
                        o.order_status.clone().unwrap_or_else(|| "n/a".to_string()),
                        o.items.len().to_string(),
                    ]
                })
                .collect();
            println!("{}", render_table(&headers, &rows));
            Ok(())
        }
    }
}

fn show_order_id(order_id: &str, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(&json!({ "orderId": order_id })),
        OutputFormat::Human => {
            println!("order {order_id}");
            println!("\nrun\n\tcapella-console assets --order-id {order_id}");
            println!("to get its presigned assets.");
            Ok(())
        }
    }
}

fn show_review(review: &ReviewResponse, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => print_json(review),
        OutputFormat::Human => {
            if review.authorized {
                println!("order authorized");
            } else {
                println!("order NOT authorized: {}", review.denial_message());
            }
            if let Some(details) = review.extra.get("orderDetails") {
                println!("{}", serde_json::to_string_pretty(details)?);
            }
            Ok(())
        }
    }
}
