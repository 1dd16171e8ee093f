//! Task command

use clap::{Args, Subcommand};

use super::{cell_text, print_json, render_table, CliError, OutputFormat};
use crate::client::ConsoleClient;

/// Task subcommand
#[derive(Debug, Args)]
pub struct TaskCommand {
    #[command(subcommand)]
    action: TaskAction,
}

#[derive(Debug, Subcommand)]
enum TaskAction {
    /// Show a tasking request and whether it has completed
    Show {
        /// Tasking request id
        tasking_request_id: String,
    },

    /// List the collects of a completed tasking request
    Collects {
        /// Tasking request id
        tasking_request_id: String,
    },

    /// Order all products of a completed tasking request
    Order {
        /// Tasking request id
        tasking_request_id: String,

        /// Reuse an active order that already covers all products
        #[arg(long, default_value_t = false)]
        check_active: bool,
    },
}

impl TaskCommand {
    /// Execute the task command
    pub async fn execute(
        &self,
        client: &ConsoleClient,
        format: OutputFormat,
    ) -> Result<(), CliError> {
        match &self.action {
            TaskAction::Show { tasking_request_id } => {
                let task = client.get_task(tasking_request_id).await?;
                match format {
                    OutputFormat::Json => print_json(&task),
                    OutputFormat::Human => {
                        println!("tasking request {tasking_request_id}");
                        println!("completed: {}", client.is_task_completed(&task));
                        Ok(())
                    }
                }
            }
            TaskAction::Collects { tasking_request_id } => {
                let task = client.get_task(tasking_request_id).await?;
                let collects = client.get_collects_for_task(&task).await?;
                match format {
                    OutputFormat::Json => print_json(&collects),
                    OutputFormat::Human => {
                        let headers = vec!["collectId".to_string()];
                        let rows: Vec<Vec<String>> = collects
                            .iter()
                            .map(|c| vec![cell_text(c.get("collectId"))])
                            .collect();
                        println!("{}", render_table(&headers, &rows));
                        Ok(())
                    }
                }
            }
            TaskAction::Order {
                tasking_request_id,
                check_active,
            } => {
                let assets = client
                    .order_products_for_task(tasking_request_id, *check_active)
                    .await?;
                match format {
                    OutputFormat::Json => print_json(&assets),
                    OutputFormat::Human => {
                        for product in &assets {
                            println!("{} ({} assets)", product.id, product.assets.len());
                        }
                        Ok(())
                    }
                }
            }
        }
    }
}
