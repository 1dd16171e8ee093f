//! Assets and download commands

use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use super::{print_json, CliError, OutputFormat};
use crate::assets::AssetDownloader;
use crate::client::ConsoleClient;

/// Presigned assets of an order
#[derive(Args, Debug)]
pub struct AssetsArgs {
    /// Order id
    #[arg(long)]
    pub order_id: String,

    /// Only show these STAC ids (repeatable)
    #[arg(long = "id")]
    pub stac_ids: Vec<String>,
}

impl AssetsArgs {
    /// Execute the assets command
    pub async fn execute(
        &self,
        client: &ConsoleClient,
        format: OutputFormat,
    ) -> Result<(), CliError> {
        let stac_ids = (!self.stac_ids.is_empty()).then_some(self.stac_ids.as_slice());
        let products = client.get_presigned_assets(&self.order_id, stac_ids).await?;

        match format {
            OutputFormat::Json => print_json(&products),
            OutputFormat::Human => {
                if products.is_empty() {
                    println!("order {} has no matching products", self.order_id);
                }
                for product in &products {
                    println!("{}", product.id);
                    let mut keys: Vec<&String> = product.assets.keys().collect();
                    keys.sort();
                    for key in keys {
                        println!("  {key}: {}", product.href(key).unwrap_or("n/a"));
                    }
                }
                Ok(())
            }
        }
    }
}

/// Download one presigned asset
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Presigned asset URL
    #[arg(long)]
    pub url: String,

    /// Local file path
    #[arg(long)]
    pub out: PathBuf,

    /// Replace an existing file
    #[arg(long = "override", default_value_t = false)]
    pub override_existing: bool,

    /// Show a progress bar
    #[arg(long, default_value_t = false)]
    pub progress: bool,
}

impl DownloadArgs {
    /// Execute the download command
    ///
    /// Presigned URLs carry their own authorization, so no console login is needed.
    pub async fn execute(
        &self,
        downloader: &AssetDownloader,
        format: OutputFormat,
    ) -> Result<(), CliError> {
        if self.url.trim().is_empty() {
            return Err(CliError::InvalidArgument("--url must not be empty".to_string()));
        }

        let path = downloader
            .download(&self.url, &self.out, self.override_existing, self.progress)
            .await?;

        match format {
            OutputFormat::Json => print_json(&json!({ "path": path })),
            OutputFormat::Human => {
                println!("{}", path.display());
                Ok(())
            }
        }
    }
}
