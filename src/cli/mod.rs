//! CLI command implementations

pub mod assets;
pub mod cache;
pub mod error;
pub mod orders;
pub mod search;
pub mod searches;
pub mod settings;
pub mod task;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, warn};

use crate::assets::AssetDownloader;
use crate::client::ConsoleClient;
use crate::config::ClientConfig;
use crate::session::Credentials;

pub use assets::{AssetsArgs, DownloadArgs};
pub use cache::{CliCache, Settings};
pub use error::CliError;
pub use orders::OrdersCommand;
pub use search::SearchArgs;
pub use searches::SearchesCommand;
pub use settings::SettingsCommand;
pub use task::TaskCommand;

/// Capella Console command line client
#[derive(Parser, Debug)]
#[command(name = "capella-console", version, about, long_about = None)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Console account email
    #[arg(long, global = true, env = "CONSOLE_EMAIL")]
    pub email: Option<String>,

    /// Console account password
    #[arg(long, global = true, env = "CONSOLE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// JWT access token (skips the cached token)
    #[arg(long, global = true, env = "CONSOLE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Do not verify the token by fetching the user profile
    #[arg(long, global = true, default_value_t = false)]
    pub no_token_check: bool,

    /// API base URL
    #[arg(long, global = true, env = "CONSOLE_API_URL")]
    pub base_url: Option<String>,

    /// Seconds allowed for one API request
    #[arg(long, global = true)]
    pub request_timeout: Option<u64>,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Log progress at info level
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Directory holding settings and the cached JWT
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Serve Prometheus metrics on this address
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the authenticated user
    Whoami,

    /// Search the catalog
    Search(SearchArgs),

    /// List, rename and delete saved searches and queries
    Searches(SearchesCommand),

    /// List, review, submit and re-submit orders
    Orders(OrdersCommand),

    /// Inspect tasking requests
    Task(TaskCommand),

    /// Show presigned assets of an order
    Assets(AssetsArgs),

    /// Download one presigned asset
    Download(DownloadArgs),

    /// Show or change local settings
    Settings(SettingsCommand),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl Cli {
    /// Run the selected command
    pub async fn execute(&self) -> Result<(), CliError> {
        let cache = self.cache();
        match &self.command {
            Commands::Settings(cmd) => cmd.execute(&cache, self.output_format),
            Commands::Searches(cmd) => cmd.execute(&cache, self.output_format),
            Commands::Download(args) => {
                let downloader = AssetDownloader::new(&self.client_config())?;
                args.execute(&downloader, self.output_format).await
            }
            Commands::Whoami => {
                let client = self.connect(&cache).await?;
                let user = client.whoami().await?;
                print_json(&user)
            }
            Commands::Search(args) => {
                let client = self.connect(&cache).await?;
                args.execute(&client, &cache, self.output_format).await
            }
            Commands::Orders(cmd) => {
                let client = self.connect(&cache).await?;
                cmd.execute(&client, self.output_format).await
            }
            Commands::Task(cmd) => {
                let client = self.connect(&cache).await?;
                cmd.execute(&client, self.output_format).await
            }
            Commands::Assets(args) => {
                let client = self.connect(&cache).await?;
                args.execute(&client, self.output_format).await
            }
        }
    }

    /// Local cache selected by `--cache-dir`
    pub fn cache(&self) -> CliCache {
        CliCache::new(self.cache_dir.clone().unwrap_or_else(CliCache::default_dir))
    }

    /// Client configuration from flags and environment
    pub fn client_config(&self) -> ClientConfig {
        let config = match &self.base_url {
            Some(url) => ClientConfig::default().with_base_url(url.as_str()),
            None => ClientConfig::from_env(),
        };
        match self.request_timeout {
            Some(secs) => {
                let connect = config.connect_timeout();
                config.with_timeouts(connect, Duration::from_secs(secs.max(1)))
            }
            None => config,
        }
    }

    /// Authenticate, preferring the cached JWT
    ///
    /// Without an explicit `--token` the cached JWT is tried first; when it is
    /// missing or rejected, credentials from flags/env (the settings' default
    /// user standing in for a missing email) are used and the new JWT cached.
    pub async fn connect(&self, cache: &CliCache) -> Result<ConsoleClient, CliError> {
        let config = self.client_config();

        if self.token.is_none() {
            if let Some(jwt) = cache.load_jwt() {
                let cached = Credentials::Token {
                    token: jwt,
                    check: true,
                };
                match ConsoleClient::connect(config.clone(), &cached).await {
                    Ok(client) => return Ok(client),
                    Err(e) => debug!("cached JWT not usable, re-authenticating: {}", e),
                }
            }
        }

        let email = self
            .email
            .clone()
            .or_else(|| cache.load_settings().console_user);
        let credentials = Credentials::resolve(
            email,
            self.password.clone(),
            self.token.clone(),
            !self.no_token_check,
        )?;
        let client = ConsoleClient::connect(config, &credentials).await?;

        if let Some(header) = client.authorization_header() {
            if let Err(e) = cache.save_jwt(header) {
                warn!("failed to cache JWT: {}", e);
            }
        }
        Ok(client)
    }
}

/// Pretty-print `value` as JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render rows as a left-aligned text table
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}", width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers)];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.extend(rows.iter().map(|row| line(row.as_slice())));
    out.join("\n")
}

/// Human-readable form of a JSON cell
pub(crate) fn cell_text(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => "n/a".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| cell_text(Some(v)))
            .collect::<Vec<_>>()
            .join(","),
        Some(other) => other.to_string(),
    }
}
