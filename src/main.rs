//! Main entry point for the capella-console CLI

use capella_console_client::cli::Cli;
use capella_console_client::metrics::init_metrics;
use capella_console_client::shutdown;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initialize tracing; `RUST_LOG` wins over `--verbose`, `LOG_FORMAT=json` switches to JSON lines
fn init_tracing(verbose: bool) {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("capella_console_client={default_level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    shutdown::install_ctrl_c_handler();

    if let Some(addr) = cli.metrics_addr {
        match init_metrics(addr) {
            Ok(()) => info!("serving metrics on {}", addr),
            Err(e) => error!("metrics disabled: {}", e),
        }
    }

    let result = cli.execute().await.map_err(|e| anyhow::anyhow!(e));

    if let Err(e) = result {
        error!("Command failed: {}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
