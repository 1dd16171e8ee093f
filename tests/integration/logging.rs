//! Integration tests for logging and tracing setup

use capella_console_client::search::SearchFilters;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[test]
fn test_env_filter_directives_parse() {
    for directive in [
        "capella_console_client=warn",
        "capella_console_client=info",
        "warn,capella_console_client=trace",
    ] {
        assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
    }
}

#[test]
fn test_json_subscriber_initialization() {
    let result = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("capella_console_client=debug"))
        .with_test_writer()
        .try_init();

    // another test may have installed a global subscriber first
    if result.is_ok() {
        info!(pages = 3, "search finished");
    }
}

#[test]
fn test_ignored_filters_logged_without_panicking() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("capella_console_client=trace"))
        .with_test_writer()
        .try_init();

    warn!("compiling a query with unsupported filters");
    let compiled = SearchFilters::new()
        .filter("cloud_cover", 10)
        .filter("incidence_angle__between", 30)
        .compile();
    assert_eq!(compiled.ignored.len(), 2);
    assert!(compiled.ignored[0].to_string().contains("cloud_cover"));
}
