//! Unit tests for retry policy configuration

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use capella_console_client::error::ConsoleError;
use capella_console_client::retry::RetryPolicy;

fn unavailable() -> ConsoleError {
    ConsoleError::Http {
        status: 503,
        message: "Service Unavailable".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_max_attempts_cap() {
    let calls = AtomicUsize::new(0);
    let result: Result<(), _> = RetryPolicy::default()
        .with_max_attempts(2)
        .run("capped", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(unavailable()) }
        })
        .await;

    assert!(matches!(
        result,
        Err(ConsoleError::RetriesExhausted { attempts: 2, .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_none_policy_fails_on_first_error() {
    let calls = AtomicUsize::new(0);
    let result: Result<(), _> = RetryPolicy::none()
        .run("once", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(unavailable()) }
        })
        .await;

    assert!(matches!(
        result,
        Err(ConsoleError::RetriesExhausted { attempts: 1, .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_custom_predicate_and_backoff() {
    let calls = AtomicUsize::new(0);
    let start = tokio::time::Instant::now();

    let result = RetryPolicy::default()
        .with_initial_backoff(Duration::from_millis(100))
        .with_multiplier(3)
        .with_predicate(|e| matches!(e, ConsoleError::Parse(_)))
        .run("parse", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ConsoleError::Parse("truncated body".to_string()))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "ok");
    // 100ms + 300ms
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(400) && elapsed < Duration::from_millis(500));
}

#[tokio::test]
async fn test_validation_never_retried_by_default() {
    let calls = AtomicUsize::new(0);
    let result: Result<(), _> = RetryPolicy::default()
        .run("fatal", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ConsoleError::Validation("bad input".to_string())) }
        })
        .await;

    assert!(matches!(result, Err(ConsoleError::Validation(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_multiplier_floor() {
    let policy = RetryPolicy::default().with_multiplier(0);
    assert_eq!(policy.backoff(3), Duration::from_secs(1));
}
