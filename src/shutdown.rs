//! Cancellation of in-flight console calls.
//!
//! A [`ShutdownCoordinator`] registered globally lets the retry loop abandon a
//! pending backoff sleep as soon as the user presses Ctrl+C, instead of
//! blocking until the retry budget is spent.

use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared handle to a shutdown coordinator.
pub type SharedShutdown = Arc<ShutdownCoordinator>;

static GLOBAL_SHUTDOWN: OnceCell<SharedShutdown> = OnceCell::new();

/// Register the process-wide coordinator. Later registrations are ignored.
pub fn set_global_shutdown(handle: SharedShutdown) {
    let _ = GLOBAL_SHUTDOWN.set(handle);
}

/// The registered coordinator, if any.
pub fn get_global_shutdown() -> Option<SharedShutdown> {
    GLOBAL_SHUTDOWN.get().cloned()
}

/// Register a coordinator and trip it on Ctrl+C.
///
/// Must be called from within a tokio runtime.
pub fn install_ctrl_c_handler() -> SharedShutdown {
    let handle = ShutdownCoordinator::shared();
    set_global_shutdown(handle.clone());
    let registered = get_global_shutdown().unwrap_or_else(|| handle.clone());
    tokio::spawn({
        let registered = registered.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - cancelling pending requests");
                registered.request_shutdown();
            }
        }
    });
    registered
}

/// Cancellation flag with async notification.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    is_shutdown: AtomicBool,
    notify: Notify,
}

impl ShutdownCoordinator {
    /// Create a new coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new shared coordinator wrapped in [`Arc`].
    pub fn shared() -> SharedShutdown {
        Arc::new(Self::new())
    }

    /// Request shutdown. Wakes all waiters exactly once.
    pub fn request_shutdown(&self) {
        if !self.is_shutdown.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }

    /// Wait until shutdown is requested. Returns immediately if already set.
    pub async fn wait_for_shutdown(&self) {
        let notified = self.notify.notified();
        if self.is_shutdown_requested() {
            return;
        }
        notified.await;
    }
}
