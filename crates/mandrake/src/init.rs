//! `InitService` — single-shot process initialization: schedules the
//! registry's periodic sweep and wires graceful shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use sa_registry::ServiceRegistry;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub struct InitService {
    started: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Default for InitService {
    fn default() -> Self {
        Self {
            started: AtomicBool::new(false),
            sweeper: Mutex::new(None),
        }
    }
}

impl InitService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `performCleanup` every 15 minutes against `registry`. A
    /// second call is a no-op — the sweeper is started at most once per
    /// process.
    pub fn ensure(&self, registry: Arc<ServiceRegistry>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                tracing::debug!("running scheduled registry cleanup");
                registry.perform_cleanup().await;
            }
        });
        *self.sweeper.lock() = Some(handle);
        tracing::info!(interval_secs = CLEANUP_INTERVAL.as_secs(), "cleanup sweeper scheduled");
    }

    /// Waits for SIGTERM, SIGINT, or ctrl-c, then cancels the sweeper and
    /// releases every cached resource (sessions, then pools/workspaces,
    /// then root) via `ServiceRegistry::reset`.
    pub async fn wait_for_shutdown_signal() {
        let ctrl_c = async {
            tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("received ctrl-c"),
            _ = terminate => tracing::info!("received SIGTERM"),
        }
    }

    pub async fn shutdown(&self, registry: &ServiceRegistry) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        registry.reset().await;
        tracing::info!("shutdown complete");
    }
}
