use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Coordinates draining in-flight queries before exit on SIGINT/SIGTERM. gollum itself has
/// no shutdown path beyond a process kill; this is an ambient-stack addition grounded on
/// `examples/RoeeJ-heimdall/src/graceful_shutdown.rs`'s broadcast-channel coordinator,
/// trimmed of the cache-persistence step (spec Non-goal: no persistence across restarts).
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<()>,
    components: Mutex<Vec<ShutdownComponent>>,
}

type ShutdownResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type ShutdownFn = Box<dyn Fn() -> tokio::task::JoinHandle<ShutdownResult> + Send + Sync>;

struct ShutdownComponent {
    name: String,
    shutdown_fn: ShutdownFn,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        GracefulShutdown {
            shutdown_tx,
            components: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub async fn register_component<F, Fut>(&self, name: String, shutdown_fn: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ShutdownResult> + Send + 'static,
    {
        let component = ShutdownComponent {
            name,
            shutdown_fn: Box::new(move || {
                let fut = shutdown_fn();
                tokio::spawn(fut)
            }),
        };
        self.components.lock().await.push(component);
    }

    pub async fn shutdown(&self) -> ShutdownResult {
        info!("initiating graceful shutdown");
        if let Err(err) = self.shutdown_tx.send(()) {
            warn!(error = %err, "failed to send shutdown signal");
        }

        tokio::time::sleep(Duration::from_millis(200)).await;

        let components = self.components.lock().await;
        let mut handles = Vec::new();
        for component in components.iter() {
            info!(component = %component.name, "shutting down component");
            handles.push((component.name.clone(), (component.shutdown_fn)()));
        }

        for (name, handle) in handles {
            match timeout(Duration::from_secs(5), handle).await {
                Ok(Ok(Ok(()))) => info!(component = %name, "component shut down cleanly"),
                Ok(Ok(Err(err))) => error!(component = %name, error = %err, "component shutdown failed"),
                Ok(Err(err)) => error!(component = %name, error = %err, "component shutdown task panicked"),
                Err(_) => warn!(component = %name, "component shutdown timed out"),
            }
        }

        info!("graceful shutdown complete");
        Ok(())
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}
