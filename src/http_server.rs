use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::metrics::DnsMetrics;

/// `GET /metrics` (Prometheus text exposition) and `GET /health`. Ambient observability
/// surface, not named by the spec but carried per the teacher's own ops conventions —
/// trimmed from `examples/RoeeJ-heimdall/src/http_server.rs`'s `HttpServer`, which also
/// wires in cluster registry and config-reload endpoints this resolver doesn't have.
pub struct HttpServer {
    metrics: Arc<DnsMetrics>,
    bind_addr: SocketAddr,
}

impl HttpServer {
    pub fn new(metrics: Arc<DnsMetrics>, bind_addr: SocketAddr) -> Self {
        HttpServer { metrics, bind_addr }
    }

    pub async fn serve(self) -> std::io::Result<()> {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.metrics);

        info!(addr = %self.bind_addr, "starting metrics/health HTTP server");
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;
        axum::serve(listener, app).await
    }
}

async fn metrics_handler(State(metrics): State<Arc<DnsMetrics>>) -> impl IntoResponse {
    metrics.encode()
}

async fn health_handler() -> impl IntoResponse {
    "ok"
}
