//! HTTP server implementation.

use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::routes::{create_meal, delete_meal, get_meal, list_meals, AppState};
use crate::error::{Result, ServiceError};

/// Build the meal API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/meals", get(list_meals).post(create_meal))
        .route("/meals/{segment}", get(get_meal).delete(delete_meal))
        .with_state(state)
}

/// HTTP server for the meal API.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    state: AppState,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, state: AppState) -> Self {
        Self { addr, state }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await.map_err(|e| {
            error!(addr = %self.addr, error = %e, "Failed to bind");
            ServiceError::Io(e)
        })?;

        info!(
            addr = %self.addr,
            "Starting HTTP server for meal API with graceful shutdown"
        );

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                ServiceError::Io(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RequestPipeline;
    use crate::ratelimit::{KeyPolicy, LimiterRegistry};
    use crate::store::SqliteMealStore;
    use crate::telemetry::Tracer;
    use std::sync::Arc;

    fn state() -> AppState {
        let pipeline = RequestPipeline::new(Arc::new(LimiterRegistry::new()), Tracer::noop());
        let store = Arc::new(SqliteMealStore::open_in_memory(None).unwrap());
        AppState::new(pipeline, store, KeyPolicy::Raw)
    }

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let _server = HttpServer::new(addr, state());
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = HttpServer::new(addr, state());

        let result = server.serve_with_shutdown(async {}).await;
        assert!(result.is_ok());
    }
}
