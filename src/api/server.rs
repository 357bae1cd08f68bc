//! HTTP server for the quote API
//!
//! Provides:
//! - Health check (/health)
//! - Batch quotes (GET/POST /quotes), rate limited

use crate::api::handlers;
use crate::api::rate_limiter::{rate_limit_middleware, RateLimiterState};
use crate::error::Result;
use crate::state::AppState;
use axum::{
    http::Method,
    middleware,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Build the router with CORS, tracing and rate limiting applied
pub fn build_router(state: Arc<AppState>) -> Router {
    let rate_limiter = Arc::new(RateLimiterState::new(state.config.api_rate_limit));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let quotes = Router::new()
        .route(
            "/quotes",
            get(handlers::get_quotes).post(handlers::post_quotes),
        )
        .route_layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/", get(handlers::health_check))
        .merge(quotes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server manager
pub struct ApiServer {
    state: Arc<AppState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            shutdown_tx: None,
        }
    }

    /// Bind and start serving in the background, returning the bound address
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let host = self.state.config.host.clone();
        let port = self.state.config.port;

        info!(
            "Rate limit: {}/s, cache TTL: {}s",
            self.state.config.api_rate_limit, self.state.config.cache_ttl_seconds
        );

        let app = build_router(self.state.clone());

        let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            });

            if let Err(e) = server.await {
                error!("API server error: {}", e);
            }
        });

        info!("Quote API server started on {}", addr);
        info!("  GET  http://{}/health", addr);
        info!("  GET  http://{}/quotes?symbols=AAPL,MSFT", addr);
        info!("  POST http://{}/quotes", addr);

        Ok(addr)
    }

    /// Stop the server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("API server stop signal sent");
        }
    }

    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}
