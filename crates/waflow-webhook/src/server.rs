// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use waflow_core::WaflowError;
use waflow_tenant::TenantResolver;

use crate::handlers;
use crate::pipeline::MessagePipeline;
use crate::rate_limit::RateLimiter;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub pipeline: MessagePipeline,
    pub resolver: TenantResolver,
    pub limiter: Arc<RateLimiter>,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the webhook router.
pub fn build_router(state: WebhookState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/webhook/{tenant_id}",
            get(handlers::handshake).post(handlers::delivery),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the shutdown future resolves, then drain
/// in-flight connections before returning.
pub async fn start_server(
    config: &ServerConfig,
    state: WebhookState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), WaflowError> {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WaflowError::Channel {
            message: format!("failed to bind webhook server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("webhook server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| WaflowError::Channel {
        message: format!("webhook server error: {e}"),
        source: Some(Box::new(e)),
    })?;

    tracing::info!("webhook server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use waflow_dedup::{DedupLedger, DurableStore, MemoryCache};
    use waflow_flow::default_executor;
    use waflow_storage::Database;

    use crate::sender::CloudApiSender;

    #[tokio::test]
    async fn server_exits_when_shutdown_resolves() {
        let db = Database::open_in_memory().await.unwrap();
        let ledger = Arc::new(DedupLedger::new(
            Arc::new(MemoryCache::new(Duration::from_secs(60))),
            Arc::new(DurableStore::new(db.clone())),
        ));
        let sender = Arc::new(
            CloudApiSender::new("http://unused.invalid".to_string(), Duration::from_secs(1))
                .unwrap(),
        );
        let state = WebhookState {
            pipeline: MessagePipeline::new(
                TenantResolver::new(db.clone()),
                ledger,
                Arc::new(default_executor().unwrap()),
                sender,
            ),
            resolver: TenantResolver::new(db),
            limiter: Arc::new(RateLimiter::new(60)),
        };
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        };

        // An already-resolved shutdown future must stop the server cleanly.
        tokio::time::timeout(
            Duration::from_secs(5),
            start_server(&config, state, async {}),
        )
        .await
        .unwrap()
        .unwrap();
    }
}
