// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `serve` subcommand: wires storage, tenant resolution, dedup, flow
//! execution, and outbound delivery into the webhook server.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use waflow_config::WaflowConfig;
use waflow_conversions::ConversionEmitter;
use waflow_core::types::TenantId;
use waflow_core::WaflowError;
use waflow_dedup::{DedupLedger, DurableStore, MemoryCache};
use waflow_flow::{default_executor, FlowGraph};
use waflow_storage::queries::tenants;
use waflow_storage::Database;
use waflow_tenant::TenantResolver;
use waflow_webhook::{
    start_server, CloudApiSender, MessagePipeline, RateLimiter, ServerConfig, WebhookState,
};

/// Workspace crate targets covered by the default log filter.
const LOG_TARGETS: &[&str] = &[
    "waflow",
    "waflow_conversions",
    "waflow_dedup",
    "waflow_flow",
    "waflow_storage",
    "waflow_tenant",
    "waflow_webhook",
];

pub async fn run_serve(config: WaflowConfig) -> Result<(), WaflowError> {
    init_tracing(&config.service.log_level);
    info!(service = %config.service.name, "starting waflow");

    let db = Database::open(&config.storage.database_path, config.storage.wal_mode).await?;
    let resolver = TenantResolver::new(db.clone());

    let executor = Arc::new(default_executor()?);
    validate_tenant_plans(&resolver, executor.graph()).await?;

    let cache = Arc::new(MemoryCache::new(Duration::from_secs(
        config.dedup.cache_ttl_secs,
    )));
    let durable = Arc::new(DurableStore::new(db.clone()));
    let ledger = Arc::new(DedupLedger::new(cache, durable));

    let sender = Arc::new(CloudApiSender::new(
        config.provider.api_base_url.clone(),
        Duration::from_secs(config.provider.send_timeout_secs),
    )?);

    let emitter = Arc::new(ConversionEmitter::new(
        db.clone(),
        config.attribution.api_base_url.clone(),
        Duration::from_secs(config.attribution.timeout_secs),
    )?);

    let pipeline =
        MessagePipeline::new(resolver.clone(), ledger, executor, sender).with_emitter(emitter);

    let state = WebhookState {
        pipeline,
        resolver,
        limiter: Arc::new(RateLimiter::new(config.server.rate_limit_per_minute)),
    };

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    start_server(&server_config, state, shutdown_signal()).await
}

/// Resolves on SIGINT or SIGTERM, triggering graceful server shutdown.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler, listening for SIGINT only");
                let _ = ctrl_c.await;
                info!("received SIGINT, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received SIGINT, shutting down");
    }
}

/// Resolve every active tenant's plan once at startup so a bad toggle set
/// aborts the boot instead of failing requests later.
pub(crate) async fn validate_tenant_plans(
    resolver: &TenantResolver,
    graph: &FlowGraph,
) -> Result<(), WaflowError> {
    let tenant_ids = tenants::list_active_tenant_ids(resolver.database()).await?;
    for id in tenant_ids {
        let tenant_id = TenantId(id);
        let toggles = resolver.node_toggles(&tenant_id).await?;
        graph
            .resolve_plan(&toggles)
            .map_err(|e| WaflowError::Graph(format!("tenant {tenant_id}: {e}")))?;
    }
    Ok(())
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={log_level}"))
            .collect();
        EnvFilter::new(format!("{},warn", directives.join(",")))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
