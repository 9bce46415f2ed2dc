// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `doctor` subcommand: environment and data checks.
//!
//! Runs the same wiring the server does at boot, but reports each step as a
//! pass/warn/fail line instead of aborting on the first problem.

use waflow_config::WaflowConfig;
use waflow_core::types::TenantId;
use waflow_core::WaflowError;
use waflow_flow::default_executor;
use waflow_storage::queries::tenants;
use waflow_storage::Database;
use waflow_tenant::TenantResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

impl CheckStatus {
    fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "ok  ",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "FAIL",
        }
    }
}

struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn new(name: impl Into<String>, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
        }
    }
}

pub async fn run_doctor(config: &WaflowConfig) -> Result<(), WaflowError> {
    let mut results = Vec::new();

    results.push(CheckResult::new(
        "config",
        CheckStatus::Pass,
        format!(
            "server {}:{}, rate limit {}/min",
            config.server.host, config.server.port, config.server.rate_limit_per_minute
        ),
    ));

    let db = match Database::open(&config.storage.database_path, config.storage.wal_mode).await {
        Ok(db) => {
            results.push(CheckResult::new(
                "storage",
                CheckStatus::Pass,
                format!("database at {}", config.storage.database_path),
            ));
            Some(db)
        }
        Err(e) => {
            results.push(CheckResult::new(
                "storage",
                CheckStatus::Fail,
                e.to_string(),
            ));
            None
        }
    };

    let executor = match default_executor() {
        Ok(executor) => {
            results.push(CheckResult::new(
                "flow graph",
                CheckStatus::Pass,
                format!("{} nodes, all handlers wired", executor.graph().nodes().len()),
            ));
            Some(executor)
        }
        Err(e) => {
            results.push(CheckResult::new(
                "flow graph",
                CheckStatus::Fail,
                e.to_string(),
            ));
            None
        }
    };

    if let (Some(db), Some(executor)) = (db, executor) {
        let resolver = TenantResolver::new(db);
        match tenants::list_active_tenant_ids(resolver.database()).await {
            Ok(ids) => {
                results.push(CheckResult::new(
                    "tenants",
                    CheckStatus::Pass,
                    format!("{} active", ids.len()),
                ));
                for id in ids {
                    let tenant_id = TenantId(id);
                    results.push(check_tenant(&resolver, &executor, &tenant_id).await);
                }
            }
            Err(e) => {
                results.push(CheckResult::new(
                    "tenants",
                    CheckStatus::Fail,
                    e.to_string(),
                ));
            }
        }
    }

    let mut failed = 0;
    for result in &results {
        println!("[{}] {}: {}", result.status.symbol(), result.name, result.detail);
        if result.status == CheckStatus::Fail {
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(WaflowError::Internal(format!("{failed} check(s) failed")));
    }
    Ok(())
}

/// Resolve one tenant's plan and credentials the way the pipeline would.
async fn check_tenant(
    resolver: &TenantResolver,
    executor: &waflow_flow::FlowExecutor,
    tenant_id: &TenantId,
) -> CheckResult {
    let name = format!("tenant {tenant_id}");

    let toggles = match resolver.node_toggles(tenant_id).await {
        Ok(toggles) => toggles,
        Err(e) => return CheckResult::new(name, CheckStatus::Fail, e.to_string()),
    };
    let plan = match executor.graph().resolve_plan(&toggles) {
        Ok(plan) => plan,
        Err(e) => return CheckResult::new(name, CheckStatus::Fail, e.to_string()),
    };

    match resolver.resolve_credentials(tenant_id).await {
        Ok(_) => CheckResult::new(
            name,
            CheckStatus::Pass,
            format!("plan {:?}, credentials configured", plan.steps),
        ),
        Err(WaflowError::CredentialsNotConfigured { .. }) => CheckResult::new(
            name,
            CheckStatus::Warn,
            "credentials not configured; webhook requests will be rejected",
        ),
        Err(e) => CheckResult::new(name, CheckStatus::Fail, e.to_string()),
    }
}
