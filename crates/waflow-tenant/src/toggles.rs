// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flow node toggles stored as `flow:`-namespaced configuration rows.
//!
//! Writes are validated against the graph first: unknown nodes and
//! non-configurable nodes are rejected before anything touches storage.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;
use waflow_core::{TenantId, WaflowError};
use waflow_flow::{FlowGraph, TOGGLE_KEY_PREFIX};
use waflow_storage::queries::bot_config;

use crate::resolver::{merge, TenantResolver};

impl TenantResolver {
    /// Effective node toggles for a tenant, merged override-over-default
    /// and keyed by bare node id. Rows holding non-boolean values are
    /// skipped.
    pub async fn node_toggles(
        &self,
        tenant_id: &TenantId,
    ) -> Result<HashMap<String, bool>, WaflowError> {
        let rows =
            bot_config::fetch_rows_by_prefix(self.database(), &tenant_id.0, TOGGLE_KEY_PREFIX)
                .await?;
        let mut overrides: HashMap<String, Value> = HashMap::new();
        let mut defaults: HashMap<String, Value> = HashMap::new();
        for row in rows {
            let Some(node_id) = row.key.strip_prefix(TOGGLE_KEY_PREFIX) else {
                continue;
            };
            let node_id = node_id.to_string();
            if row.is_default {
                defaults.insert(node_id, row.value);
            } else {
                overrides.insert(node_id, row.value);
            }
        }

        let mut toggles = HashMap::new();
        let node_ids: Vec<String> = overrides.keys().chain(defaults.keys()).cloned().collect();
        for node_id in node_ids {
            let value = merge(overrides.remove(&node_id), defaults.remove(&node_id));
            match value.as_ref().and_then(Value::as_bool) {
                Some(enabled) => {
                    toggles.insert(node_id, enabled);
                }
                None => {
                    warn!(tenant_id = %tenant_id, node = %node_id, "toggle row is not a boolean, skipping");
                }
            }
        }
        Ok(toggles)
    }

    /// Write a node toggle override for a tenant, after validating the
    /// write against the graph.
    pub async fn set_node_toggle(
        &self,
        graph: &FlowGraph,
        tenant_id: &TenantId,
        node_id: &str,
        enabled: bool,
    ) -> Result<(), WaflowError> {
        graph.check_toggle(node_id, enabled)?;
        let key = format!("{TOGGLE_KEY_PREFIX}{node_id}");
        self.set_config(tenant_id, &key, &Value::Bool(enabled)).await
    }

    /// Remove a tenant's toggle override, restoring the default.
    pub async fn reset_node_toggle(
        &self,
        graph: &FlowGraph,
        tenant_id: &TenantId,
        node_id: &str,
    ) -> Result<bool, WaflowError> {
        if graph.node(node_id).is_none() {
            return Err(WaflowError::Config(format!("unknown flow node '{node_id}'")));
        }
        let key = format!("{TOGGLE_KEY_PREFIX}{node_id}");
        self.reset_config(tenant_id, &key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use waflow_flow::default_graph;
    use waflow_storage::queries::bot_config::seed_default;
    use waflow_storage::Database;

    fn tid(s: &str) -> TenantId {
        TenantId(s.to_string())
    }

    async fn resolver() -> TenantResolver {
        TenantResolver::new(Database::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn toggle_round_trip_with_defaults() {
        let resolver = resolver().await;
        let graph = default_graph().unwrap();
        seed_default(resolver.database(), "flow:intent_classifier", &json!(true))
            .await
            .unwrap();

        let toggles = resolver.node_toggles(&tid("t1")).await.unwrap();
        assert_eq!(toggles.get("intent_classifier"), Some(&true));

        resolver
            .set_node_toggle(&graph, &tid("t1"), "intent_classifier", false)
            .await
            .unwrap();
        let toggles = resolver.node_toggles(&tid("t1")).await.unwrap();
        assert_eq!(toggles.get("intent_classifier"), Some(&false));

        // The other tenant still sees the default.
        let toggles = resolver.node_toggles(&tid("t2")).await.unwrap();
        assert_eq!(toggles.get("intent_classifier"), Some(&true));

        assert!(resolver
            .reset_node_toggle(&graph, &tid("t1"), "intent_classifier")
            .await
            .unwrap());
        let toggles = resolver.node_toggles(&tid("t1")).await.unwrap();
        assert_eq!(toggles.get("intent_classifier"), Some(&true));
    }

    #[tokio::test]
    async fn rejects_toggle_on_non_configurable_node() {
        let resolver = resolver().await;
        let graph = default_graph().unwrap();
        let err = resolver
            .set_node_toggle(&graph, &tid("t1"), "normalize", false)
            .await
            .unwrap_err();
        assert!(matches!(err, WaflowError::Config(_)));

        let toggles = resolver.node_toggles(&tid("t1")).await.unwrap();
        assert!(toggles.is_empty());
    }

    #[tokio::test]
    async fn rejects_unknown_node() {
        let resolver = resolver().await;
        let graph = default_graph().unwrap();
        let err = resolver
            .set_node_toggle(&graph, &tid("t1"), "ghost", true)
            .await
            .unwrap_err();
        assert!(matches!(err, WaflowError::Config(_)));
    }

    #[tokio::test]
    async fn non_boolean_toggle_rows_are_skipped() {
        let resolver = resolver().await;
        seed_default(resolver.database(), "flow:intent_classifier", &json!("yes"))
            .await
            .unwrap();
        let toggles = resolver.node_toggles(&tid("t1")).await.unwrap();
        assert!(toggles.is_empty());
    }

    #[tokio::test]
    async fn resolved_toggles_feed_plan_resolution() {
        let resolver = resolver().await;
        let graph = default_graph().unwrap();
        resolver
            .set_node_toggle(&graph, &tid("t1"), "context_retrieval", false)
            .await
            .unwrap();

        let toggles = resolver.node_toggles(&tid("t1")).await.unwrap();
        let plan = graph.resolve_plan(&toggles).unwrap();
        assert!(!plan.steps.contains(&"context_retrieval"));
        assert!(plan.steps.contains(&"compose_reply"));
    }
}
