// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flow node definitions and the handler contract.
//!
//! A node describes one processing step in the inbound pipeline. The node
//! set is design-time data: ids, dependency edges, and per-node policy
//! flags are fixed in code, while the enabled/disabled state of
//! configurable nodes comes from tenant configuration at run time.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use strum::Display;
use waflow_core::{InboundEnvelope, TenantId, WaflowError};

/// Processing stage a node belongs to. The category decides what happens
/// when the node's handler fails mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NodeCategory {
    /// Payload normalization. Failures abort the run.
    Ingress,
    /// Classification and context gathering. Failures are recoverable:
    /// the run continues with the node's output absent.
    Enrichment,
    /// Reply composition. Failures abort the run and trigger the
    /// tenant's fallback reply.
    Generation,
}

impl NodeCategory {
    /// Whether a handler failure in this category aborts the run.
    pub fn is_fatal(self) -> bool {
        matches!(self, NodeCategory::Ingress | NodeCategory::Generation)
    }
}

/// Static definition of one pipeline node.
#[derive(Debug, Clone)]
pub struct FlowNode {
    /// Stable identifier, also the suffix of the `flow:` toggle key.
    pub id: &'static str,
    pub category: NodeCategory,
    /// Enabled state when the tenant has no toggle row for this node.
    pub enabled_by_default: bool,
    /// Whether tenants may toggle this node at all.
    pub configurable: bool,
    /// Whether downstream nodes can be rewired around this node when it
    /// is disabled. A node that is not bypassable must never end up
    /// disabled in a resolved plan.
    pub bypassable: bool,
    /// Hard upstream edges. Every id here must name another node.
    pub dependencies: &'static [&'static str],
    /// Fallback upstream edges, consulted in order when this node is
    /// disabled and a dependent needs a substitute producer.
    pub optional_dependencies: &'static [&'static str],
}

/// What a node handler produced.
#[derive(Debug, Clone)]
pub enum NodeOutcome {
    /// Output recorded under the node's id, run proceeds to the next step.
    Continue(Value),
    /// Terminal outcome: skip all remaining nodes and deliver `reply`
    /// (when present) immediately.
    ShortCircuit {
        reason: String,
        reply: Option<String>,
    },
}

/// Per-run state handed to each handler.
#[derive(Debug)]
pub struct RunContext {
    pub tenant_id: TenantId,
    pub envelope: InboundEnvelope,
    /// Tenant configuration resolved once for the whole run.
    pub config: HashMap<String, Value>,
    /// Outputs of nodes executed earlier in this run, keyed by node id.
    pub outputs: HashMap<String, Value>,
}

impl RunContext {
    pub fn new(
        tenant_id: TenantId,
        envelope: InboundEnvelope,
        config: HashMap<String, Value>,
    ) -> Self {
        Self {
            tenant_id,
            envelope,
            config,
            outputs: HashMap::new(),
        }
    }

    /// Output of an upstream node, if it ran and produced one.
    pub fn output(&self, node_id: &str) -> Option<&Value> {
        self.outputs.get(node_id)
    }

    /// String-typed configuration value, if present.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }
}

/// Implemented by each node's processing logic.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    async fn run(&self, ctx: &RunContext) -> Result<NodeOutcome, WaflowError>;
}
