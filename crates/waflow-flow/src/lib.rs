// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flow dependency graph and executor for the inbound pipeline.
//!
//! The pipeline is modelled as a static directed acyclic graph of nodes.
//! Tenants can toggle configurable nodes; plan resolution rewires the
//! dependents of disabled nodes to their nearest enabled upstream and
//! fails fast when a toggle set strands a node.

pub mod builtin;
pub mod executor;
pub mod graph;
pub mod node;

use std::collections::HashMap;
use std::sync::Arc;

pub use executor::{FlowExecutor, FlowRunResult, DEFAULT_FALLBACK_REPLY, FALLBACK_REPLY_KEY};
pub use graph::{ExecutionPlan, FlowGraph};
pub use node::{FlowNode, NodeCategory, NodeHandler, NodeOutcome, RunContext};

use waflow_core::WaflowError;

/// Prefix of the configuration keys that store node toggles.
pub const TOGGLE_KEY_PREFIX: &str = "flow:";

/// The default inbound pipeline graph.
pub fn default_graph() -> Result<FlowGraph, WaflowError> {
    FlowGraph::new(vec![
        FlowNode {
            id: "normalize",
            category: NodeCategory::Ingress,
            enabled_by_default: true,
            configurable: false,
            bypassable: false,
            dependencies: &[],
            optional_dependencies: &[],
        },
        FlowNode {
            id: "intent_classifier",
            category: NodeCategory::Enrichment,
            enabled_by_default: true,
            configurable: true,
            bypassable: true,
            dependencies: &["normalize"],
            optional_dependencies: &["normalize"],
        },
        FlowNode {
            id: "context_retrieval",
            category: NodeCategory::Enrichment,
            enabled_by_default: true,
            configurable: true,
            bypassable: true,
            dependencies: &["intent_classifier"],
            optional_dependencies: &["normalize"],
        },
        FlowNode {
            id: "compose_reply",
            category: NodeCategory::Generation,
            enabled_by_default: true,
            configurable: false,
            bypassable: false,
            dependencies: &["context_retrieval"],
            optional_dependencies: &["intent_classifier", "normalize"],
        },
    ])
}

/// Executor over the default graph wired to the built-in handlers.
pub fn default_executor() -> Result<FlowExecutor, WaflowError> {
    let graph = Arc::new(default_graph()?);
    let mut handlers: HashMap<&'static str, Arc<dyn NodeHandler>> = HashMap::new();
    handlers.insert("normalize", Arc::new(builtin::NormalizeHandler));
    handlers.insert("intent_classifier", Arc::new(builtin::IntentClassifierHandler));
    handlers.insert("context_retrieval", Arc::new(builtin::ContextRetrievalHandler));
    handlers.insert("compose_reply", Arc::new(builtin::ComposeReplyHandler));
    FlowExecutor::new(graph, handlers)
}
