// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential execution of a resolved plan.
//!
//! Handlers run one at a time in plan order. Enrichment failures degrade
//! the run and continue; ingress and generation failures abort it and
//! substitute the tenant's fallback reply. A short-circuit outcome skips
//! every remaining step.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, warn};
use waflow_core::WaflowError;

use crate::graph::{ExecutionPlan, FlowGraph};
use crate::node::{NodeHandler, NodeOutcome, RunContext};

/// Configuration key for the reply used when a fatal node fails.
pub const FALLBACK_REPLY_KEY: &str = "replies:fallback";

/// Reply used when a fatal node fails and the tenant has not configured one.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "Sorry, something went wrong on our side. Please try again in a moment.";

/// Outcome of one full pipeline run.
#[derive(Debug, Clone)]
pub struct FlowRunResult {
    /// Reply text to deliver, if the run produced one.
    pub reply: Option<String>,
    /// Short-circuit reason, when a node ended the run early.
    pub short_circuit: Option<String>,
    /// Enrichment nodes that failed but did not abort the run.
    pub degraded: Vec<&'static str>,
    /// Whether the reply is the fallback after a fatal failure.
    pub fallback: bool,
}

/// Runs resolved plans against a fixed handler set.
pub struct FlowExecutor {
    graph: Arc<FlowGraph>,
    handlers: HashMap<&'static str, Arc<dyn NodeHandler>>,
}

impl std::fmt::Debug for FlowExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowExecutor")
            .field("graph", &self.graph)
            .field("handlers", &self.handlers.keys())
            .finish()
    }
}

impl FlowExecutor {
    /// Build an executor, checking that every node has a handler.
    pub fn new(
        graph: Arc<FlowGraph>,
        handlers: HashMap<&'static str, Arc<dyn NodeHandler>>,
    ) -> Result<Self, WaflowError> {
        for node in graph.nodes() {
            if !handlers.contains_key(node.id) {
                return Err(WaflowError::Graph(format!(
                    "no handler registered for node '{}'",
                    node.id
                )));
            }
        }
        Ok(Self { graph, handlers })
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    /// Execute a plan. Failures are resolved to a result rather than an
    /// error: the caller always gets something it can act on.
    pub async fn run(&self, plan: &ExecutionPlan, mut ctx: RunContext) -> FlowRunResult {
        let mut degraded = Vec::new();
        let mut reply = None;

        for step in &plan.steps {
            let node = match self.graph.node(step) {
                Some(node) => node,
                None => continue,
            };
            let handler = match self.handlers.get(step) {
                Some(handler) => Arc::clone(handler),
                None => continue,
            };

            match handler.run(&ctx).await {
                Ok(NodeOutcome::Continue(value)) => {
                    debug!(node = *step, "node completed");
                    ctx.outputs.insert(step.to_string(), value);
                }
                Ok(NodeOutcome::ShortCircuit { reason, reply: sc_reply }) => {
                    debug!(node = *step, reason = %reason, "node short-circuited run");
                    return FlowRunResult {
                        reply: sc_reply,
                        short_circuit: Some(reason),
                        degraded,
                        fallback: false,
                    };
                }
                Err(e) if node.category.is_fatal() => {
                    error!(node = *step, error = %e, "fatal node failure, using fallback reply");
                    return FlowRunResult {
                        reply: Some(self.fallback_reply(&ctx)),
                        short_circuit: None,
                        degraded,
                        fallback: true,
                    };
                }
                Err(e) => {
                    warn!(node = *step, error = %e, "node failed, continuing without its output");
                    degraded.push(*step);
                }
            }

            if node.category == crate::node::NodeCategory::Generation {
                reply = ctx.output(step).and_then(|v| v.as_str()).map(str::to_string);
            }
        }

        FlowRunResult {
            reply,
            short_circuit: None,
            degraded,
            fallback: false,
        }
    }

    fn fallback_reply(&self, ctx: &RunContext) -> String {
        ctx.config_str(FALLBACK_REPLY_KEY)
            .unwrap_or(DEFAULT_FALLBACK_REPLY)
            .to_string()
    }
}
