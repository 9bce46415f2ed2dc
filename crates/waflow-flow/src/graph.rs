// SPDX-FileCopyrightText: 2026 Waflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dependency graph validation and execution plan resolution.
//!
//! The graph is validated once at construction: unique ids, referential
//! integrity of every edge, and acyclicity. Plan resolution then applies
//! a tenant's toggles, rewires dependents of disabled nodes to their
//! nearest enabled upstream, and produces a deterministic topological
//! order. Resolution failures mean the tenant's toggle set strands a
//! node, which is a startup-time configuration defect.

use std::collections::{HashMap, HashSet};

use waflow_core::WaflowError;

use crate::node::FlowNode;

/// Validated, immutable node graph.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    nodes: Vec<FlowNode>,
    index: HashMap<&'static str, usize>,
}

/// Result of resolving a graph against one tenant's toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Enabled node ids in execution order.
    pub steps: Vec<&'static str>,
    /// Disabled nodes that were rewired around.
    pub bypassed: Vec<&'static str>,
}

impl FlowGraph {
    /// Build and validate a graph from its node definitions.
    pub fn new(nodes: Vec<FlowNode>) -> Result<Self, WaflowError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id, i).is_some() {
                return Err(WaflowError::Graph(format!("duplicate node id '{}'", node.id)));
            }
        }
        for node in &nodes {
            for dep in node.dependencies.iter().chain(node.optional_dependencies) {
                if *dep == node.id {
                    return Err(WaflowError::Graph(format!(
                        "node '{}' depends on itself",
                        node.id
                    )));
                }
                if !index.contains_key(dep) {
                    return Err(WaflowError::Graph(format!(
                        "node '{}' references unknown dependency '{dep}'",
                        node.id
                    )));
                }
            }
            if !node.configurable && !node.enabled_by_default {
                return Err(WaflowError::Graph(format!(
                    "node '{}' is not configurable but disabled by default",
                    node.id
                )));
            }
            if !node.bypassable && !node.enabled_by_default {
                return Err(WaflowError::Graph(format!(
                    "node '{}' is not bypassable but disabled by default",
                    node.id
                )));
            }
        }
        let graph = Self { nodes, index };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.index.get(id).map(|i| &self.nodes[*i])
    }

    /// All nodes in declared order.
    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    /// Check that a toggle write is legal for this graph. Unknown node
    /// ids and writes against non-configurable nodes are rejected.
    pub fn check_toggle(&self, node_id: &str, enabled: bool) -> Result<(), WaflowError> {
        let node = self.node(node_id).ok_or_else(|| {
            WaflowError::Config(format!("unknown flow node '{node_id}'"))
        })?;
        if !node.configurable {
            return Err(WaflowError::Config(format!(
                "flow node '{node_id}' is not configurable"
            )));
        }
        if !enabled && !node.bypassable {
            return Err(WaflowError::Config(format!(
                "flow node '{node_id}' cannot be disabled"
            )));
        }
        Ok(())
    }

    /// Resolve the execution plan for one tenant's toggle set.
    ///
    /// Toggles on non-configurable nodes are ignored. For every disabled
    /// node, dependents are rewired to the disabled node's nearest
    /// enabled upstream, found by walking its optional dependencies and
    /// then their dependencies recursively. A dependent left without an
    /// enabled upstream is an error.
    pub fn resolve_plan(&self, toggles: &HashMap<String, bool>) -> Result<ExecutionPlan, WaflowError> {
        let enabled: HashSet<&'static str> = self
            .nodes
            .iter()
            .filter(|n| self.is_enabled(n, toggles))
            .map(|n| n.id)
            .collect();

        for node in &self.nodes {
            if !enabled.contains(node.id) && !node.bypassable {
                return Err(WaflowError::Graph(format!(
                    "node '{}' is disabled but not bypassable",
                    node.id
                )));
            }
        }

        // Rewire each enabled node's edges past disabled producers.
        let mut edges: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
        for node in self.nodes.iter().filter(|n| enabled.contains(n.id)) {
            let mut deps = Vec::new();
            for dep in node.dependencies {
                if enabled.contains(dep) {
                    deps.push(*dep);
                    continue;
                }
                let mut visited = HashSet::new();
                match self.substitute_for(dep, &enabled, &mut visited) {
                    Some(sub) => {
                        if sub != node.id && !deps.contains(&sub) {
                            deps.push(sub);
                        }
                    }
                    None => {
                        return Err(WaflowError::Graph(format!(
                            "node '{}' has no enabled upstream for disabled dependency '{dep}'",
                            node.id
                        )));
                    }
                }
            }
            edges.insert(node.id, deps);
        }

        let steps = self.topo_order(&enabled, &edges)?;
        let bypassed = self
            .nodes
            .iter()
            .filter(|n| !enabled.contains(n.id))
            .map(|n| n.id)
            .collect();
        Ok(ExecutionPlan { steps, bypassed })
    }

    fn is_enabled(&self, node: &FlowNode, toggles: &HashMap<String, bool>) -> bool {
        if !node.configurable {
            return node.enabled_by_default;
        }
        toggles
            .get(node.id)
            .copied()
            .unwrap_or(node.enabled_by_default)
    }

    /// Nearest enabled upstream of a disabled node. Optional dependencies
    /// are consulted in declared order before hard dependencies at each
    /// level of the walk.
    fn substitute_for(
        &self,
        disabled: &str,
        enabled: &HashSet<&'static str>,
        visited: &mut HashSet<&'static str>,
    ) -> Option<&'static str> {
        let node = self.node(disabled)?;
        if !visited.insert(node.id) {
            return None;
        }
        for cand in node.optional_dependencies.iter().chain(node.dependencies) {
            if enabled.contains(cand) {
                return Some(*cand);
            }
            if let Some(sub) = self.substitute_for(cand, enabled, visited) {
                return Some(sub);
            }
        }
        None
    }

    /// Kahn topological sort, breaking ties by declared node order.
    fn topo_order(
        &self,
        enabled: &HashSet<&'static str>,
        edges: &HashMap<&'static str, Vec<&'static str>>,
    ) -> Result<Vec<&'static str>, WaflowError> {
        let mut remaining: Vec<&'static str> = self
            .nodes
            .iter()
            .filter(|n| enabled.contains(n.id))
            .map(|n| n.id)
            .collect();
        let mut done: HashSet<&'static str> = HashSet::new();
        let mut order = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let ready = remaining.iter().position(|id| {
                edges
                    .get(id)
                    .map(|deps| deps.iter().all(|d| done.contains(d)))
                    .unwrap_or(true)
            });
            match ready {
                Some(pos) => {
                    let id = remaining.remove(pos);
                    done.insert(id);
                    order.push(id);
                }
                None => {
                    return Err(WaflowError::Graph(format!(
                        "dependency cycle among nodes: {}",
                        remaining.join(", ")
                    )));
                }
            }
        }
        Ok(order)
    }

    fn check_acyclic(&self) -> Result<(), WaflowError> {
        // Depth-first walk over the union of hard and optional edges.
        let mut state: HashMap<&'static str, u8> = HashMap::new();
        for node in &self.nodes {
            self.visit(node.id, &mut state)?;
        }
        Ok(())
    }

    fn visit(&self, id: &'static str, state: &mut HashMap<&'static str, u8>) -> Result<(), WaflowError> {
        match state.get(id) {
            Some(2) => return Ok(()),
            Some(1) => {
                return Err(WaflowError::Graph(format!(
                    "dependency cycle through node '{id}'"
                )))
            }
            _ => {}
        }
        state.insert(id, 1);
        if let Some(node) = self.node(id) {
            for dep in node.dependencies.iter().chain(node.optional_dependencies) {
                self.visit(*dep, state)?;
            }
        }
        state.insert(id, 2);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_graph;
    use crate::node::NodeCategory;

    fn node(
        id: &'static str,
        deps: &'static [&'static str],
        optional: &'static [&'static str],
    ) -> FlowNode {
        FlowNode {
            id,
            category: NodeCategory::Enrichment,
            enabled_by_default: true,
            configurable: true,
            bypassable: true,
            dependencies: deps,
            optional_dependencies: optional,
        }
    }

    fn no_toggles() -> HashMap<String, bool> {
        HashMap::new()
    }

    fn toggles(pairs: &[(&str, bool)]) -> HashMap<String, bool> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = FlowGraph::new(vec![node("a", &[], &[]), node("a", &[], &[])]).unwrap_err();
        assert!(err.to_string().contains("duplicate node id"));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let err = FlowGraph::new(vec![node("a", &["ghost"], &[])]).unwrap_err();
        assert!(err.to_string().contains("unknown dependency"));
    }

    #[test]
    fn rejects_self_dependency() {
        let err = FlowGraph::new(vec![node("a", &["a"], &[])]).unwrap_err();
        assert!(err.to_string().contains("depends on itself"));
    }

    #[test]
    fn rejects_cycle() {
        let err = FlowGraph::new(vec![
            node("a", &["b"], &[]),
            node("b", &["a"], &[]),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn plan_respects_declared_order_for_ties() {
        let graph = FlowGraph::new(vec![
            node("root", &[], &[]),
            node("left", &["root"], &[]),
            node("right", &["root"], &[]),
            node("sink", &["left", "right"], &[]),
        ])
        .unwrap();
        let plan = graph.resolve_plan(&no_toggles()).unwrap();
        assert_eq!(plan.steps, vec!["root", "left", "right", "sink"]);
        assert!(plan.bypassed.is_empty());
    }

    #[test]
    fn disabled_node_rewires_dependents_to_optional_upstream() {
        let graph = FlowGraph::new(vec![
            node("a", &[], &[]),
            node("b", &["a"], &["a"]),
            node("c", &["b"], &[]),
        ])
        .unwrap();
        let plan = graph.resolve_plan(&toggles(&[("b", false)])).unwrap();
        assert_eq!(plan.steps, vec!["a", "c"]);
        assert_eq!(plan.bypassed, vec!["b"]);
    }

    #[test]
    fn substitute_walk_is_transitive() {
        // Both b and c disabled: d falls back through c -> b -> a.
        let graph = FlowGraph::new(vec![
            node("a", &[], &[]),
            node("b", &["a"], &["a"]),
            node("c", &["b"], &["b"]),
            node("d", &["c"], &[]),
        ])
        .unwrap();
        let plan = graph
            .resolve_plan(&toggles(&[("b", false), ("c", false)]))
            .unwrap();
        assert_eq!(plan.steps, vec!["a", "d"]);
    }

    #[test]
    fn stranded_dependent_is_an_error() {
        // b has no optional upstream, so disabling it strands c.
        let graph = FlowGraph::new(vec![
            node("b", &[], &[]),
            node("c", &["b"], &[]),
        ])
        .unwrap();
        let err = graph.resolve_plan(&toggles(&[("b", false)])).unwrap_err();
        assert!(err.to_string().contains("no enabled upstream"));
    }

    #[test]
    fn toggle_on_non_configurable_node_is_ignored_in_plan() {
        let mut fixed = node("a", &[], &[]);
        fixed.configurable = false;
        fixed.bypassable = false;
        let graph = FlowGraph::new(vec![fixed, node("b", &["a"], &[])]).unwrap();
        let plan = graph.resolve_plan(&toggles(&[("a", false)])).unwrap();
        assert_eq!(plan.steps, vec!["a", "b"]);
    }

    #[test]
    fn check_toggle_rejects_unknown_and_non_configurable() {
        let graph = default_graph().unwrap();
        assert!(graph.check_toggle("ghost", false).is_err());
        assert!(graph.check_toggle("normalize", false).is_err());
        assert!(graph.check_toggle("intent_classifier", false).is_ok());
        assert!(graph.check_toggle("intent_classifier", true).is_ok());
    }

    #[test]
    fn default_graph_resolves_with_each_enrichment_node_off() {
        let graph = default_graph().unwrap();
        for id in ["intent_classifier", "context_retrieval"] {
            let plan = graph.resolve_plan(&toggles(&[(id, false)])).unwrap();
            assert!(!plan.steps.contains(&id));
            assert!(plan.steps.contains(&"normalize"));
            assert!(plan.steps.contains(&"compose_reply"));
        }
        let plan = graph
            .resolve_plan(&toggles(&[
                ("intent_classifier", false),
                ("context_retrieval", false),
            ]))
            .unwrap();
        assert_eq!(plan.steps, vec!["normalize", "compose_reply"]);
    }
}
