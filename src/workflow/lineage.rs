// src/workflow/lineage.rs

//! Ancestor / descendant reachability between workflow steps.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Bfs, Reversed};
use tracing::debug;

use crate::errors::{Result, SchedulerError};

use super::WorkflowStep;

static NO_STEPS: LazyLock<HashSet<String>> = LazyLock::new(HashSet::new);

/// Read-only lineage queries consumed by version resolution.
///
/// Sets are strict: a step is never its own ancestor or descendant.
pub trait LineageOracle: Send + Sync {
    fn ancestors_of(&self, step: &str) -> &HashSet<String>;

    fn descendants_of(&self, step: &str) -> &HashSet<String>;

    /// Whether `ancestor` is a strict ancestor of `step`.
    fn is_ancestor(&self, ancestor: &str, step: &str) -> bool {
        self.ancestors_of(step).contains(ancestor)
    }

    /// Whether `descendant` is a strict descendant of `step`.
    fn is_descendant(&self, descendant: &str, step: &str) -> bool {
        self.descendants_of(step).contains(descendant)
    }
}

#[derive(Debug, Clone)]
struct StepNode {
    step: Arc<WorkflowStep>,
    ancestors: HashSet<String>,
    descendants: HashSet<String>,
}

/// Workflow DAG with reachability sets computed once at build time.
#[derive(Debug, Clone, Default)]
pub struct WorkflowDag {
    steps: HashMap<String, StepNode>,
}

impl WorkflowDag {
    pub fn builder() -> WorkflowDagBuilder {
        WorkflowDagBuilder::default()
    }

    pub fn step(&self, name: &str) -> Option<Arc<WorkflowStep>> {
        self.steps.get(name).map(|n| Arc::clone(&n.step))
    }

    /// All step names.
    pub fn steps(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(|s| s.as_str())
    }
}

impl LineageOracle for WorkflowDag {
    fn ancestors_of(&self, step: &str) -> &HashSet<String> {
        self.steps
            .get(step)
            .map(|n| &n.ancestors)
            .unwrap_or(&NO_STEPS)
    }

    fn descendants_of(&self, step: &str) -> &HashSet<String> {
        self.steps
            .get(step)
            .map(|n| &n.descendants)
            .unwrap_or(&NO_STEPS)
    }
}

/// Collects steps and edges, then validates and freezes them into a
/// [`WorkflowDag`].
#[derive(Debug, Default)]
pub struct WorkflowDagBuilder {
    steps: Vec<(String, u32)>,
    edges: Vec<(String, String)>,
}

impl WorkflowDagBuilder {
    /// Register a step with its rank (position in the workflow definition).
    pub fn step(mut self, name: &str, rank: u32) -> Self {
        self.steps.push((name.to_string(), rank));
        self
    }

    /// Data flows from `from` to `to`.
    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.edges.push((from.to_string(), to.to_string()));
        self
    }

    pub fn build(self) -> Result<WorkflowDag> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for (name, _) in &self.steps {
            graph.add_node(name.as_str());
        }

        for (from, to) in &self.edges {
            for endpoint in [from, to] {
                if !graph.contains_node(endpoint.as_str()) {
                    return Err(SchedulerError::ConfigError(format!(
                        "edge {from} -> {to} references unknown step '{endpoint}'"
                    )));
                }
            }
            graph.add_edge(from.as_str(), to.as_str(), ());
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(SchedulerError::DagCycle(format!(
                "cycle detected in workflow involving step '{}'",
                cycle.node_id()
            )));
        }

        let mut steps = HashMap::with_capacity(self.steps.len());
        for (name, rank) in &self.steps {
            let descendants = reachable(&graph, name);
            let ancestors = reachable(Reversed(&graph), name);
            debug!(
                step = %name,
                ancestors = ancestors.len(),
                descendants = descendants.len(),
                "computed lineage"
            );
            steps.insert(
                name.clone(),
                StepNode {
                    step: Arc::new(WorkflowStep::new(name, *rank)),
                    ancestors,
                    descendants,
                },
            );
        }

        Ok(WorkflowDag { steps })
    }
}

fn reachable<'a, G>(graph: G, start: &'a str) -> HashSet<String>
where
    G: petgraph::visit::IntoNeighbors<NodeId = &'a str> + petgraph::visit::Visitable,
{
    let mut bfs = Bfs::new(graph, start);
    let mut result = HashSet::new();
    while let Some(node) = bfs.next(graph) {
        if node != start {
            result.insert(node.to_string());
        }
    }
    result
}
