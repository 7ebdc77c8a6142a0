// src/dag/graph.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::engine::TaskName;
use crate::errors::{ForensicflowError, Result};
use crate::types::MissingDependencyPolicy;
use crate::workflow::Task;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct requirements: tasks that must finish before this one can run.
    deps: Vec<TaskName>,
    /// Direct dependents: tasks that list this one in `requires`.
    dependents: Vec<TaskName>,
    /// Vertex created for a `requires` entry with no matching task.
    phantom: bool,
}

/// Adjacency-list dependency graph keyed by task name.
///
/// Edges point requirement → dependent. Vertices are kept in a `BTreeMap`
/// so iteration order (roots, topological order) is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: BTreeMap<TaskName, DagNode>,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph builder: one vertex per task, one edge per `requires` entry,
    /// then a cycle check.
    pub fn build<'a>(
        tasks: impl IntoIterator<Item = &'a Task>,
        policy: MissingDependencyPolicy,
    ) -> Result<Self> {
        let tasks: Vec<&Task> = tasks.into_iter().collect();
        let mut graph = DagGraph::new();

        for task in &tasks {
            graph.add_vertex(&task.name);
        }

        for task in &tasks {
            for requirement in &task.requires {
                if !graph.contains(requirement) {
                    match policy {
                        MissingDependencyPolicy::Reject => {
                            return Err(ForensicflowError::UnknownDependency {
                                task: task.name.clone(),
                                dependency: requirement.clone(),
                            });
                        }
                        MissingDependencyPolicy::Phantom => {
                            warn!(
                                task = %task.name,
                                dependency = %requirement,
                                "requirement names no task; adding phantom vertex"
                            );
                        }
                    }
                }
                graph.add_edge(requirement, &task.name);
            }
        }

        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Returns `false` if the vertex already existed.
    pub fn add_vertex(&mut self, name: &str) -> bool {
        match self.nodes.get_mut(name) {
            Some(node) => {
                node.phantom = false;
                false
            }
            None => {
                self.nodes.insert(name.to_string(), DagNode::default());
                true
            }
        }
    }

    /// Add `from → to`. Missing endpoints become phantom vertices;
    /// duplicate edges are ignored.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        for endpoint in [from, to] {
            self.nodes.entry(endpoint.to_string()).or_insert_with(|| DagNode {
                phantom: true,
                ..DagNode::default()
            });
        }

        if let Some(node) = self.nodes.get_mut(to) {
            if node.deps.iter().any(|d| d == from) {
                return;
            }
            node.deps.push(from.to_string());
        }
        if let Some(node) = self.nodes.get_mut(from) {
            node.dependents.push(to.to_string());
        }
    }

    /// A topological sort fails if there is a cycle; the vertex it
    /// stopped on is reported.
    pub fn check_acyclic(&self) -> Result<()> {
        self.sorted().map(|_| ())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn is_phantom(&self, name: &str) -> bool {
        self.nodes.get(name).is_some_and(|n| n.phantom)
    }

    pub fn phantoms(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.phantom)
            .map(|(k, _)| k.as_str())
    }

    /// Return all vertex names, phantoms included.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Vertices without requirements.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.deps.is_empty())
            .map(|(k, _)| k.as_str())
    }

    /// Immediate requirements of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Requirements before dependents. Empty if the graph has a cycle.
    pub fn topological_order(&self) -> Vec<&str> {
        self.sorted().unwrap_or_default()
    }

    fn sorted(&self) -> Result<Vec<&str>> {
        toposort(&self.as_graphmap(), None).map_err(|cycle| ForensicflowError::CyclicDependency {
            task: cycle.node_id().to_string(),
        })
    }

    /// Edges point requirement -> dependent, nodes in name order.
    fn as_graphmap(&self) -> DiGraphMap<&str, ()> {
        let mut graph = DiGraphMap::new();
        for (name, node) in &self.nodes {
            graph.add_node(name.as_str());
            for dependent in &node.dependents {
                graph.add_edge(name.as_str(), dependent.as_str(), ());
            }
        }
        graph
    }
}
