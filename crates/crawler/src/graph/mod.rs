//! Citation graph materialization
//!
//! Turns a traversal result into a directed graph plus the per-node
//! attributes and positions the renderers draw.

mod attributes;
mod layout;

pub(crate) use attributes::escape_html;
pub use attributes::{NodeAttributes, SizeScale};
pub use layout::{layered, Position};

use crate::traversal::VisitedNodes;
use citegraph_common::PaperId;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;

/// Directed citation graph over visited papers
///
/// Node weights are paper ids; node indices follow the discovery order of
/// the traversal result, so index `i` lines up with the i-th visited node.
#[derive(Debug, Clone, Default)]
pub struct DirectedGraph {
    graph: DiGraph<PaperId, ()>,
}

impl DirectedGraph {
    /// Materialize `nodes`: every visited paper becomes a node, and every
    /// non-leaf paper gets an edge to each of its children.
    ///
    /// Children that are not themselves visited (pruned or never reached)
    /// get no edge. Repeated children collapse into one edge.
    pub fn build(nodes: &VisitedNodes) -> Self {
        let mut graph = DiGraph::with_capacity(nodes.len(), 0);
        for node in nodes {
            graph.add_node(node.id().clone());
        }

        let mut dangling = 0usize;
        for (position, node) in nodes.iter().enumerate() {
            if node.leaf {
                continue;
            }
            let from = NodeIndex::new(position);
            for child in &node.children {
                match nodes.position(child) {
                    Some(to) => {
                        graph.update_edge(from, NodeIndex::new(to), ());
                    }
                    None => dangling += 1,
                }
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            dangling,
            "Materialized citation graph"
        );

        Self { graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edges as `(from, to)` node positions, in insertion order
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| (edge.source().index(), edge.target().index()))
            .collect()
    }

    /// Positions of the nodes with an edge into `position`
    pub fn parents(&self, position: usize) -> Vec<usize> {
        self.graph
            .neighbors_directed(NodeIndex::new(position), Direction::Incoming)
            .map(|idx| idx.index())
            .collect()
    }
}

#[cfg(test)]
impl DirectedGraph {
    fn node_index(&self, id: &PaperId) -> Option<NodeIndex> {
        self.graph.node_indices().find(|&idx| &self.graph[idx] == id)
    }

    pub fn contains_node(&self, id: &PaperId) -> bool {
        self.node_index(id).is_some()
    }

    pub fn contains_edge(&self, from: &PaperId, to: &PaperId) -> bool {
        match (self.node_index(from), self.node_index(to)) {
            (Some(a), Some(b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Edges as `(from, to)` ids, in insertion order
    pub fn edge_ids(&self) -> Vec<(&PaperId, &PaperId)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| (&self.graph[edge.source()], &self.graph[edge.target()]))
            .collect()
    }
}
