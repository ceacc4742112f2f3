//! Breadth-first citation graph acquisition
//!
//! Explores the citation relation level by level from one or more seed
//! papers. Every distinct paper is resolved and recorded once; papers found
//! one level past the depth bound are kept as leaves and not expanded.
//! Papers that cannot be resolved are pruned and the run carries on.

use crate::store::RecordStore;
use citegraph_common::metrics::{NODES_PRUNED, NODES_VISITED};
use citegraph_common::{AppConfig, AppError, Direction, EdgeFilter, PaperId, PaperRecord, Result};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// A resolved paper plus the traversal's view of it
#[derive(Debug, Clone, PartialEq)]
pub struct VisitedNode {
    pub record: PaperRecord,

    /// Targets of the edges selected by direction and filter
    pub children: Vec<PaperId>,

    /// Discovered past the depth bound; children are not expanded
    pub leaf: bool,

    /// Level at which the paper was first discovered
    pub depth: u32,
}

impl VisitedNode {
    pub fn id(&self) -> &PaperId {
        &self.record.id
    }
}

/// Visited papers keyed by id, iterated in discovery order
#[derive(Debug, Clone, Default)]
pub struct VisitedNodes {
    nodes: Vec<VisitedNode>,
    index: HashMap<PaperId, usize>,
    pruned: Vec<PaperId>,
}

impl VisitedNodes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node; returns false (and keeps the existing entry) if its id
    /// is already present.
    pub fn insert(&mut self, node: VisitedNode) -> bool {
        if self.index.contains_key(node.id()) {
            return false;
        }
        self.index.insert(node.id().clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    pub fn contains(&self, id: &PaperId) -> bool {
        self.index.contains_key(id)
    }

    /// Position of `id` in discovery order
    pub fn position(&self, id: &PaperId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VisitedNode> {
        self.nodes.iter()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.leaf).count()
    }

    /// Ids that could not be resolved during the run
    pub fn pruned(&self) -> &[PaperId] {
        &self.pruned
    }
}

#[cfg(test)]
impl VisitedNodes {
    pub fn get(&self, id: &PaperId) -> Option<&VisitedNode> {
        self.position(id).map(|i| &self.nodes[i])
    }
}

impl<'a> IntoIterator for &'a VisitedNodes {
    type Item = &'a VisitedNode;
    type IntoIter = std::slice::Iter<'a, VisitedNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// Traversal configuration
#[derive(Debug, Clone)]
pub struct TraversalOptions {
    /// Deepest expanded level; the next level is recorded as leaves
    pub max_depth: u32,
    pub edge_filter: EdgeFilter,
    pub direction: Direction,
    /// Papers resolved concurrently within one level
    pub concurrency: usize,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            edge_filter: EdgeFilter::InfluentialOnly,
            direction: Direction::Citations,
            concurrency: 1,
        }
    }
}

impl From<&AppConfig> for TraversalOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_depth: config.traversal.depth,
            edge_filter: config.edge_filter(),
            direction: config.traversal.direction,
            concurrency: config.traversal.concurrency,
        }
    }
}

/// Children of `record` under the configured direction and filter
fn select_children(record: &PaperRecord, options: &TraversalOptions) -> Vec<PaperId> {
    record
        .edges(options.direction)
        .iter()
        .filter(|edge| options.edge_filter.accepts(edge))
        .map(|edge| edge.target.clone())
        .collect()
}

/// Explore from `seeds` and return every paper reached within bounds.
///
/// Never fails: papers that cannot be resolved are recorded in
/// [`VisitedNodes::pruned`] and contribute no node. The frontier is
/// processed one level at a time; within a level, ids are resolved in
/// first-seen order (concurrently when `concurrency > 1`) and inserted in
/// that same order, so the result matches a FIFO queue walk.
#[instrument(skip(store, seeds), fields(seeds = seeds.len(), max_depth = options.max_depth))]
pub async fn traverse(
    store: &RecordStore,
    seeds: &[PaperId],
    options: &TraversalOptions,
) -> VisitedNodes {
    let mut visited = VisitedNodes::new();
    let mut failed: HashSet<PaperId> = HashSet::new();
    let mut frontier: Vec<PaperId> = seeds.to_vec();
    let mut depth: u32 = 0;

    while !frontier.is_empty() {
        let mut queued = HashSet::new();
        let level: Vec<PaperId> = frontier
            .into_iter()
            .filter(|id| !visited.contains(id) && !failed.contains(id))
            .filter(|id| queued.insert(id.clone()))
            .collect();

        debug!(depth, papers = level.len(), "Expanding level");

        let resolved: Vec<(PaperId, Result<PaperRecord>)> = stream::iter(level)
            .map(|id| async move {
                let outcome = store.get(&id).await;
                (id, outcome)
            })
            .buffered(options.concurrency.max(1))
            .collect()
            .await;

        let leaf = depth > options.max_depth;
        let mut next = Vec::new();

        for (id, outcome) in resolved {
            match outcome {
                Ok(record) => {
                    let children = select_children(&record, options);
                    if !leaf {
                        next.extend(children.iter().cloned());
                    }
                    visited.insert(VisitedNode {
                        record,
                        children,
                        leaf,
                        depth,
                    });
                    metrics::counter!(NODES_VISITED).increment(1);
                }
                Err(e) => {
                    log_pruned(&id, &e);
                    metrics::counter!(NODES_PRUNED).increment(1);
                    failed.insert(id.clone());
                    visited.pruned.push(id);
                }
            }
        }

        frontier = next;
        depth += 1;
    }

    visited
}

fn log_pruned(id: &PaperId, error: &AppError) {
    if error.is_pruning() && !error.is_anomaly() {
        debug!(paper_id = %id, error = %error, "Paper unavailable, pruning branch");
    } else {
        warn!(paper_id = %id, error = %error, code = ?error.code(), "Failed to resolve paper, pruning branch");
    }
}

/// Validate the seeds, traverse, and require that at least one seed resolved.
pub async fn crawl(
    store: &RecordStore,
    seeds: &[PaperId],
    options: &TraversalOptions,
) -> Result<VisitedNodes> {
    if seeds.is_empty() {
        return Err(AppError::validation("seeds", "at least one seed paper is required"));
    }

    info!(
        seeds = seeds.len(),
        depth = options.max_depth,
        direction = %options.direction,
        filter = %options.edge_filter,
        "Starting traversal"
    );

    let visited = traverse(store, seeds, options).await;

    if !seeds.iter().any(|seed| visited.contains(seed)) {
        let ids: Vec<&str> = seeds.iter().map(PaperId::as_str).collect();
        return Err(AppError::PaperNotFound { id: ids.join(", ") });
    }

    Ok(visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DirectedGraph, NodeAttributes, SizeScale};
    use crate::testing::{paper_json, store_with};
    use citegraph_common::MockPaperSource;
    use tokio_test::{assert_err, assert_ok};

    fn ids(nodes: &VisitedNodes) -> Vec<&str> {
        nodes.iter().map(|node| node.id().as_str()).collect()
    }

    fn children(nodes: &VisitedNodes, id: &str) -> Vec<String> {
        nodes
            .get(&PaperId::from(id))
            .unwrap()
            .children
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    fn options(max_depth: u32, edge_filter: EdgeFilter) -> TraversalOptions {
        TraversalOptions {
            max_depth,
            edge_filter,
            ..TraversalOptions::default()
        }
    }

    /// A cites B and C (both influential); B cites D (not influential)
    fn small_corpus() -> MockPaperSource {
        MockPaperSource::new()
            .with_response("A", paper_json("A", Some(2017), &[("B", true), ("C", true)], &[]))
            .with_response("B", paper_json("B", Some(2018), &[("D", false)], &[]))
            .with_response("C", paper_json("C", Some(2019), &[], &[]))
            .with_response("D", paper_json("D", Some(2020), &[], &[]))
    }

    #[tokio::test]
    async fn test_influential_scenario() {
        let (_dir, store, _source) = store_with(small_corpus()).await;
        let seeds = [PaperId::from("A")];

        let nodes = traverse(&store, &seeds, &options(0, EdgeFilter::InfluentialOnly)).await;

        assert_eq!(ids(&nodes), vec!["A", "B", "C"]);
        assert_eq!(children(&nodes, "A"), vec!["B", "C"]);
        assert!(children(&nodes, "B").is_empty());
        assert!(children(&nodes, "C").is_empty());
        assert!(!nodes.get(&PaperId::from("A")).unwrap().leaf);
        assert!(nodes.get(&PaperId::from("B")).unwrap().leaf);
        assert!(nodes.get(&PaperId::from("C")).unwrap().leaf);
    }

    #[tokio::test]
    async fn test_depth_one_expands_second_level() {
        let (_dir, store, _source) = store_with(small_corpus()).await;
        let seeds = [PaperId::from("A")];

        let nodes = traverse(&store, &seeds, &options(1, EdgeFilter::InfluentialOnly)).await;

        // same papers; B and C sit at depth 1 <= max_depth so they are expanded
        assert_eq!(ids(&nodes), vec!["A", "B", "C"]);
        assert_eq!(nodes.leaf_count(), 0);

        let nodes = traverse(&store, &seeds, &options(1, EdgeFilter::All)).await;
        assert_eq!(ids(&nodes), vec!["A", "B", "C", "D"]);
        assert_eq!(children(&nodes, "B"), vec!["D"]);
        let d = nodes.get(&PaperId::from("D")).unwrap();
        assert!(d.leaf);
        assert_eq!(d.depth, 2);
    }

    #[tokio::test]
    async fn test_leaf_keeps_children_but_does_not_expand() {
        let source = MockPaperSource::new()
            .with_response("A", paper_json("A", None, &[("B", true)], &[]))
            .with_response("B", paper_json("B", None, &[("C", true)], &[]))
            .with_response("C", paper_json("C", None, &[], &[]));
        let (_dir, store, source) = store_with(source).await;

        let nodes = traverse(&store, &[PaperId::from("A")], &options(0, EdgeFilter::All)).await;

        let b = nodes.get(&PaperId::from("B")).unwrap();
        assert!(b.leaf);
        assert_eq!(b.children, vec![PaperId::from("C")]);
        assert!(!nodes.contains(&PaperId::from("C")));
        assert_eq!(source.calls("C"), 0);
    }

    #[tokio::test]
    async fn test_convergent_paths_visit_once() {
        // A -> B, A -> C, B -> D, C -> D
        let source = MockPaperSource::new()
            .with_response("A", paper_json("A", None, &[("B", true), ("C", true)], &[]))
            .with_response("B", paper_json("B", None, &[("D", true)], &[]))
            .with_response("C", paper_json("C", None, &[("D", true)], &[]))
            .with_response("D", paper_json("D", None, &[], &[]));
        let (_dir, store, source) = store_with(source).await;

        let nodes = traverse(&store, &[PaperId::from("A")], &options(3, EdgeFilter::All)).await;

        assert_eq!(ids(&nodes), vec!["A", "B", "C", "D"]);
        assert_eq!(source.calls("D"), 1);
        assert_eq!(nodes.get(&PaperId::from("D")).unwrap().depth, 2);
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let source = MockPaperSource::new()
            .with_response("A", paper_json("A", None, &[("B", true)], &[]))
            .with_response("B", paper_json("B", None, &[("A", true), ("B", true)], &[]));
        let (_dir, store, source) = store_with(source).await;

        let nodes = traverse(&store, &[PaperId::from("A")], &options(10, EdgeFilter::All)).await;

        assert_eq!(ids(&nodes), vec!["A", "B"]);
        assert_eq!(source.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_unresolvable_child_is_pruned() {
        let source = MockPaperSource::new()
            .with_response("A", paper_json("A", None, &[("B", true), ("gone", true), ("down", true)], &[]))
            .with_response("B", paper_json("B", None, &[("down", true)], &[]))
            .with_response("gone", r#"{"error": "Paper not found"}"#);
        let (_dir, store, source) = store_with(source).await;

        let nodes = traverse(&store, &[PaperId::from("A")], &options(2, EdgeFilter::All)).await;

        assert_eq!(ids(&nodes), vec!["A", "B"]);
        assert_eq!(nodes.pruned(), &[PaperId::from("gone"), PaperId::from("down")]);
        // a failed id is not retried when another parent enqueues it
        assert_eq!(source.calls("down"), 1);
    }

    #[tokio::test]
    async fn test_references_direction() {
        let source = MockPaperSource::new()
            .with_response("A", paper_json("A", None, &[("X", true)], &[("R", false)]))
            .with_response("R", paper_json("R", None, &[], &[]));
        let (_dir, store, _source) = store_with(source).await;

        let options = TraversalOptions {
            max_depth: 1,
            edge_filter: EdgeFilter::All,
            direction: Direction::References,
            concurrency: 1,
        };
        let nodes = traverse(&store, &[PaperId::from("A")], &options).await;

        assert_eq!(ids(&nodes), vec!["A", "R"]);
    }

    #[tokio::test]
    async fn test_multiple_seeds_share_nodes() {
        let source = MockPaperSource::new()
            .with_response("A", paper_json("A", None, &[("C", true)], &[]))
            .with_response("B", paper_json("B", None, &[("C", true)], &[]))
            .with_response("C", paper_json("C", None, &[], &[]));
        let (_dir, store, source) = store_with(source).await;

        let seeds = [PaperId::from("A"), PaperId::from("B"), PaperId::from("A")];
        let nodes = traverse(&store, &seeds, &options(1, EdgeFilter::All)).await;

        assert_eq!(ids(&nodes), vec!["A", "B", "C"]);
        assert_eq!(source.calls("A"), 1);
        assert_eq!(source.calls("C"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_levels_match_sequential_order() {
        let corpus = || {
            MockPaperSource::new()
                .with_response("A", paper_json("A", None, &[("B", true), ("C", true), ("D", true)], &[]))
                .with_response("B", paper_json("B", None, &[("E", true)], &[]))
                .with_response("C", paper_json("C", None, &[("E", true), ("F", true)], &[]))
                .with_response("D", paper_json("D", None, &[], &[]))
                .with_response("E", paper_json("E", None, &[], &[]))
                .with_response("F", paper_json("F", None, &[], &[]))
        };
        let seeds = [PaperId::from("A")];

        let (_d1, sequential_store, _) = store_with(corpus()).await;
        let sequential = traverse(&sequential_store, &seeds, &options(0, EdgeFilter::All)).await;

        let (_d2, parallel_store, source) = store_with(corpus()).await;
        let parallel_options = TraversalOptions {
            concurrency: 4,
            ..options(0, EdgeFilter::All)
        };
        let parallel = traverse(&parallel_store, &seeds, &parallel_options).await;

        assert_eq!(ids(&sequential), ids(&parallel));
        for node in &sequential {
            assert_eq!(parallel.get(node.id()).unwrap(), node);
        }
        assert_eq!(source.total_calls(), 4);
    }

    #[tokio::test]
    async fn test_crawl_rejects_empty_seeds() {
        let (_dir, store, _source) = store_with(MockPaperSource::new()).await;
        let err = assert_err!(crawl(&store, &[], &TraversalOptions::default()).await);
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_crawl_fails_when_no_seed_resolves() {
        let (_dir, store, _source) = store_with(MockPaperSource::new()).await;
        let err = crawl(&store, &[PaperId::from("nope")], &TraversalOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PaperNotFound { .. }));
    }

    #[tokio::test]
    async fn test_crawl_tolerates_partial_seed_failure() {
        let (_dir, store, _source) = store_with(small_corpus()).await;
        let seeds = [PaperId::from("nope"), PaperId::from("C")];
        let nodes = assert_ok!(crawl(&store, &seeds, &TraversalOptions::default()).await);
        assert_eq!(ids(&nodes), vec!["C"]);
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let record = PaperRecord {
            id: PaperId::from("A"),
            title: String::new(),
            year: None,
            url: String::new(),
            citations: vec![],
            citation_count: 0,
            references: vec![],
        };
        let node = VisitedNode {
            record,
            children: vec![],
            leaf: false,
            depth: 0,
        };

        let mut nodes = VisitedNodes::new();
        assert!(nodes.insert(node.clone()));
        assert!(!nodes.insert(VisitedNode { leaf: true, ..node }));
        assert_eq!(nodes.len(), 1);
        assert!(!nodes.get(&PaperId::from("A")).unwrap().leaf);
    }
    #[tokio::test]
    async fn test_crawl_to_graph_and_attributes() {
        let (_dir, store, _source) = store_with(small_corpus()).await;
        let nodes = traverse(&store, &[PaperId::from("A")], &options(0, EdgeFilter::InfluentialOnly)).await;

        let graph = DirectedGraph::build(&nodes);
        let attributes = NodeAttributes::compute(&nodes, &SizeScale::default());

        assert_eq!(graph.node_count(), 3);
        for id in ["A", "B", "C"] {
            assert!(graph.contains_node(&PaperId::from(id)));
        }
        assert!(!graph.contains_node(&PaperId::from("D")));
        assert_eq!(
            graph.edge_ids(),
            vec![
                (&PaperId::from("A"), &PaperId::from("B")),
                (&PaperId::from("A"), &PaperId::from("C")),
            ]
        );

        assert_eq!(attributes.labels.len(), 3);
        assert_eq!(attributes.sizes.len(), 3);
        assert_eq!(attributes.years, vec![2017, 2018, 2019]);
        assert!(attributes.labels[0].ends_with("(2017)<br>citations: 2"));
        assert!(attributes.sizes[0] > attributes.sizes[2]);
    }

    #[tokio::test]
    async fn test_pruned_papers_stay_out_of_the_graph() {
        let source = MockPaperSource::new()
            .with_response("A", paper_json("A", Some(2001), &[("B", true), ("gone", true), ("down", true)], &[]))
            .with_response("B", paper_json("B", None, &[("down", true)], &[]))
            .with_response("gone", r#"{"error": "Paper not found"}"#);
        let (_dir, store, _source) = store_with(source).await;

        let nodes = traverse(&store, &[PaperId::from("A")], &options(2, EdgeFilter::All)).await;
        let graph = DirectedGraph::build(&nodes);
        let attributes = NodeAttributes::compute(&nodes, &SizeScale::default());

        assert_eq!(nodes.pruned().len(), 2);
        assert_eq!(graph.node_count(), nodes.len());
        for pruned in nodes.pruned() {
            assert!(!graph.contains_node(pruned));
            assert!(!graph.contains_edge(&PaperId::from("A"), pruned));
        }
        assert_eq!(graph.edge_ids(), vec![(&PaperId::from("A"), &PaperId::from("B"))]);

        assert_eq!(attributes.labels.len(), nodes.len());
        assert_eq!(attributes.sizes.len(), nodes.len());
        // B has no year and takes the earliest known one
        assert_eq!(attributes.years, vec![2001, 2001]);
        // the raw count includes the pruned entries
        assert!(attributes.labels[0].ends_with("citations: 3"));
    }
}
