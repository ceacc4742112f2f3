//! Graph rendering
//!
//! A [`GraphView`] gathers everything a renderer needs: one entry per
//! visited paper with its computed attributes and position, plus the edge
//! list. Renderers turn the view into a single output file.

mod html;
mod json;

pub use html::HtmlRenderer;
pub use json::JsonRenderer;

use crate::graph::{DirectedGraph, NodeAttributes, Position};
use crate::traversal::VisitedNodes;
use chrono::{DateTime, Utc};
use citegraph_common::config::{OutputFormat, RenderConfig};
use citegraph_common::{AppError, PaperId, Result};
use serde::Serialize;
use std::io::Write;
use tracing::info;

/// One paper as drawn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNode {
    pub id: PaperId,
    pub title: String,
    pub url: String,
    /// Year reported upstream
    pub year: Option<i32>,
    /// Year used for colouring (imputed when unknown)
    pub color_year: i32,
    pub citations: usize,
    pub leaf: bool,
    pub depth: u32,
    pub label: String,
    pub size: f64,
    pub x: f64,
    pub y: f64,
}

/// Directed edge between two rendered nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedEdge {
    pub source: PaperId,
    pub target: PaperId,
    /// Positions of the endpoints in `GraphView::nodes`
    #[serde(skip)]
    pub from: usize,
    #[serde(skip)]
    pub to: usize,
}

/// Render-ready graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub title: String,
    #[serde(skip)]
    pub colorscale: String,
    pub generated_at: DateTime<Utc>,
    pub nodes: Vec<RenderedNode>,
    pub edges: Vec<RenderedEdge>,
    pub pruned: Vec<PaperId>,
}

impl GraphView {
    /// Zip the traversal result with its graph, attributes and layout.
    ///
    /// `attributes` and `positions` must be aligned with `nodes`.
    pub fn assemble(
        nodes: &VisitedNodes,
        graph: &DirectedGraph,
        attributes: &NodeAttributes,
        positions: &[Position],
        config: &RenderConfig,
    ) -> Result<Self> {
        let n = nodes.len();
        if attributes.labels.len() != n
            || attributes.sizes.len() != n
            || attributes.years.len() != n
            || positions.len() != n
        {
            return Err(AppError::Render {
                message: format!(
                    "attribute sequences are not aligned with {} nodes",
                    n
                ),
            });
        }

        let rendered = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| RenderedNode {
                id: node.id().clone(),
                title: node.record.title.clone(),
                url: node.record.url.clone(),
                year: node.record.year,
                color_year: attributes.years[i],
                citations: node.record.citation_count,
                leaf: node.leaf,
                depth: node.depth,
                label: attributes.labels[i].clone(),
                size: attributes.sizes[i],
                x: positions[i].x,
                y: positions[i].y,
            })
            .collect::<Vec<_>>();

        let edges = graph
            .edges()
            .into_iter()
            .map(|(from, to)| RenderedEdge {
                source: rendered[from].id.clone(),
                target: rendered[to].id.clone(),
                from,
                to,
            })
            .collect();

        Ok(Self {
            title: config.title.clone(),
            colorscale: config.colorscale.clone(),
            generated_at: Utc::now(),
            nodes: rendered,
            edges,
            pruned: nodes.pruned().to_vec(),
        })
    }
}

/// Output format backend
pub trait Renderer: Send + Sync {
    fn render(&self, view: &GraphView) -> Result<String>;

    fn name(&self) -> &str;
}

/// Renderer for the configured format. For HTML, a configured plotly.js
/// bundle is read here so a missing file fails before any crawling.
pub fn renderer_for(config: &RenderConfig) -> Result<Box<dyn Renderer>> {
    match config.format {
        OutputFormat::Html => {
            let renderer = match &config.plotly_js {
                Some(path) => HtmlRenderer::inline(path)?,
                None => HtmlRenderer::cdn(),
            };
            Ok(Box::new(renderer))
        }
        OutputFormat::Json => Ok(Box::new(JsonRenderer)),
    }
}

/// Render `view` and write it to `output` (`-` for stdout)
pub fn write_output(renderer: &dyn Renderer, view: &GraphView, output: &str) -> Result<()> {
    let artifact = renderer.render(view)?;

    if output == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(artifact.as_bytes())?;
        stdout.flush()?;
    } else {
        std::fs::write(output, artifact.as_bytes())?;
    }

    info!(
        renderer = renderer.name(),
        output,
        bytes = artifact.len(),
        "Wrote graph"
    );
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::graph::{layered, SizeScale};
    use crate::traversal::VisitedNode;
    use citegraph_common::{CitationEdge, PaperRecord};

    fn node(id: &str, year: Option<i32>, children: &[&str], leaf: bool, depth: u32) -> VisitedNode {
        VisitedNode {
            record: PaperRecord {
                id: PaperId::from(id),
                title: format!("Paper {}", id),
                year,
                url: format!("https://www.semanticscholar.org/paper/{}", id),
                citations: children
                    .iter()
                    .map(|c| CitationEdge {
                        target: PaperId::from(*c),
                        influential: true,
                    })
                    .collect(),
                citation_count: children.len(),
                references: vec![],
            },
            children: children.iter().map(|c| PaperId::from(*c)).collect(),
            leaf,
            depth,
        }
    }

    /// View of A -> {B, C} with B and C as leaves
    pub(crate) fn sample_view() -> GraphView {
        let mut nodes = VisitedNodes::new();
        nodes.insert(node("A", Some(2017), &["B", "C"], false, 0));
        nodes.insert(node("B", None, &[], true, 1));
        nodes.insert(node("C", Some(2019), &[], true, 1));

        let graph = DirectedGraph::build(&nodes);
        let attributes = NodeAttributes::compute(&nodes, &SizeScale::default());
        let positions = layered(&nodes, &graph);
        GraphView::assemble(&nodes, &graph, &attributes, &positions, &RenderConfig::default())
            .unwrap()
    }

    #[test]
    fn test_assemble_aligns_nodes() {
        let view = sample_view();

        assert_eq!(view.title, "Citations graph");
        assert_eq!(view.nodes.len(), 3);
        assert_eq!(view.nodes[0].citations, 2);
        assert_eq!(view.nodes[1].year, None);
        assert_eq!(view.nodes[1].color_year, 2017);
        assert!(view.nodes[2].leaf);
        assert_eq!(view.edges.len(), 2);
        assert_eq!(view.edges[0].source, PaperId::from("A"));
        assert_eq!(view.edges[1].target, PaperId::from("C"));
        assert_eq!((view.edges[1].from, view.edges[1].to), (0, 2));
    }

    #[test]
    fn test_assemble_rejects_misaligned_attributes() {
        let mut nodes = VisitedNodes::new();
        nodes.insert(node("A", None, &[], false, 0));
        let graph = DirectedGraph::build(&nodes);
        let attributes = NodeAttributes {
            labels: vec![],
            sizes: vec![],
            years: vec![],
        };

        let err = GraphView::assemble(&nodes, &graph, &attributes, &[], &RenderConfig::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Render { .. }));
    }

    #[test]
    fn test_renderer_selection() {
        let mut config = RenderConfig::default();
        assert_eq!(renderer_for(&config).unwrap().name(), "html");
        config.format = OutputFormat::Json;
        assert_eq!(renderer_for(&config).unwrap().name(), "json");
    }

    #[test]
    fn test_missing_plotly_bundle_fails_early() {
        let config = RenderConfig {
            plotly_js: Some("/nonexistent/plotly.min.js".into()),
            ..RenderConfig::default()
        };
        assert!(matches!(renderer_for(&config), Err(AppError::Render { .. })));
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let path = path.to_str().unwrap();

        write_output(&JsonRenderer, &sample_view(), path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["nodes"].as_array().unwrap().len(), 3);
    }
}
