//! Per-node display attributes
//!
//! Labels, marker sizes and colour years, each a sequence aligned with the
//! discovery order of the visited nodes. Pure functions of their input.

use crate::traversal::VisitedNodes;
use citegraph_common::config::RenderConfig;
use tracing::warn;

/// Clamp-then-rescale mapping from citation counts to marker sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeScale {
    pub min_size: f64,
    pub max_size: f64,
    /// Counts above this are clamped before rescaling
    pub threshold: usize,
}

impl Default for SizeScale {
    fn default() -> Self {
        Self {
            min_size: 10.0,
            max_size: 40.0,
            threshold: 200,
        }
    }
}

impl From<&RenderConfig> for SizeScale {
    fn from(config: &RenderConfig) -> Self {
        Self {
            min_size: config.min_size,
            max_size: config.max_size,
            threshold: config.size_threshold,
        }
    }
}

/// Attribute sequences for one traversal result
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAttributes {
    pub labels: Vec<String>,
    pub sizes: Vec<f64>,
    pub years: Vec<i32>,
}

impl NodeAttributes {
    pub fn compute(nodes: &VisitedNodes, scale: &SizeScale) -> Self {
        Self {
            labels: calc_labels(nodes),
            sizes: calc_sizes(nodes, scale),
            years: calc_years(nodes),
        }
    }
}

/// Hover label: linked title, year and citation count
pub fn calc_labels(nodes: &VisitedNodes) -> Vec<String> {
    nodes
        .iter()
        .map(|node| {
            let record = &node.record;
            let year = record
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "<a href=\"{}\" style=\"color: inherit; text-decoration: underline;\">{}</a>({})<br>citations: {}",
                escape_html(&record.url),
                escape_html(&record.title),
                year,
                record.citation_count
            )
        })
        .collect()
}

/// Marker sizes from citation counts.
///
/// Counts are clamped to `scale.threshold`, then mapped linearly with
/// `min_size + (max_size - min_size) * (c - lo) / (hi - lo + 1)`. The `+ 1`
/// keeps equal counts finite (they all get `min_size`) and keeps every size
/// strictly below `max_size`.
pub fn calc_sizes(nodes: &VisitedNodes, scale: &SizeScale) -> Vec<f64> {
    let counts: Vec<usize> = nodes
        .iter()
        .map(|node| node.record.citation_count.min(scale.threshold))
        .collect();

    let (Some(&lo), Some(&hi)) = (counts.iter().min(), counts.iter().max()) else {
        return Vec::new();
    };

    let range_old = (hi - lo + 1) as f64;
    let range_new = scale.max_size - scale.min_size;

    counts
        .into_iter()
        .map(|c| scale.min_size + range_new * (c - lo) as f64 / range_old)
        .collect()
}

/// Publication years with unknown values imputed to the earliest known year.
///
/// If no visited paper has a year, every entry is `0`.
pub fn calc_years(nodes: &VisitedNodes) -> Vec<i32> {
    let earliest = nodes.iter().filter_map(|node| node.record.year).min();

    let fallback = match earliest {
        Some(year) => year,
        None => {
            if !nodes.is_empty() {
                warn!(nodes = nodes.len(), "No publication years known, colouring every node as year 0");
            }
            0
        }
    };

    nodes
        .iter()
        .map(|node| node.record.year.unwrap_or(fallback))
        .collect()
}

/// Escape text for HTML element content and attribute values
pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
