//! Layered node placement
//!
//! Layer = discovery depth, drawn top to bottom. Within a layer nodes are
//! ordered by the mean x of their already-placed parents (a single
//! downward barycenter sweep) and centred on x = 0. Layers come from the
//! traversal rather than a topological sort, so cycles need no handling.

use super::DirectedGraph;
use crate::traversal::VisitedNodes;
use serde::Serialize;
use std::collections::BTreeMap;

const HORIZONTAL_GAP: f64 = 100.0;
const VERTICAL_GAP: f64 = 120.0;

/// Node position in plot coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Positions aligned with the discovery order of `nodes`
pub fn layered(nodes: &VisitedNodes, graph: &DirectedGraph) -> Vec<Position> {
    let mut layers: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, node) in nodes.iter().enumerate() {
        layers.entry(node.depth).or_default().push(i);
    }

    let mut placed: Vec<Option<Position>> = vec![None; nodes.len()];

    for (depth, members) in layers {
        let mut keyed: Vec<(f64, usize)> = members
            .iter()
            .enumerate()
            .map(|(slot, &i)| {
                let parent_xs: Vec<f64> = graph
                    .parents(i)
                    .into_iter()
                    .filter_map(|p| placed[p].map(|pos| pos.x))
                    .collect();
                let key = if parent_xs.is_empty() {
                    centred(slot, members.len())
                } else {
                    parent_xs.iter().sum::<f64>() / parent_xs.len() as f64
                };
                (key, i)
            })
            .collect();

        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

        let y = -(depth as f64) * VERTICAL_GAP;
        for (slot, &(_, i)) in keyed.iter().enumerate() {
            placed[i] = Some(Position {
                x: centred(slot, keyed.len()),
                y,
            });
        }
    }

    placed
        .into_iter()
        .map(|pos| pos.unwrap_or(Position { x: 0.0, y: 0.0 }))
        .collect()
}

fn centred(slot: usize, width: usize) -> f64 {
    (slot as f64 - (width as f64 - 1.0) / 2.0) * HORIZONTAL_GAP
}
