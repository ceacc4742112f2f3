//! Citation edges and the policies used to follow them

use super::PaperId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of a paper's `citations` or `references` list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationEdge {
    /// Paper at the other end of the edge
    pub target: PaperId,

    /// Upstream marks the relationship as significant
    pub influential: bool,
}

/// Which edge list of a record the traversal follows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Papers citing this one
    #[default]
    Citations,
    /// Papers this one cites
    References,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Citations => write!(f, "citations"),
            Direction::References => write!(f, "references"),
        }
    }
}

/// Which edges of the selected list are followed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeFilter {
    /// Only edges flagged influential
    #[default]
    InfluentialOnly,
    /// Every edge
    All,
}

impl EdgeFilter {
    pub fn accepts(&self, edge: &CitationEdge) -> bool {
        match self {
            EdgeFilter::InfluentialOnly => edge.influential,
            EdgeFilter::All => true,
        }
    }
}

impl fmt::Display for EdgeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeFilter::InfluentialOnly => write!(f, "influential_only"),
            EdgeFilter::All => write!(f, "all"),
        }
    }
}
