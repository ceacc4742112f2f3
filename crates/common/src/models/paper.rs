//! Paper identifier and record

use super::{CitationEdge, Direction};
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque upstream paper identifier; equality is exact string equality
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(String);

impl PaperId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaperId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PaperId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for PaperId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Metadata for one paper, immutable once decoded
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// Identifier the record was requested under
    pub id: PaperId,

    pub title: String,

    /// Publication year, if upstream knows it
    pub year: Option<i32>,

    /// Canonical landing page
    pub url: String,

    /// Followable papers citing this one
    pub citations: Vec<CitationEdge>,

    /// Citation entries as reported upstream, including ones without an id
    pub citation_count: usize,

    /// Papers this one cites
    pub references: Vec<CitationEdge>,
}

/// Wire shape of a paper response
#[derive(Deserialize)]
struct PaperPayload {
    #[serde(rename = "paperId", default)]
    paper_id: Option<String>,

    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    year: Option<i32>,

    #[serde(default)]
    url: Option<String>,

    citations: Vec<EdgePayload>,

    #[serde(default)]
    references: Vec<EdgePayload>,
}

#[derive(Deserialize)]
struct EdgePayload {
    #[serde(rename = "paperId", default)]
    paper_id: Option<String>,

    #[serde(rename = "isInfluential", default)]
    is_influential: bool,
}

impl EdgePayload {
    // Upstream lists papers it could not resolve with a null id; they cannot
    // be followed, so they are dropped here.
    fn into_edge(self) -> Option<CitationEdge> {
        self.paper_id.filter(|id| !id.is_empty()).map(|id| CitationEdge {
            target: PaperId::from(id),
            influential: self.is_influential,
        })
    }
}

impl PaperRecord {
    /// Decode a raw upstream response for `id`.
    ///
    /// A body carrying an `error` field is the service reporting the
    /// identifier as unknown and decodes to `PaperNotFound`; anything that is
    /// not a paper object decodes to `Malformed`.
    pub fn decode(id: &PaperId, raw: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(raw).map_err(|e| AppError::Malformed {
                id: id.to_string(),
                message: e.to_string(),
            })?;

        let Some(object) = value.as_object() else {
            return Err(AppError::Malformed {
                id: id.to_string(),
                message: "response is not a JSON object".to_string(),
            });
        };

        if object.contains_key("error") {
            return Err(AppError::PaperNotFound { id: id.to_string() });
        }

        let payload: PaperPayload =
            serde_json::from_value(value).map_err(|e| AppError::Malformed {
                id: id.to_string(),
                message: e.to_string(),
            })?;

        if let Some(upstream_id) = payload.paper_id.as_deref() {
            if upstream_id != id.as_str() {
                tracing::debug!(requested = %id, upstream = upstream_id, "Paper resolved under a different id");
            }
        }

        Ok(Self {
            id: id.clone(),
            title: payload.title.unwrap_or_default(),
            year: payload.year,
            url: payload.url.unwrap_or_default(),
            citation_count: payload.citations.len(),
            citations: payload.citations.into_iter().filter_map(EdgePayload::into_edge).collect(),
            references: payload.references.into_iter().filter_map(EdgePayload::into_edge).collect(),
        })
    }

    /// Edge list in the given direction
    pub fn edges(&self, direction: Direction) -> &[CitationEdge] {
        match direction {
            Direction::Citations => &self.citations,
            Direction::References => &self.references,
        }
    }
}
