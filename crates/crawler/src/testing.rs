//! Fixtures shared by the crawler's unit tests

use crate::store::RecordStore;
use citegraph_common::{DiskCache, MockPaperSource};
use std::sync::Arc;
use tempfile::TempDir;

/// Upstream-shaped paper body with the given edges as `(id, influential)`
pub fn paper_json(
    id: &str,
    year: Option<i32>,
    citations: &[(&str, bool)],
    references: &[(&str, bool)],
) -> String {
    let edges = |edges: &[(&str, bool)]| -> Vec<serde_json::Value> {
        edges
            .iter()
            .map(|(target, influential)| {
                serde_json::json!({ "paperId": target, "isInfluential": influential })
            })
            .collect()
    };

    serde_json::json!({
        "paperId": id,
        "title": format!("Paper {}", id),
        "year": year,
        "url": format!("https://www.semanticscholar.org/paper/{}", id),
        "citations": edges(citations),
        "references": edges(references),
    })
    .to_string()
}

/// A store over a fresh temporary cache directory
pub async fn store_with(source: MockPaperSource) -> (TempDir, RecordStore, Arc<MockPaperSource>) {
    let dir = tempfile::tempdir().unwrap();
    let cache = DiskCache::open(dir.path()).await.unwrap();
    let source = Arc::new(source);
    let store = RecordStore::new(cache, source.clone());
    (dir, store, source)
}
