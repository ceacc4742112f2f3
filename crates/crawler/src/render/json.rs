//! JSON graph export

use super::{GraphView, Renderer};
use citegraph_common::Result;

/// Pretty-printed JSON document of the view
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, view: &GraphView) -> Result<String> {
        let mut out = serde_json::to_string_pretty(view)?;
        out.push('\n');
        Ok(out)
    }

    fn name(&self) -> &str {
        "json"
    }
}
