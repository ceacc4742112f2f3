//! Plotly page
//!
//! One scatter trace for the papers (size by citations, colour by year,
//! hover label with a link) and one arrow annotation per edge. With a local
//! plotly.js bundle the library is inlined and the page works offline;
//! otherwise it is loaded from the Plotly CDN.

use super::{GraphView, Renderer};
use crate::graph::escape_html;
use citegraph_common::{AppError, Result};
use serde_json::{json, Value};
use std::path::Path;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

#[derive(Debug, Clone, PartialEq)]
enum PlotlySource {
    Cdn,
    Inline(String),
}

pub struct HtmlRenderer {
    plotly: PlotlySource,
}

impl HtmlRenderer {
    /// Page that loads plotly.js from the CDN
    pub fn cdn() -> Self {
        Self {
            plotly: PlotlySource::Cdn,
        }
    }

    /// Page with the plotly.js bundle at `path` inlined
    pub fn inline(path: &Path) -> Result<Self> {
        let bundle = std::fs::read_to_string(path).map_err(|e| AppError::Render {
            message: format!("Failed to read plotly.js bundle '{}': {}", path.display(), e),
        })?;
        Ok(Self {
            plotly: PlotlySource::Inline(bundle),
        })
    }

    fn script_tag(&self) -> String {
        match &self.plotly {
            PlotlySource::Cdn => format!(r#"<script src="{}"></script>"#, PLOTLY_CDN),
            // a literal closing tag inside the bundle would end the element early
            PlotlySource::Inline(bundle) => {
                format!("<script>\n{}\n</script>", bundle.replace("</script", "<\\/script"))
            }
        }
    }

    fn figure(view: &GraphView) -> Value {
        let nodes = &view.nodes;

        let trace = json!({
            "type": "scatter",
            "mode": "markers",
            "x": nodes.iter().map(|n| n.x).collect::<Vec<_>>(),
            "y": nodes.iter().map(|n| n.y).collect::<Vec<_>>(),
            "text": nodes.iter().map(|n| n.label.as_str()).collect::<Vec<_>>(),
            "hoverinfo": "text",
            "textposition": "top center",
            "marker": {
                "size": nodes.iter().map(|n| n.size).collect::<Vec<_>>(),
                "color": nodes.iter().map(|n| n.color_year).collect::<Vec<_>>(),
                "colorscale": view.colorscale,
                "colorbar": { "title": { "text": "Year" } },
            },
        });

        let arrows: Vec<Value> = view
            .edges
            .iter()
            .map(|edge| {
                let (from, to) = (&nodes[edge.from], &nodes[edge.to]);
                json!({
                    "ax": from.x,
                    "ay": from.y,
                    "axref": "x",
                    "ayref": "y",
                    "x": to.x,
                    "y": to.y,
                    "xref": "x",
                    "yref": "y",
                    "showarrow": true,
                    "arrowsize": 1,
                    "arrowwidth": 1,
                    "arrowhead": 2,
                    "opacity": 0.5,
                })
            })
            .collect();

        let axis = json!({
            "showline": false,
            "zeroline": false,
            "showgrid": false,
            "showticklabels": false,
            "title": { "text": "" },
        });

        let layout = json!({
            "title": { "text": view.title },
            "showlegend": false,
            "hovermode": "closest",
            "xaxis": axis,
            "yaxis": axis,
            "margin": { "l": 40, "r": 40, "b": 85, "t": 100, "pad": 0 },
            "annotations": arrows,
        });

        json!({ "data": [trace], "layout": layout })
    }
}

impl Renderer for HtmlRenderer {
    fn render(&self, view: &GraphView) -> Result<String> {
        let figure = serde_json::to_string(&Self::figure(view))?;
        // the figure is inlined in a <script>; labels carry markup
        let figure = figure.replace("</", "<\\/");

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
{plotly}
<style>html, body, #graph {{ width: 100%; height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="graph"></div>
<script>
const figure = {figure};
Plotly.newPlot("graph", figure.data, figure.layout, {{ responsive: true }});
</script>
</body>
</html>
"#,
            title = escape_html(&view.title),
            plotly = self.script_tag(),
            figure = figure,
        ))
    }

    fn name(&self) -> &str {
        "html"
    }
}
