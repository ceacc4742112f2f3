//! Command-line arguments

use citegraph_common::config::OutputFormat;
use citegraph_common::{AppConfig, Direction, PaperId};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Crawl a citation graph from Semantic Scholar and render it", long_about = None)]
pub struct Args {
    /// Seed paper identifier (repeatable)
    #[arg(short = 'i', long = "id", required = true, num_args = 1..)]
    pub ids: Vec<String>,

    /// Expansion depth; papers one level deeper are kept as leaves
    #[arg(short = 'd', long)]
    pub depth: Option<u32>,

    /// Follow non-influential citations as well
    #[arg(long)]
    pub extended: bool,

    /// Follow references instead of citations
    #[arg(long)]
    pub references: bool,

    /// Directory holding cached responses
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Output file, `-` for stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output format (html or json)
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Local plotly.js bundle to inline into the HTML page
    #[arg(long)]
    pub plotly_js: Option<PathBuf>,

    /// Papers fetched concurrently per level
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Serve from the cache only
    #[arg(long)]
    pub offline: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,
}

impl Args {
    /// Override loaded configuration with the flags that were given
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(depth) = self.depth {
            config.traversal.depth = depth;
        }
        if self.extended {
            config.traversal.influential_only = false;
        }
        if self.references {
            config.traversal.direction = Direction::References;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = dir.clone();
        }
        if let Some(output) = &self.output {
            config.render.output = output.clone();
        }
        if let Some(format) = self.format {
            config.render.format = format;
        }
        if let Some(path) = &self.plotly_js {
            config.render.plotly_js = Some(path.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.traversal.concurrency = concurrency;
        }
        if self.offline {
            config.cache.offline = true;
        }
    }

    /// Seed ids, trimmed, empty entries dropped
    pub fn seeds(&self) -> Vec<PaperId> {
        self.ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(PaperId::from)
            .collect()
    }
}
