//! Citegraph crawler
//!
//! Builds the citation neighbourhood of one or more seed papers:
//! - Breadth-first traversal over the Semantic Scholar paper API
//! - Raw responses cached on disk, one file per paper
//! - Directed graph with per-node labels, sizes and years
//! - Layered layout rendered as a Plotly page or JSON

mod cli;
mod graph;
mod render;
mod store;
mod traversal;

#[cfg(test)]
mod testing;

use anyhow::Context;
use clap::Parser;
use citegraph_common::{create_source, metrics, AppConfig, DiskCache, VERSION};
use graph::{layered, DirectedGraph, NodeAttributes, SizeScale};
use render::{renderer_for, write_output, GraphView};
use std::time::Instant;
use store::RecordStore;
use tracing::info;
use tracing_subscriber::EnvFilter;
use traversal::{crawl, TraversalOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = cli::Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_tracing(&config);
    metrics::register_metrics();

    info!("Starting Citegraph v{}", VERSION);

    let seeds = args.seeds();
    let started = Instant::now();
    let renderer = renderer_for(&config.render)?;

    let cache = DiskCache::open(&config.cache.dir).await?;
    let source = create_source(&config)?;
    info!(
        cache_dir = %cache.dir().display(),
        source = source.name(),
        offline = config.cache.offline,
        "Record store ready"
    );
    let store = RecordStore::new(cache, source);

    let options = TraversalOptions::from(&config);
    let nodes = crawl(&store, &seeds, &options).await?;

    let graph = DirectedGraph::build(&nodes);
    let attributes = NodeAttributes::compute(&nodes, &SizeScale::from(&config.render));
    let positions = layered(&nodes, &graph);
    let view = GraphView::assemble(&nodes, &graph, &attributes, &positions, &config.render)?;

    write_output(renderer.as_ref(), &view, &config.render.output)
        .with_context(|| format!("Failed to write {}", config.render.output))?;

    let stats = store.stats();
    info!(
        nodes = graph.node_count(),
        leaves = nodes.leaf_count(),
        edges = graph.edge_count(),
        pruned = nodes.pruned().len(),
        fetches = stats.fetches,
        cache_hits = stats.cache_hits,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Crawl complete"
    );

    Ok(())
}

/// Logs go to stderr so the rendered graph can be written to stdout
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
