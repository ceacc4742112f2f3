//! Citegraph Common Library
//!
//! Shared code for the citation graph crawler including:
//! - Paper data model and payload decoding
//! - Paper source client with retry and rate limiting
//! - On-disk record cache
//! - Error types and handling
//! - Configuration management
//! - Metrics descriptions

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use cache::DiskCache;
pub use client::{create_source, MockPaperSource, PaperSource};
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use models::{CitationEdge, Direction, EdgeFilter, PaperId, PaperRecord};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
