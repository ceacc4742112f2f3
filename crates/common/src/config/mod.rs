//! Configuration management for Citegraph
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use crate::errors::{AppError, Result};
use crate::models::{Direction, EdgeFilter};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Paper metadata service configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Local record cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Traversal configuration
    #[serde(default)]
    pub traversal: TraversalConfig,

    /// Rendering configuration
    #[serde(default)]
    pub render: RenderConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL; papers are requested from `{base_url}/paper/{id}`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent as `x-api-key`
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt on a transient status
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff interval in milliseconds (doubles each retry)
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// HTTP statuses treated as transient
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,

    /// Client-side request budget (0 = unlimited)
    #[serde(default)]
    pub requests_per_second: u32,

    /// User agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Directory holding one raw response file per paper
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Never touch the network; cache misses prune the branch
    #[serde(default)]
    pub offline: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TraversalConfig {
    /// Maximum expanded depth; nodes one level deeper become leaves
    #[serde(default = "default_depth")]
    pub depth: u32,

    /// Follow only edges flagged influential
    #[serde(default = "default_influential_only")]
    pub influential_only: bool,

    /// Which edge list to follow
    #[serde(default)]
    pub direction: Direction,

    /// Papers resolved concurrently within one frontier level
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Output path, `-` for stdout
    #[serde(default = "default_output")]
    pub output: String,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Smallest marker size
    #[serde(default = "default_min_size")]
    pub min_size: f64,

    /// Largest marker size
    #[serde(default = "default_max_size")]
    pub max_size: f64,

    /// Citation counts above this are clamped before rescaling
    #[serde(default = "default_size_threshold")]
    pub size_threshold: usize,

    /// Figure title
    #[serde(default = "default_title")]
    pub title: String,

    /// Plotly colorscale name for the year color bar
    #[serde(default = "default_colorscale")]
    pub colorscale: String,

    /// Local plotly.js bundle inlined into the HTML page. Without it the
    /// page loads plotly.js from the Plotly CDN when opened.
    #[serde(default)]
    pub plotly_js: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,
}

/// Rendered artifact format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Interactive Plotly page
    #[default]
    Html,
    /// Nodes, attributes, positions and edges as JSON
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}' (expected html or json)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Html => write!(f, "html"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

// Default value functions
fn default_base_url() -> String { "https://api.semanticscholar.org/v1".to_string() }
fn default_api_timeout() -> u64 { 30 }
fn default_max_retries() -> u32 { 5 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30_000 }
fn default_retry_statuses() -> Vec<u16> { vec![502, 503, 504] }
fn default_user_agent() -> String { format!("citegraph/{}", crate::VERSION) }
fn default_cache_dir() -> PathBuf { PathBuf::from("papers") }
fn default_depth() -> u32 { 2 }
fn default_influential_only() -> bool { true }
fn default_concurrency() -> usize { 1 }
fn default_output() -> String { "output.html".to_string() }
fn default_min_size() -> f64 { 10.0 }
fn default_max_size() -> f64 { 40.0 }
fn default_size_threshold() -> usize { 200 }
fn default_title() -> String { "Citations graph".to_string() }
fn default_colorscale() -> String { "Jet".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_api_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            retry_statuses: default_retry_statuses(),
            requests_per_second: 0,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            offline: false,
        }
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            influential_only: default_influential_only(),
            direction: Direction::default(),
            concurrency: default_concurrency(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            min_size: default_min_size(),
            max_size: default_max_size(),
            size_threshold: default_size_threshold(),
            title: default_title(),
            colorscale: default_colorscale(),
            plotly_js: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            traversal: TraversalConfig::default(),
            render: RenderConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment.
    ///
    /// With an explicit `path` only that file is read (it must exist);
    /// otherwise the optional `config/default`, `config/{APP_ENV}` and
    /// `config/local` files are layered in that order. The result is not
    /// validated here; callers apply their overrides first and then call
    /// [`AppConfig::validate`].
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::with_name(path));
            }
            None => {
                let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
                builder = builder
                    .add_source(File::with_name("config/default").required(false))
                    .add_source(File::with_name(&format!("config/{}", env)).required(false))
                    .add_source(File::with_name("config/local").required(false));
            }
        }

        // e.g., APP__TRAVERSAL__DEPTH=3
        let config = builder
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Reject configurations the crawler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::validation("api.base_url", "must not be empty"));
        }
        if self.cache.dir.as_os_str().is_empty() {
            return Err(AppError::validation("cache.dir", "must not be empty"));
        }
        if self.traversal.concurrency == 0 {
            return Err(AppError::validation("traversal.concurrency", "must be at least 1"));
        }
        if self.render.size_threshold == 0 {
            return Err(AppError::validation("render.size_threshold", "must be at least 1"));
        }
        if !(self.render.min_size.is_finite() && self.render.max_size.is_finite())
            || self.render.max_size < self.render.min_size
        {
            return Err(AppError::validation(
                "render.max_size",
                format!(
                    "size range [{}, {}] is not a valid interval",
                    self.render.min_size, self.render.max_size
                ),
            ));
        }
        Ok(())
    }

    /// The follow policy derived from `influential_only`
    pub fn edge_filter(&self) -> EdgeFilter {
        if self.traversal.influential_only {
            EdgeFilter::InfluentialOnly
        } else {
            EdgeFilter::All
        }
    }
}

impl ApiConfig {
    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.traversal.depth, 2);
        assert_eq!(config.api.max_retries, 5);
        assert_eq!(config.api.retry_statuses, vec![502, 503, 504]);
        assert_eq!(config.edge_filter(), EdgeFilter::InfluentialOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[traversal]
depth = 4
influential_only = false
direction = "references"

[render]
format = "json"
max_size = 60.0
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::load(Some(&path)).unwrap();

        assert_eq!(config.traversal.depth, 4);
        assert_eq!(config.traversal.direction, Direction::References);
        assert_eq!(config.edge_filter(), EdgeFilter::All);
        assert_eq!(config.render.format, OutputFormat::Json);
        assert_eq!(config.render.max_size, 60.0);
        // untouched sections keep their defaults
        assert_eq!(config.render.min_size, 10.0);
        assert_eq!(config.cache.dir, PathBuf::from("papers"));
    }

    #[test]
    fn test_load_leaves_validation_to_caller() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[traversal]\nconcurrency = 0").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let mut config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.traversal.concurrency, 0);
        assert!(config.validate().is_err());

        // an override applied after loading makes it valid
        config.traversal.concurrency = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_size_range() {
        let mut config = AppConfig::default();
        config.render.min_size = 50.0;
        config.render.max_size = 10.0;
        assert!(matches!(config.validate(), Err(AppError::Validation { .. })));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.traversal.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("HTML".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("svg".parse::<OutputFormat>().is_err());
    }
}
