// Run configuration resolved from command line options

use sitemapper_scanner::{DEFAULT_CONCURRENCY, EvictionPolicy, PageUrl};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid target URL '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("Unknown map type '{0}' (expected 'hash' or 'tree')")]
    UnknownMapType(String),

    #[error("Unknown output format '{0}' (expected 'json' or 'xml')")]
    UnknownFormat(String),

    #[error("Worker count must be at least 1")]
    ZeroWorkers,

    #[error("Request timeout must be at least 1 second")]
    ZeroTimeout,
}

/// Which projection of the crawl gets written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapType {
    /// Adjacency list of every known page.
    #[default]
    Hash,
    /// Rooted page tree starting at the entry page.
    Tree,
}

impl FromStr for MapType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hash" => Ok(MapType::Hash),
            "tree" => Ok(MapType::Tree),
            _ => Err(ConfigError::UnknownMapType(s.to_string())),
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapType::Hash => write!(f, "hash"),
            MapType::Tree => write!(f, "tree"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Xml,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "xml" => Ok(OutputFormat::Xml),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Raw options as they arrive from the command line.
#[derive(Debug, Clone)]
pub struct ConfigOptions {
    pub target: String,
    pub filename: Option<String>,
    pub map_type: String,
    pub format: String,
    pub verbose: bool,
    pub parallel: bool,
    pub workers: Option<usize>,
    pub timeout_secs: u64,
    pub deadline_secs: Option<u64>,
    pub keep_evicted: bool,
}

impl ConfigOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            filename: None,
            map_type: MapType::default().to_string(),
            format: OutputFormat::default().to_string(),
            verbose: false,
            parallel: false,
            workers: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            deadline_secs: None,
            keep_evicted: false,
        }
    }
}

/// Validated configuration for one crawl run.
#[derive(Debug, Clone)]
pub struct Config {
    pub target: PageUrl,
    pub filename: String,
    pub map_type: MapType,
    pub format: OutputFormat,
    pub concurrency: usize,
    pub verbose: bool,
    pub timeout: Duration,
    pub deadline: Option<Duration>,
    pub eviction: EvictionPolicy,
}

impl Config {
    pub fn new(options: ConfigOptions) -> Result<Self, ConfigError> {
        let target = PageUrl::parse_request_uri(&options.target).map_err(|e| {
            ConfigError::InvalidTarget {
                target: options.target.clone(),
                reason: e.to_string(),
            }
        })?;

        let map_type: MapType = options.map_type.parse()?;
        let format: OutputFormat = options.format.parse()?;

        if options.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let concurrency = resolve_concurrency(options.workers, options.parallel)?;

        let base = match options.filename.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => target.host().unwrap_or("sitemap").to_string(),
        };
        let filename = format_filename(&base, format);

        let eviction = if options.keep_evicted {
            EvictionPolicy::Retain
        } else {
            EvictionPolicy::Prune
        };

        debug!(
            "Resolved config: target={}, file={}, map={}, concurrency={}",
            target, filename, map_type, concurrency
        );

        Ok(Self {
            target,
            filename,
            map_type,
            format,
            concurrency,
            verbose: options.verbose,
            timeout: Duration::from_secs(options.timeout_secs),
            deadline: options.deadline_secs.map(Duration::from_secs),
            eviction,
        })
    }
}

/// `--workers` wins, then `--parallel` (logical CPUs), else the default pool.
pub fn resolve_concurrency(workers: Option<usize>, parallel: bool) -> Result<usize, ConfigError> {
    match workers {
        Some(0) => Err(ConfigError::ZeroWorkers),
        Some(n) => Ok(n),
        None if parallel => Ok(num_cpus::get().max(1)),
        None => Ok(DEFAULT_CONCURRENCY),
    }
}

pub fn format_filename(name: &str, format: OutputFormat) -> String {
    format!("{}.{}", name, format.extension())
}
