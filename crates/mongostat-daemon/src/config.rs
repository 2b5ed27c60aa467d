//! Configuration for mongostat-daemon

use mongostat_collector::CycleConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::{DaemonError, DaemonResult};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// MongoDB connection and tracked collections
    #[serde(default)]
    pub mongodb: MongoConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Collection cycle configuration
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    /// Connection string
    #[serde(default = "default_uri")]
    pub uri: String,

    /// Database holding the tracked collections
    #[serde(default = "default_database")]
    pub database: String,

    /// Collections to report on
    #[serde(default)]
    pub collections: Vec<String>,

    /// Application name reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            database: default_database(),
            collections: Vec::new(),
            app_name: default_app_name(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// When collection cycles run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectMode {
    /// Background cycle every `interval_secs`
    #[default]
    Interval,
    /// One cycle per `/metrics` request
    OnScrape,
}

/// Collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Scheduling mode
    #[serde(default)]
    pub mode: CollectMode,

    /// Cycle interval in seconds (interval mode)
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Metric namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Enable `collStats` metrics
    #[serde(default = "default_true")]
    pub collection_stats: bool,

    /// Enable `$indexStats` metrics
    #[serde(default = "default_true")]
    pub index_usage: bool,

    /// Enable WiredTiger ticket metrics
    #[serde(default = "default_true")]
    pub storage_engine: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            mode: CollectMode::Interval,
            interval_secs: default_interval(),
            namespace: default_namespace(),
            collection_stats: true,
            index_usage: true,
            storage_engine: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "test".to_string()
}

fn default_app_name() -> String {
    "mongostat".to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9216))
}

fn default_interval() -> u64 {
    15
}

fn default_namespace() -> String {
    "mongodb".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `MONGOSTAT_<SECTION>__<KEY>` variables
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        // e.g. MONGOSTAT_MONGODB__URI, MONGOSTAT_COLLECTOR__INTERVAL_SECS
        builder = builder.add_source(
            config::Environment::with_prefix("MONGOSTAT")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("mongodb.collections")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Reject configurations that cannot produce any metrics
    pub fn validate(&self) -> DaemonResult<()> {
        if self.mongodb.database.trim().is_empty() {
            return Err(DaemonError::Config("mongodb.database must not be empty".into()));
        }
        if self.collector.namespace.trim().is_empty() {
            return Err(DaemonError::Config("collector.namespace must not be empty".into()));
        }
        if self.collector.interval_secs == 0 {
            return Err(DaemonError::Config("collector.interval_secs must be positive".into()));
        }
        let per_collection = self.collector.collection_stats || self.collector.index_usage;
        if per_collection && self.mongodb.collections.is_empty() {
            return Err(DaemonError::Config(
                "mongodb.collections must list at least one collection".into(),
            ));
        }
        if !per_collection && !self.collector.storage_engine {
            return Err(DaemonError::Config("every collector is disabled".into()));
        }
        Ok(())
    }

    /// What each collection cycle should fetch
    pub fn cycle_config(&self) -> CycleConfig {
        CycleConfig {
            database: self.mongodb.database.clone(),
            collections: self.mongodb.collections.clone(),
            collection_stats: self.collector.collection_stats,
            index_usage: self.collector.index_usage,
            storage_engine: self.collector.storage_engine,
        }
    }
}
