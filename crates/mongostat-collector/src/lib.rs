//! mongostat collectors
//!
//! Turns MongoDB administrative statistics into Prometheus gauges.
//!
//! ## Collectors
//!
//! - **Collection statistics**: `collStats` document counts and sizes, per collection and per index
//! - **Index usage**: `$indexStats` operation counts per (collection, index)
//! - **Storage engine**: WiredTiger read/write tickets still available
//!
//! Every collector splits its work into `fetch` (talk to the database, build a
//! snapshot) and `export` (reset the entity's series, set new values, flush).
//! A failed fetch never reaches `export`, so the previously exported values
//! stay in place until the next successful cycle.
//!
//! ```no_run
//! # async fn run(client: mongodb::Client) -> mongostat_collector::error::Result<()> {
//! use mongostat_collector::{Cycle, CycleConfig, MetricsRegistry};
//! use std::sync::Arc;
//!
//! let metrics = Arc::new(MetricsRegistry::new()?);
//! let cycle = Cycle::new(
//!     Arc::new(client),
//!     metrics.clone(),
//!     CycleConfig::new("shop", vec!["orders".to_string()]),
//! );
//! cycle.run_once().await;
//! println!("{}", metrics.export()?);
//! # Ok(())
//! # }
//! ```

pub mod cycle;
mod decode;
pub mod error;
pub mod metrics;
pub mod source;

pub use cycle::{Cycle, CycleConfig, CycleReport};
pub use error::{CollectorError, FetchError};
pub use metrics::collectors::{
    CollectionSnapshot, CollectionStatsCollector, EngineSnapshot, IndexUsage, IndexUsageCollector,
    IndexUsageSnapshot, StorageEngineCollector, TicketInfo,
};
pub use metrics::{MetricsRegistry, MongoMetrics};
pub use source::StatsSource;
