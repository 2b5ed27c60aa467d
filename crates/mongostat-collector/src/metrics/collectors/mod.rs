//! Metric collectors for MongoDB statistics

pub mod collection;
pub mod index_usage;
pub mod storage_engine;

use prometheus::Registry;

use super::instruments::ExportGate;
use crate::error::Result;

pub use collection::{CollectionSnapshot, CollectionStatsCollector};
pub use index_usage::{IndexUsage, IndexUsageCollector, IndexUsageSnapshot};
pub use storage_engine::{EngineSnapshot, StorageEngineCollector, TicketInfo};

/// All collectors combined
pub struct MongoMetrics {
    /// `collStats` gauges
    pub collection: CollectionStatsCollector,
    /// `$indexStats` gauges
    pub index_usage: IndexUsageCollector,
    /// WiredTiger ticket gauges
    pub storage_engine: StorageEngineCollector,
}

impl MongoMetrics {
    /// Create all collectors and register their instruments
    pub fn new(registry: &Registry, namespace: &str, gate: &ExportGate) -> Result<Self> {
        Ok(Self {
            collection: CollectionStatsCollector::new(registry, namespace, gate.clone())?,
            index_usage: IndexUsageCollector::new(registry, namespace, gate.clone())?,
            storage_engine: StorageEngineCollector::new(registry, namespace, gate.clone())?,
        })
    }
}
