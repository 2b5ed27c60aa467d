//! One collection cycle: fetch every snapshot, then export the ones that arrived.
//!
//! Fetches for distinct collections run concurrently. Exports run one after
//! another once all fetches have settled, so a slow collection never holds
//! the export gate. A failed fetch is logged and skipped; whatever that
//! (collector, collection) pair exposed last time stays exposed.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::metrics::collectors::{
    CollectionStatsCollector, IndexUsageCollector, StorageEngineCollector,
};
use crate::metrics::MetricsRegistry;
use crate::source::StatsSource;

/// What a cycle collects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Database holding the tracked collections
    pub database: String,
    /// Collections to run `collStats` and `$indexStats` against
    #[serde(default)]
    pub collections: Vec<String>,
    /// Enable the collection statistics collector
    #[serde(default = "default_true")]
    pub collection_stats: bool,
    /// Enable the index usage collector
    #[serde(default = "default_true")]
    pub index_usage: bool,
    /// Enable the storage engine collector
    #[serde(default = "default_true")]
    pub storage_engine: bool,
}

impl CycleConfig {
    /// Track `collections` in `database` with every collector enabled
    pub fn new(database: impl Into<String>, collections: Vec<String>) -> Self {
        Self {
            database: database.into(),
            collections,
            collection_stats: true,
            index_usage: true,
            storage_engine: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Outcome counts of one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Snapshots fetched and exported
    pub exported: usize,
    /// Fetches that failed and were skipped
    pub failed: usize,
}

/// Drives fetch-then-export for all enabled collectors
pub struct Cycle {
    source: Arc<dyn StatsSource>,
    metrics: Arc<MetricsRegistry>,
    config: CycleConfig,
    running: Mutex<()>,
}

impl Cycle {
    pub fn new(
        source: Arc<dyn StatsSource>,
        metrics: Arc<MetricsRegistry>,
        config: CycleConfig,
    ) -> Self {
        Self {
            source,
            metrics,
            config,
            running: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Run one cycle. Concurrent callers are serialized.
    pub async fn run_once(&self) -> CycleReport {
        let _running = self.running.lock().await;
        let source = self.source.as_ref();
        let database = self.config.database.as_str();
        let mut report = CycleReport::default();

        let fetches = self.config.collections.iter().map(|collection| async move {
            let stats = if self.config.collection_stats {
                Some(CollectionStatsCollector::fetch(source, database, collection).await)
            } else {
                None
            };
            let usage = if self.config.index_usage {
                Some(IndexUsageCollector::fetch(source, database, collection).await)
            } else {
                None
            };
            (collection.as_str(), stats, usage)
        });
        let per_collection = join_all(fetches).await;

        let engine = if self.config.storage_engine {
            Some(StorageEngineCollector::fetch(source).await)
        } else {
            None
        };

        let collectors = self.metrics.mongo();
        for (collection, stats, usage) in per_collection {
            match stats {
                Some(Ok(snapshot)) => {
                    collectors.collection.export(&snapshot);
                    report.exported += 1;
                }
                Some(Err(e)) => report.record_failure("collection_stats", Some(collection), &e),
                None => {}
            }
            match usage {
                Some(Ok(snapshot)) => {
                    collectors.index_usage.export(&snapshot);
                    report.exported += 1;
                }
                Some(Err(e)) => report.record_failure("index_usage", Some(collection), &e),
                None => {}
            }
        }
        match engine {
            Some(Ok(snapshot)) => {
                collectors.storage_engine.export(&snapshot);
                report.exported += 1;
            }
            Some(Err(e)) => report.record_failure("storage_engine", None, &e),
            None => {}
        }

        debug!(
            exported = report.exported,
            failed = report.failed,
            "collection cycle finished"
        );
        report
    }
}

impl CycleReport {
    fn record_failure(&mut self, collector: &str, collection: Option<&str>, error: &FetchError) {
        self.failed += 1;
        warn!(
            collector,
            collection = collection.unwrap_or("-"),
            error = %error,
            "fetch failed, skipping export"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{gauge_value, series_count};
    use crate::source::fake::FakeSource;
    use mongodb::bson::doc;

    fn coll_stats(count: i32, indexes: &[&str]) -> mongodb::bson::Document {
        let mut sizes = mongodb::bson::Document::new();
        for index in indexes {
            sizes.insert(*index, 256_i32);
        }
        doc! {
            "count": count,
            "size": 2048_i32,
            "storageSize": 4096_i32,
            "totalIndexSize": 256_i32 * indexes.len() as i32,
            "indexSizes": sizes,
        }
    }

    fn seeded_source() -> Arc<FakeSource> {
        let source = Arc::new(FakeSource::new());
        for name in ["orders", "users"] {
            source.set_coll_stats(name, coll_stats(10, &["_id_"]));
            let usage = doc! { "name": "_id_", "accesses": { "ops": 42_i64 } };
            source.set_index_stats(name, vec![usage]);
        }
        source.set_server_status(doc! {
            "wiredTiger": { "concurrentTransactions": {
                "read": { "available": 128_i32 },
                "write": { "available": 64_i32 },
            } }
        });
        source
    }

    fn cycle(source: Arc<FakeSource>) -> Cycle {
        Cycle::new(
            source,
            Arc::new(MetricsRegistry::new().unwrap()),
            CycleConfig::new("shop", vec!["orders".to_string(), "users".to_string()]),
        )
    }

    fn objects(cycle: &Cycle, collection: &str) -> Option<f64> {
        gauge_value(
            &cycle.metrics().gather(),
            "mongodb_collection_objects_count",
            &[("collection", collection)],
        )
    }

    #[tokio::test]
    async fn test_cycle_exports_every_collector() {
        let cycle = cycle(seeded_source());

        let report = cycle.run_once().await;

        assert_eq!(report, CycleReport { exported: 5, failed: 0 });
        let families = cycle.metrics().gather();
        assert_eq!(objects(&cycle, "orders"), Some(10.0));
        assert_eq!(objects(&cycle, "users"), Some(10.0));
        assert_eq!(
            gauge_value(
                &families,
                "mongodb_index_usage_count",
                &[("collection", "users"), ("index", "_id_")]
            ),
            Some(42.0)
        );
        assert_eq!(gauge_value(&families, "mongodb_wiredtiger_write_tickets", &[]), Some(64.0));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_values_and_spares_others() {
        let source = seeded_source();
        let cycle = cycle(source.clone());
        cycle.run_once().await;

        source.set_coll_stats("orders", coll_stats(99, &["_id_"]));
        source.set_coll_stats("users", coll_stats(20, &["_id_"]));
        source.fail("orders");
        let report = cycle.run_once().await;

        assert_eq!(report.failed, 2);
        assert_eq!(objects(&cycle, "orders"), Some(10.0));
        assert_eq!(objects(&cycle, "users"), Some(20.0));

        source.recover("orders");
        cycle.run_once().await;
        assert_eq!(objects(&cycle, "orders"), Some(99.0));
    }

    #[tokio::test]
    async fn test_dropped_index_disappears_after_next_cycle() {
        let source = seeded_source();
        let cycle = cycle(source.clone());
        source.set_coll_stats("orders", coll_stats(10, &["_id_", "by_date"]));
        cycle.run_once().await;

        source.set_coll_stats("orders", coll_stats(10, &["_id_"]));
        cycle.run_once().await;

        let families = cycle.metrics().gather();
        let by_date = [("collection", "orders"), ("index", "by_date")];
        assert_eq!(gauge_value(&families, "mongodb_collection_index_size_bytes", &by_date), None);
    }

    #[tokio::test]
    async fn test_disabled_collectors_are_not_fetched() {
        let source = seeded_source();
        let mut config = CycleConfig::new("shop", vec!["orders".to_string()]);
        config.index_usage = false;
        config.storage_engine = false;
        let cycle = Cycle::new(source, Arc::new(MetricsRegistry::new().unwrap()), config);

        let report = cycle.run_once().await;

        assert_eq!(report, CycleReport { exported: 1, failed: 0 });
        let families = cycle.metrics().gather();
        assert_eq!(series_count(&families, "mongodb_wiredtiger_read_tickets"), 0);
        assert_eq!(series_count(&families, "mongodb_wiredtiger_write_tickets"), 0);
        assert_eq!(
            gauge_value(
                &families,
                "mongodb_index_usage_count",
                &[("collection", "orders"), ("index", "_id_")]
            ),
            None
        );
    }

    #[tokio::test]
    async fn test_failed_engine_fetch_exposes_no_ticket_series() {
        let source = seeded_source();
        source.set_server_status(doc! { "storageEngine": { "name": "inMemory" } });
        let cycle = cycle(source);

        let report = cycle.run_once().await;

        assert_eq!(report, CycleReport { exported: 4, failed: 1 });
        let output = cycle.metrics().export().unwrap();
        assert!(!output.contains("mongodb_wiredtiger_read_tickets"));
        assert!(!output.contains("mongodb_wiredtiger_write_tickets"));
        assert!(output.contains("mongodb_collection_objects_count"));
    }
}
