//! Shared fixtures for daemon tests

use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongostat_collector::error::BoxError;
use mongostat_collector::{Cycle, CycleConfig, MetricsRegistry, StatsSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Answers every request with a fixed shop database; counts `collStats` calls
#[derive(Default)]
pub struct StaticSource {
    pub coll_stats_calls: AtomicU64,
}

#[async_trait]
impl StatsSource for StaticSource {
    async fn run_command(&self, _database: &str, command: Document) -> Result<Document, BoxError> {
        if command.contains_key("serverStatus") {
            return Ok(doc! {
                "wiredTiger": { "concurrentTransactions": {
                    "read": { "out": 0, "available": 128, "totalTickets": 128 },
                    "write": { "out": 0, "available": 64, "totalTickets": 128 },
                } }
            });
        }
        self.coll_stats_calls.fetch_add(1, Ordering::SeqCst);
        Ok(doc! {
            "count": 10,
            "size": 2048,
            "storageSize": 4096,
            "totalIndexSize": 512,
            "indexSizes": { "_id_": 256, "by_date": 256 },
        })
    }

    async fn aggregate(
        &self,
        _database: &str,
        _collection: &str,
        _pipeline: Vec<Document>,
    ) -> Result<Vec<Document>, BoxError> {
        Ok(vec![doc! { "name": "_id_", "accesses": { "ops": 42_i64 } }])
    }
}

pub fn seeded_source() -> Arc<StaticSource> {
    Arc::new(StaticSource::default())
}

pub fn test_cycle(source: Arc<StaticSource>) -> Arc<Cycle> {
    Arc::new(Cycle::new(
        source,
        Arc::new(MetricsRegistry::new().expect("registry")),
        CycleConfig::new("shop", vec!["orders".to_string()]),
    ))
}
