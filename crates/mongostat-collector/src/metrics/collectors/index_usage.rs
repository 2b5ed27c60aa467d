//! Index usage from `$indexStats`

use mongodb::bson::{doc, Document};
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Registry};
use tracing::debug;

use crate::decode;
use crate::error::{FetchError, Result};
use crate::metrics::instruments::{
    flush, register_gauge_vec, reset_matching, ExportGate, InstrumentSpec,
};
use crate::source::StatsSource;

// The server reports a cumulative counter; it is republished as-is, so the
// instrument is a gauge that is set rather than a counter that is incremented.
const INDEX_USAGE: InstrumentSpec = InstrumentSpec {
    subsystem: None,
    name: "index_usage_count",
    help: "Contains a usage count of the given index",
};

/// One `$indexStats` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUsage {
    /// Index name
    pub name: String,
    /// Operations that used the index since server start or index creation
    pub ops: u64,
}

impl IndexUsage {
    /// Decode `{ name, accesses: { ops, since } }`
    pub fn from_document(record: &Document) -> std::result::Result<Self, FetchError> {
        let name = decode::string(record, "name")?.to_string();
        let accesses = decode::document(record, "accesses")?;
        let ops = decode::count(accesses, "ops").map_err(|e| match e {
            FetchError::Decode { reason, .. } => {
                FetchError::decode(format!("{name}.accesses.ops"), reason)
            }
            other => other,
        })?;
        Ok(Self { name, ops })
    }
}

/// Index usage for one collection, in server order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexUsageSnapshot {
    /// Collection name, used as the `collection` label
    pub collection: String,
    /// Per-index operation counts
    pub items: Vec<IndexUsage>,
}

impl IndexUsageSnapshot {
    /// Decode the records returned by `[{ $indexStats: {} }]`
    pub fn from_documents(
        collection: &str,
        records: &[Document],
    ) -> std::result::Result<Self, FetchError> {
        Ok(Self {
            collection: collection.to_string(),
            items: records
                .iter()
                .map(IndexUsage::from_document)
                .collect::<std::result::Result<_, _>>()?,
        })
    }
}

/// Per-(collection, index) usage gauge
pub struct IndexUsageCollector {
    /// Cumulative operations per (collection, index)
    pub index_usage_count: GaugeVec,
    gate: ExportGate,
}

impl IndexUsageCollector {
    /// Create and register index usage metrics
    pub fn new(registry: &Registry, namespace: &str, gate: ExportGate) -> Result<Self> {
        Ok(Self {
            index_usage_count: register_gauge_vec(
                registry,
                namespace,
                INDEX_USAGE,
                &["collection", "index"],
            )?,
            gate,
        })
    }

    /// Run `$indexStats` on `database.collection`
    pub async fn fetch(
        source: &dyn StatsSource,
        database: &str,
        collection: &str,
    ) -> std::result::Result<IndexUsageSnapshot, FetchError> {
        let pipeline = vec![doc! { "$indexStats": {} }];
        let records = source
            .aggregate(database, collection, pipeline)
            .await
            .map_err(|e| FetchError::command("$indexStats", e))?;
        IndexUsageSnapshot::from_documents(collection, &records)
    }

    /// Replace the collection's usage series with the snapshot's absolute counts
    pub fn export(&self, snapshot: &IndexUsageSnapshot) -> Vec<MetricFamily> {
        let _guard = self.gate.export();
        let collection = snapshot.collection.as_str();

        reset_matching(&self.index_usage_count, "collection", collection);
        for item in &snapshot.items {
            self.index_usage_count
                .with_label_values(&[collection, item.name.as_str()])
                .set(item.ops as f64);
        }

        debug!(collection, indexes = snapshot.items.len(), "exported index usage");

        let instruments: [&dyn Collector; 1] = [&self.index_usage_count];
        flush(&instruments)
    }
}
