//! Collection statistics

use mongodb::bson::{doc, Bson, Document};
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Registry};
use std::collections::BTreeMap;
use tracing::debug;

use crate::decode;
use crate::error::{FetchError, Result};
use crate::metrics::instruments::{
    flush, register_gauge_vec, reset_matching, ExportGate, InstrumentSpec,
};
use crate::source::StatsSource;

const SUBSYSTEM: Option<&str> = Some("collection");

const OBJECTS_COUNT: InstrumentSpec = InstrumentSpec {
    subsystem: SUBSYSTEM,
    name: "objects_count",
    help: "Contains a count of the number of objects (i.e. documents) in this collection",
};
const DATA_SIZE: InstrumentSpec = InstrumentSpec {
    subsystem: SUBSYSTEM,
    name: "data_size_bytes",
    help: "The total size in bytes of the uncompressed data held in this collection",
};
const STORAGE_SIZE: InstrumentSpec = InstrumentSpec {
    subsystem: SUBSYSTEM,
    name: "storage_size_bytes",
    help: "The total amount of storage allocated to this collection for document storage",
};
const TOTAL_INDEX_SIZE: InstrumentSpec = InstrumentSpec {
    subsystem: SUBSYSTEM,
    name: "total_index_size_bytes",
    help: "The total size of all indexes",
};
const INDEX_SIZE: InstrumentSpec = InstrumentSpec {
    subsystem: SUBSYSTEM,
    name: "index_size_bytes",
    help: "The individual size of an index",
};

/// Result of one `collStats` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSnapshot {
    /// Collection name, used as the `collection` label
    pub name: String,
    /// Number of documents
    pub object_count: u64,
    /// Uncompressed data size in bytes
    pub data_size: u64,
    /// Storage allocated for documents in bytes
    pub storage_size: u64,
    /// Sum of all index sizes in bytes
    pub total_index_size: u64,
    /// Index name to size in bytes
    pub index_sizes: BTreeMap<String, u64>,
}

impl CollectionSnapshot {
    /// Decode a `collStats` response for `name`
    pub fn from_document(
        name: &str,
        response: &Document,
    ) -> std::result::Result<Self, FetchError> {
        let index_sizes: BTreeMap<String, u64> = match response.get("indexSizes") {
            None | Some(Bson::Null) => BTreeMap::new(),
            Some(Bson::Document(sizes)) => sizes
                .iter()
                .map(|(index, size)| {
                    decode::to_count(size, &format!("indexSizes.{index}"))
                        .map(|size| (index.clone(), size))
                })
                .collect::<std::result::Result<_, _>>()?,
            Some(_) => return Err(FetchError::decode("indexSizes", "expected a document")),
        };

        Ok(Self {
            name: name.to_string(),
            object_count: decode::count(response, "count")?,
            data_size: decode::count(response, "size")?,
            storage_size: decode::count(response, "storageSize")?,
            total_index_size: decode::count(response, "totalIndexSize")?,
            index_sizes,
        })
    }
}

/// Per-collection size and count gauges
pub struct CollectionStatsCollector {
    /// Documents per collection
    pub objects_count: GaugeVec,
    /// Uncompressed data size per collection
    pub data_size_bytes: GaugeVec,
    /// Allocated storage per collection
    pub storage_size_bytes: GaugeVec,
    /// Total index size per collection
    pub total_index_size_bytes: GaugeVec,
    /// Size per (collection, index)
    pub index_size_bytes: GaugeVec,
    gate: ExportGate,
}

impl CollectionStatsCollector {
    /// Create and register collection metrics
    pub fn new(registry: &Registry, namespace: &str, gate: ExportGate) -> Result<Self> {
        let per_collection = ["collection"];
        Ok(Self {
            objects_count: register_gauge_vec(registry, namespace, OBJECTS_COUNT, &per_collection)?,
            data_size_bytes: register_gauge_vec(registry, namespace, DATA_SIZE, &per_collection)?,
            storage_size_bytes: register_gauge_vec(
                registry,
                namespace,
                STORAGE_SIZE,
                &per_collection,
            )?,
            total_index_size_bytes: register_gauge_vec(
                registry,
                namespace,
                TOTAL_INDEX_SIZE,
                &per_collection,
            )?,
            index_size_bytes: register_gauge_vec(
                registry,
                namespace,
                INDEX_SIZE,
                &["collection", "index"],
            )?,
            gate,
        })
    }

    /// Run `collStats` with byte scale against `database.collection`
    pub async fn fetch(
        source: &dyn StatsSource,
        database: &str,
        collection: &str,
    ) -> std::result::Result<CollectionSnapshot, FetchError> {
        let command = doc! { "collStats": collection, "scale": 1 };
        let response = source
            .run_command(database, command)
            .await
            .map_err(|e| FetchError::command("collStats", e))?;
        CollectionSnapshot::from_document(collection, &response)
    }

    /// Replace everything exposed for the snapshot's collection, then flush
    pub fn export(&self, snapshot: &CollectionSnapshot) -> Vec<MetricFamily> {
        let _guard = self.gate.export();
        let name = snapshot.name.as_str();

        for vec in self.instruments() {
            reset_matching(vec, "collection", name);
        }

        self.objects_count
            .with_label_values(&[name])
            .set(snapshot.object_count as f64);
        self.data_size_bytes
            .with_label_values(&[name])
            .set(snapshot.data_size as f64);
        self.storage_size_bytes
            .with_label_values(&[name])
            .set(snapshot.storage_size as f64);
        self.total_index_size_bytes
            .with_label_values(&[name])
            .set(snapshot.total_index_size as f64);
        for (index, size) in &snapshot.index_sizes {
            self.index_size_bytes
                .with_label_values(&[name, index.as_str()])
                .set(*size as f64);
        }

        debug!(
            collection = name,
            indexes = snapshot.index_sizes.len(),
            "exported collection stats"
        );

        let instruments: [&dyn Collector; 5] = [
            &self.objects_count,
            &self.data_size_bytes,
            &self.storage_size_bytes,
            &self.total_index_size_bytes,
            &self.index_size_bytes,
        ];
        flush(&instruments)
    }

    fn instruments(&self) -> [&GaugeVec; 5] {
        [
            &self.objects_count,
            &self.data_size_bytes,
            &self.storage_size_bytes,
            &self.total_index_size_bytes,
            &self.index_size_bytes,
        ]
    }
}
