//! Central metrics registry

use prometheus::proto::MetricFamily;
use prometheus::Registry;

use super::collectors::MongoMetrics;
use super::exporter::encode_text;
use super::instruments::ExportGate;
use crate::error::Result;

/// Default metric namespace
pub const DEFAULT_NAMESPACE: &str = "mongodb";

/// Registry holding every collector's instruments
pub struct MetricsRegistry {
    registry: Registry,
    gate: ExportGate,
    mongo_metrics: MongoMetrics,
}

impl MetricsRegistry {
    /// Create a registry with the default `mongodb` namespace
    pub fn new() -> Result<Self> {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    /// Create a registry whose instruments live under `namespace`
    pub fn with_namespace(namespace: &str) -> Result<Self> {
        let registry = Registry::new();
        let gate = ExportGate::new();
        let mongo_metrics = MongoMetrics::new(&registry, namespace, &gate)?;

        Ok(Self {
            registry,
            gate,
            mongo_metrics,
        })
    }

    /// Get the collectors
    pub fn mongo(&self) -> &MongoMetrics {
        &self.mongo_metrics
    }

    /// Gather all families; waits for any in-flight export to finish
    pub fn gather(&self) -> Vec<MetricFamily> {
        let _guard = self.gate.scrape();
        self.registry.gather()
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String> {
        encode_text(&self.gather())
    }

    /// Get the underlying registry for custom metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
