//! Instrument registration shared by all collectors

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts, Registry};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;

/// Static descriptor of one instrument
#[derive(Debug, Clone, Copy)]
pub struct InstrumentSpec {
    /// Optional subsystem placed between namespace and name
    pub subsystem: Option<&'static str>,
    /// Metric name within the subsystem
    pub name: &'static str,
    /// Help text
    pub help: &'static str,
}

impl InstrumentSpec {
    fn opts(&self, namespace: &str) -> Opts {
        let opts = Opts::new(self.name, self.help).namespace(namespace);
        match self.subsystem {
            Some(subsystem) => opts.subsystem(subsystem),
            None => opts,
        }
    }
}

/// Create and register a gauge vec.
///
/// With no `labels` the vec holds at most one series, created on first set.
pub fn register_gauge_vec(
    registry: &Registry,
    namespace: &str,
    spec: InstrumentSpec,
    labels: &[&str],
) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(spec.opts(namespace), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Remove every child of `vec` whose `label` equals `value`.
///
/// Used to clear a single entity (one collection) without touching the
/// series other entities have exposed through the same instrument.
pub fn reset_matching(vec: &GaugeVec, label: &str, value: &str) {
    for family in vec.collect() {
        for metric in family.get_metric() {
            let labels: HashMap<&str, &str> = metric
                .get_label()
                .iter()
                .map(|pair| (pair.get_name(), pair.get_value()))
                .collect();
            if labels.get(label) == Some(&value) {
                // Only fails if the child vanished, which the gate rules out.
                let _ = vec.remove(&labels);
            }
        }
    }
}

/// Flush a set of instruments into metric families
pub fn flush(instruments: &[&dyn Collector]) -> Vec<MetricFamily> {
    instruments.iter().flat_map(|c| c.collect()).collect()
}

/// Serializes exports against each other and against scrapes.
///
/// Exports hold the write side for the whole reset-then-set sequence; a
/// gather holds the read side, so it only ever sees complete exports.
#[derive(Debug, Clone, Default)]
pub struct ExportGate {
    lock: Arc<RwLock<()>>,
}

impl ExportGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn export(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write()
    }

    pub(crate) fn scrape(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read()
    }
}
