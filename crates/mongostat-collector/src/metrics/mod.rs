//! Metrics collection and export
//!
//! Each collector owns a fixed set of instruments registered once in a shared
//! [`prometheus::Registry`]. Exports only change label value combinations.

pub mod collectors;
pub mod exporter;
pub mod instruments;
pub mod registry;

pub use collectors::MongoMetrics;
pub use exporter::{encode_text, TEXT_CONTENT_TYPE};
pub use instruments::{ExportGate, InstrumentSpec};
pub use registry::MetricsRegistry;
