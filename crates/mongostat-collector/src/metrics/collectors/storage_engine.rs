//! WiredTiger concurrency tickets

use mongodb::bson::{doc, Document};
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Registry};

use crate::decode;
use crate::error::{FetchError, Result};
use crate::metrics::instruments::{flush, register_gauge_vec, ExportGate, InstrumentSpec};
use crate::source::StatsSource;

const READ_TICKETS: InstrumentSpec = InstrumentSpec {
    subsystem: Some("wiredtiger"),
    name: "read_tickets",
    help: "Available concurrent read operation tickets by the WiredTiger storage engine",
};
const WRITE_TICKETS: InstrumentSpec = InstrumentSpec {
    subsystem: Some("wiredtiger"),
    name: "write_tickets",
    help: "Available concurrent write operation tickets by the WiredTiger storage engine",
};

/// Ticket accounting for one operation kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketInfo {
    /// Tickets currently held
    pub out: u64,
    /// Tickets that can still be handed out
    pub available: u64,
    /// Configured ticket pool size
    pub total_tickets: u64,
}

impl TicketInfo {
    fn from_document(doc: &Document) -> std::result::Result<Self, FetchError> {
        Ok(Self {
            out: decode::count(doc, "out")?,
            available: decode::count(doc, "available")?,
            total_tickets: decode::count(doc, "totalTickets")?,
        })
    }
}

/// `wiredTiger.concurrentTransactions` at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSnapshot {
    pub read: TicketInfo,
    pub write: TicketInfo,
}

impl EngineSnapshot {
    /// Decode the `wiredTiger` sub-document of a `serverStatus` response
    pub fn from_wired_tiger(wired_tiger: &Document) -> std::result::Result<Self, FetchError> {
        let transactions = decode::document(wired_tiger, "concurrentTransactions")?;
        Ok(Self {
            read: TicketInfo::from_document(decode::document(transactions, "read")?)?,
            write: TicketInfo::from_document(decode::document(transactions, "write")?)?,
        })
    }
}

/// Global read/write ticket gauges.
///
/// Both are label-less vecs: the single series only exists once a snapshot
/// has been exported, so a server that never answered reports nothing
/// instead of zero available tickets.
pub struct StorageEngineCollector {
    /// Available read tickets
    pub read_tickets: GaugeVec,
    /// Available write tickets
    pub write_tickets: GaugeVec,
    gate: ExportGate,
}

impl StorageEngineCollector {
    /// Create and register storage engine metrics
    pub fn new(registry: &Registry, namespace: &str, gate: ExportGate) -> Result<Self> {
        Ok(Self {
            read_tickets: register_gauge_vec(registry, namespace, READ_TICKETS, &[])?,
            write_tickets: register_gauge_vec(registry, namespace, WRITE_TICKETS, &[])?,
            gate,
        })
    }

    /// Run `serverStatus` and decode its `wiredTiger` section.
    ///
    /// Deployments that already fetch `serverStatus` should call
    /// [`EngineSnapshot::from_wired_tiger`] on their own response instead.
    pub async fn fetch(
        source: &dyn StatsSource,
    ) -> std::result::Result<EngineSnapshot, FetchError> {
        let response = source
            .run_command("admin", doc! { "serverStatus": 1 })
            .await
            .map_err(|e| FetchError::command("serverStatus", e))?;
        EngineSnapshot::from_wired_tiger(decode::document(&response, "wiredTiger")?)
    }

    /// Set both ticket gauges. There are no labels, so nothing can go stale.
    pub fn export(&self, snapshot: &EngineSnapshot) -> Vec<MetricFamily> {
        let _guard = self.gate.export();

        self.read_tickets
            .with_label_values(&[])
            .set(snapshot.read.available as f64);
        self.write_tickets
            .with_label_values(&[])
            .set(snapshot.write.available as f64);

        let instruments: [&dyn Collector; 2] = [&self.read_tickets, &self.write_tickets];
        flush(&instruments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::gauge_value;
    use crate::source::fake::FakeSource;

    fn wired_tiger(read: i32, write: i32) -> Document {
        doc! {
            "concurrentTransactions": {
                "write": { "out": 0_i32, "available": write, "totalTickets": 128_i32 },
                "read": { "out": 1_i32, "available": read, "totalTickets": 128_i32 },
            }
        }
    }

    fn collector(registry: &Registry) -> StorageEngineCollector {
        StorageEngineCollector::new(registry, "mongodb", ExportGate::new()).unwrap()
    }

    #[test]
    fn test_export_sets_ticket_gauges() {
        let registry = Registry::new();
        let collector = collector(&registry);
        let snapshot = EngineSnapshot::from_wired_tiger(&wired_tiger(128, 64)).unwrap();

        let families = collector.export(&snapshot);

        assert_eq!(families.len(), 2);
        let read = gauge_value(&families, "mongodb_wiredtiger_read_tickets", &[]);
        let write = gauge_value(&families, "mongodb_wiredtiger_write_tickets", &[]);
        assert_eq!(read, Some(128.0));
        assert_eq!(write, Some(64.0));
        assert_eq!(registry.gather().len(), 2);
    }

    #[test]
    fn test_no_series_before_first_export() {
        let registry = Registry::new();
        let _collector = collector(&registry);

        assert!(registry.gather().is_empty());
    }

    #[test]
    fn test_export_overwrites_previous_reading() {
        let registry = Registry::new();
        let collector = collector(&registry);
        collector.export(&EngineSnapshot::from_wired_tiger(&wired_tiger(128, 64)).unwrap());

        collector.export(&EngineSnapshot::from_wired_tiger(&wired_tiger(3, 0)).unwrap());

        let families = registry.gather();
        let read = families
            .iter()
            .find(|f| f.get_name() == "mongodb_wiredtiger_read_tickets")
            .unwrap();
        assert_eq!(read.get_metric().len(), 1);
        assert_eq!(read.get_metric()[0].get_gauge().get_value(), 3.0);
    }

    #[test]
    fn test_decode_keeps_full_ticket_info() {
        let snapshot = EngineSnapshot::from_wired_tiger(&wired_tiger(127, 128)).unwrap();
        assert_eq!(
            snapshot.read,
            TicketInfo {
                out: 1,
                available: 127,
                total_tickets: 128
            }
        );
    }

    #[test]
    fn test_decode_requires_concurrent_transactions() {
        let err = EngineSnapshot::from_wired_tiger(&doc! { "cache": {} }).unwrap_err();
        assert!(err.to_string().contains("concurrentTransactions"));
    }

    #[tokio::test]
    async fn test_fetch_extracts_wired_tiger_section() {
        let source = FakeSource::new();
        source.set_server_status(doc! { "ok": 1.0, "wiredTiger": wired_tiger(10, 20) });

        let snapshot = StorageEngineCollector::fetch(&source).await.unwrap();
        assert_eq!(snapshot.read.available, 10);
        assert_eq!(snapshot.write.available, 20);
    }

    #[tokio::test]
    async fn test_fetch_without_wired_tiger_fails() {
        let source = FakeSource::new();
        source.set_server_status(doc! { "ok": 1.0, "storageEngine": { "name": "inMemory" } });

        assert!(matches!(
            StorageEngineCollector::fetch(&source).await,
            Err(FetchError::Decode { .. })
        ));
    }
}
