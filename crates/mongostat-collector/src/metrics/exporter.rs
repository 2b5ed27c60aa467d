//! Metrics exporter for Prometheus scraping

use prometheus::proto::MetricFamily;
use prometheus::{Encoder, TextEncoder};

use crate::error::Result;

/// Content type of the text exposition format
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Encode metric families in Prometheus text format
pub fn encode_text(families: &[MetricFamily]) -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Gauge, Registry};

    #[test]
    fn test_encode_text() {
        let registry = Registry::new();
        let gauge =
            Gauge::new("mongodb_wiredtiger_read_tickets", "Available read tickets").unwrap();
        registry.register(Box::new(gauge.clone())).unwrap();
        gauge.set(128.0);

        let output = encode_text(&registry.gather()).unwrap();
        assert!(output.contains("# TYPE mongodb_wiredtiger_read_tickets gauge"));
        assert!(output.contains("mongodb_wiredtiger_read_tickets 128"));
    }
}
