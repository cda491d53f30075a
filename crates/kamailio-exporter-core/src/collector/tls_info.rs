//! `tls.info`: TLS connection counts.

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch, int_or_zero};
use crate::metrics::{MetricDesc, MetricSink};

const OPENED: MetricDesc =
    MetricDesc::gauge("kamailio_tls_opened_connections", "TLS Opened Connections", &[]);
const MAX: MetricDesc =
    MetricDesc::gauge("kamailio_tls_max_connections", "TLS Opened Connections", &[]);
const WRITE_QUEUED: MetricDesc = MetricDesc::gauge(
    "kamailio_tls_clear_text_write_queued_bytes",
    "TLS Opened Connections",
    &[],
);

struct TlsInfo;

pub(crate) fn factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(TlsInfo)
}

impl Collector for TlsInfo {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        let records = fetch(rpc, "tls.info", &[])?;

        // Every record yields all three series; absent or non-integer fields read as 0.
        for record in &records {
            let field = |key: &str| record.get(key).map(int_or_zero).unwrap_or(0) as f64;
            sink.push_plain(OPENED, field("opened_connections"));
            sink.push_plain(MAX, field("max_connections"));
            sink.push_plain(WRITE_QUEUED, field("clear_text_write_queued_bytes"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockRpc;
    use crate::record::{Record, StructItem};
    use crate::session::ProtocolError;

    fn values(sink: &MetricSink) -> Vec<(String, f64)> {
        sink.points()
            .iter()
            .map(|p| (p.desc.name.to_string(), p.value))
            .collect()
    }

    #[test]
    fn reports_connection_counts() {
        let mut rpc = MockRpc::typical_kamailio();
        let mut sink = MetricSink::new();
        TlsInfo.update(&mut rpc, &mut sink).unwrap();
        assert_eq!(sink.len(), 3);
        let opened = sink
            .points()
            .iter()
            .find(|p| p.desc.name == "kamailio_tls_opened_connections")
            .unwrap();
        assert_eq!(opened.value, 4.0);
    }

    #[test]
    fn mistyped_field_reads_as_zero() {
        let mut rpc = MockRpc::new();
        rpc.add_reply(
            "tls.info",
            &[],
            vec![Record::Struct(vec![
                StructItem::new("max_connections", Record::String("x".into())),
                StructItem::new("opened_connections", Record::Int(4)),
                StructItem::new("clear_text_write_queued_bytes", Record::Int(0)),
            ])],
        );
        let mut sink = MetricSink::new();
        TlsInfo.update(&mut rpc, &mut sink).unwrap();
        assert_eq!(
            values(&sink),
            vec![
                ("kamailio_tls_opened_connections".to_string(), 4.0),
                ("kamailio_tls_max_connections".to_string(), 0.0),
                ("kamailio_tls_clear_text_write_queued_bytes".to_string(), 0.0),
            ]
        );
    }

    #[test]
    fn absent_fields_still_emit_every_series() {
        let mut rpc = MockRpc::new();
        rpc.add_reply(
            "tls.info",
            &[],
            vec![Record::Struct(vec![StructItem::new(
                "opened_connections",
                Record::Int(2),
            )])],
        );
        let mut sink = MetricSink::new();
        TlsInfo.update(&mut rpc, &mut sink).unwrap();
        assert_eq!(sink.len(), 3);
        assert_eq!(values(&sink)[0].1, 2.0);
        assert_eq!(values(&sink)[1].1, 0.0);
    }

    #[test]
    fn module_not_loaded_is_an_error() {
        let mut rpc = MockRpc::minimal_kamailio();
        let err = TlsInfo.update(&mut rpc, &mut MetricSink::new()).unwrap_err();
        assert!(matches!(
            err,
            CollectError::Protocol(ProtocolError::Fault { code: 500, .. })
        ));
    }
}
