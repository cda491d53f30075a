//! `core.tcp_info`: TCP/TLS connection limits and reader count.

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch, int_or_zero, members};
use crate::metrics::{MetricDesc, MetricSink};

const READERS: MetricDesc = MetricDesc::gauge("kamailio_tcp_readers", "TCP readers", &[]);
const MAX_CONNECTIONS: MetricDesc =
    MetricDesc::gauge("kamailio_tcp_max_connections", "TCP connection limit", &[]);
const MAX_TLS_CONNECTIONS: MetricDesc =
    MetricDesc::gauge("kamailio_tls_max_connections", "TLS connection limit", &[]);
const TLS_CONNECTIONS: MetricDesc =
    MetricDesc::gauge("kamailio_tls_connections", "Opened TLS connections", &[]);

struct CoreTcpInfo;

pub(crate) fn factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(CoreTcpInfo)
}

impl Collector for CoreTcpInfo {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        let records = fetch(rpc, "core.tcp_info", &[])?;

        for item in members(&records[0]) {
            let desc = match item.key.as_str() {
                "readers" => READERS,
                "max_connections" => MAX_CONNECTIONS,
                "max_tls_connections" => MAX_TLS_CONNECTIONS,
                "opened_tls_connections" => TLS_CONNECTIONS,
                _ => continue,
            };
            sink.push_plain(desc, int_or_zero(&item.value) as f64);
        }
        Ok(())
    }
}
