//! `tm.stats`: transaction module counters.

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch, int_or_zero, is_reply_code, members};
use crate::metrics::{MetricDesc, MetricSink};

const CODES: MetricDesc =
    MetricDesc::counter("kamailio_tm_stats_codes_total", "Per-code counters.", &["code"]);

/// Non-code keys of the reply and the series they feed.
const FIELDS: &[(&str, MetricDesc)] = &[
    ("current", MetricDesc::gauge("kamailio_tm_stats_current", "Current transactions.", &[])),
    ("waiting", MetricDesc::gauge("kamailio_tm_stats_waiting", "Waiting transactions.", &[])),
    ("total", MetricDesc::counter("kamailio_tm_stats_total", "Total transactions.", &[])),
    (
        "total_local",
        MetricDesc::counter("kamailio_tm_stats_local_total", "Total local transactions.", &[]),
    ),
    (
        "rpl_received",
        MetricDesc::counter("kamailio_tm_stats_rpl_received_total", "Number of reply received.", &[]),
    ),
    (
        "rpl_generated",
        MetricDesc::counter("kamailio_tm_stats_rpl_generated_total", "Number of reply generated.", &[]),
    ),
    (
        "rpl_sent",
        MetricDesc::counter("kamailio_tm_stats_rpl_sent_total", "Number of reply sent.", &[]),
    ),
    ("created", MetricDesc::counter("kamailio_tm_stats_created_total", "Created transactions.", &[])),
    ("freed", MetricDesc::counter("kamailio_tm_stats_freed_total", "Freed transactions.", &[])),
    (
        "delayed_free",
        MetricDesc::counter("kamailio_tm_stats_delayed_free_total", "Delayed free transactions.", &[]),
    ),
];

struct TmStats;

pub(crate) fn factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(TmStats)
}

impl Collector for TmStats {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        for record in &fetch(rpc, "tm.stats", &[])? {
            for item in members(record) {
                let value = int_or_zero(&item.value) as f64;
                if is_reply_code(&item.key) {
                    sink.push(CODES, value, [item.key.as_str()]);
                } else if let Some((_, desc)) = FIELDS.iter().find(|(key, _)| *key == item.key) {
                    sink.push_plain(desc.clone(), value);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockRpc;
    use crate::metrics::MetricKind;

    #[test]
    fn codes_counters_and_gauges() {
        let mut rpc = MockRpc::minimal_kamailio();
        let mut sink = MetricSink::new();
        TmStats.update(&mut rpc, &mut sink).unwrap();

        // 5 code buckets + 10 named fields
        assert_eq!(sink.len(), 15);

        let codes: Vec<_> = sink
            .points()
            .iter()
            .filter(|p| p.desc.name == "kamailio_tm_stats_codes_total")
            .map(|p| (p.label_values[0].as_str(), p.value))
            .collect();
        assert_eq!(
            codes,
            vec![("6xx", 0.0), ("5xx", 3.0), ("4xx", 25.0), ("3xx", 0.0), ("2xx", 600.0)]
        );

        let current = sink
            .points()
            .iter()
            .find(|p| p.desc.name == "kamailio_tm_stats_current")
            .unwrap();
        assert_eq!(current.desc.kind, MetricKind::Gauge);
        assert_eq!(current.value, 9.0);

        let local = sink
            .points()
            .iter()
            .find(|p| p.desc.name == "kamailio_tm_stats_local_total")
            .unwrap();
        assert_eq!(local.desc.kind, MetricKind::Counter);
        assert_eq!(local.value, 12.0);
    }
}
