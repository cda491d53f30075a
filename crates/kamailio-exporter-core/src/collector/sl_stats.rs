//! `sl.stats`: stateless reply counters per code.

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch, int_or_zero, is_reply_code, members};
use crate::metrics::{MetricDesc, MetricSink};

const CODES: MetricDesc =
    MetricDesc::counter("kamailio_sl_stats_codes_total", "Per-code counters.", &["code"]);

struct SlStats;

pub(crate) fn factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(SlStats)
}

impl Collector for SlStats {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        for record in &fetch(rpc, "sl.stats", &[])? {
            for item in members(record).iter().filter(|i| is_reply_code(&i.key)) {
                sink.push(CODES, int_or_zero(&item.value) as f64, [item.key.as_str()]);
            }
        }
        Ok(())
    }
}
