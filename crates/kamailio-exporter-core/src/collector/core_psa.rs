//! `core.psa`: one status series per Kamailio process.

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch, int_or_zero, str_or_empty};
use crate::metrics::{MetricDesc, MetricSink};

const PROCESS_STATUS: MetricDesc = MetricDesc::gauge(
    "kamailio_core_process_status",
    "Status of each process running in Kamailio",
    &["index", "pid", "rank", "description"],
);

struct CorePsa;

pub(crate) fn factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(CorePsa)
}

impl Collector for CorePsa {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        for record in &fetch(rpc, "core.psa", &[])? {
            let int = |key: &str| record.get(key).map(int_or_zero).unwrap_or_default();
            let description = record.get("description").map(str_or_empty).unwrap_or_default();
            sink.push(
                PROCESS_STATUS,
                int("status") as f64,
                [
                    int("index").to_string(),
                    int("pid").to_string(),
                    int("rank").to_string(),
                    description.to_string(),
                ],
            );
        }
        Ok(())
    }
}
