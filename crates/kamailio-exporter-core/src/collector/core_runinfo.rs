//! `core.runinfo`: uptime, labelled with the running build.

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch, int_or_zero, str_or_empty};
use crate::metrics::{MetricDesc, MetricSink};

const UPTIME: MetricDesc = MetricDesc::gauge(
    "kamailio_core_uptime",
    "Uptime in seconds",
    &["version", "compiled", "compiler"],
);

struct CoreRuninfo;

pub(crate) fn factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(CoreRuninfo)
}

impl Collector for CoreRuninfo {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        let records = fetch(rpc, "core.runinfo", &[])?;
        let info = &records[0];
        let text = |key: &str| info.get(key).map(str_or_empty).unwrap_or_default();
        let uptime = info.get("uptime_secs").map(int_or_zero).unwrap_or_default();

        sink.push(
            UPTIME,
            uptime as f64,
            [text("version"), text("compiled"), text("compiler")],
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockRpc;

    #[test]
    fn uptime_with_build_labels() {
        let mut rpc = MockRpc::minimal_kamailio();
        let mut sink = MetricSink::new();
        CoreRuninfo.update(&mut rpc, &mut sink).unwrap();

        assert_eq!(sink.len(), 1);
        let p = &sink.points()[0];
        assert_eq!(p.value, 86400.0);
        assert_eq!(
            p.label_values,
            vec!["kamailio 5.7.4 (x86_64/linux)", "10:12:44 Jan 10 2024", "gcc 12.2.0"]
        );
    }
}
