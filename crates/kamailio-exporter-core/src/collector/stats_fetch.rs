//! `stats.fetch all`: core, shm, sl, tcp, tmx and dialog statistics plus
//! anything the routing script declares.

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch};
use crate::mapping::{STAT_MAPPINGS, StatTable, map_scripted, map_static};
use crate::metrics::MetricSink;

struct StatsFetch;

pub(crate) fn factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(StatsFetch)
}

impl Collector for StatsFetch {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        let table = StatTable::from_reply(&fetch(rpc, "stats.fetch", &["all"])?);
        if table.is_empty() {
            return Err(CollectError::NoData("no statistics in reply"));
        }
        map_static(&table, STAT_MAPPINGS, sink);
        map_scripted(&table, sink);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockRpc;
    use crate::metrics::MetricKind;
    use crate::record::Record;

    #[test]
    fn static_and_scripted_points() {
        let mut rpc = MockRpc::minimal_kamailio();
        let mut sink = MetricSink::new();
        StatsFetch.update(&mut rpc, &mut sink).unwrap();
        assert_eq!(rpc.calls(), &["stats.fetch all"]);

        let find = |name: &str, label: Option<&str>| {
            sink.points()
                .iter()
                .find(|p| p.desc.name == name && p.label_values.first().map(String::as_str) == label)
                .map(|p| p.value)
        };
        assert_eq!(find("kamailio_core_request_total", Some("fwd")), Some(42.0));
        assert_eq!(find("kamailio_core_rcv_request_total", Some("invite")), Some(310.0));
        assert_eq!(find("kamailio_shm_bytes", Some("total")), Some(67108864.0));
        assert_eq!(find("kamailio_shm_fragments", None), Some(117.0));
        assert_eq!(find("kamailio_tmx_type_total", Some("uas")), Some(640.0));
        assert_eq!(find("kamailio_dialog", Some("active_dialogs")), Some(14.0));
        assert_eq!(find("kamailio_tmx_type_total", Some("uac")), None);

        let queue = sink
            .points()
            .iter()
            .find(|p| p.desc.name == "kamailio_queue_depth")
            .unwrap();
        assert_eq!(queue.desc.kind, MetricKind::Gauge);
        assert_eq!(queue.value, 3.0);
    }

    #[test]
    fn reply_without_statistics_is_no_data() {
        let mut rpc = MockRpc::new();
        rpc.add_reply("stats.fetch", &["all"], vec![Record::Struct(Vec::new())]);
        let err = StatsFetch.update(&mut rpc, &mut MetricSink::new()).unwrap_err();
        assert!(err.is_no_data());
    }
}
