//! `rtpengine.show all`: reachability of each configured rtpengine.

use tracing::{debug, error};

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch, int_or_zero, members, str_or_empty};
use crate::metrics::{MetricDesc, MetricSink};

const ENABLED: MetricDesc = MetricDesc::gauge(
    "kamailio_rtpengine_enabled",
    "rtpengine connection status",
    &["url", "set", "index", "weight"],
);

struct Rtpengine;

pub(crate) fn factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(Rtpengine)
}

impl Collector for Rtpengine {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        let records = fetch(rpc, "rtpengine.show", &["all"])?;

        let mut non_empty = 0;
        for record in &records {
            if members(record).is_empty() {
                // rtpengine module loaded but no instance configured or enabled
                debug!("rtpengine.show all returned an empty record");
                continue;
            }
            non_empty += 1;

            let url = record.get("url").map(str_or_empty).unwrap_or_default();
            if url.is_empty() {
                error!("rtpengine record without url, skipping");
                continue;
            }
            let int = |key: &str| record.get(key).map(int_or_zero).unwrap_or_default();
            let enabled = if int("disabled") == 1 { 0.0 } else { 1.0 };

            sink.push(
                ENABLED,
                enabled,
                [
                    url.to_string(),
                    int("set").to_string(),
                    int("index").to_string(),
                    int("weight").to_string(),
                ],
            );
        }

        if non_empty == 0 {
            return Err(CollectError::NoData("no rtpengine instance"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockRpc;
    use crate::record::{Record, StructItem};

    #[test]
    fn disabled_flag_is_inverted() {
        let mut rpc = MockRpc::typical_kamailio();
        let mut sink = MetricSink::new();
        Rtpengine.update(&mut rpc, &mut sink).unwrap();

        let got: Vec<_> = sink
            .points()
            .iter()
            .map(|p| (p.label_values.clone(), p.value))
            .collect();
        assert_eq!(
            got,
            vec![
                (vec!["udp:127.0.0.1:2223".to_string(), "0".into(), "0".into(), "1".into()], 1.0),
                (vec!["udp:10.0.0.20:2223".to_string(), "0".into(), "1".into(), "1".into()], 0.0),
            ]
        );
    }

    #[test]
    fn only_empty_records_is_no_data() {
        let mut rpc = MockRpc::new();
        rpc.add_reply("rtpengine.show", &["all"], vec![Record::Struct(Vec::new())]);
        let err = Rtpengine.update(&mut rpc, &mut MetricSink::new()).unwrap_err();
        assert!(err.is_no_data());
    }

    #[test]
    fn record_without_url_is_skipped() {
        let mut rpc = MockRpc::new();
        rpc.add_reply(
            "rtpengine.show",
            &["all"],
            vec![
                Record::Struct(vec![StructItem::new("disabled", Record::Int(0))]),
                Record::Struct(vec![StructItem::new("url", Record::String("udp:rtp:22222".into()))]),
            ],
        );
        let mut sink = MetricSink::new();
        Rtpengine.update(&mut rpc, &mut sink).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.points()[0].label_values[0], "udp:rtp:22222");
        assert_eq!(sink.points()[0].value, 1.0);
    }
}
