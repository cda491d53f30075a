//! `dispatcher.list`: status, latency and weights of each destination.

use std::collections::HashMap;

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch};
use crate::dispatcher::{DispatcherTarget, parse_dispatcher_targets};
use crate::metrics::{MetricDesc, MetricSink};

const LABELS: &[&str] = &["set_id", "destination", "set_name"];

/// Series per target and the field each one reads.
const SERIES: &[(MetricDesc, fn(&DispatcherTarget) -> f64)] = &[
    (
        MetricDesc::gauge("kamailio_dispatcher_list_target", "Target status.", LABELS),
        |t| t.status as f64,
    ),
    (
        MetricDesc::gauge(
            "kamailio_dispatcher_list_target_latency_avg",
            "Target Latency Average.",
            LABELS,
        ),
        |t| t.latency_avg,
    ),
    (
        MetricDesc::gauge("kamailio_dispatcher_list_target_latency_std", "Target Latency.", LABELS),
        |t| t.latency_std,
    ),
    (
        MetricDesc::gauge("kamailio_dispatcher_list_target_latency_est", "Target Latency.", LABELS),
        |t| t.latency_est,
    ),
    (
        MetricDesc::gauge("kamailio_dispatcher_list_target_latency_max", "Target Latency.", LABELS),
        |t| t.latency_max,
    ),
    (
        MetricDesc::gauge(
            "kamailio_dispatcher_list_target_latency_timeout",
            "Target Latency.",
            LABELS,
        ),
        |t| t.latency_timeout,
    ),
    (
        MetricDesc::gauge("kamailio_dispatcher_list_target_priority", "Target Priority.", LABELS),
        |t| t.priority as f64,
    ),
    (
        MetricDesc::gauge("kamailio_dispatcher_list_target_weight", "Target Weight.", LABELS),
        |t| t.weight as f64,
    ),
    (
        MetricDesc::gauge("kamailio_dispatcher_list_target_rweight", "Target rweight.", LABELS),
        |t| t.rweight as f64,
    ),
];

struct DispatcherList {
    set_names: HashMap<i64, String>,
}

pub(crate) fn factory(config: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(DispatcherList {
        set_names: config.dispatcher_names.clone(),
    })
}

impl Collector for DispatcherList {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        let records = fetch(rpc, "dispatcher.list", &[])?;
        let targets = parse_dispatcher_targets(&records)?;

        for target in &targets {
            let set_id = target.set_id.to_string();
            let set_name = self
                .set_names
                .get(&target.set_id)
                .map(String::as_str)
                .unwrap_or_default();

            for (desc, value) in SERIES {
                sink.push(
                    desc.clone(),
                    value(target),
                    [set_id.as_str(), target.uri.as_str(), set_name],
                );
            }
        }
        Ok(())
    }
}
