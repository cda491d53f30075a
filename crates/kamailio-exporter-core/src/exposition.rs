//! Bridge from poll cycles into the `prometheus` crate.
//!
//! [`ExporterCollector`] runs one poll cycle per scrape: registering it in a
//! `prometheus::Registry` makes every `gather()` talk to Kamailio.

use std::collections::{HashMap, HashSet};

use prometheus::core::{Collector as PromCollector, Desc};
use prometheus::proto::{Counter, Gauge, LabelPair, Metric, MetricFamily, MetricType};
use prometheus::{IntGauge, Opts};
use tracing::debug;

use crate::collector::{Orchestrator, SCRAPE_DURATION, SCRAPE_SUCCESS};
use crate::metrics::{MetricDesc, MetricKind, MetricPoint};
use crate::{BRANCH, REVISION, RUSTC_VERSION, VERSION};

fn metric_type(kind: MetricKind) -> MetricType {
    match kind {
        MetricKind::Counter => MetricType::COUNTER,
        MetricKind::Gauge => MetricType::GAUGE,
    }
}

fn to_metric(point: &MetricPoint) -> Metric {
    let mut metric = Metric::default();
    for (name, value) in point.desc.label_names.iter().zip(&point.label_values) {
        let mut pair = LabelPair::default();
        pair.set_name(name.to_string());
        pair.set_value(value.clone());
        metric.mut_label().push(pair);
    }
    match point.desc.kind {
        MetricKind::Counter => {
            let mut counter = Counter::default();
            counter.set_value(point.value);
            metric.set_counter(counter);
        }
        MetricKind::Gauge => {
            let mut gauge = Gauge::default();
            gauge.set_value(point.value);
            metric.set_gauge(gauge);
        }
    }
    metric
}

/// Groups points into families by metric name, in first-seen order.
///
/// A series (name plus label values) seen twice keeps its first value. A point
/// whose kind disagrees with its family's is dropped.
pub fn to_metric_families(points: Vec<MetricPoint>) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();
    let mut kinds: Vec<MetricKind> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut seen: HashSet<(String, Vec<String>)> = HashSet::new();

    for point in points {
        let name = point.desc.name.to_string();
        if !seen.insert((name.clone(), point.label_values.clone())) {
            debug!(metric = %name, labels = ?point.label_values, "duplicate series dropped");
            continue;
        }

        let slot = match index.get(&name) {
            Some(&i) => i,
            None => {
                let mut family = MetricFamily::default();
                family.set_name(name.clone());
                family.set_help(point.desc.help.to_string());
                family.set_field_type(metric_type(point.desc.kind));
                families.push(family);
                kinds.push(point.desc.kind);
                index.insert(name.clone(), families.len() - 1);
                families.len() - 1
            }
        };

        if kinds[slot] != point.desc.kind {
            debug!(metric = %name, "metric kind conflicts with its family, point dropped");
            continue;
        }
        families[slot].mut_metric().push(to_metric(&point));
    }
    families
}

fn prom_desc(desc: &MetricDesc) -> prometheus::Result<Desc> {
    Desc::new(
        desc.name.to_string(),
        desc.help.to_string(),
        desc.label_names.iter().map(|l| l.to_string()).collect(),
        HashMap::new(),
    )
}

/// `prometheus` collector that polls Kamailio on every `collect()`.
///
/// Only the two meta-metric families are described up front; collector
/// output varies with the Kamailio modules loaded and is left unchecked.
pub struct ExporterCollector {
    orchestrator: Orchestrator,
    descs: Vec<Desc>,
}

impl ExporterCollector {
    pub fn new(orchestrator: Orchestrator) -> prometheus::Result<Self> {
        Ok(Self {
            orchestrator,
            descs: vec![prom_desc(&SCRAPE_DURATION)?, prom_desc(&SCRAPE_SUCCESS)?],
        })
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}

impl PromCollector for ExporterCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        match self.orchestrator.poll() {
            Ok(report) => to_metric_families(report.points),
            // already logged by the orchestrator
            Err(_) => Vec::new(),
        }
    }
}

/// `kamailio_exporter_build_info{version, revision, branch, rustversion} 1`.
pub fn build_info() -> prometheus::Result<IntGauge> {
    let gauge = IntGauge::with_opts(
        Opts::new(
            "kamailio_exporter_build_info",
            "A metric with a constant '1' value labeled by version, revision, branch, and rustversion from which kamailio_exporter was built.",
        )
        .const_label("version", VERSION)
        .const_label("revision", REVISION)
        .const_label("branch", BRANCH)
        .const_label("rustversion", RUSTC_VERSION),
    )?;
    gauge.set(1);
    Ok(gauge)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use prometheus::{Encoder, Registry, TextEncoder};

    use super::*;
    use crate::metrics::MetricSink;
    use crate::session::Endpoint;

    const REQUESTS: MetricDesc =
        MetricDesc::counter("kamailio_core_request_total", "Request counters", &["method"]);
    const TLS_MAX: MetricDesc =
        MetricDesc::gauge("kamailio_tls_max_connections", "TLS connection limit", &[]);

    fn sample() -> Vec<MetricPoint> {
        let mut sink = MetricSink::new();
        sink.push(REQUESTS, 42.0, ["fwd"]);
        sink.push_plain(TLS_MAX, 2048.0);
        sink.push(REQUESTS, 7.0, ["rcv"]);
        sink.push_plain(TLS_MAX, 1024.0);
        sink.into_points()
    }

    #[test]
    fn groups_by_name_and_drops_duplicate_series() {
        let families = to_metric_families(sample());
        assert_eq!(families.len(), 2);

        let requests = &families[0];
        assert_eq!(requests.get_name(), "kamailio_core_request_total");
        assert_eq!(requests.get_field_type(), MetricType::COUNTER);
        assert_eq!(requests.get_metric().len(), 2);
        let first = &requests.get_metric()[0];
        assert_eq!(first.get_label()[0].get_name(), "method");
        assert_eq!(first.get_label()[0].get_value(), "fwd");
        assert_eq!(first.get_counter().get_value(), 42.0);

        let tls = &families[1];
        assert_eq!(tls.get_field_type(), MetricType::GAUGE);
        assert_eq!(tls.get_metric().len(), 1);
        assert_eq!(tls.get_metric()[0].get_gauge().get_value(), 2048.0);
    }

    #[test]
    fn text_exposition() {
        let families = to_metric_families(sample());
        let mut buf = Vec::new();
        TextEncoder::new().encode(&families, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("# TYPE kamailio_core_request_total counter"));
        assert!(text.contains("kamailio_core_request_total{method=\"fwd\"} 42"));
        assert!(text.contains("kamailio_tls_max_connections 2048"));
    }

    #[test]
    fn unreachable_kamailio_yields_no_families() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            Endpoint::Unix(dir.path().join("kamailio_ctl")),
            Duration::from_millis(100),
            Arc::from(Vec::new()),
        );
        let collector = ExporterCollector::new(orchestrator).unwrap();
        assert_eq!(collector.desc().len(), 2);

        let registry = Registry::new();
        registry.register(Box::new(collector)).unwrap();
        assert!(registry.gather().is_empty());
    }

    #[test]
    fn build_info_labels() {
        let registry = Registry::new();
        registry.register(Box::new(build_info().unwrap())).unwrap();
        let families = registry.gather();
        assert_eq!(families.len(), 1);
        let metric = &families[0].get_metric()[0];
        assert_eq!(metric.get_gauge().get_value(), 1.0);
        let labels: Vec<_> = metric
            .get_label()
            .iter()
            .map(|l| (l.get_name(), l.get_value()))
            .collect();
        assert!(labels.contains(&("version", VERSION)));
        assert!(labels.contains(&("revision", REVISION)));
        assert!(labels.contains(&("branch", BRANCH)));
        assert!(labels.contains(&("rustversion", RUSTC_VERSION)));
        assert!(!RUSTC_VERSION.is_empty());
    }
}
