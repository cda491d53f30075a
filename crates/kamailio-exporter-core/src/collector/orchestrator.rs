//! Poll cycle: one session, every enabled collector, meta-metrics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use super::{InstantiatedCollector, Rpc};
use crate::metrics::{MetricDesc, MetricPoint, MetricSink};
use crate::session::{ConnectError, Endpoint, Session};

pub const SCRAPE_DURATION: MetricDesc = MetricDesc::gauge(
    "kamailio_scrape_collector_duration_seconds",
    "kamailio_exporter: Duration of a collector scrape.",
    &["collector"],
);

pub const SCRAPE_SUCCESS: MetricDesc = MetricDesc::gauge(
    "kamailio_scrape_collector_success",
    "kamailio_exporter: Whether a collector succeeded.",
    &["collector"],
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStatus {
    Success,
    NoData,
    Error,
}

/// How one collector fared in one cycle.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub collector: &'static str,
    pub duration: Duration,
    pub status: ScrapeStatus,
}

impl ScrapeOutcome {
    pub fn success(&self) -> bool {
        self.status == ScrapeStatus::Success
    }
}

/// Everything one poll cycle produced, meta-metrics included.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub points: Vec<MetricPoint>,
    pub outcomes: Vec<ScrapeOutcome>,
}

/// Runs the instantiated collectors against a fresh session per cycle.
///
/// Holds no mutable state, so overlapping cycles (concurrent scrapes) each
/// get their own session and never contend.
pub struct Orchestrator {
    endpoint: Endpoint,
    timeout: Duration,
    collectors: Arc<[InstantiatedCollector]>,
}

impl Orchestrator {
    pub fn new(
        endpoint: Endpoint,
        timeout: Duration,
        collectors: Arc<[InstantiatedCollector]>,
    ) -> Self {
        Self {
            endpoint,
            timeout,
            collectors,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name).collect()
    }

    /// Opens a session and runs one cycle on it. The session is closed
    /// before returning.
    ///
    /// A connect failure aborts the cycle before any collector runs.
    pub fn poll(&self) -> Result<CycleReport, ConnectError> {
        let mut session = match Session::open(&self.endpoint, self.timeout) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "poll cycle aborted");
                return Err(e);
            }
        };
        Ok(self.run_cycle(&mut session))
    }

    /// Runs every collector once on `rpc`.
    ///
    /// A failing collector is logged and reported with success 0; the
    /// remaining collectors still run.
    pub fn run_cycle(&self, rpc: &mut dyn Rpc) -> CycleReport {
        let cycle_start = Instant::now();
        let mut sink = MetricSink::new();
        let mut outcomes = Vec::with_capacity(self.collectors.len());

        for entry in self.collectors.iter() {
            let start = Instant::now();
            let result = entry.collector.update(rpc, &mut sink);
            let duration = start.elapsed();

            let status = match result {
                Ok(()) => {
                    debug!(
                        collector = entry.name,
                        duration_ms = duration.as_millis() as u64,
                        "collector succeeded"
                    );
                    ScrapeStatus::Success
                }
                Err(e) if e.is_no_data() => {
                    debug!(collector = entry.name, reason = %e, "collector returned no data");
                    ScrapeStatus::NoData
                }
                Err(e) => {
                    error!(
                        collector = entry.name,
                        duration_ms = duration.as_millis() as u64,
                        error = %e,
                        "collector failed"
                    );
                    ScrapeStatus::Error
                }
            };

            sink.push(SCRAPE_DURATION, duration.as_secs_f64(), [entry.name]);
            let success = if status == ScrapeStatus::Success { 1.0 } else { 0.0 };
            sink.push(SCRAPE_SUCCESS, success, [entry.name]);

            outcomes.push(ScrapeOutcome {
                collector: entry.name,
                duration,
                status,
            });
        }

        debug!(
            collectors = outcomes.len(),
            points = sink.len(),
            duration_ms = cycle_start.elapsed().as_millis() as u64,
            "poll cycle complete"
        );

        CycleReport {
            points: sink.into_points(),
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{
        CollectError, Collector, CollectorConfig, CollectorSelection, MockRpc, Registry,
    };
    use crate::metrics::MetricKind;
    use crate::session::ProtocolError;

    /// Emits one gauge named after the command it issues.
    struct Probe {
        command: &'static str,
    }

    impl Collector for Probe {
        fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
            let records = rpc.request(self.command, &[])?;
            let value = records.first().and_then(|r| r.as_int().ok()).unwrap_or(0);
            sink.push_plain(
                MetricDesc::dynamic(
                    format!("probe_{}", self.command.replace('.', "_")),
                    "probe".into(),
                    MetricKind::Gauge,
                ),
                value as f64,
            );
            Ok(())
        }
    }

    struct Empty;

    impl Collector for Empty {
        fn update(&self, _rpc: &mut dyn Rpc, _sink: &mut MetricSink) -> Result<(), CollectError> {
            Err(CollectError::NoData("nothing configured"))
        }
    }

    fn orchestrator(collectors: Vec<InstantiatedCollector>) -> Orchestrator {
        Orchestrator::new(
            Endpoint::Tcp("127.0.0.1:1".into()),
            Duration::from_millis(200),
            collectors.into(),
        )
    }

    fn probe(name: &'static str) -> InstantiatedCollector {
        InstantiatedCollector {
            name,
            collector: Box::new(Probe { command: name }),
        }
    }

    fn meta<'a>(report: &'a CycleReport, desc: &MetricDesc, collector: &str) -> Option<&'a MetricPoint> {
        report
            .points
            .iter()
            .find(|p| p.desc.name == desc.name && p.label_values[0] == collector)
    }

    #[test]
    fn failing_collector_does_not_stop_the_cycle() {
        let orch = orchestrator(vec![probe("first.cmd"), probe("second.cmd"), probe("third.cmd")]);
        let mut rpc = MockRpc::new();
        rpc.add_reply("first.cmd", &[], vec![crate::record::Record::Int(1)]);
        rpc.add_failure("second.cmd", &[], || ProtocolError::DeadlineExceeded);
        rpc.add_reply("third.cmd", &[], vec![crate::record::Record::Int(3)]);

        let report = orch.run_cycle(&mut rpc);

        assert_eq!(report.outcomes.len(), 3);
        for name in ["first.cmd", "second.cmd", "third.cmd"] {
            assert!(meta(&report, &SCRAPE_DURATION, name).is_some());
            assert!(meta(&report, &SCRAPE_SUCCESS, name).is_some());
        }
        assert_eq!(meta(&report, &SCRAPE_SUCCESS, "first.cmd").unwrap().value, 1.0);
        assert_eq!(meta(&report, &SCRAPE_SUCCESS, "second.cmd").unwrap().value, 0.0);
        assert_eq!(meta(&report, &SCRAPE_SUCCESS, "third.cmd").unwrap().value, 1.0);
        assert_eq!(report.outcomes[1].status, ScrapeStatus::Error);

        let probes: Vec<_> = report
            .points
            .iter()
            .filter(|p| p.desc.name.starts_with("probe_"))
            .map(|p| (p.desc.name.to_string(), p.value))
            .collect();
        assert_eq!(
            probes,
            vec![
                ("probe_first_cmd".to_string(), 1.0),
                ("probe_third_cmd".to_string(), 3.0)
            ]
        );
    }

    #[test]
    fn no_data_counts_as_unsuccessful() {
        let orch = orchestrator(vec![InstantiatedCollector {
            name: "empty",
            collector: Box::new(Empty),
        }]);
        let report = orch.run_cycle(&mut MockRpc::new());
        assert_eq!(report.outcomes[0].status, ScrapeStatus::NoData);
        assert!(!report.outcomes[0].success());
        assert_eq!(meta(&report, &SCRAPE_SUCCESS, "empty").unwrap().value, 0.0);
        assert_eq!(report.points.len(), 2);
    }

    #[test]
    fn connect_failure_aborts_before_any_collector() {
        let dir = tempfile::tempdir().unwrap();
        let orch = Orchestrator::new(
            Endpoint::Unix(dir.path().join("missing_ctl")),
            Duration::from_millis(200),
            vec![probe("never.called")].into(),
        );
        let err = match orch.poll() {
            Err(e) => e,
            Ok(_) => panic!("poll succeeded without a server"),
        };
        assert!(err.endpoint.contains("missing_ctl"));
    }

    #[test]
    fn builtin_collectors_against_typical_kamailio() {
        let registry = Registry::builtin();
        let config = CollectorConfig {
            dlg_profiles: vec!["inbound".into(), "outbound".into()],
            ..Default::default()
        };
        let collectors = registry
            .instantiate(&CollectorSelection::default(), &config)
            .unwrap();
        let orch = Orchestrator::new(
            Endpoint::Unix("/var/run/kamailio/kamailio_ctl".into()),
            Duration::from_secs(1),
            collectors,
        );

        let mut rpc = MockRpc::typical_kamailio();
        let report = orch.run_cycle(&mut rpc);

        for outcome in &report.outcomes {
            assert_eq!(
                outcome.status,
                ScrapeStatus::Success,
                "collector {} did not succeed",
                outcome.collector
            );
        }
        let names: Vec<&str> = report.points.iter().map(|p| &*p.desc.name).collect();
        for expected in [
            "kamailio_core_request_total",
            "kamailio_pkgmem_used",
            "kamailio_tcp_readers",
            "kamailio_tls_opened_connections",
            "kamailio_rtpengine_enabled",
            "kamailio_tm_stats_codes_total",
            "kamailio_sl_stats_codes_total",
            "kamailio_htable_auto_expire_seconds",
            "kamailio_htable_slots_total",
            "kamailio_core_process_status",
            "kamailio_core_uptime",
            "kamailio_dlg_profile_get_size_dialog",
            "kamailio_dlg_stats_active_all",
            "kamailio_dispatcher_list_target",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn minimal_kamailio_degrades_per_collector() {
        let registry = Registry::builtin();
        let collectors = registry
            .instantiate(&CollectorSelection::default(), &CollectorConfig::default())
            .unwrap();
        let orch = Orchestrator::new(
            Endpoint::Unix("/var/run/kamailio/kamailio_ctl".into()),
            Duration::from_secs(1),
            collectors,
        );

        let report = orch.run_cycle(&mut MockRpc::minimal_kamailio());
        let status = |name: &str| {
            report
                .outcomes
                .iter()
                .find(|o| o.collector == name)
                .map(|o| o.status)
                .unwrap()
        };
        assert_eq!(status("stats.fetch"), ScrapeStatus::Success);
        assert_eq!(status("core.runinfo"), ScrapeStatus::Success);
        assert_eq!(status("tls.info"), ScrapeStatus::Error);
        assert_eq!(status("dlg.profile_get_size"), ScrapeStatus::NoData);
        assert_eq!(report.outcomes.len(), registry.descriptors().len());
    }
}
