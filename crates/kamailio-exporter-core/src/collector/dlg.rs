//! Dialog module: per-profile sizes and active dialog states.

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch, int_or_zero, members};
use crate::metrics::{MetricDesc, MetricSink};

const PROFILE_SIZE: MetricDesc = MetricDesc::gauge(
    "kamailio_dlg_profile_get_size_dialog",
    "Current number of dialogs belonging to a profile.",
    &["profile"],
);

const ACTIVE: &[(&str, MetricDesc)] = &[
    ("starting", MetricDesc::gauge("kamailio_dlg_stats_active_starting", "Dialog starting.", &[])),
    (
        "connecting",
        MetricDesc::gauge("kamailio_dlg_stats_active_connecting", "Dialog connecting.", &[]),
    ),
    (
        "answering",
        MetricDesc::gauge("kamailio_dlg_stats_active_answering", "Dialog answering.", &[]),
    ),
    ("ongoing", MetricDesc::gauge("kamailio_dlg_stats_active_ongoing", "Dialog ongoing.", &[])),
    ("all", MetricDesc::gauge("kamailio_dlg_stats_active_all", "Dialog all.", &[])),
];

// ============================================================
// dlg.profile_get_size
// ============================================================

struct ProfileGetSize {
    profiles: Vec<String>,
}

pub(crate) fn profile_factory(config: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(ProfileGetSize {
        profiles: config.dlg_profiles.clone(),
    })
}

impl Collector for ProfileGetSize {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        if self.profiles.is_empty() {
            return Err(CollectError::NoData("no dialog profile configured"));
        }
        for profile in &self.profiles {
            let records = fetch(rpc, "dlg.profile_get_size", &[profile.as_str()])?;
            sink.push(PROFILE_SIZE, int_or_zero(&records[0]) as f64, [profile.as_str()]);
        }
        Ok(())
    }
}

// ============================================================
// dlg.stats_active
// ============================================================

struct StatsActive;

pub(crate) fn stats_active_factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(StatsActive)
}

impl Collector for StatsActive {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        for record in &fetch(rpc, "dlg.stats_active", &[])? {
            for item in members(record) {
                if let Some((_, desc)) = ACTIVE.iter().find(|(key, _)| *key == item.key) {
                    sink.push_plain(desc.clone(), int_or_zero(&item.value) as f64);
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

    #[test]
    fn profile_sizes() {
        let collector = ProfileGetSize {
            profiles: vec!["inbound".into(), "outbound".into()],
        };
        let mut rpc = MockRpc::typical_kamailio();
        let mut sink = MetricSink::new();
        collector.update(&mut rpc, &mut sink).unwrap();

        let got: Vec<_> = sink
            .points()
            .iter()
            .map(|p| (p.label_values[0].as_str(), p.value))
            .collect();
        assert_eq!(got, vec![("inbound", 12.0), ("outbound", 3.0)]);
        assert_eq!(
            rpc.calls(),
            &["dlg.profile_get_size inbound", "dlg.profile_get_size outbound"]
        );
    }

    #[test]
    fn no_profiles_is_no_data() {
        let collector = ProfileGetSize { profiles: Vec::new() };
        let mut rpc = MockRpc::typical_kamailio();
        let err = collector.update(&mut rpc, &mut MetricSink::new()).unwrap_err();
        assert!(err.is_no_data());
        assert!(rpc.calls().is_empty());
    }

    #[test]
    fn unknown_profile_stops_at_the_fault() {
        let collector = ProfileGetSize {
            profiles: vec!["inbound".into(), "missing".into(), "outbound".into()],
        };
        let mut rpc = MockRpc::typical_kamailio();
        let mut sink = MetricSink::new();
        assert!(collector.update(&mut rpc, &mut sink).is_err());
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn active_dialog_states() {
        let mut rpc = MockRpc::typical_kamailio();
        let mut sink = MetricSink::new();
        StatsActive.update(&mut rpc, &mut sink).unwrap();
        assert_eq!(sink.len(), 5);
        let all = sink
            .points()
            .iter()
            .find(|p| p.desc.name == "kamailio_dlg_stats_active_all")
            .unwrap();
        assert_eq!(all.value, 14.0);
        assert_eq!(rpc.calls(), &["dlg.stats_active"]);
    }
}
