//! Flat statistics (`stats.fetch all`) to metric points.
//!
//! Two paths run over the same [`StatTable`]:
//!
//! - **static**: a fixed table of `(stat key, family, label value)` entries,
//!   see [`STAT_MAPPINGS`];
//! - **scripted**: every `script.*` key becomes its own unlabelled metric,
//!   counter or gauge depending on its name suffix.
//!
//! Absent keys produce no point. Values that do not parse as a float are
//! skipped one by one.

mod table;

pub use table::STAT_MAPPINGS;

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::metrics::{MetricDesc, MetricKind, MetricSink};
use crate::record::Record;

/// Key prefix of statistics declared in the Kamailio routing script.
pub const SCRIPTED_PREFIX: &str = "script.";

/// Statistic name to textual value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatTable {
    entries: BTreeMap<String, String>,
}

impl StatTable {
    /// Builds the table from the first struct record of a reply.
    ///
    /// If a key repeats, its first value is kept. Nested structs are skipped.
    pub fn from_reply(records: &[Record]) -> Self {
        let mut entries = BTreeMap::new();
        let items = records
            .iter()
            .find_map(|r| r.as_struct_items().ok())
            .unwrap_or_default();
        for item in items {
            if let Some(value) = item.value.to_stat_string() {
                entries.entry(item.key.clone()).or_insert(value);
            }
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StatTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut entries = BTreeMap::new();
        for (k, v) in iter {
            entries.entry(k.into()).or_insert_with(|| v.into());
        }
        Self { entries }
    }
}

/// A metric family fed by one or more statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFamily {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: &'static [&'static str],
}

impl StatFamily {
    pub fn desc(&self) -> MetricDesc {
        MetricDesc::new(self.name, self.help, self.kind, self.labels)
    }
}

/// One statistic and where it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatMapping {
    pub key: &'static str,
    pub family: StatFamily,
    /// Value of the family's single label; `None` for unlabelled families.
    pub label_value: Option<&'static str>,
}

fn parse_value(key: &str, raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) => Some(v),
        Err(e) => {
            trace!(key, value = raw, error = %e, "statistic is not a number, skipping");
            None
        }
    }
}

/// Emits one point per mapping whose key is present and numeric.
pub fn map_static(table: &StatTable, mappings: &[StatMapping], sink: &mut MetricSink) {
    for mapping in mappings {
        let Some(raw) = table.get(mapping.key) else {
            continue;
        };
        let Some(value) = parse_value(mapping.key, raw) else {
            continue;
        };
        sink.push(mapping.family.desc(), value, mapping.label_value);
    }
}

/// Counter for names following the Prometheus unit-suffix conventions,
/// gauge otherwise.
pub fn scripted_kind(bare_name: &str) -> MetricKind {
    if ["total", "seconds", "bytes"]
        .iter()
        .any(|suffix| bare_name.ends_with(suffix))
    {
        MetricKind::Counter
    } else {
        MetricKind::Gauge
    }
}

fn is_valid_name_part(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b':')
}

/// Emits one unlabelled point per `script.*` statistic.
///
/// The metric is named `kamailio_<name>` with `<name>` lowercased. A fresh
/// descriptor is built for every key on every call.
pub fn map_scripted(table: &StatTable, sink: &mut MetricSink) {
    for (key, raw) in table.iter() {
        let Some(bare) = key.strip_prefix(SCRIPTED_PREFIX) else {
            continue;
        };
        let bare = bare.to_lowercase();
        if !is_valid_name_part(&bare) {
            debug!(key, "scripted statistic is not a valid metric name, skipping");
            continue;
        }
        let Some(value) = parse_value(key, raw) else {
            continue;
        };
        let desc = MetricDesc::dynamic(
            format!("kamailio_{}", bare),
            format!("Scripted metric {}", bare),
            scripted_kind(&bare),
        );
        sink.push_plain(desc, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StructItem;

    fn points(table: &StatTable) -> Vec<(String, Vec<String>, f64)> {
        let mut sink = MetricSink::new();
        map_static(table, STAT_MAPPINGS, &mut sink);
        map_scripted(table, &mut sink);
        sink.into_points()
            .into_iter()
            .map(|p| (p.desc.name.into_owned(), p.label_values, p.value))
            .collect()
    }

    #[test]
    fn fwd_requests_maps_to_one_labelled_point() {
        let table: StatTable = [("core.fwd_requests", "42")].into_iter().collect();
        assert_eq!(
            points(&table),
            vec![(
                "kamailio_core_request_total".to_string(),
                vec!["fwd".to_string()],
                42.0
            )]
        );
    }

    #[test]
    fn absent_key_produces_nothing() {
        assert!(points(&StatTable::default()).is_empty());
        let table: StatTable = [("core.something_new", "1")].into_iter().collect();
        assert!(points(&table).is_empty());
    }

    #[test]
    fn unparsable_value_skips_only_that_point() {
        let table: StatTable = [
            ("core.fwd_requests", "n/a"),
            ("core.rcv_requests", " 7 "),
            ("shmem.fragments", "117"),
        ]
        .into_iter()
        .collect();
        let got = points(&table);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0], ("kamailio_core_request_total".into(), vec!["rcv".into()], 7.0));
        assert_eq!(got[1], ("kamailio_shm_fragments".into(), Vec::new(), 117.0));
    }

    #[test]
    fn scripted_kinds() {
        assert_eq!(scripted_kind("requests_total"), MetricKind::Counter);
        assert_eq!(scripted_kind("queue_depth"), MetricKind::Gauge);
        assert_eq!(scripted_kind("lag_seconds"), MetricKind::Counter);
        assert_eq!(scripted_kind("payload_bytes"), MetricKind::Counter);
        assert_eq!(scripted_kind("subtotal"), MetricKind::Counter);
    }

    #[test]
    fn scripted_statistics() {
        let table: StatTable = [
            ("script.requests_total", "17"),
            ("script.Queue_Depth", "3"),
            ("script.lag_seconds", "0.25"),
            ("script.bad-name", "1"),
            ("script.", "1"),
            ("core.rcv_requests", "5"),
        ]
        .into_iter()
        .collect();

        let mut sink = MetricSink::new();
        map_scripted(&table, &mut sink);
        let got: Vec<_> = sink
            .points()
            .iter()
            .map(|p| (p.desc.name.to_string(), p.desc.kind, p.value))
            .collect();
        assert_eq!(
            got,
            vec![
                ("kamailio_queue_depth".to_string(), MetricKind::Gauge, 3.0),
                ("kamailio_lag_seconds".to_string(), MetricKind::Counter, 0.25),
                ("kamailio_requests_total".to_string(), MetricKind::Counter, 17.0),
            ]
        );
        assert_eq!(sink.points()[0].desc.help, "Scripted metric queue_depth");
    }

    #[test]
    fn table_from_reply_keeps_first_duplicate() {
        let records = vec![
            Record::Int(0),
            Record::Struct(vec![
                StructItem::new("core.fwd_requests", Record::String("1".into())),
                StructItem::new("core.fwd_requests", Record::String("2".into())),
                StructItem::new("shmem.used_size", Record::Int(300)),
                StructItem::new("nested", Record::Struct(Vec::new())),
            ]),
        ];
        let table = StatTable::from_reply(&records);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("core.fwd_requests"), Some("1"));
        assert_eq!(table.get("shmem.used_size"), Some("300"));
        assert_eq!(table.get("nested"), None);
    }

    #[test]
    fn every_mapping_key_is_unique() {
        let mut keys: Vec<_> = STAT_MAPPINGS.iter().map(|m| m.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), STAT_MAPPINGS.len());
    }

    #[test]
    fn label_arity_matches_family() {
        for m in STAT_MAPPINGS {
            assert_eq!(
                m.family.labels.len(),
                usize::from(m.label_value.is_some()),
                "{}",
                m.key
            );
        }
    }
}
