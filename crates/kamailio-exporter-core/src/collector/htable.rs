//! `htable.listTables` and `htable.stats`: hash table settings and occupancy.

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch, int_or_zero, str_or_empty};
use crate::metrics::{MetricDesc, MetricSink};
use crate::record::Record;

const AUTO_EXPIRE: MetricDesc = MetricDesc::gauge(
    "kamailio_htable_auto_expire_seconds",
    "Time in seconds to delete an item from a hash table if no update was done to it",
    &["name"],
);
const UPDATE_EXPIRE: MetricDesc = MetricDesc::gauge(
    "kamailio_htable_update_expire_status",
    "Update Expire status",
    &["name"],
);
const DMQ_REPLICATE: MetricDesc = MetricDesc::gauge(
    "kamailio_htable_dmq_replicate_status",
    "DMQ Replicate status",
    &["name"],
);
const DB_MODE: MetricDesc = MetricDesc::gauge(
    "kamailio_htable_db_mode_status",
    "Htable write back to db table",
    &["name", "dbtable"],
);

const SLOTS: MetricDesc = MetricDesc::gauge(
    "kamailio_htable_slots_total",
    "Number of slots in the htable",
    &["name"],
);
const ITEMS: MetricDesc = MetricDesc::gauge(
    "kamailio_htable_items_total",
    "Total number of items stored in the htable",
    &["name"],
);
const ITEMS_MIN: MetricDesc = MetricDesc::gauge(
    "kamailio_htable_items_per_slots_min",
    "Min number of items per slot in the htable",
    &["name"],
);
const ITEMS_MAX: MetricDesc = MetricDesc::gauge(
    "kamailio_htable_items_per_slots_max",
    "Max number of items per slot in the htable",
    &["name"],
);

fn int(record: &Record, key: &str) -> f64 {
    record.get(key).map(int_or_zero).unwrap_or_default() as f64
}

fn string<'a>(record: &'a Record, key: &str) -> &'a str {
    record.get(key).map(str_or_empty).unwrap_or_default()
}

struct ListTables;

pub(crate) fn list_tables_factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(ListTables)
}

impl Collector for ListTables {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        for record in &fetch(rpc, "htable.listTables", &[])? {
            let name = string(record, "name");
            sink.push(AUTO_EXPIRE, int(record, "expire"), [name]);
            sink.push(DB_MODE, int(record, "dbmode"), [name, string(record, "dbtable")]);
            sink.push(DMQ_REPLICATE, int(record, "dmqreplicate"), [name]);
            sink.push(UPDATE_EXPIRE, int(record, "updateexpire"), [name]);
        }
        Ok(())
    }
}

struct Stats;

pub(crate) fn stats_factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(Stats)
}

impl Collector for Stats {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        for record in &fetch(rpc, "htable.stats", &[])? {
            let name = string(record, "name");
            sink.push(SLOTS, int(record, "slots"), [name]);
            sink.push(ITEMS, int(record, "all"), [name]);
            sink.push(ITEMS_MIN, int(record, "min"), [name]);
            sink.push(ITEMS_MAX, int(record, "max"), [name]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MockRpc;
    use crate::metrics::MetricPoint;

    fn find<'a>(points: &'a [MetricPoint], name: &str, table: &str) -> &'a MetricPoint {
        points
            .iter()
            .find(|p| p.desc.name == name && p.label_values[0] == table)
            .unwrap()
    }

    #[test]
    fn list_tables_settings() {
        let mut rpc = MockRpc::typical_kamailio();
        let mut sink = MetricSink::new();
        ListTables.update(&mut rpc, &mut sink).unwrap();
        assert_eq!(sink.len(), 8);

        let points = sink.points();
        assert_eq!(find(points, "kamailio_htable_auto_expire_seconds", "ipban").value, 300.0);
        let db = find(points, "kamailio_htable_db_mode_status", "routes");
        assert_eq!(db.value, 1.0);
        assert_eq!(db.label_values[1], "htable_routes");
        assert_eq!(find(points, "kamailio_htable_dmq_replicate_status", "routes").value, 1.0);
    }

    #[test]
    fn stats_occupancy() {
        let mut rpc = MockRpc::typical_kamailio();
        let mut sink = MetricSink::new();
        Stats.update(&mut rpc, &mut sink).unwrap();

        let points = sink.points();
        assert_eq!(find(points, "kamailio_htable_slots_total", "routes").value, 1024.0);
        assert_eq!(find(points, "kamailio_htable_items_total", "routes").value, 800.0);
        assert_eq!(find(points, "kamailio_htable_items_per_slots_max", "ipban").value, 2.0);
    }

    #[test]
    fn htable_module_missing() {
        let mut rpc = MockRpc::minimal_kamailio();
        assert!(ListTables.update(&mut rpc, &mut MetricSink::new()).is_err());
        assert!(Stats.update(&mut rpc, &mut MetricSink::new()).is_err());
    }
}
