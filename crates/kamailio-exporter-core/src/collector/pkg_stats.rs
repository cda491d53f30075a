//! `pkg.stats`: private (per-process) memory pools.

use super::{CollectError, Collector, CollectorConfig, Rpc, fetch, int_or_zero};
use crate::metrics::{MetricDesc, MetricSink};

const USED: MetricDesc = MetricDesc::gauge("kamailio_pkgmem_used", "Private memory used", &["entry"]);
const FREE: MetricDesc = MetricDesc::gauge("kamailio_pkgmem_free", "Private memory free", &["entry"]);
const REAL: MetricDesc =
    MetricDesc::gauge("kamailio_pkgmem_real", "Private memory real used", &["entry"]);
const SIZE: MetricDesc =
    MetricDesc::gauge("kamailio_pkgmem_size", "Private memory total size", &["entry"]);
const FRAGS: MetricDesc =
    MetricDesc::gauge("kamailio_pkgmem_frags", "Private memory total frags", &["entry"]);

struct PkgStats;

pub(crate) fn factory(_: &CollectorConfig) -> Box<dyn Collector> {
    Box::new(PkgStats)
}

impl Collector for PkgStats {
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError> {
        let records = fetch(rpc, "pkg.stats", &[])?;

        for record in &records {
            let field = |key: &str| record.get(key).map(int_or_zero).unwrap_or_default();
            let entry = field("entry").to_string();

            for (desc, key) in [
                (USED, "used"),
                (FREE, "free"),
                (REAL, "real_used"),
                (SIZE, "total_size"),
                (FRAGS, "total_frags"),
            ] {
                sink.push(desc, field(key) as f64, [entry.as_str()]);
            }
        }
        Ok(())
    }
}
