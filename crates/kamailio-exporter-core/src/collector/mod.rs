//! Kamailio metrics collectors.
//!
//! Each collector issues one or more BINRPC commands against the session of
//! the current poll cycle and turns the replies into metric points.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       Orchestrator                         │
//! │   one Session per cycle, every collector run in turn,      │
//! │   duration + success meta-metrics per collector            │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────────┐    │
//! │  │ stats.fetch  │ │ tm.stats ... │ │ dispatcher.list  │    │
//! │  └──────┬───────┘ └──────┬───────┘ └────────┬─────────┘    │
//! │         └────────────────┼──────────────────┘              │
//! │                    ┌─────▼─────┐                           │
//! │                    │    Rpc    │ (trait)                   │
//! │                    └─────┬─────┘                           │
//! └──────────────────────────┼─────────────────────────────────┘
//!                ┌───────────┴───────────┐
//!         ┌──────▼──────┐         ┌──────▼──────┐
//!         │   Session   │         │   MockRpc   │
//!         │ (unix/tcp)  │         │ (Testing)   │
//!         └─────────────┘         └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use kamailio_exporter_core::collector::{
//!     CollectorConfig, CollectorSelection, MockRpc, Orchestrator, Registry,
//! };
//!
//! let registry = Registry::builtin();
//! let collectors = registry
//!     .instantiate(&CollectorSelection::default(), &CollectorConfig::default())
//!     .unwrap();
//! let orchestrator = Orchestrator::new(
//!     "unix:///var/run/kamailio/kamailio_ctl".parse().unwrap(),
//!     std::time::Duration::from_secs(5),
//!     collectors,
//! );
//!
//! let mut rpc = MockRpc::typical_kamailio();
//! let report = orchestrator.run_cycle(&mut rpc);
//! assert!(!report.points.is_empty());
//! ```

mod core_psa;
mod core_runinfo;
mod core_tcp_info;
mod dispatcher_list;
mod dlg;
mod htable;
pub mod mock;
mod orchestrator;
mod pkg_stats;
mod registry;
mod rtpengine;
mod sl_stats;
mod stats_fetch;
mod tls_info;
mod tm_stats;
pub mod traits;

pub use mock::MockRpc;
pub use orchestrator::{
    CycleReport, Orchestrator, SCRAPE_DURATION, SCRAPE_SUCCESS, ScrapeOutcome, ScrapeStatus,
};
pub use registry::{
    CollectorDescriptor, CollectorFactory, CollectorSelection, InstantiatedCollector, Registry,
    RegistryError,
};
pub use traits::Rpc;

use std::collections::HashMap;
use std::fmt;

use crate::dispatcher::DispatcherParseError;
use crate::metrics::MetricSink;
use crate::record::{Record, StructItem, TypeMismatch};
use crate::session::ProtocolError;

/// A unit that turns the replies of one or more commands into metric points.
pub trait Collector: Send + Sync {
    /// Issues this collector's commands on `rpc` and pushes the resulting
    /// points into `sink`.
    fn update(&self, rpc: &mut dyn Rpc, sink: &mut MetricSink) -> Result<(), CollectError>;
}

/// Why a collector produced nothing (or not everything) this cycle.
#[derive(Debug)]
pub enum CollectError {
    /// Nothing to report; not a failure. Logged at debug level.
    NoData(&'static str),
    Protocol(ProtocolError),
    TypeMismatch(TypeMismatch),
    Dispatcher(DispatcherParseError),
}

impl CollectError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, CollectError::NoData(_))
    }
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::NoData(reason) => write!(f, "no data: {}", reason),
            CollectError::Protocol(e) => write!(f, "{}", e),
            CollectError::TypeMismatch(e) => write!(f, "{}", e),
            CollectError::Dispatcher(e) => write!(f, "dispatcher.list: {}", e),
        }
    }
}

impl std::error::Error for CollectError {}

impl From<ProtocolError> for CollectError {
    fn from(e: ProtocolError) -> Self {
        CollectError::Protocol(e)
    }
}

impl From<TypeMismatch> for CollectError {
    fn from(e: TypeMismatch) -> Self {
        CollectError::TypeMismatch(e)
    }
}

impl From<DispatcherParseError> for CollectError {
    fn from(e: DispatcherParseError) -> Self {
        CollectError::Dispatcher(e)
    }
}

/// Settings handed to collector factories at startup.
#[derive(Debug, Clone, Default)]
pub struct CollectorConfig {
    /// Dispatcher set ID to human-readable name, used as the `set_name` label.
    pub dispatcher_names: HashMap<i64, String>,
    /// Dialog profiles queried with `dlg.profile_get_size`.
    pub dlg_profiles: Vec<String>,
}

/// Every collector kind known to this build, all enabled by default.
pub const BUILTIN_COLLECTORS: &[CollectorDescriptor] = &[
    CollectorDescriptor::new("core.psa", true, core_psa::factory),
    CollectorDescriptor::new("core.runinfo", true, core_runinfo::factory),
    CollectorDescriptor::new("core.tcp_info", true, core_tcp_info::factory),
    CollectorDescriptor::new("dispatcher.list", true, dispatcher_list::factory),
    CollectorDescriptor::new("dlg.profile_get_size", true, dlg::profile_factory),
    CollectorDescriptor::new("dlg.stats_active", true, dlg::stats_active_factory),
    CollectorDescriptor::new("htable.listTables", true, htable::list_tables_factory),
    CollectorDescriptor::new("htable.stats", true, htable::stats_factory),
    CollectorDescriptor::new("pkg.stats", true, pkg_stats::factory),
    CollectorDescriptor::new("rtpengine.show", true, rtpengine::factory),
    CollectorDescriptor::new("sl.stats", true, sl_stats::factory),
    CollectorDescriptor::new("stats.fetch", true, stats_fetch::factory),
    CollectorDescriptor::new("tls.info", true, tls_info::factory),
    CollectorDescriptor::new("tm.stats", true, tm_stats::factory),
];

// ============================================================
// Helpers shared by the collectors
// ============================================================

/// Issues a command; an empty reply becomes [`CollectError::NoData`].
pub(crate) fn fetch(
    rpc: &mut dyn Rpc,
    command: &str,
    args: &[&str],
) -> Result<Vec<Record>, CollectError> {
    let records = rpc.request(command, args)?;
    if records.is_empty() {
        return Err(CollectError::NoData("empty reply"));
    }
    Ok(records)
}

/// Struct members of `record`, or nothing if it is not a struct.
pub(crate) fn members(record: &Record) -> &[StructItem] {
    record.as_struct_items().unwrap_or_default()
}

/// Integer value, zero when the field has another type.
pub(crate) fn int_or_zero(record: &Record) -> i64 {
    record.as_int().unwrap_or_default()
}

/// String value, empty when the field has another type.
pub(crate) fn str_or_empty(record: &Record) -> &str {
    record.as_str().unwrap_or_default()
}

/// `^[0-9x]{3}$`: per-code reply counters in `tm.stats` / `sl.stats`.
pub(crate) fn is_reply_code(key: &str) -> bool {
    key.len() == 3 && key.bytes().all(|b| b.is_ascii_digit() || b == b'x')
}
