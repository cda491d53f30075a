//! kamailio-exporter-core: shared library for the Kamailio metrics exporter.
//!
//! Provides:
//! - `record`: decoded BINRPC values (int, string, double, struct)
//! - `binrpc`: wire codec for the `ctl` module's binary RPC protocol
//! - `session`: one connection per poll cycle, bounded by a single deadline
//! - `collector`: collector contract, registry, orchestrator and the built-in collectors
//! - `dispatcher`: parser for the nested `dispatcher.list` reply
//! - `mapping`: stat table to metric point mapping (static table + scripted stats)
//! - `metrics`: metric descriptors, points and the per-cycle sink
//! - `exposition`: bridge into the `prometheus` crate's registry

pub mod binrpc;
pub mod collector;
pub mod dispatcher;
pub mod exposition;
pub mod mapping;
pub mod metrics;
pub mod record;
pub mod session;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git SHA of the build, or `unknown`.
pub const REVISION: &str = env!("GIT_SHA");

/// Git branch the build was made from, or `unknown`.
pub const BRANCH: &str = env!("GIT_BRANCH");

/// Version of the compiler that built this crate, or `unknown`.
pub const RUSTC_VERSION: &str = env!("RUSTC_VERSION");
