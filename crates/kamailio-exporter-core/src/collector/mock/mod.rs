//! In-memory stand-in for the control socket.
//!
//! Provides:
//! - `MockRpc`: canned replies keyed by command and arguments
//! - `scenarios`: pre-built replies of typical Kamailio deployments

mod rpc;
mod scenarios;

pub use rpc::MockRpc;
