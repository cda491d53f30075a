//! Transport abstraction seen by collectors.

use crate::record::Record;
use crate::session::ProtocolError;

/// Issues one BINRPC command and returns the decoded reply records.
///
/// Implemented by [`crate::session::Session`] for live polling and by
/// [`super::MockRpc`] for tests. An empty reply is returned as an empty
/// vector; collectors decide whether that means "no data".
pub trait Rpc {
    fn request(&mut self, command: &str, args: &[&str]) -> Result<Vec<Record>, ProtocolError>;
}
