//! Canned-reply RPC transport for testing collectors without a socket.

use std::collections::HashMap;

use crate::collector::Rpc;
use crate::record::Record;
use crate::session::ProtocolError;

#[derive(Debug, Clone)]
enum Reply {
    Records(Vec<Record>),
    Fault { code: i64, message: String },
    Failure(fn() -> ProtocolError),
}

/// RPC transport answering from a fixed table.
///
/// Unknown commands get the fault Kamailio sends for them
/// (`500 command not found`). Every request is recorded in order.
#[derive(Debug, Clone, Default)]
pub struct MockRpc {
    replies: HashMap<String, Reply>,
    calls: Vec<String>,
}

fn key(command: &str, args: &[&str]) -> String {
    let mut key = command.to_string();
    for arg in args {
        key.push(' ');
        key.push_str(arg);
    }
    key
}

impl MockRpc {
    /// Creates a transport that knows no commands.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `command args...` with `records`.
    pub fn add_reply(&mut self, command: &str, args: &[&str], records: Vec<Record>) {
        self.replies.insert(key(command, args), Reply::Records(records));
    }

    /// Answers `command args...` with an error reply.
    pub fn add_fault(&mut self, command: &str, args: &[&str], code: i64, message: &str) {
        self.replies.insert(
            key(command, args),
            Reply::Fault {
                code,
                message: message.to_string(),
            },
        );
    }

    /// Fails `command args...` with the error built by `make`.
    pub fn add_failure(&mut self, command: &str, args: &[&str], make: fn() -> ProtocolError) {
        self.replies.insert(key(command, args), Reply::Failure(make));
    }

    /// Removes a command, so that it answers with `command not found`.
    pub fn remove(&mut self, command: &str, args: &[&str]) {
        self.replies.remove(&key(command, args));
    }

    /// Requests seen so far, as `command arg1 arg2`.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

impl Rpc for MockRpc {
    fn request(&mut self, command: &str, args: &[&str]) -> Result<Vec<Record>, ProtocolError> {
        let key = key(command, args);
        let reply = self.replies.get(&key).cloned();
        self.calls.push(key);
        match reply {
            Some(Reply::Records(records)) => Ok(records),
            Some(Reply::Fault { code, message }) => Err(ProtocolError::Fault { code, message }),
            Some(Reply::Failure(make)) => Err(make()),
            None => Err(ProtocolError::Fault {
                code: 500,
                message: "command not found".to_string(),
            }),
        }
    }
}
