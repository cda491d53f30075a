//! Connection to the Kamailio control socket.
//!
//! A [`Session`] is opened once per poll cycle and shared sequentially by
//! every collector in that cycle. A single deadline, fixed at open time,
//! bounds the connect and every later read and write. Once the deadline has
//! passed the session refuses further requests. The socket is shut down when
//! the session is dropped.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, trace};

use crate::binrpc::{self, DecodeError, ReadError};
use crate::collector::Rpc;
use crate::record::Record;

// ============================================================
// Endpoint
// ============================================================

/// Address of the control socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `tcp://host:port`
    Tcp(String),
    /// `unix:///path` or a bare absolute path.
    Unix(PathBuf),
}

/// Invalid endpoint URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointParseError(String);

impl fmt::Display for EndpointParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid RPC endpoint: {}", self.0)
    }
}

impl std::error::Error for EndpointParseError {}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(EndpointParseError(format!("'{}' has no socket path", s)));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = s.strip_prefix("tcp://") {
            let addr = addr.trim_end_matches('/');
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| EndpointParseError(format!("'{}' has no port", s)))?;
            if host.is_empty() {
                return Err(EndpointParseError(format!("'{}' has no host", s)));
            }
            port.parse::<u16>()
                .map_err(|e| EndpointParseError(format!("'{}': bad port: {}", s, e)))?;
            return Ok(Endpoint::Tcp(addr.to_string()));
        }
        if s.starts_with('/') {
            return Ok(Endpoint::Unix(PathBuf::from(s)));
        }
        Err(EndpointParseError(format!(
            "'{}' (expected unix:///path or tcp://host:port)",
            s
        )))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

// ============================================================
// Errors
// ============================================================

/// The control socket could not be reached. Aborts the whole poll cycle.
#[derive(Debug)]
pub struct ConnectError {
    pub endpoint: String,
    pub source: io::Error,
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot connect to {}: {}", self.endpoint, self.source)
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// A single request failed. Fatal to the collector that issued it.
#[derive(Debug)]
pub enum ProtocolError {
    Io(io::Error),
    /// The per-cycle deadline passed, now or on an earlier request.
    DeadlineExceeded,
    /// The reply belongs to a different request.
    CookieMismatch { expected: u32, got: u32 },
    Decode(DecodeError),
    /// Kamailio answered with an error reply.
    Fault { code: i64, message: String },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
            ProtocolError::DeadlineExceeded => write!(f, "deadline exceeded"),
            ProtocolError::CookieMismatch { expected, got } => write!(
                f,
                "reply cookie mismatch: expected {:#010x}, got {:#010x}",
                expected, got
            ),
            ProtocolError::Decode(e) => write!(f, "decode error: {}", e),
            ProtocolError::Fault { code, message } => {
                write!(f, "server fault {}: {}", code, message)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<DecodeError> for ProtocolError {
    fn from(e: DecodeError) -> Self {
        ProtocolError::Decode(e)
    }
}

// ============================================================
// Session
// ============================================================

enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Stream {
    fn set_timeouts(&self, timeout: Duration) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => {
                s.set_read_timeout(Some(timeout))?;
                s.set_write_timeout(Some(timeout))
            }
            #[cfg(unix)]
            Stream::Unix(s) => {
                s.set_read_timeout(Some(timeout))?;
                s.set_write_timeout(Some(timeout))
            }
        }
    }

    fn shutdown(&self) -> io::Result<()> {
        match self {
            Stream::Tcp(s) => s.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Stream::Unix(s) => s.shutdown(Shutdown::Both),
        }
    }
}

/// Reader/writer that re-arms the socket timeout with the remaining budget
/// before every blocking call.
struct DeadlineIo<'a> {
    stream: &'a mut Stream,
    deadline: Instant,
}

impl DeadlineIo<'_> {
    fn arm(&self) -> io::Result<()> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded"));
        }
        self.stream.set_timeouts(remaining)
    }
}

impl Read for DeadlineIo<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.arm()?;
        match self.stream {
            Stream::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.read(buf),
        }
    }
}

impl Write for DeadlineIo<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.arm()?;
        match self.stream {
            Stream::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Stream::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stream {
            Stream::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Stream::Unix(s) => s.flush(),
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// One connection to the control socket, valid for one poll cycle.
pub struct Session {
    stream: Stream,
    endpoint: String,
    deadline: Instant,
    expired: bool,
    next_cookie: u32,
}

impl Session {
    /// Connects to `endpoint`. `timeout` bounds the connect and every
    /// request made on the returned session.
    pub fn open(endpoint: &Endpoint, timeout: Duration) -> Result<Session, ConnectError> {
        let name = endpoint.to_string();
        let stream = Instant::now()
            .checked_add(timeout)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "timeout out of range"))
            .and_then(|deadline| connect(endpoint, deadline).map(|s| (s, deadline)));
        let (stream, deadline) = stream.map_err(|source| ConnectError {
            endpoint: name.clone(),
            source,
        })?;
        debug!(endpoint = %name, "session opened");

        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0)
            ^ std::process::id();

        Ok(Session {
            stream,
            endpoint: name,
            deadline,
            expired: false,
            next_cookie: seed,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// True once the deadline has been hit; every later request fails.
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Sends `command` with string `args` and waits for the matching reply.
    pub fn request(&mut self, command: &str, args: &[&str]) -> Result<Vec<Record>, ProtocolError> {
        if self.expired {
            return Err(ProtocolError::DeadlineExceeded);
        }

        let cookie = self.next_cookie;
        self.next_cookie = self.next_cookie.wrapping_add(1);
        let packet = binrpc::encode_request(cookie, command, args);

        let mut io = DeadlineIo {
            stream: &mut self.stream,
            deadline: self.deadline,
        };
        let result = io
            .write_all(&packet)
            .map_err(ReadError::Io)
            .and_then(|_| binrpc::read_packet(&mut io));

        let reply = match result {
            Ok(reply) => reply,
            Err(ReadError::Io(e)) if is_timeout(&e) => {
                self.expired = true;
                debug!(endpoint = %self.endpoint, command, "deadline exceeded");
                return Err(ProtocolError::DeadlineExceeded);
            }
            Err(ReadError::Io(e)) => return Err(ProtocolError::Io(e)),
            Err(ReadError::Decode(e)) => return Err(ProtocolError::Decode(e)),
        };

        if reply.cookie != cookie {
            return Err(ProtocolError::CookieMismatch {
                expected: cookie,
                got: reply.cookie,
            });
        }

        if reply.is_fault() {
            let mut records = reply.records.into_iter();
            let code = records.next().and_then(|r| r.as_int().ok()).unwrap_or(-1);
            let message = records
                .next()
                .and_then(|r| r.as_str().ok().map(str::to_string))
                .unwrap_or_default();
            return Err(ProtocolError::Fault { code, message });
        }

        trace!(command, records = reply.records.len(), "rpc reply");
        Ok(reply.records)
    }
}

impl Rpc for Session {
    fn request(&mut self, command: &str, args: &[&str]) -> Result<Vec<Record>, ProtocolError> {
        Session::request(self, command, args)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Peer may already be gone.
        let _ = self.stream.shutdown();
        debug!(endpoint = %self.endpoint, "session closed");
    }
}

fn remaining(deadline: Instant) -> io::Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "deadline exceeded while connecting",
        ));
    }
    Ok(left)
}

/// Connects within `deadline`. Each resolved address gets only what is left
/// of the budget. Name resolution and Unix connects cannot be interrupted, so
/// the budget is checked again once they return.
fn connect(endpoint: &Endpoint, deadline: Instant) -> io::Result<Stream> {
    match endpoint {
        Endpoint::Tcp(addr) => {
            let addrs: Vec<_> = addr.to_socket_addrs()?.collect();
            let mut last_err = None;
            for sock_addr in addrs {
                match TcpStream::connect_timeout(&sock_addr, remaining(deadline)?) {
                    Ok(stream) => {
                        stream.set_nodelay(true)?;
                        return Ok(Stream::Tcp(stream));
                    }
                    Err(e) => last_err = Some(e),
                }
            }
            Err(last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
            }))
        }
        #[cfg(unix)]
        Endpoint::Unix(path) => {
            let stream = UnixStream::connect(path)?;
            remaining(deadline)?;
            Ok(Stream::Unix(stream))
        }
        #[cfg(not(unix))]
        Endpoint::Unix(_) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unix sockets are not available on this platform",
        )),
    }
}
