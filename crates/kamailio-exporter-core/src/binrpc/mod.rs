//! BINRPC wire codec, as spoken by Kamailio's `ctl` module.
//!
//! # Packet layout
//!
//! ```text
//! +------+--------------------------+-------------+-------------+--------------+
//! | 0xA1 | flags | len_sz | ck_sz   | body length | cookie      | body records |
//! | 1 B  | 4 bit | 2 bit  | 2 bit   | len_sz+1 B  | ck_sz+1 B   | ...          |
//! +------+--------------------------+-------------+-------------+--------------+
//! ```
//!
//! Every body record starts with one header byte `S | size(3) | type(4)`.
//! With `S` clear, `size` is the value length; with `S` set, `size` is the
//! number of big-endian bytes that follow and hold the value length. A struct
//! is opened by a plain struct header and closed by a struct header with `S`
//! set; its members are AVP name records each followed by a value record.

mod decode;
mod encode;

pub use decode::{decode_body, decode_packet, read_packet};
pub use encode::{encode_packet, encode_request};

use std::fmt;
use std::io;

use crate::record::Record;

/// High nibble of the first header byte.
pub const MAGIC: u8 = 0xA;
/// Protocol version, low nibble of the first header byte.
pub const PROTOCOL_VERSION: u8 = 0x1;
/// Reply flag: the body carries a fault (int code + string message).
pub const FLAG_FAULT: u8 = 0x1;
/// Largest packet body accepted from the peer.
pub const MAX_BODY_LEN: usize = 1024 * 1024;

pub(crate) const TYPE_INT: u8 = 0;
pub(crate) const TYPE_STRING: u8 = 1;
pub(crate) const TYPE_DOUBLE: u8 = 2;
pub(crate) const TYPE_STRUCT: u8 = 3;
pub(crate) const TYPE_ARRAY: u8 = 4;
pub(crate) const TYPE_AVP: u8 = 5;
pub(crate) const TYPE_BYTES: u8 = 6;

/// Record header bit marking an out-of-line length (or a struct end).
pub(crate) const EXTENDED: u8 = 0x80;

/// One decoded packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub flags: u8,
    pub cookie: u32,
    pub records: Vec<Record>,
}

impl Packet {
    pub fn is_fault(&self) -> bool {
        self.flags & FLAG_FAULT != 0
    }
}

/// Malformed or incomplete BINRPC input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended before a declared length was satisfied.
    Truncated { needed: usize, available: usize },
    /// First byte is not `0xA1`.
    BadHeader(u8),
    /// Record type this decoder does not handle (arrays, unknown tags).
    UnsupportedType(u8),
    /// Structurally invalid record stream.
    Malformed(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Truncated { needed, available } => {
                write!(f, "truncated input: needed {} bytes, got {}", needed, available)
            }
            DecodeError::BadHeader(b) => write!(f, "bad packet header byte 0x{:02x}", b),
            DecodeError::UnsupportedType(t) => write!(f, "unsupported record type {}", t),
            DecodeError::Malformed(msg) => write!(f, "malformed record stream: {}", msg),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Failure while reading a packet from a byte stream.
#[derive(Debug)]
pub enum ReadError {
    Io(io::Error),
    Decode(DecodeError),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "I/O error: {}", e),
            ReadError::Decode(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e)
    }
}

impl From<DecodeError> for ReadError {
    fn from(e: DecodeError) -> Self {
        ReadError::Decode(e)
    }
}

/// Number of big-endian bytes needed to hold `v` (at least one).
pub(crate) fn byte_width(v: u32) -> usize {
    match v {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}
