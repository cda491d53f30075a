//! Packet and record decoding.
//!
//! Decoding never panics on malformed input; every short read surfaces as
//! [`DecodeError::Truncated`].

use std::io::{self, Read};

use super::{
    DecodeError, EXTENDED, MAGIC, MAX_BODY_LEN, PROTOCOL_VERSION, Packet, ReadError, TYPE_ARRAY,
    TYPE_AVP, TYPE_BYTES, TYPE_DOUBLE, TYPE_INT, TYPE_STRING, TYPE_STRUCT,
};
use crate::record::{Record, StructItem};

const MAX_DEPTH: usize = 32;

struct PacketHeader {
    flags: u8,
    body_len: usize,
    cookie: u32,
}

/// Total header length implied by the first two bytes.
fn header_len(prefix: [u8; 2]) -> Result<usize, DecodeError> {
    if prefix[0] != (MAGIC << 4) | PROTOCOL_VERSION {
        return Err(DecodeError::BadHeader(prefix[0]));
    }
    let len_size = ((prefix[1] >> 2) & 0x03) as usize + 1;
    let cookie_size = (prefix[1] & 0x03) as usize + 1;
    Ok(2 + len_size + cookie_size)
}

fn parse_header(header: &[u8]) -> Result<PacketHeader, DecodeError> {
    let len_size = ((header[1] >> 2) & 0x03) as usize + 1;
    let body_len = be_uint(&header[2..2 + len_size]) as usize;
    if body_len > MAX_BODY_LEN {
        return Err(DecodeError::Malformed("declared body length too large"));
    }
    let cookie = be_uint(&header[2 + len_size..]);
    Ok(PacketHeader {
        flags: header[1] >> 4,
        body_len,
        cookie,
    })
}

fn be_uint(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

/// Decodes a complete packet held in memory.
pub fn decode_packet(buf: &[u8]) -> Result<Packet, DecodeError> {
    let mut cur = Cursor::new(buf);
    let prefix = cur.take(2)?;
    let header_len = header_len([prefix[0], prefix[1]])?;
    cur.take(header_len - 2)?;
    let header = parse_header(&buf[..header_len])?;
    let body = cur.take(header.body_len)?;
    Ok(Packet {
        flags: header.flags,
        cookie: header.cookie,
        records: decode_body(body)?,
    })
}

/// Reads exactly one packet from a byte stream.
///
/// The whole declared body is consumed before decoding, so the stream stays
/// aligned on packet boundaries even when the body turns out to be invalid.
pub fn read_packet<R: Read>(reader: &mut R) -> Result<Packet, ReadError> {
    let mut header = [0u8; 10];
    fill(reader, &mut header[..2])?;
    let header_len = header_len([header[0], header[1]])?;
    fill(reader, &mut header[2..header_len])?;
    let header = parse_header(&header[..header_len])?;

    let mut body = vec![0u8; header.body_len];
    fill(reader, &mut body)?;

    Ok(Packet {
        flags: header.flags,
        cookie: header.cookie,
        records: decode_body(&body)?,
    })
}

fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), ReadError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(DecodeError::Truncated {
                    needed: buf.len(),
                    available: filled,
                }
                .into());
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Decodes a packet body into its top-level records.
pub fn decode_body(body: &[u8]) -> Result<Vec<Record>, DecodeError> {
    let mut cur = Cursor::new(body);
    let mut records = Vec::new();
    while !cur.is_empty() {
        match cur.header()? {
            Header::StructEnd => return Err(DecodeError::Malformed("unexpected struct end")),
            Header::Value { typ: TYPE_AVP, .. } => {
                return Err(DecodeError::Malformed("member name outside struct"));
            }
            Header::Value { typ, len } => records.push(cur.value(typ, len, 0)?),
        }
    }
    Ok(records)
}

enum Header {
    Value { typ: u8, len: usize },
    StructEnd,
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.buf.len() - self.pos;
        if n > available {
            return Err(DecodeError::Truncated {
                needed: n,
                available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn header(&mut self) -> Result<Header, DecodeError> {
        let h = self.take(1)?[0];
        let typ = h & 0x0F;
        let size = ((h >> 4) & 0x07) as usize;

        if h & EXTENDED == 0 {
            return Ok(Header::Value { typ, len: size });
        }
        if typ == TYPE_STRUCT {
            return Ok(Header::StructEnd);
        }
        if size == 0 || size > 4 {
            return Err(DecodeError::Malformed("invalid length field width"));
        }
        let len = be_uint(self.take(size)?) as usize;
        Ok(Header::Value { typ, len })
    }

    fn value(&mut self, typ: u8, len: usize, depth: usize) -> Result<Record, DecodeError> {
        match typ {
            TYPE_INT => Ok(Record::Int(self.int(len)? as i64)),
            TYPE_DOUBLE => Ok(Record::Double(self.int(len)? as f64 / 1000.0)),
            TYPE_STRING | TYPE_AVP => Ok(Record::String(self.string(len)?)),
            TYPE_BYTES => Ok(Record::String(
                String::from_utf8_lossy(self.take(len)?).into_owned(),
            )),
            TYPE_STRUCT => self.structure(depth + 1),
            TYPE_ARRAY => Err(DecodeError::UnsupportedType(typ)),
            other => Err(DecodeError::UnsupportedType(other)),
        }
    }

    fn int(&mut self, len: usize) -> Result<i32, DecodeError> {
        if len > 4 {
            return Err(DecodeError::Malformed("integer wider than 32 bits"));
        }
        Ok(be_uint(self.take(len)?) as i32)
    }

    fn string(&mut self, len: usize) -> Result<String, DecodeError> {
        let raw = self.take(len)?;
        let raw = raw.strip_suffix(b"\0").unwrap_or(raw);
        Ok(String::from_utf8_lossy(raw).into_owned())
    }

    fn structure(&mut self, depth: usize) -> Result<Record, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::Malformed("structs nested too deeply"));
        }
        let mut items = Vec::new();
        loop {
            let key = match self.header()? {
                Header::StructEnd => return Ok(Record::Struct(items)),
                Header::Value { typ: TYPE_AVP, len } => self.string(len)?,
                Header::Value { .. } => {
                    return Err(DecodeError::Malformed("struct member without name"));
                }
            };
            let value = match self.header()? {
                Header::StructEnd => {
                    return Err(DecodeError::Malformed("struct member without value"));
                }
                Header::Value { typ: TYPE_AVP, .. } => {
                    return Err(DecodeError::Malformed("struct member name without value"));
                }
                Header::Value { typ, len } => self.value(typ, len, depth)?,
            };
            items.push(StructItem { key, value });
        }
    }
}
