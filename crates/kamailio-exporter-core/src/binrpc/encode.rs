//! Packet and record encoding.

use super::{
    EXTENDED, MAGIC, PROTOCOL_VERSION, TYPE_AVP, TYPE_DOUBLE, TYPE_INT, TYPE_STRING, TYPE_STRUCT,
    byte_width,
};
use crate::record::Record;

const COOKIE_SIZE: usize = 4;

/// Encodes a request: the command name followed by each argument, all as
/// string records.
pub fn encode_request(cookie: u32, command: &str, args: &[&str]) -> Vec<u8> {
    let mut body = Vec::with_capacity(command.len() + 16);
    encode_string(&mut body, TYPE_STRING, command);
    for arg in args {
        encode_string(&mut body, TYPE_STRING, arg);
    }
    frame(0, cookie, &body)
}

/// Encodes an arbitrary packet. Used for replies by test servers.
pub fn encode_packet(flags: u8, cookie: u32, records: &[Record]) -> Vec<u8> {
    let mut body = Vec::new();
    for record in records {
        encode_record(&mut body, record);
    }
    frame(flags, cookie, &body)
}

fn frame(flags: u8, cookie: u32, body: &[u8]) -> Vec<u8> {
    let body_len = body.len() as u32;
    let len_size = byte_width(body_len);

    let mut out = Vec::with_capacity(2 + len_size + COOKIE_SIZE + body.len());
    out.push((MAGIC << 4) | PROTOCOL_VERSION);
    out.push(((flags & 0x0F) << 4) | (((len_size - 1) as u8) << 2) | (COOKIE_SIZE - 1) as u8);
    out.extend_from_slice(&body_len.to_be_bytes()[4 - len_size..]);
    out.extend_from_slice(&cookie.to_be_bytes());
    out.extend_from_slice(body);
    out
}

fn encode_record(buf: &mut Vec<u8>, record: &Record) {
    match record {
        Record::Int(v) => encode_int(buf, TYPE_INT, *v as i32),
        Record::String(s) => encode_string(buf, TYPE_STRING, s),
        Record::Double(v) => encode_int(buf, TYPE_DOUBLE, (v * 1000.0).round() as i32),
        Record::Struct(items) => {
            buf.push(TYPE_STRUCT);
            for item in items {
                encode_string(buf, TYPE_AVP, &item.key);
                encode_record(buf, &item.value);
            }
            buf.push(EXTENDED | TYPE_STRUCT);
        }
    }
}

fn write_header(buf: &mut Vec<u8>, typ: u8, len: usize) {
    if len <= 7 {
        buf.push(((len as u8) << 4) | typ);
    } else {
        let len = len as u32;
        let width = byte_width(len);
        buf.push(EXTENDED | ((width as u8) << 4) | typ);
        buf.extend_from_slice(&len.to_be_bytes()[4 - width..]);
    }
}

// Zero encodes as an empty value.
fn encode_int(buf: &mut Vec<u8>, typ: u8, v: i32) {
    let bits = v as u32;
    let width = if bits == 0 { 0 } else { byte_width(bits) };
    write_header(buf, typ, width);
    buf.extend_from_slice(&bits.to_be_bytes()[4 - width..]);
}

fn encode_string(buf: &mut Vec<u8>, typ: u8, s: &str) {
    write_header(buf, typ, s.len() + 1);
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StructItem;

    #[test]
    fn request_layout() {
        let bytes = encode_request(0x01020304, "core.psa", &[]);
        // "core.psa" + NUL = 9 bytes, needs an extended length byte.
        assert_eq!(bytes[0], 0xA1);
        assert_eq!(bytes[1], 0x03); // no flags, 1 length byte, 4 cookie bytes
        assert_eq!(bytes[2] as usize, bytes.len() - 7);
        assert_eq!(&bytes[3..7], &[1, 2, 3, 4]);
        assert_eq!(bytes[7], 0x91); // S=1, one length byte, string
        assert_eq!(bytes[8], 9);
        assert_eq!(&bytes[9..17], b"core.psa");
        assert_eq!(bytes[17], 0);
    }

    #[test]
    fn short_string_uses_inline_length() {
        let bytes = encode_request(7, "all", &[]);
        assert_eq!(&bytes[7..], &[0x41, b'a', b'l', b'l', 0]);
    }

    #[test]
    fn int_encoding_is_minimal() {
        let mut buf = Vec::new();
        encode_int(&mut buf, TYPE_INT, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_int(&mut buf, TYPE_INT, 300);
        assert_eq!(buf, vec![0x20, 0x01, 0x2C]);

        buf.clear();
        encode_int(&mut buf, TYPE_INT, -1);
        assert_eq!(buf, vec![0x40, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn struct_markers() {
        let mut buf = Vec::new();
        encode_record(
            &mut buf,
            &Record::Struct(vec![StructItem::new("a", Record::Int(1))]),
        );
        assert_eq!(buf, vec![0x03, 0x25, b'a', 0, 0x10, 0x01, 0x83]);
    }

    #[test]
    fn long_body_uses_wider_length_field() {
        let long = "x".repeat(300);
        let bytes = encode_request(1, &long, &[]);
        // Body is 3 header bytes + 301 string bytes = 304, two length bytes.
        assert_eq!(bytes[1], 0x07);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 304);
    }
}
