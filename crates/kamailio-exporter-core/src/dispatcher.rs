//! `dispatcher.list` reply parsing.
//!
//! The reply nests four levels deep:
//!
//! ```text
//! RECORDS
//!   SET { ID, TARGETS }
//!     TARGETS
//!       DEST { URI, FLAGS, PRIORITY, ATTRS { BODY, WEIGHT, RWEIGHT, SOCKET },
//!              LATENCY { AVG, STD, EST, MAX, TIMEOUT } }
//! ```
//!
//! Parsing flattens it into one [`DispatcherTarget`] per DEST, tagged with the
//! ID of its set. Unknown keys are skipped at every level; a known key holding
//! the wrong variant fails the whole parse.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::record::{Record, StructItem, TypeMismatch};

/// One dispatcher destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatcherTarget {
    pub set_id: i64,
    pub uri: String,
    pub flags: String,
    /// 1 when the destination is active and probing (`FLAGS == "AP"`).
    pub status: u8,
    pub priority: i64,
    pub body: String,
    pub weight: i64,
    pub rweight: i64,
    pub socket: String,
    pub latency_avg: f64,
    pub latency_std: f64,
    pub latency_est: f64,
    pub latency_max: f64,
    pub latency_timeout: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatcherParseError {
    /// `key` held a value of the wrong type.
    Shape {
        key: &'static str,
        source: TypeMismatch,
    },
    /// A SET without an ID.
    MissingSetId,
}

impl fmt::Display for DispatcherParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatcherParseError::Shape { key, source } => write!(f, "{}: {}", key, source),
            DispatcherParseError::MissingSetId => {
                write!(f, "missing set ID while parsing dispatcher.list")
            }
        }
    }
}

impl std::error::Error for DispatcherParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatcherParseError::Shape { source, .. } => Some(source),
            DispatcherParseError::MissingSetId => None,
        }
    }
}

type Result<T> = std::result::Result<T, DispatcherParseError>;

fn shape<T>(key: &'static str, r: std::result::Result<T, TypeMismatch>) -> Result<T> {
    r.map_err(|source| DispatcherParseError::Shape { key, source })
}

/// Flattens a `dispatcher.list` reply into its targets, in reply order.
///
/// Top-level records that are not structs are ignored.
pub fn parse_dispatcher_targets(records: &[Record]) -> Result<Vec<DispatcherTarget>> {
    let mut targets = Vec::new();
    for record in records {
        let Ok(items) = record.as_struct_items() else {
            continue;
        };
        for item in items.iter().filter(|i| i.key == "RECORDS") {
            for set in shape("RECORDS", item.value.as_struct_items())? {
                if set.key != "SET" {
                    continue;
                }
                let set_items = shape("SET", set.value.as_struct_items())?;
                parse_set(set_items, &mut targets)?;
            }
        }
    }
    Ok(targets)
}

fn parse_set(items: &[StructItem], out: &mut Vec<DispatcherTarget>) -> Result<()> {
    let mut set_id = None;
    let mut destinations: &[StructItem] = &[];

    for item in items {
        match item.key.as_str() {
            "ID" => set_id = Some(shape("ID", item.value.as_int())?),
            "TARGETS" => destinations = shape("TARGETS", item.value.as_struct_items())?,
            _ => {}
        }
    }

    let set_id = set_id.ok_or(DispatcherParseError::MissingSetId)?;

    for dest in destinations.iter().filter(|d| d.key == "DEST") {
        let props = shape("DEST", dest.value.as_struct_items())?;
        out.push(parse_destination(set_id, props)?);
    }
    Ok(())
}

fn parse_destination(set_id: i64, props: &[StructItem]) -> Result<DispatcherTarget> {
    let mut target = DispatcherTarget {
        set_id,
        ..Default::default()
    };

    for prop in props {
        match prop.key.as_str() {
            "URI" => target.uri = shape("URI", prop.value.as_str())?.to_string(),
            "FLAGS" => {
                target.flags = shape("FLAGS", prop.value.as_str())?.to_string();
                target.status = u8::from(target.flags == "AP");
            }
            "PRIORITY" => target.priority = shape("PRIORITY", prop.value.as_int())?,
            "ATTRS" => parse_attrs(&mut target, shape("ATTRS", prop.value.as_struct_items())?)?,
            "LATENCY" => {
                parse_latency(&mut target, shape("LATENCY", prop.value.as_struct_items())?)?
            }
            _ => {}
        }
    }
    Ok(target)
}

fn parse_attrs(target: &mut DispatcherTarget, attrs: &[StructItem]) -> Result<()> {
    for attr in attrs {
        match attr.key.as_str() {
            "BODY" => target.body = shape("BODY", attr.value.as_str())?.to_string(),
            "WEIGHT" => target.weight = shape("WEIGHT", attr.value.as_int())?,
            "RWEIGHT" => target.rweight = shape("RWEIGHT", attr.value.as_int())?,
            "SOCKET" => target.socket = shape("SOCKET", attr.value.as_str())?.to_string(),
            _ => {}
        }
    }
    Ok(())
}

fn parse_latency(target: &mut DispatcherTarget, latency: &[StructItem]) -> Result<()> {
    for item in latency {
        match item.key.as_str() {
            "AVG" => target.latency_avg = shape("AVG", item.value.as_number())?,
            "STD" => target.latency_std = shape("STD", item.value.as_number())?,
            "EST" => target.latency_est = shape("EST", item.value.as_number())?,
            "MAX" => target.latency_max = shape("MAX", item.value.as_number())?,
            "TIMEOUT" => target.latency_timeout = shape("TIMEOUT", item.value.as_number())?,
            _ => {}
        }
    }
    Ok(())
}

/// Builds the set ID to name map from `ID:NAME` entries.
///
/// Entries that are not exactly `<int>:<name>` are dropped with a warning.
pub fn parse_dispatcher_mapping<S: AsRef<str>>(entries: &[S]) -> HashMap<i64, String> {
    let mut mapping = HashMap::new();
    for entry in entries {
        let entry = entry.as_ref();
        let parts: Vec<&str> = entry.split(':').collect();
        let [id, name] = parts.as_slice() else {
            warn!(dispatcher = entry, "invalid dispatcher mapping, ignoring entry");
            continue;
        };
        match id.trim().parse::<i64>() {
            Ok(id) => {
                mapping.insert(id, name.to_string());
            }
            Err(e) => {
                warn!(dispatcher = entry, error = %e, "invalid dispatcher set ID, ignoring entry");
            }
        }
    }
    mapping
}
