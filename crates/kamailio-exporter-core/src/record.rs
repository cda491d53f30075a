//! Decoded BINRPC values.
//!
//! Every reply from the control socket is a list of [`Record`] trees. A
//! record is immutable once decoded and lives only as long as the collector
//! that requested it.

use std::fmt;

/// Variant tag of a [`Record`], used in type mismatch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Int,
    String,
    Double,
    Struct,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Int => "int",
            RecordKind::String => "string",
            RecordKind::Double => "double",
            RecordKind::Struct => "struct",
        };
        f.write_str(name)
    }
}

/// A single decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Int(i64),
    String(String),
    Double(f64),
    /// Ordered key/value members. Keys may repeat.
    Struct(Vec<StructItem>),
}

/// One member of a struct record.
#[derive(Debug, Clone, PartialEq)]
pub struct StructItem {
    pub key: String,
    pub value: Record,
}

impl StructItem {
    pub fn new(key: impl Into<String>, value: Record) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Accessor called on the wrong record variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMismatch {
    pub expected: RecordKind,
    pub found: RecordKind,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type mismatch: expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for TypeMismatch {}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Int(_) => RecordKind::Int,
            Record::String(_) => RecordKind::String,
            Record::Double(_) => RecordKind::Double,
            Record::Struct(_) => RecordKind::Struct,
        }
    }

    fn mismatch(&self, expected: RecordKind) -> TypeMismatch {
        TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_int(&self) -> Result<i64, TypeMismatch> {
        match self {
            Record::Int(v) => Ok(*v),
            other => Err(other.mismatch(RecordKind::Int)),
        }
    }

    pub fn as_str(&self) -> Result<&str, TypeMismatch> {
        match self {
            Record::String(s) => Ok(s),
            other => Err(other.mismatch(RecordKind::String)),
        }
    }

    pub fn as_double(&self) -> Result<f64, TypeMismatch> {
        match self {
            Record::Double(v) => Ok(*v),
            other => Err(other.mismatch(RecordKind::Double)),
        }
    }

    /// Numeric value of an int or double record.
    ///
    /// Kamailio sends some figures (dispatcher latency max/timeout) as ints
    /// on one version and doubles on another.
    pub fn as_number(&self) -> Result<f64, TypeMismatch> {
        match self {
            Record::Int(v) => Ok(*v as f64),
            Record::Double(v) => Ok(*v),
            other => Err(other.mismatch(RecordKind::Double)),
        }
    }

    pub fn as_struct_items(&self) -> Result<&[StructItem], TypeMismatch> {
        match self {
            Record::Struct(items) => Ok(items),
            other => Err(other.mismatch(RecordKind::Struct)),
        }
    }

    /// Looks up a struct member by key.
    ///
    /// Returns the first member with a matching key; later duplicates are
    /// ignored. Returns `None` for non-struct records.
    pub fn get(&self, key: &str) -> Option<&Record> {
        match self {
            Record::Struct(items) => items.iter().find(|i| i.key == key).map(|i| &i.value),
            _ => None,
        }
    }

    /// Textual form used for flat stat tables. Structs have none.
    pub fn to_stat_string(&self) -> Option<String> {
        match self {
            Record::String(s) => Some(s.clone()),
            Record::Int(v) => Some(v.to_string()),
            Record::Double(v) => Some(v.to_string()),
            Record::Struct(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::Struct(vec![
            StructItem::new("name", Record::String("location".into())),
            StructItem::new("slots", Record::Int(1024)),
            StructItem::new("name", Record::String("shadowed".into())),
        ])
    }

    #[test]
    fn accessors_return_type_mismatch_on_wrong_variant() {
        let r = Record::String("abc".into());
        let err = r.as_int().unwrap_err();
        assert_eq!(err.expected, RecordKind::Int);
        assert_eq!(err.found, RecordKind::String);
        assert_eq!(err.to_string(), "type mismatch: expected int, found string");

        assert!(Record::Int(1).as_struct_items().is_err());
        assert!(Record::Double(1.5).as_str().is_err());
    }

    #[test]
    fn get_returns_first_match() {
        let r = sample();
        assert_eq!(r.get("name").unwrap().as_str().unwrap(), "location");
        assert_eq!(r.get("slots").unwrap().as_int().unwrap(), 1024);
        assert!(r.get("missing").is_none());
        assert!(Record::Int(3).get("name").is_none());
    }

    #[test]
    fn as_number_accepts_int_and_double() {
        assert_eq!(Record::Int(7).as_number().unwrap(), 7.0);
        assert_eq!(Record::Double(0.25).as_number().unwrap(), 0.25);
        assert!(Record::String("7".into()).as_number().is_err());
    }

    #[test]
    fn absent_field_degrades_to_default() {
        let r = sample();
        let expire = r.get("expire").and_then(|v| v.as_int().ok()).unwrap_or_default();
        assert_eq!(expire, 0);
        let slots = r.get("name").and_then(|v| v.as_int().ok()).unwrap_or_default();
        assert_eq!(slots, 0);
    }

    #[test]
    fn stat_string_rendering() {
        assert_eq!(Record::String("42".into()).to_stat_string().as_deref(), Some("42"));
        assert_eq!(Record::Int(-3).to_stat_string().as_deref(), Some("-3"));
        assert_eq!(Record::Double(1.5).to_stat_string().as_deref(), Some("1.5"));
        assert_eq!(sample().to_stat_string(), None);
    }
}
