//! Host-side values: what callers pass to actions and what coerced rows hold.

use std::collections::BTreeMap;

use serde_json::Value;
use time::macros::format_description;
use time::PrimitiveDateTime;

use crate::account::Account;
use crate::asset::Asset;

#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Passed through as-is.
    Wire(Value),
    Bool(bool),
    /// A `time_point_sec`, always UTC.
    Timestamp(PrimitiveDateTime),
    Asset(Asset),
    /// Reduced to its name on the wire.
    Account(Account),
    Array(Vec<HostValue>),
    Struct(BTreeMap<String, HostValue>),
    Variant(Box<VariantValue>),
}

/// The tagged form of a variant. On the wire it is `[index, value]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantValue {
    pub index: usize,
    pub value: HostValue,
}

impl HostValue {
    pub fn variant(index: usize, value: HostValue) -> Self {
        HostValue::Variant(Box::new(VariantValue { index, value }))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_asset(&self) -> Option<&Asset> {
        match self {
            HostValue::Asset(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<PrimitiveDateTime> {
        match self {
            HostValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn to_wire(&self) -> Value {
        match self {
            HostValue::Wire(v) => v.clone(),
            HostValue::Bool(b) => Value::Bool(*b),
            HostValue::Timestamp(t) => Value::String(format_time_point_sec(*t)),
            HostValue::Asset(a) => Value::String(a.to_string()),
            HostValue::Account(a) => Value::String(a.name.clone()),
            HostValue::Array(items) => Value::Array(items.iter().map(HostValue::to_wire).collect()),
            HostValue::Struct(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect(),
            ),
            HostValue::Variant(v) => Value::Array(vec![Value::from(v.index), v.value.to_wire()]),
        }
    }
}

impl From<Value> for HostValue {
    fn from(v: Value) -> Self {
        HostValue::Wire(v)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Wire(Value::String(s.to_string()))
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<Asset> for HostValue {
    fn from(a: Asset) -> Self {
        HostValue::Asset(a)
    }
}

impl From<Account> for HostValue {
    fn from(a: Account) -> Self {
        HostValue::Account(a)
    }
}

impl From<PrimitiveDateTime> for HostValue {
    fn from(t: PrimitiveDateTime) -> Self {
        HostValue::Timestamp(t)
    }
}

/// `2024-05-01T12:30:00`: no offset, no fraction.
pub fn format_time_point_sec(t: PrimitiveDateTime) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        t.year(),
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    )
}

/// Accepts the chain's `time_point_sec` text, optionally with a fractional
/// second part, which is dropped.
pub fn parse_time_point_sec(text: &str) -> Option<PrimitiveDateTime> {
    let (whole, frac) = match text.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (text, None),
    };
    if let Some(frac) = frac {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    PrimitiveDateTime::parse(whole, &format).ok()
}
