//! Field values and backend commands shared by every protocol adaptor.
//!
//! Backend command vocabularies mix strings, numbers, flags and field bags in
//! one positional argument list. [`FieldValue`] is the closed set of values
//! such a list may carry, and [`Command`] is the tagged form of one call: a
//! command name plus its ordered arguments.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A bag of named hit fields. Iteration order carries no meaning.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Callback the backend invokes once a hit has been handed off.
#[derive(Clone)]
pub struct HitCallback(Arc<dyn Fn() + Send + Sync>);

impl HitCallback {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn invoke(&self) {
        (self.0)()
    }
}

impl fmt::Debug for HitCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HitCallback(..)")
    }
}

impl PartialEq for HitCallback {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

/// One value inside a hit's field bag or a command's argument list.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<FieldValue>),
    Map(FieldMap),
    Callback(HitCallback),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&FieldMap> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut FieldMap> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Loose truthiness: null, `false`, zero, NaN and the empty string are
    /// falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Int(i) => *i != 0,
            FieldValue::Float(f) => *f != 0.0 && !f.is_nan(),
            FieldValue::String(s) => !s.is_empty(),
            FieldValue::List(_) | FieldValue::Map(_) | FieldValue::Callback(_) => true,
        }
    }

    /// Integer coercion with `parseInt` semantics: floats truncate toward
    /// zero, strings parse their leading decimal digits, and anything that
    /// yields no digits becomes `0`.
    pub fn to_integer(&self) -> i64 {
        match self {
            FieldValue::Int(i) => *i,
            FieldValue::Float(f) if f.is_finite() => f.trunc() as i64,
            FieldValue::String(s) => parse_leading_integer(s).unwrap_or(0),
            _ => 0,
        }
    }

    /// Text form used when a value lands in a string-only position.
    pub fn to_text(&self) -> Option<String> {
        match self {
            FieldValue::Null | FieldValue::Callback(_) => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::List(_) | FieldValue::Map(_) => serde_json::to_string(self).ok(),
        }
    }
}

fn parse_leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<FieldMap> for FieldValue {
    fn from(v: FieldMap) -> Self {
        FieldValue::Map(v)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(v: Vec<FieldValue>) -> Self {
        FieldValue::List(v)
    }
}

impl From<HitCallback> for FieldValue {
    fn from(v: HitCallback) -> Self {
        FieldValue::Callback(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(obj) => FieldValue::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null | FieldValue::Callback(_) => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Int(i) => serializer.serialize_i64(*i),
            FieldValue::Float(f) => serializer.serialize_f64(*f),
            FieldValue::String(s) => serializer.serialize_str(s),
            FieldValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            FieldValue::Map(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(FieldValue::from)
    }
}

/// Closed set of canonical hit kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum HitType {
    Pageview,
    Event,
    Exception,
    Timing,
    SetUserProperties,
    EcommerceRequire,
    EcommerceAddTransaction,
    EcommerceAddItem,
    EcommerceSend,
}

impl HitType {
    pub fn as_str(self) -> &'static str {
        match self {
            HitType::Pageview => "pageview",
            HitType::Event => "event",
            HitType::Exception => "exception",
            HitType::Timing => "timing",
            HitType::SetUserProperties => "setUserProperties",
            HitType::EcommerceRequire => "ecommerceRequire",
            HitType::EcommerceAddTransaction => "ecommerceAddTransaction",
            HitType::EcommerceAddItem => "ecommerceAddItem",
            HitType::EcommerceSend => "ecommerceSend",
        }
    }
}

impl fmt::Display for HitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One protocol-native backend call: a possibly account-namespaced command
/// name followed by its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub args: Vec<FieldValue>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<FieldValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// The trailing field bag, if the command carries one.
    pub fn fields(&self) -> Option<&FieldMap> {
        self.args.last().and_then(FieldValue::as_map)
    }

    pub fn fields_mut(&mut self) -> Option<&mut FieldMap> {
        self.args.last_mut().and_then(FieldValue::as_map_mut)
    }

    /// Independent copy addressed to a named tracker: `"<account>.<name>"`.
    pub fn namespaced(&self, account: &str) -> Command {
        Command {
            name: format!("{account}.{}", self.name),
            args: self.args.clone(),
        }
    }

    /// Flatten into the positional form pushed onto a command queue.
    pub fn to_positional(&self) -> Vec<FieldValue> {
        std::iter::once(FieldValue::String(self.name.clone()))
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.args.len() + 1))?;
        seq.serialize_element(&self.name)?;
        for arg in &self.args {
            seq.serialize_element(arg)?;
        }
        seq.end()
    }
}
