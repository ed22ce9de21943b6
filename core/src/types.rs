//! Request parameter types.
//!
//! # Design
//! `ParamValue` makes the loose "string, number, boolean, date or date-like
//! string" inputs an explicit tagged variant, each with its own query and
//! JSON encoding. `Params` keeps insertion order because both the query
//! string and the JSON body are emitted in mapping order.

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use crate::error::DispatchError;
use crate::iso8601::{format_iso8601, parse_iso8601};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Present in the mapping but skipped by every encoding.
    Undefined,
    Null,
    Bool(bool),
    Number(Numeric),
    String(String),
    DateTime(DateTime<Utc>),
}

/// A number as it was supplied: integers keep their exact value, everything
/// else is a double.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Numeric {
    fn to_query_value(self) -> String {
        match self {
            Numeric::Int(i) => i.to_string(),
            Numeric::UInt(u) => u.to_string(),
            Numeric::Float(f) => format_number(f),
        }
    }

    fn to_json_value(self) -> Value {
        match self {
            Numeric::Int(i) => Value::from(i),
            Numeric::UInt(u) => Value::from(u),
            Numeric::Float(f) => Number::from_f64(f)
                .map(|num| match num.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
                        Value::from(f as i64)
                    }
                    _ => Value::Number(num),
                })
                .unwrap_or(Value::Null),
        }
    }
}

impl From<&Number> for Numeric {
    fn from(number: &Number) -> Self {
        if let Some(i) = number.as_i64() {
            Numeric::Int(i)
        } else if let Some(u) = number.as_u64() {
            Numeric::UInt(u)
        } else {
            Numeric::Float(number.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl ParamValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, ParamValue::Undefined)
    }

    /// Query-string form of the value, or `None` when it must be skipped.
    ///
    /// Date-times and strings that parse as ISO-8601 are rendered as
    /// `YYYY-MM-DDTHH:MM:SS.sssZ`; everything else uses its plain form.
    pub fn to_query_value(&self) -> Option<String> {
        let encoded = match self {
            ParamValue::Undefined => return None,
            ParamValue::Null => "null".to_string(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Number(n) => n.to_query_value(),
            ParamValue::String(s) => match parse_iso8601(s) {
                Some(parsed) => format_iso8601(&parsed),
                None => s.clone(),
            },
            ParamValue::DateTime(dt) => format_iso8601(dt),
        };
        Some(encoded)
    }

    /// JSON form of the value, or `None` when it must be skipped.
    ///
    /// Strings are sent verbatim; only real date-times are rendered.
    /// Non-finite numbers have no JSON form and become `null`.
    pub fn to_json_value(&self) -> Option<Value> {
        let value = match self {
            ParamValue::Undefined => return None,
            ParamValue::Null => Value::Null,
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Number(n) => n.to_json_value(),
            ParamValue::String(s) => Value::String(s.clone()),
            ParamValue::DateTime(dt) => Value::String(format_iso8601(dt)),
        };
        Some(value)
    }
}

/// Plain string form of a double, as JavaScript's `Number#toString` prints
/// it: shortest round-trip digits, integral values without a fraction,
/// exponent notation below `1e-6` and from `1e21` up, and `NaN`, `Infinity`,
/// `-Infinity` for non-finite values.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest digits, e.g. `1.2345e3`.
    let scientific = format!("{:e}", n.abs());
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return n.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return n.to_string();
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let len = digits.len() as i32;
    // Position of the decimal point relative to the first digit.
    let point = exponent + 1;

    let magnitude = if len <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - len) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat(-point as usize))
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{lead}e{sign}{}", exponent.abs())
        } else {
            format!("{lead}.{rest}e{sign}{}", exponent.abs())
        }
    };

    if n < 0.0 {
        format!("-{magnitude}")
    } else {
        magnitude
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Numeric> for ParamValue {
    fn from(value: Numeric) -> Self {
        ParamValue::Number(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(Numeric::Float(value))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(Numeric::Int(value))
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Number(Numeric::Int(i64::from(value)))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Number(Numeric::Int(i64::from(value)))
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Number(Numeric::UInt(value))
    }
}

impl From<DateTime<Utc>> for ParamValue {
    fn from(value: DateTime<Utc>) -> Self {
        ParamValue::DateTime(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Undefined)
    }
}

/// Ordered, flat parameter mapping.
///
/// Inserting an existing key replaces its value but keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode as `?key=value&key=value&`.
    ///
    /// Keys and values are not percent-encoded and the trailing `&` is kept.
    pub fn to_query(&self) -> String {
        let mut query = String::from("?");
        for (key, value) in &self.entries {
            if let Some(encoded) = value.to_query_value() {
                query.push_str(key);
                query.push('=');
                query.push_str(&encoded);
                query.push('&');
            }
        }
        query
    }

    /// JSON object of every defined entry, in mapping order.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .filter_map(|(k, v)| v.to_json_value().map(|json| (k.clone(), json)))
            .collect();
        Value::Object(map)
    }

    pub fn to_json_body(&self) -> Result<String, DispatchError> {
        serde_json::to_string(&self.to_json()).map_err(DispatchError::Encode)
    }

    /// Build a mapping from a flat JSON object.
    ///
    /// Nested arrays and objects are rejected. Integers keep their exact
    /// value. Strings stay strings, so date-like text is still normalized by
    /// the query encoding.
    pub fn from_json_object(value: &Value) -> Result<Self, DispatchError> {
        let Value::Object(map) = value else {
            return Err(DispatchError::InvalidParams("expected a JSON object".to_string()));
        };

        let mut params = Params::new();
        for (key, value) in map {
            let value = match value {
                Value::Null => ParamValue::Null,
                Value::Bool(b) => ParamValue::Bool(*b),
                Value::Number(n) => ParamValue::Number(Numeric::from(n)),
                Value::String(s) => ParamValue::String(s.clone()),
                Value::Array(_) | Value::Object(_) => {
                    return Err(DispatchError::InvalidParams(format!(
                        "parameter {key} is not a scalar"
                    )));
                }
            };
            params.insert(key.clone(), value);
        }
        Ok(params)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}
