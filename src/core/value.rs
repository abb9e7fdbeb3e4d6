/// Value Model Module
///
/// Backend-agnostic values, rows and the semantic types used by the
/// formatting layer, plus the pure formatting helpers adapters build on.
use crate::core::{DriverError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A single database value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Loose truthiness: NULL, false, zero, "", "0" and empty blobs are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Real(f) => *f != 0.0,
            Value::Text(s) => !(s.is_empty() || s == "0"),
            Value::Blob(b) => !b.is_empty(),
            Value::Date(_) | Value::DateTime(_) => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interprets the value as a point in time. Numbers are unix timestamps (UTC).
    pub fn to_datetime(&self) -> Result<NaiveDateTime> {
        let from_secs = |secs: i64| {
            DateTime::<Utc>::from_timestamp(secs, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| DriverError::InvalidArgument(format!("timestamp {} out of range", secs)))
        };

        match self {
            Value::Integer(secs) => from_secs(*secs),
            Value::Real(secs) if secs.is_finite() => from_secs(secs.trunc() as i64),
            Value::Text(s) => match s.trim().parse::<i64>() {
                Ok(secs) => from_secs(secs),
                Err(_) => Err(DriverError::InvalidArgument(format!(
                    "'{}' is not a unix timestamp",
                    s
                ))),
            },
            Value::Date(d) => d
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| DriverError::InvalidArgument(format!("invalid date {}", d))),
            Value::DateTime(dt) => Ok(*dt),
            other => Err(DriverError::InvalidArgument(format!(
                "{:?} cannot be formatted as a date",
                other
            ))),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", if *b { 1 } else { 0 }),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::types::ValueRef<'_>> for Value {
    fn from(value: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// One fetched row: column name to value, in result column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    /// Looks a value up by column name. With duplicate names the last column wins.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .rev()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> Vec<&str> {
        self.values.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Collapses the row into a name-keyed map, later duplicates overwriting earlier ones.
    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.values.into_iter().collect()
    }
}

/// Formatting-layer classification of a value, independent of backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Text,
    Binary,
    Bool,
    Integer,
    Float,
    Date,
    DateTime,
    Time,
    Identifier,
    Unknown,
}

/// A value rendered for inclusion in SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedValue {
    Literal(String),
    Integer(i64),
}

impl fmt::Display for FormattedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormattedValue::Literal(s) => f.write_str(s),
            FormattedValue::Integer(i) => write!(f, "{}", i),
        }
    }
}

/// Quotes a string literal: single quotes around, embedded quotes doubled.
pub fn quote_text(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for ch in text.chars() {
        if ch == '\'' {
            quoted.push('\'');
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    quoted
}

/// `'YYYY-MM-DD'`
pub fn format_date(value: &Value) -> Result<String> {
    Ok(value.to_datetime()?.format("'%Y-%m-%d'").to_string())
}

/// `'YYYY-MM-DD HH:MM:SS'`
pub fn format_datetime(value: &Value) -> Result<String> {
    Ok(value.to_datetime()?.format("'%Y-%m-%d %H:%M:%S'").to_string())
}

/// Shared formatting rules for adapters whose backend quotes text with
/// standard SQL literals and cannot quote identifiers.
///
/// Identifiers pass through untouched; never feed untrusted input to
/// `SemanticType::Identifier`.
pub fn format_standard(value: &Value, semantic_type: SemanticType) -> Result<FormattedValue> {
    match semantic_type {
        SemanticType::Text => {
            let text = value.to_string();
            // A NUL ends the statement text for most backends.
            if text.contains('\0') {
                return Err(DriverError::InvalidArgument(
                    "text literal contains a NUL character".to_string(),
                ));
            }
            Ok(FormattedValue::Literal(quote_text(&text)))
        }
        SemanticType::Identifier => Ok(FormattedValue::Literal(value.to_string())),
        SemanticType::Bool => Ok(FormattedValue::Integer(if value.is_truthy() { 1 } else { 0 })),
        SemanticType::Date => format_date(value).map(FormattedValue::Literal),
        SemanticType::DateTime => format_datetime(value).map(FormattedValue::Literal),
        other => Err(DriverError::InvalidArgument(format!(
            "Unsupported formatting type: {:?}",
            other
        ))),
    }
}
