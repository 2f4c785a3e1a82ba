//! Data points rendered as InfluxDB line protocol.

use chrono::{DateTime, Utc};
use errors::{ClientResult, InfluxClientError};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Timestamp precision of a written point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePrecision {
    S,
    Ms,
    Us,
    #[default]
    Ns
}

impl WritePrecision {
    /// Value of the `precision` query parameter of the write endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "s",
            Self::Ms => "ms",
            Self::Us => "us",
            Self::Ns => "ns"
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    UInteger(u64),
    Bool(bool),
    String(String)
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::UInteger(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// A single measurement with tags, fields and an optional timestamp.
///
/// ```rust
/// use chrono::Utc;
/// use influxdb_testing::{Point, WritePrecision};
///
/// let point = Point::measurement("cpu")
///     .tag("host", "server01")
///     .field("idle", 90_i64)
///     .time(Utc::now(), WritePrecision::Ms);
/// assert!(point.to_line_protocol().unwrap().starts_with("cpu,host=server01 idle=90i "));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    time: Option<(DateTime<Utc>, WritePrecision)>
}

impl Point {
    pub fn measurement(name: impl Into<String>) -> Self {
        Self {
            measurement: name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            time: None
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn time(mut self, time: DateTime<Utc>, precision: WritePrecision) -> Self {
        self.time = Some((time, precision));
        self
    }

    /// Precision of the timestamp, if the point carries one.
    pub fn precision(&self) -> Option<WritePrecision> {
        self.time.map(|(_, precision)| precision)
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Render the point as one line of line protocol.
    ///
    /// Tags with an empty value are skipped; the server rejects them.
    pub fn to_line_protocol(&self) -> ClientResult<String> {
        if self.measurement.is_empty() {
            return Err(invalid("measurement name is empty"));
        }
        if self.fields.is_empty() {
            return Err(invalid(&format!(
                "measurement {} has no fields",
                self.measurement
            )));
        }

        reject_line_break("measurement", &self.measurement)?;
        let mut line = escape(&self.measurement, &[',', ' ']);

        for (key, value) in &self.tags {
            if key.is_empty() || value.is_empty() {
                continue;
            }
            reject_line_break("tag key", key)?;
            reject_line_break("tag value", value)?;
            let _ = write!(
                line,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            );
        }

        let mut separator = ' ';
        for (key, value) in &self.fields {
            let rendered = match value {
                FieldValue::Float(v) if !v.is_finite() => {
                    return Err(invalid(&format!("field {} is not a finite number", key)));
                }
                FieldValue::Float(v) => v.to_string(),
                FieldValue::Integer(v) => format!("{}i", v),
                FieldValue::UInteger(v) => format!("{}u", v),
                FieldValue::Bool(v) => v.to_string(),
                FieldValue::String(v) => format!("\"{}\"", escape(v, &['"', '\\']))
            };
            reject_line_break("field key", key)?;
            let _ = write!(line, "{}{}={}", separator, escape(key, &[',', '=', ' ']), rendered);
            separator = ',';
        }

        if let Some((time, precision)) = self.time {
            let timestamp = match precision {
                WritePrecision::S => time.timestamp(),
                WritePrecision::Ms => time.timestamp_millis(),
                WritePrecision::Us => time.timestamp_micros(),
                WritePrecision::Ns => time
                    .timestamp_nanos_opt()
                    .ok_or_else(|| invalid("timestamp out of range for nanosecond precision"))?
            };
            let _ = write!(line, " {}", timestamp);
        }

        Ok(line)
    }
}

fn escape(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Only quoted string field values may span lines.
fn reject_line_break(what: &str, text: &str) -> ClientResult<()> {
    if text.contains(['\n', '\r']) {
        return Err(invalid(&format!("{} {:?} contains a line break", what, text)));
    }
    Ok(())
}

fn invalid(reason: &str) -> InfluxClientError {
    InfluxClientError::InvalidPoint {
        reason: reason.to_string()
    }
}
