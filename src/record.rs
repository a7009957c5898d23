use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A validated log record: a JSON object that exposes a `level` key.
///
/// Records arrive from the upstream source as arbitrary values; use
/// [`LogRecord::classify`] to turn a value into a typed record instead
/// of poking at fields optimistically. All other keys are carried
/// through verbatim as event properties.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord(Map<String, Value>);

/// Returns `true` iff the value is a JSON object with a `level` key.
///
/// No type check is applied to the level's value beyond presence; a
/// record with `"level": 0` qualifies, an empty object does not.
pub fn is_log_record(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key("level"),
        _ => false,
    }
}

/// Returns `true` iff the value exposes a `message` key, i.e. looks like
/// a structured error payload rather than a bare string or opaque value.
pub fn is_error_like(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key("message"),
        _ => false,
    }
}

impl LogRecord {
    /// Validate an arbitrary value as a log record.
    ///
    /// Returns `None` for anything [`is_log_record`] rejects; the caller
    /// treats that as a skip, not an error.
    pub fn classify(value: Value) -> Option<LogRecord> {
        match value {
            Value::Object(map) if map.contains_key("level") => Some(LogRecord(map)),
            _ => None,
        }
    }

    /// Numeric level of the record.
    ///
    /// A non-numeric `level` yields NaN, which fails every `<` threshold
    /// comparison and maps to `Verbose`, mirroring loose upstream input.
    pub fn level(&self) -> f64 {
        self.0.get("level").and_then(Value::as_f64).unwrap_or(f64::NAN)
    }

    /// The record's `msg` field, if it is a string.
    pub fn msg(&self) -> Option<&str> {
        self.0.get("msg").and_then(Value::as_str)
    }

    /// The record's `time` field interpreted as epoch milliseconds.
    ///
    /// Zero, absent, and non-numeric times all yield `None`; the sink
    /// applies its own ingestion timestamp in that case.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        let millis = self.0.get("time").and_then(Value::as_i64)?;
        if millis == 0 {
            return None;
        }
        DateTime::from_timestamp_millis(millis)
    }

    /// The raw `err` field, without interpretation.
    pub fn err(&self) -> Option<&Value> {
        self.0.get("err")
    }

    /// Whether the record carries an error payload.
    ///
    /// Follows the upstream source's truthiness rules: `null`, `false`,
    /// `""` and `0` do not count as errors.
    pub fn has_err(&self) -> bool {
        match self.0.get("err") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64() != Some(0.0),
            Some(_) => true,
        }
    }

    /// Shallow copy of the record with `msg` and `time` removed, and
    /// `err` removed as well when `strip_err` is set. Every other key,
    /// including `level`, is carried through verbatim.
    pub fn properties(&self, strip_err: bool) -> Map<String, Value> {
        let mut props = self.0.clone();
        props.remove("msg");
        props.remove("time");
        if strip_err {
            props.remove("err");
        }
        props
    }
}
