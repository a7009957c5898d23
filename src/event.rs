use crate::exception::{reconstruct, CanonicalError, ErrorRepr};
use crate::record::LogRecord;
use crate::severity::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Non-error telemetry item: a message plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    pub message: String,
    pub severity: Severity,
    pub properties: Map<String, Value>,
    pub time: Option<DateTime<Utc>>,
}

/// Error-carrying telemetry item: a canonical error plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExceptionEvent {
    pub exception: CanonicalError,
    pub severity: Severity,
    pub properties: Map<String, Value>,
    pub time: Option<DateTime<Utc>>,
}

/// Message for the event: the record's `msg` when non-empty, otherwise
/// the severity name. The severity substitutes only as a last resort so
/// no event goes out empty.
fn derive_message(record: &LogRecord, severity: Severity) -> String {
    match record.msg() {
        Some(msg) if !msg.is_empty() => msg.to_string(),
        _ => severity.to_string(),
    }
}

/// Build a [`TraceEvent`] from a classified record.
pub fn to_trace_event(record: &LogRecord) -> TraceEvent {
    let severity = Severity::from_level(record.level());
    TraceEvent {
        message: derive_message(record, severity),
        severity,
        properties: record.properties(false),
        time: record.time(),
    }
}

/// Build an [`ExceptionEvent`] from a classified record.
///
/// The derived message is not emitted directly; it serves as the
/// reconstruction fallback when the error payload carries no message.
pub fn to_exception_event(record: &LogRecord) -> ExceptionEvent {
    let severity = Severity::from_level(record.level());
    let message = derive_message(record, severity);
    let exception = reconstruct(ErrorRepr::classify(record.err()), &message);
    ExceptionEvent {
        exception,
        severity,
        properties: record.properties(true),
        time: record.time(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> LogRecord {
        LogRecord::classify(value).unwrap()
    }

    #[test]
    fn trace_event_carries_message_and_extras() {
        let event = to_trace_event(&record(json!({
            "level": 30,
            "msg": "hi",
            "time": 1700000000000i64,
            "user": "alice",
        })));
        assert_eq!(event.message, "hi");
        assert_eq!(event.severity, Severity::Information);
        assert_eq!(event.properties.get("user"), Some(&json!("alice")));
        assert_eq!(event.properties.get("level"), Some(&json!(30)));
        assert!(!event.properties.contains_key("msg"));
        assert!(!event.properties.contains_key("time"));
        assert_eq!(event.time.unwrap().timestamp_millis(), 1700000000000);
    }

    #[test]
    fn missing_message_falls_back_to_severity_name() {
        let event = to_trace_event(&record(json!({"level": 40})));
        assert_eq!(event.message, "Warning");

        let event = to_trace_event(&record(json!({"level": 40, "msg": ""})));
        assert_eq!(event.message, "Warning");
    }

    #[test]
    fn exception_event_reconstructs_error_and_strips_err() {
        let event = to_exception_event(&record(json!({
            "level": 50,
            "msg": "oops",
            "err": {"message": "bad state", "cause": {"message": "root"}},
            "request_id": "abc",
        })));
        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.exception.message, "bad state");
        assert_eq!(event.exception.cause.as_deref().unwrap().message, "root");
        assert!(!event.properties.contains_key("err"));
        assert_eq!(event.properties.get("request_id"), Some(&json!("abc")));
        assert!(event.time.is_none());
    }

    #[test]
    fn exception_fallback_uses_derived_message() {
        // err carries no message of its own, so the record message wins.
        let event = to_exception_event(&record(json!({"level": 50, "msg": "oops", "err": {"code": 1}})));
        assert_eq!(event.exception.message, "oops");

        // No record message either: severity name is the last resort.
        let event = to_exception_event(&record(json!({"level": 60, "err": {"code": 1}})));
        assert_eq!(event.exception.message, "Critical");
    }

    #[test]
    fn translation_is_idempotent() {
        let rec = record(json!({"level": 50, "msg": "oops", "err": {"message": "x"}, "k": 1}));
        assert_eq!(to_exception_event(&rec), to_exception_event(&rec));

        let rec = record(json!({"level": 30, "msg": "hi", "k": 1}));
        assert_eq!(to_trace_event(&rec), to_trace_event(&rec));
    }
}
