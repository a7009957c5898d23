use appinsights_log_sink::{
    ExceptionEvent, Severity, SinkError, SinkLifecycle, SinkOptions, StreamProcessor,
    TelemetryChannel, TraceEvent,
};
use async_trait::async_trait;
use futures::stream;
use serde_json::json;
use std::error::Error;
use std::sync::{Arc, Mutex};

/// Records every dispatch call so tests can assert on what the sink saw.
#[derive(Default)]
struct RecordingChannel {
    traces: Mutex<Vec<TraceEvent>>,
    exceptions: Mutex<Vec<ExceptionEvent>>,
    fail: bool,
}

#[async_trait]
impl TelemetryChannel for RecordingChannel {
    async fn track_trace(&self, event: &TraceEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.fail {
            return Err("trace rejected".into());
        }
        self.traces.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn track_exception(
        &self,
        event: &ExceptionEvent,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.fail {
            return Err("exception rejected".into());
        }
        self.exceptions.lock().unwrap().push(event.clone());
        Ok(())
    }
}

fn processor_with(channel: Arc<RecordingChannel>, min_level: i64) -> StreamProcessor {
    let mut lifecycle = SinkLifecycle::new();
    lifecycle
        .configure(&SinkOptions {
            telemetry_client: Some(channel),
            connection_string: None,
            min_level,
        })
        .unwrap();
    StreamProcessor::with_lifecycle(&lifecycle, min_level)
}

#[tokio::test]
async fn forwards_records_in_order_as_traces_and_exceptions() {
    let channel = Arc::new(RecordingChannel::default());
    let processor = processor_with(Arc::clone(&channel), 10);

    let records = stream::iter(vec![
        json!({"level": 30, "msg": "first"}),
        json!({"level": 50, "msg": "second", "err": "bad"}),
        json!({"level": 40, "msg": "third"}),
    ]);
    processor.run(records).await.unwrap();

    let traces = channel.traces.lock().unwrap();
    assert_eq!(traces.len(), 2);
    assert_eq!(traces[0].message, "first");
    assert_eq!(traces[0].severity, Severity::Information);
    assert_eq!(traces[1].message, "third");
    assert_eq!(traces[1].severity, Severity::Warning);

    let exceptions = channel.exceptions.lock().unwrap();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].severity, Severity::Error);
}

#[tokio::test]
async fn below_threshold_record_reaches_no_sink() {
    let channel = Arc::new(RecordingChannel::default());
    let processor = processor_with(Arc::clone(&channel), 10);

    processor
        .run(stream::iter(vec![json!({"level": 5, "msg": "hi"})]))
        .await
        .unwrap();

    assert!(channel.traces.lock().unwrap().is_empty());
    assert!(channel.exceptions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn error_record_produces_exactly_one_exception_call() {
    let channel = Arc::new(RecordingChannel::default());
    let processor = processor_with(Arc::clone(&channel), 10);

    processor
        .run(stream::iter(vec![json!({
            "level": 50,
            "msg": "oops",
            "time": 1700000000000i64,
            "err": "bad",
            "request_id": "abc",
        })]))
        .await
        .unwrap();

    assert!(channel.traces.lock().unwrap().is_empty());
    let exceptions = channel.exceptions.lock().unwrap();
    assert_eq!(exceptions.len(), 1);

    let event = &exceptions[0];
    assert_eq!(event.severity, Severity::Error);
    // The string payload keeps its own message; "oops" is only the fallback.
    assert_eq!(event.exception.message, "bad");
    assert!(event.exception.stack.is_some());
    assert!(!event.properties.contains_key("msg"));
    assert!(!event.properties.contains_key("time"));
    assert!(!event.properties.contains_key("err"));
    assert_eq!(event.properties.get("request_id"), Some(&json!("abc")));
    assert_eq!(event.time.unwrap().timestamp_millis(), 1700000000000);
}

#[tokio::test]
async fn falsy_error_payload_still_goes_out_as_a_trace() {
    let channel = Arc::new(RecordingChannel::default());
    let processor = processor_with(Arc::clone(&channel), 10);

    processor
        .run(stream::iter(vec![json!({"level": 50, "msg": "oops", "err": null})]))
        .await
        .unwrap();

    assert_eq!(channel.traces.lock().unwrap().len(), 1);
    assert!(channel.exceptions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unconfigured_sink_terminates_the_stream() {
    let mut lifecycle = SinkLifecycle::new();
    lifecycle
        .configure(&SinkOptions {
            telemetry_client: None,
            connection_string: None,
            min_level: 10,
        })
        .unwrap();
    let processor = StreamProcessor::with_lifecycle(&lifecycle, 10);

    let result = processor
        .run(stream::iter(vec![
            json!({"level": 5, "msg": "skipped fine"}),
            json!({"level": 30, "msg": "fatal here"}),
        ]))
        .await;
    assert!(matches!(result, Err(SinkError::Unconfigured)));
}

#[tokio::test]
async fn channel_failure_propagates_out_of_the_loop() {
    let channel = Arc::new(RecordingChannel { fail: true, ..Default::default() });
    let processor = processor_with(Arc::clone(&channel), 10);

    let result = processor
        .run(stream::iter(vec![json!({"level": 30, "msg": "hi"})]))
        .await;
    assert!(matches!(result, Err(SinkError::Channel(_))));
}
