use crate::channel::TelemetryChannel;
use crate::config::{SinkError, SinkLifecycle, SinkOptions};
use crate::event::{to_exception_event, to_trace_event};
use crate::record::LogRecord;
use futures::{pin_mut, Stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;

/// Drives a log-record stream end-to-end: classify, filter, translate,
/// dispatch — one record at a time, in arrival order.
///
/// There is no internal buffering and no concurrency between records;
/// the next record is pulled only after the current dispatch call has
/// been accepted, so pacing is governed entirely by the upstream stream
/// and the channel.
pub struct StreamProcessor {
    client: Option<Arc<dyn TelemetryChannel>>,
    min_level: i64,
}

impl StreamProcessor {
    /// Resolve the client from the options and build a processor.
    ///
    /// A missing client is not an error here: it only becomes one when
    /// a dispatchable record arrives, per [`SinkError::Unconfigured`].
    pub fn new(options: &SinkOptions) -> Result<Self, SinkError> {
        let mut lifecycle = SinkLifecycle::new();
        lifecycle.configure(options)?;
        Ok(Self::with_lifecycle(&lifecycle, options.min_level))
    }

    /// Build a processor around an externally managed lifecycle.
    pub fn with_lifecycle(lifecycle: &SinkLifecycle, min_level: i64) -> Self {
        Self { client: lifecycle.client(), min_level }
    }

    /// Consume the stream until the source signals end-of-stream.
    ///
    /// Returns the first fatal error ([`SinkError::Unconfigured`] or a
    /// channel failure); skips are not errors and do not stop the loop.
    pub async fn run<S>(&self, stream: S) -> Result<(), SinkError>
    where
        S: Stream<Item = Value>,
    {
        pin_mut!(stream);
        while let Some(value) = stream.next().await {
            self.process(value).await?;
        }
        Ok(())
    }

    /// Handle a single value from the stream.
    pub async fn process(&self, value: Value) -> Result<(), SinkError> {
        if value.is_null() {
            return Ok(());
        }

        let Some(record) = LogRecord::classify(value) else {
            tracing::debug!("skipping value that is not a log record");
            return Ok(());
        };

        // NaN levels fail this comparison and fall through to dispatch.
        if record.level() < self.min_level as f64 {
            return Ok(());
        }

        let client = self.client.as_deref().ok_or(SinkError::Unconfigured)?;

        if record.has_err() {
            let event = to_exception_event(&record);
            client.track_exception(&event).await.map_err(SinkError::Channel)?;
        } else {
            let event = to_trace_event(&record);
            client.track_trace(&event).await.map_err(SinkError::Channel)?;
        }

        Ok(())
    }
}
