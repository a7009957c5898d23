use crate::event::{ExceptionEvent, TraceEvent};
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for translated telemetry events.
///
/// Implementations transport events to a concrete backend (the bundled
/// Application Insights ingestion client, or anything injected via
/// [`SinkOptions::telemetry_client`](crate::config::SinkOptions)). The
/// dispatch methods are accept-only: returning `Ok(())` means the event
/// was handed to the transport, not that the backend acknowledged it —
/// delivery durability is the implementation's own concern.
#[async_trait]
pub trait TelemetryChannel: Send + Sync {
    /// Record a non-error trace event.
    ///
    /// **Returns**
    /// - `Ok(())` if the event was accepted by the transport.
    /// - `Err(..)` if the transport rejected it. The stream processor
    ///   treats this as fatal and stops consuming.
    async fn track_trace(&self, event: &TraceEvent) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Record an error-carrying exception event. Same contract as
    /// [`track_trace`](TelemetryChannel::track_trace).
    async fn track_exception(
        &self,
        event: &ExceptionEvent,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered events, if the transport buffers.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
