use crate::channel::TelemetryChannel;
use crate::event::{ExceptionEvent, TraceEvent};
use async_trait::async_trait;
use std::error::Error;

/// A channel that simply drops all events.
///
/// Useful for measuring the overhead of translation without any
/// external I/O, and for unit tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopChannel;

#[async_trait]
impl TelemetryChannel for NoopChannel {
    async fn track_trace(&self, _event: &TraceEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }

    async fn track_exception(
        &self,
        _event: &ExceptionEvent,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
