pub mod channel;
pub mod config;
pub mod env;
pub mod event;
pub mod exception;
pub mod noop;
pub mod processor;
pub mod record;
pub mod severity;

#[cfg(feature = "ingestion")]
pub mod ingestion;

pub use channel::TelemetryChannel;
pub use config::{SinkError, SinkLifecycle, SinkOptions};
pub use event::{to_exception_event, to_trace_event, ExceptionEvent, TraceEvent};
pub use exception::{reconstruct, CanonicalError, ErrorRepr};
pub use processor::StreamProcessor;
pub use record::LogRecord;
pub use severity::Severity;
