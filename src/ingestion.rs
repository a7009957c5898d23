use crate::channel::TelemetryChannel;
use crate::event::{ExceptionEvent, TraceEvent};
use crate::exception::CanonicalError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// Ingestion endpoint used when the connection string does not name one.
pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";

/// Configuration for [`IngestionChannel`].
///
/// The channel talks to the Application Insights track endpoint over
/// HTTP, posting envelope batches in the newline-delimited JSON stream
/// format the service accepts.
#[derive(Clone, Debug)]
pub struct IngestionConfig {
    pub instrumentation_key: String,
    /// Base URL without path, e.g. "https://dc.services.visualstudio.com".
    pub endpoint: String,
    /// Maximum queued envelopes before new events are dropped.
    pub buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl IngestionConfig {
    /// Parse an Application Insights connection string, e.g.
    /// `InstrumentationKey=...;IngestionEndpoint=https://...`.
    ///
    /// Keys are matched case-insensitively; unknown keys are ignored.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, ConnectionStringError> {
        if connection_string.trim().is_empty() {
            return Err(ConnectionStringError::Empty);
        }

        let mut instrumentation_key = None;
        let mut endpoint = None;

        for segment in connection_string.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::MalformedSegment(segment.to_string()))?;
            if key.trim().eq_ignore_ascii_case("InstrumentationKey") {
                instrumentation_key = Some(value.trim().to_string());
            } else if key.trim().eq_ignore_ascii_case("IngestionEndpoint") {
                endpoint = Some(value.trim().trim_end_matches('/').to_string());
            }
        }

        let instrumentation_key = instrumentation_key
            .filter(|k| !k.is_empty())
            .ok_or(ConnectionStringError::MissingInstrumentationKey)?;

        Ok(IngestionConfig {
            instrumentation_key,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_INGESTION_ENDPOINT.to_string()),
            buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
        })
    }
}

/// Error type returned when parsing a connection string.
#[derive(thiserror::Error, Debug)]
pub enum ConnectionStringError {
    #[error("connection string is empty")]
    Empty,

    #[error("connection string has no InstrumentationKey")]
    MissingInstrumentationKey,

    #[error("malformed connection string segment: {0:?}")]
    MalformedSegment(String),
}

enum Command {
    Track(Envelope),
    Flush(oneshot::Sender<()>),
}

/// Application Insights implementation of [`TelemetryChannel`].
///
/// Dispatch calls enqueue envelopes into a bounded channel; a background
/// task owns the HTTP client and ships batches, so `track_*` never waits
/// on network I/O. When the queue is full the event is dropped and
/// counted rather than blocking the caller.
#[derive(Clone)]
pub struct IngestionChannel {
    sender: mpsc::Sender<Command>,
    instrumentation_key: String,
    /// Successfully enqueued envelopes.
    pub submitted_events: Arc<AtomicU64>,
    /// Dropped because the queue was full.
    pub dropped_events: Arc<AtomicU64>,
}

impl IngestionChannel {
    /// Create a channel and spawn the background task that drains it.
    ///
    /// Minimal thresholds are enforced for `buffer`, `batch_size` and
    /// `flush_interval` to avoid degenerate configurations. The task
    /// exits after the last clone of the channel is dropped and the
    /// queue has been flushed.
    pub fn new(config: IngestionConfig) -> (Self, JoinHandle<()>) {
        let buffer = config.buffer.max(16);
        let batch_size = config.batch_size.max(1);
        let flush_interval = config.flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<Command>(buffer);

        let submitted_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));

        let url = format!("{}/v2.1/track", config.endpoint);
        let handle = tokio::spawn(async move {
            let client = Client::new();
            let mut batch: Vec<Envelope> = Vec::with_capacity(batch_size);

            loop {
                tokio::select! {
                    command = rx.recv() => match command {
                        Some(Command::Track(envelope)) => {
                            batch.push(envelope);
                            if batch.len() >= batch_size {
                                send_batch(&client, &url, &mut batch).await;
                            }
                        }
                        Some(Command::Flush(ack)) => {
                            if !batch.is_empty() {
                                send_batch(&client, &url, &mut batch).await;
                            }
                            let _ = ack.send(());
                        }
                        None => {
                            if !batch.is_empty() {
                                send_batch(&client, &url, &mut batch).await;
                            }
                            break;
                        }
                    },
                    _ = sleep(flush_interval) => {
                        if !batch.is_empty() {
                            send_batch(&client, &url, &mut batch).await;
                        }
                    }
                }
            }
        });

        (
            Self {
                sender: tx,
                instrumentation_key: config.instrumentation_key,
                submitted_events,
                dropped_events,
            },
            handle,
        )
    }

    /// Convenience constructor from a raw connection string.
    pub fn from_connection_string(
        connection_string: &str,
    ) -> Result<(Self, JoinHandle<()>), ConnectionStringError> {
        Ok(Self::new(IngestionConfig::from_connection_string(connection_string)?))
    }

    fn submit(&self, envelope: Envelope) -> Result<(), Box<dyn Error + Send + Sync>> {
        match self.sender.try_send(Command::Track(envelope)) {
            Ok(()) => {
                self.submitted_events.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("ingestion queue full, dropping telemetry envelope");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err("ingestion background task is gone".into())
            }
        }
    }
}

async fn send_batch(client: &Client, url: &str, batch: &mut Vec<Envelope>) {
    let mut body = String::new();
    for envelope in batch.iter() {
        match serde_json::to_string(envelope) {
            Ok(line) => {
                body.push_str(&line);
                body.push('\n');
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode telemetry envelope"),
        }
    }

    let mut backoff = Duration::from_millis(100);
    for attempt in 0..3 {
        let result = client
            .post(url)
            .header("Content-Type", "application/x-json-stream")
            .body(body.clone())
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                batch.clear();
                return;
            }
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), attempt, "track endpoint rejected batch");
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "failed to reach track endpoint");
            }
        }

        sleep(backoff).await;
        backoff *= 2;
    }

    // Delivery is best-effort; after the retry budget the batch is gone.
    tracing::warn!(envelopes = batch.len(), "dropping telemetry batch after repeated failures");
    batch.clear();
}

#[async_trait]
impl TelemetryChannel for IngestionChannel {
    async fn track_trace(&self, event: &TraceEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.submit(Envelope::message(&self.instrumentation_key, event))
    }

    async fn track_exception(
        &self,
        event: &ExceptionEvent,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.submit(Envelope::exception(&self.instrumentation_key, event))
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Command::Flush(tx))
            .await
            .map_err(|_| "ingestion background task is gone")?;
        rx.await.map_err(|_| "ingestion background task is gone")?;
        Ok(())
    }
}

/// One item in the track request body.
#[derive(Serialize)]
struct Envelope {
    name: String,
    time: String,
    #[serde(rename = "iKey")]
    ikey: String,
    data: EnvelopeData,
}

#[derive(Serialize)]
struct EnvelopeData {
    #[serde(rename = "baseType")]
    base_type: &'static str,
    #[serde(rename = "baseData")]
    base_data: BaseData,
}

#[derive(Serialize)]
#[serde(untagged)]
enum BaseData {
    Message(MessageData),
    Exception(ExceptionData),
}

#[derive(Serialize)]
struct MessageData {
    ver: u8,
    message: String,
    #[serde(rename = "severityLevel")]
    severity_level: u8,
    properties: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct ExceptionData {
    ver: u8,
    exceptions: Vec<ExceptionDetails>,
    #[serde(rename = "severityLevel")]
    severity_level: u8,
    properties: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct ExceptionDetails {
    id: u32,
    #[serde(rename = "outerId")]
    outer_id: u32,
    #[serde(rename = "typeName")]
    type_name: &'static str,
    message: String,
    #[serde(rename = "hasFullStack")]
    has_full_stack: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

impl Envelope {
    fn message(ikey: &str, event: &TraceEvent) -> Envelope {
        Envelope {
            name: format!("Microsoft.ApplicationInsights.{}.Message", ikey.replace('-', "")),
            time: event.time.unwrap_or_else(Utc::now).to_rfc3339(),
            ikey: ikey.to_string(),
            data: EnvelopeData {
                base_type: "MessageData",
                base_data: BaseData::Message(MessageData {
                    ver: 2,
                    message: event.message.clone(),
                    severity_level: event.severity.wire_level(),
                    properties: stringify_properties(&event.properties),
                }),
            },
        }
    }

    fn exception(ikey: &str, event: &ExceptionEvent) -> Envelope {
        Envelope {
            name: format!("Microsoft.ApplicationInsights.{}.Exception", ikey.replace('-', "")),
            time: event.time.unwrap_or_else(Utc::now).to_rfc3339(),
            ikey: ikey.to_string(),
            data: EnvelopeData {
                base_type: "ExceptionData",
                base_data: BaseData::Exception(ExceptionData {
                    ver: 2,
                    exceptions: flatten_chain(&event.exception),
                    severity_level: event.severity.wire_level(),
                    properties: stringify_properties(&event.properties),
                }),
            },
        }
    }
}

/// The cause chain, outermost first, linked through `outerId`.
fn flatten_chain(error: &CanonicalError) -> Vec<ExceptionDetails> {
    let mut details = Vec::with_capacity(error.chain_len());
    let mut current = Some(error);
    let mut id = 1;
    while let Some(error) = current {
        details.push(ExceptionDetails {
            id,
            outer_id: if id == 1 { 0 } else { id - 1 },
            type_name: "Error",
            message: error.message.clone(),
            has_full_stack: error.stack.is_some(),
            stack: error.stack.clone(),
        });
        current = error.cause.as_deref();
        id += 1;
    }
    details
}

/// The track endpoint wants string-valued custom properties; strings
/// pass through unquoted, everything else keeps its JSON rendering.
fn stringify_properties(properties: &Map<String, Value>) -> BTreeMap<String, String> {
    properties
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}
