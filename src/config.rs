use crate::channel::TelemetryChannel;
use crate::env::{env_or_none, CONNECTION_STRING_ENV};
use std::error::Error;
use std::sync::Arc;

#[cfg(feature = "ingestion")]
use crate::ingestion::{ConnectionStringError, IngestionChannel};

/// Options accepted by the sink at startup.
///
/// `Default` mirrors the conventional setup: no pre-built client, the
/// connection string taken from `APPLICATIONINSIGHTS_CONNECTION_STRING`
/// when present, and a minimum level of 10 so trace-level records are
/// the only thing filtered out.
#[derive(Clone)]
pub struct SinkOptions {
    /// Pre-built channel to adopt as-is, bypassing construction.
    pub telemetry_client: Option<Arc<dyn TelemetryChannel>>,
    /// Connection string used to construct the ingestion channel. When
    /// both this and `telemetry_client` are set, construction wins and
    /// overwrites the adopted client (last-applied order, kept from the
    /// original transport).
    pub connection_string: Option<String>,
    /// Records with a `level` below this threshold are skipped.
    pub min_level: i64,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            telemetry_client: None,
            connection_string: env_or_none(CONNECTION_STRING_ENV),
            min_level: 10,
        }
    }
}

/// Errors surfaced by configuration and stream processing.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// A dispatchable record arrived before any client was configured.
    /// Signals a startup bug, so it terminates the stream.
    #[error("You must either provide a TelemetryClient instance or a connection string.")]
    Unconfigured,

    #[cfg(feature = "ingestion")]
    #[error("invalid connection string")]
    ConnectionString(#[from] ConnectionStringError),

    #[cfg(not(feature = "ingestion"))]
    #[error("ingestion feature is not enabled")]
    IngestionFeatureDisabled,

    #[error("telemetry channel error: {0}")]
    Channel(#[source] Box<dyn Error + Send + Sync>),
}

/// Holds the process-wide telemetry client: unconfigured until
/// [`configure`](SinkLifecycle::configure) resolves one, then terminal
/// for the rest of the process lifetime.
#[derive(Default)]
pub struct SinkLifecycle {
    client: Option<Arc<dyn TelemetryChannel>>,
}

impl SinkLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the client from the options, once.
    ///
    /// An adopted `telemetry_client` is applied first; a
    /// `connection_string` then constructs a fresh ingestion channel and
    /// overwrites it. If neither option is set the lifecycle stays
    /// unconfigured and dispatch will fail later with
    /// [`SinkError::Unconfigured`].
    pub fn configure(&mut self, options: &SinkOptions) -> Result<(), SinkError> {
        // Configured is terminal; a second call cannot replace the client.
        if self.client.is_some() {
            return Ok(());
        }

        if let Some(client) = &options.telemetry_client {
            self.client = Some(Arc::clone(client));
        }

        if let Some(connection_string) = &options.connection_string {
            #[cfg(feature = "ingestion")]
            {
                let (channel, _task) = IngestionChannel::from_connection_string(connection_string)?;
                self.client = Some(Arc::new(channel));
            }

            #[cfg(not(feature = "ingestion"))]
            {
                let _ = connection_string;
                return Err(SinkError::IngestionFeatureDisabled);
            }
        }

        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Handle to the configured client, if any.
    pub fn client(&self) -> Option<Arc<dyn TelemetryChannel>> {
        self.client.clone()
    }
}
