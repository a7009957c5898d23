//! Forward a handful of pino-style records to Application Insights.
//!
//! Reads the connection string from APPLICATIONINSIGHTS_CONNECTION_STRING:
//!
//! ```sh
//! APPLICATIONINSIGHTS_CONNECTION_STRING="InstrumentationKey=..." \
//!     cargo run --example forward_stream
//! ```

use appinsights_log_sink::{SinkOptions, StreamProcessor};
use futures::stream;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let options = SinkOptions::default();
    let processor = StreamProcessor::new(&options)?;

    let records = stream::iter(vec![
        json!({"level": 30, "msg": "service started", "port": 8080}),
        json!({"level": 40, "msg": "cache miss", "key": "user:42"}),
        json!({
            "level": 50,
            "msg": "request failed",
            "err": {"message": "upstream timeout", "cause": {"message": "connect ETIMEDOUT"}},
            "request_id": "3f1c",
        }),
    ]);

    processor.run(records).await?;

    // Give the background ingestion task a moment to ship its batch.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    Ok(())
}
