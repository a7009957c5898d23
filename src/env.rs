/// Environment variable names used by this crate for convenient
/// configuration from the host process.
///
/// These are purely helpers; the core types remain decoupled from
/// environment access.

/// Application Insights connection string, e.g.
/// `InstrumentationKey=...;IngestionEndpoint=https://...`.
pub const CONNECTION_STRING_ENV: &str = "APPLICATIONINSIGHTS_CONNECTION_STRING";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating absence as `None`.
pub fn env_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
