use crate::record::is_error_like;
use serde::Serialize;
use serde_json::Value;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

/// Normalized error representation carried by an exception event.
///
/// Owns its cause chain as a simple tree; constructed once per record
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalError {
    pub message: String,
    pub stack: Option<String>,
    pub cause: Option<Box<CanonicalError>>,
}

impl CanonicalError {
    pub fn new(message: impl Into<String>) -> Self {
        CanonicalError { message: message.into(), stack: None, cause: None }
    }

    /// Adopt a native error as-is, preserving its message and walking
    /// its `source()` chain into the cause linkage.
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        CanonicalError {
            message: err.to_string(),
            stack: None,
            cause: err.source().map(|source| Box::new(CanonicalError::from_error(source))),
        }
    }

    /// Number of errors in the chain, this one included.
    pub fn chain_len(&self) -> usize {
        1 + self.cause.as_deref().map_or(0, CanonicalError::chain_len)
    }
}

impl fmt::Display for CanonicalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for CanonicalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_deref().map(|cause| cause as &(dyn Error + 'static))
    }
}

/// The shapes an error payload can arrive in, resolved up front so each
/// reconstruction rule lives in exactly one match arm.
#[derive(Debug, Clone)]
pub enum ErrorRepr {
    /// An already-canonical error handed through the typed API; adopted
    /// unchanged. JSON input never classifies into this variant.
    Native(CanonicalError),
    /// An error-shaped JSON object (exposes a `message` key).
    Shaped(Value),
    /// A bare string.
    Text(String),
    /// Anything else worth mentioning but not decodable.
    Other(Value),
    Absent,
}

impl ErrorRepr {
    /// Resolve the runtime shape of a record's `err` field.
    pub fn classify(err: Option<&Value>) -> ErrorRepr {
        match err {
            None | Some(Value::Null) => ErrorRepr::Absent,
            Some(value) if is_error_like(value) => ErrorRepr::Shaped(value.clone()),
            Some(Value::String(s)) => ErrorRepr::Text(s.clone()),
            Some(value) => ErrorRepr::Other(value.clone()),
        }
    }
}

/// Normalize an error representation into a [`CanonicalError`].
///
/// `fallback_message` is the record's derived message; it fills in
/// whenever the payload carries no usable message of its own, so an
/// exception event never ends up empty.
///
/// Dispatch rules, in precedence order:
/// 1. native error: adopted as-is;
/// 2. error-shaped object: message from `message` (fallback when empty),
///    cause reconstructed recursively, stack overwritten from `stack`
///    even when that leaves it unset;
/// 3. string: the string as message (fallback when empty), stack
///    synthesized here, no cause;
/// 4. anything else: fallback message only.
pub fn reconstruct(err: ErrorRepr, fallback_message: &str) -> CanonicalError {
    match err {
        ErrorRepr::Native(error) => error,
        ErrorRepr::Shaped(value) => {
            let message = value
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(fallback_message)
                .to_string();

            let cause = value
                .get("cause")
                .filter(|c| !c.is_null())
                .map(|c| Box::new(reconstruct(ErrorRepr::classify(Some(c)), fallback_message)));

            // Stack comes from the payload even when the pairing with the
            // message ends up inconsistent; never synthesized here.
            let stack = value.get("stack").and_then(Value::as_str).map(str::to_string);

            CanonicalError { message, stack, cause }
        }
        ErrorRepr::Text(text) => {
            let message = if text.is_empty() { fallback_message.to_string() } else { text };
            CanonicalError {
                message,
                stack: Some(Backtrace::force_capture().to_string()),
                cause: None,
            }
        }
        ErrorRepr::Other(_) | ErrorRepr::Absent => CanonicalError::new(fallback_message),
    }
}
