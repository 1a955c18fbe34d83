use thiserror::Error;

/// Result type alias for probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors that can occur while preparing or orchestrating probes.
///
/// Network failures inside a probe never show up here: they are folded into
/// the probe result fields instead (see [`crate::DnsFailure`] and
/// [`crate::TransportErrorKind`]).
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The target string could not be classified into a usable address
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// A probe for this target identifier is already running
    #[error("probe already in flight for target {id}")]
    InFlight {
        /// Target identifier
        id: String,
    },

    /// The run finished after `cancel_all` and its result was discarded
    #[error("probe for target {id} was cancelled")]
    Cancelled {
        /// Target identifier
        id: String,
    },

    /// DoH provider answered with a non-success status
    #[error("provider error ({code}): {provider}")]
    Provider {
        /// Provider name
        provider: String,
        /// HTTP status code
        code: u16,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Request timed out
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
