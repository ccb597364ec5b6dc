//! Error types for the telemetry pipeline

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `start()` called on a publisher whose ticker is already running
    #[error("Publisher is already started")]
    AlreadyStarted,

    /// Timer-driven operation requested outside a Tokio runtime
    #[error("No Tokio runtime available to drive the publisher")]
    NoRuntime,

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A single transport rejected a payload
    #[error("Transport '{transport}' failed: {message}")]
    Transport { transport: String, message: String },

    /// Every transport in the chain failed for one flush
    #[error("Delivery failed: {attempted} transport(s) tried, {records} record(s) not delivered")]
    DeliveryFailed { attempted: usize, records: usize },

    /// HTTP client error
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl TelemetryError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        TelemetryError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a transport failure
    pub fn transport(transport: impl Into<String>, message: impl Into<String>) -> Self {
        TelemetryError::Transport {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Create a chain-exhausted delivery failure
    pub fn delivery_failed(attempted: usize, records: usize) -> Self {
        TelemetryError::DeliveryFailed { attempted, records }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        TelemetryError::Other(msg.into())
    }
}
