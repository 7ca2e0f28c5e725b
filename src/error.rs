use thiserror::Error;

/// Failures talking to the exchange REST API.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Exchange API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Missing API credentials for authenticated endpoint")]
    MissingCredentials,

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),
}

/// Failures from the vision/language model call.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Vision model is not configured")]
    NotConfigured,
}

/// Failures reading or appending the trade ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
