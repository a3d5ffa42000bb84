use thiserror::Error;

/// Streaming core error types
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    #[error("Export failed: {0}")]
    Export(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for streaming core operations
pub type TelemetryResult<T> = Result<T, TelemetryError>;
