//! Error types for jenisaver

use thiserror::Error;

/// Coarse classification used when deciding what to tell the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Backend errors
    NetworkError,
    BackendRejected,
    BadResponse,

    // Push channel errors
    ChannelError,

    // User errors
    Cancelled,
    InvalidConfig,

    // System errors
    FileError,
}

/// Main error type for jenisaver
#[derive(Error, Debug)]
pub enum SaverError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {0}")]
    Api(String),

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Download cancelled")]
    Cancelled,

    #[error("Push channel protocol error: {0}")]
    Protocol(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SaverError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Network(_) | Self::Http(_) => ErrorCode::NetworkError,
            Self::Api(_) => ErrorCode::BackendRejected,
            Self::MalformedResponse(_) | Self::Json(_) => ErrorCode::BadResponse,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Protocol(_) | Self::WebSocket(_) => ErrorCode::ChannelError,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::File(_) => ErrorCode::FileError,
        }
    }

    /// Whether the user asked for this outcome
    pub fn is_cancelled(&self) -> bool {
        self.code() == ErrorCode::Cancelled
    }
}

pub type Result<T> = std::result::Result<T, SaverError>;
