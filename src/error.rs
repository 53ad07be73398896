use thiserror::Error;

/// Errors surfaced by the Home Assistant RPC connection and the HTTP API.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("RPC error [{code}]: {message}")]
    Rpc { code: String, message: String },
    #[error("Session is no longer authorized")]
    Unauthorized,
    #[error("Unexpected payload: {0}")]
    Decode(String),
    #[error("HTTP status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("{0}")]
    Validation(String),
    #[error("Unsupported image type: {0}. Only JPEG, PNG, and GIF are supported.")]
    UnsupportedImage(String),
}

impl ClientError {
    /// Whether this error means the host session is gone and the panel has
    /// to start over from the host root.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ClientError::Unauthorized => true,
            ClientError::Rpc { code, .. } => {
                matches!(code.as_str(), "unauthorized" | "403" | "forbidden")
            }
            ClientError::Http { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ClientError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => ClientError::Network(e.to_string()),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Network(e.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
