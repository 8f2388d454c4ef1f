use thiserror::Error;

/// Failure of a token store read or write.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("token file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// Every way a backend call can fail.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered `401`. Persisted tokens have already been cleared.
    /// `message` is the backend's explanation, e.g. for rejected credentials.
    #[error("session expired or not authorized{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Unauthorized { message: Option<String> },

    /// Any other non-2xx answer. `message` is the backend's `message` or
    /// `error` field when the body carried one.
    #[error("backend returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),

    #[error("invalid base URL `{0}`")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Text to show to the user: the backend message when there is one,
    /// `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            }
            | ApiError::Unauthorized {
                message: Some(message),
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
